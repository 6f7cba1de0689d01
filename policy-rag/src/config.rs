//! Configuration for retrieval, generation and validation.
//!
//! A [`RagConfig`] is set once when the pipeline is built and never changes
//! afterwards. Use [`RagConfig::builder()`] for validated construction or
//! [`RagConfig::from_env()`] to read the usual deployment variables.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default completion model (served through Groq's OpenAI-compatible API).
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Configuration parameters for the question-answering pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Number of chunks handed to the generator.
    pub top_k: usize,
    /// Minimum similarity for a candidate to be considered at all.
    pub similarity_threshold: f32,
    /// Relevance/redundancy trade-off for MMR selection, in `[0, 1]`.
    pub diversity_weight: f32,
    /// Completion model identifier.
    pub model: String,
    /// Sampling temperature for answer generation.
    pub temperature: f32,
    /// Token budget for answer generation.
    pub max_tokens: u32,
    /// Token budget for the groundedness validation call.
    pub validation_max_tokens: u32,
    /// Token budget for judge calls made during evaluation.
    pub judge_max_tokens: u32,
    /// Number of characters kept in each source preview.
    pub source_preview_chars: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: 0.7,
            diversity_weight: 0.3,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_tokens: 1024,
            validation_max_tokens: 512,
            judge_max_tokens: 256,
            source_preview_chars: 200,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Build a configuration from environment variables, falling back to the
    /// defaults for anything unset.
    ///
    /// Recognized variables: `TOP_K_RETRIEVAL`, `SIMILARITY_THRESHOLD`,
    /// `DIVERSITY_WEIGHT`, `GROQ_MODEL`, `LLM_TEMPERATURE`, `LLM_MAX_TOKENS`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a variable is set but cannot be
    /// parsed, or if the resulting configuration is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(top_k) = parse_var(&lookup, "TOP_K_RETRIEVAL")? {
            builder = builder.top_k(top_k);
        }
        if let Some(threshold) = parse_var(&lookup, "SIMILARITY_THRESHOLD")? {
            builder = builder.similarity_threshold(threshold);
        }
        if let Some(weight) = parse_var(&lookup, "DIVERSITY_WEIGHT")? {
            builder = builder.diversity_weight(weight);
        }
        if let Some(model) = lookup("GROQ_MODEL").filter(|m| !m.trim().is_empty()) {
            builder = builder.model(model);
        }
        if let Some(temperature) = parse_var(&lookup, "LLM_TEMPERATURE")? {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = parse_var(&lookup, "LLM_MAX_TOKENS")? {
            builder = builder.max_tokens(max_tokens);
        }
        builder.build()
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| RagError::ConfigError(format!("{key}='{raw}' is invalid: {e}"))),
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the number of chunks handed to the generator.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity threshold.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Set the MMR diversity weight.
    pub fn diversity_weight(mut self, weight: f32) -> Self {
        self.config.diversity_weight = weight;
        self
    }

    /// Set the completion model identifier.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the generation temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the generation token budget.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set the validation token budget.
    pub fn validation_max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.validation_max_tokens = max_tokens;
        self
    }

    /// Set the evaluation judge token budget.
    pub fn judge_max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.judge_max_tokens = max_tokens;
        self
    }

    /// Set the source preview length in characters.
    pub fn source_preview_chars(mut self, chars: usize) -> Self {
        self.config.source_preview_chars = chars;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `top_k == 0` or `max_tokens == 0`
    /// - `similarity_threshold` or `diversity_weight` is outside `[0, 1]`
    /// - `temperature` is outside `[0, 2]`
    /// - `model` is empty
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if !(0.0..=1.0).contains(&config.similarity_threshold) {
            return Err(RagError::ConfigError(format!(
                "similarity_threshold ({}) must be between 0 and 1",
                config.similarity_threshold
            )));
        }
        if !(0.0..=1.0).contains(&config.diversity_weight) {
            return Err(RagError::ConfigError(format!(
                "diversity_weight ({}) must be between 0 and 1",
                config.diversity_weight
            )));
        }
        if !(0.0..=2.0).contains(&config.temperature) {
            return Err(RagError::ConfigError(format!(
                "temperature ({}) must be between 0 and 2",
                config.temperature
            )));
        }
        if config.max_tokens == 0 {
            return Err(RagError::ConfigError("max_tokens must be greater than zero".to_string()));
        }
        if config.model.trim().is_empty() {
            return Err(RagError::ConfigError("model must not be empty".to_string()));
        }
        Ok(config)
    }
}
