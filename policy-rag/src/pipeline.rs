//! Question-answering pipeline orchestrator.
//!
//! The [`RagPipeline`] runs one question through retrieval, context
//! formatting, answer generation and response assembly. It composes a
//! [`SimilaritySearch`] gateway, a [`CompletionService`] and an optional
//! [`Reranker`].
//!
//! # Example
//!
//! ```rust,ignore
//! use policy_rag::{QueryOptions, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .search_gateway(Arc::new(gateway))
//!     .completion_service(Arc::new(chat))
//!     .build()?;
//!
//! let response = pipeline.query("What is the minimum FHA credit score?", &QueryOptions::default()).await?;
//! println!("{} (confidence {})", response.answer, response.confidence);
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::completion::CompletionService;
use crate::confidence::{ConfidenceStrategy, estimate_confidence};
use crate::config::RagConfig;
use crate::context::format_context;
use crate::document::Chunk;
use crate::error::{RagError, Result};
use crate::gateway::SimilaritySearch;
use crate::generator::AnswerGenerator;
use crate::reranker::Reranker;
use crate::response::{QueryResponse, SourceAttribution};
use crate::retriever::Retriever;

/// Per-query switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Overrides the configured `top_k` for this query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    /// Rerank candidates before generation.
    pub use_reranking: bool,
    /// Ask the model to validate its answer and use that confidence.
    pub validate_answer: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self { top_k: None, use_reranking: true, validate_answer: false }
    }
}

impl QueryOptions {
    /// Set the `top_k` override.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Enable or disable reranking.
    pub fn with_reranking(mut self, use_reranking: bool) -> Self {
        self.use_reranking = use_reranking;
        self
    }

    /// Enable or disable answer validation.
    pub fn with_validation(mut self, validate_answer: bool) -> Self {
        self.validate_answer = validate_answer;
        self
    }

    /// The confidence strategy these options select.
    pub fn confidence_strategy(&self) -> ConfidenceStrategy {
        ConfidenceStrategy::for_validation(self.validate_answer)
    }
}

/// Static pipeline settings, as reported by [`RagPipeline::stats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub model: String,
    pub top_k: usize,
    pub similarity_threshold: f32,
    pub diversity_weight: f32,
}

/// The question-answering orchestrator.
///
/// Holds no per-query state; a single instance can serve concurrent queries.
/// Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    retriever: Retriever,
    generator: AnswerGenerator,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return the retriever.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Return the answer generator.
    pub fn generator(&self) -> &AnswerGenerator {
        &self.generator
    }

    /// Report the model and retrieval settings.
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            model: self.config.model.clone(),
            top_k: self.config.top_k,
            similarity_threshold: self.config.similarity_threshold,
            diversity_weight: self.config.diversity_weight,
        }
    }

    /// Run the retrieval stage alone, honoring `top_k` and `use_reranking`.
    ///
    /// # Errors
    ///
    /// Propagates retrieval and reranking failures.
    pub async fn retrieve(&self, question: &str, options: &QueryOptions) -> Result<Vec<Chunk>> {
        if options.use_reranking {
            self.retriever.retrieve_with_reranking(question, options.top_k, None).await
        } else {
            self.retriever.retrieve(question, options.top_k, None).await
        }
    }

    /// Build source attributions for retrieved chunks, in retrieval order.
    pub fn attribute_sources(&self, chunks: &[Chunk]) -> Vec<SourceAttribution> {
        chunks
            .iter()
            .map(|c| SourceAttribution::from_chunk(c, self.config.source_preview_chars))
            .collect()
    }

    /// Answer one question: retrieve → format context → generate → assemble.
    ///
    /// An empty retrieval returns [`QueryResponse::no_information`] without
    /// calling the completion service.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::RetrievalError`] or [`RagError::RerankerError`] if
    /// retrieval fails and [`RagError::GenerationError`] if answer generation
    /// fails. Validation failures are never returned.
    pub async fn query(&self, question: &str, options: &QueryOptions) -> Result<QueryResponse> {
        self.query_with_chunks(question, options).await.map(|(response, _)| response)
    }

    /// Same as [`query`](Self::query), also returning the chunks the answer
    /// was generated from, with their full text.
    ///
    /// # Errors
    ///
    /// Same as [`query`](Self::query).
    pub async fn query_with_chunks(
        &self,
        question: &str,
        options: &QueryOptions,
    ) -> Result<(QueryResponse, Vec<Chunk>)> {
        let chunks = self.retrieve(question, options).await.inspect_err(|e| {
            error!(error = %e, "retrieval failed");
        })?;

        if chunks.is_empty() {
            info!(retrieved = 0, "no chunks cleared the threshold");
            return Ok((QueryResponse::no_information(), chunks));
        }

        let context = format_context(&chunks);
        let strategy = options.confidence_strategy();

        let (answer, tokens_used, response_time, confidence, validation) = match strategy {
            ConfidenceStrategy::LlmValidation => {
                let validated = self.generator.generate_with_validation(question, &context).await?;
                (
                    validated.answer,
                    validated.tokens_used,
                    validated.response_time,
                    validated.confidence_score,
                    Some(validated.validation),
                )
            }
            ConfidenceStrategy::RetrievalHeuristic => {
                let generated = self.generator.generate_answer(question, &context).await?;
                (
                    generated.answer,
                    generated.tokens_used,
                    generated.response_time,
                    estimate_confidence(&chunks),
                    None,
                )
            }
        };

        info!(retrieved = chunks.len(), confidence, ?strategy, tokens_used, "query processed");

        let response = QueryResponse {
            answer,
            sources: self.attribute_sources(&chunks),
            confidence,
            retrieved_count: chunks.len(),
            tokens_used,
            response_time,
            validation,
        };
        Ok((response, chunks))
    }

    /// Answer several questions in order.
    ///
    /// A failing question produces an error record (answer
    /// `"Error processing query: <error>"`, no sources, confidence 0) and the
    /// batch carries on.
    pub async fn batch_query<S: AsRef<str>>(
        &self,
        questions: &[S],
        options: &QueryOptions,
    ) -> Vec<QueryResponse> {
        let mut responses = Vec::with_capacity(questions.len());
        for question in questions {
            let response = match self.query(question.as_ref(), options).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(error = %e, "batch question failed");
                    QueryResponse {
                        answer: format!("Error processing query: {e}"),
                        ..QueryResponse::no_information()
                    }
                }
            };
            responses.push(response);
        }
        responses
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config` defaults to [`RagConfig::default()`]; the search gateway and the
/// completion service are required. Without a reranker the retriever uses
/// [`PolicySignalReranker`](crate::PolicySignalReranker).
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    search_gateway: Option<Arc<dyn SimilaritySearch>>,
    completion_service: Option<Arc<dyn CompletionService>>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the similarity search gateway.
    pub fn search_gateway(mut self, gateway: Arc<dyn SimilaritySearch>) -> Self {
        self.search_gateway = Some(gateway);
        self
    }

    /// Set the completion service used for generation and validation.
    pub fn completion_service(mut self, service: Arc<dyn CompletionService>) -> Self {
        self.completion_service = Some(service);
        self
    }

    /// Replace the default reranker.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Build the [`RagPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required component is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        let gateway = self
            .search_gateway
            .ok_or_else(|| RagError::ConfigError("search_gateway is required".to_string()))?;
        let service = self
            .completion_service
            .ok_or_else(|| RagError::ConfigError("completion_service is required".to_string()))?;

        let mut retriever = Retriever::new(
            gateway,
            config.top_k,
            config.similarity_threshold,
            config.diversity_weight,
        );
        if let Some(reranker) = self.reranker {
            retriever = retriever.with_reranker(reranker);
        }
        let generator = AnswerGenerator::new(service, &config);

        info!(model = %config.model, top_k = config.top_k, "pipeline ready");
        Ok(RagPipeline { config, retriever, generator })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ChunkMetadata;
    use crate::mock::{MockCompletionService, StaticSearchGateway};
    use crate::reranker::NoOpReranker;
    use crate::response::NO_INFORMATION_ANSWER;

    fn fha_chunks() -> Vec<Chunk> {
        vec![
            Chunk::new(
                "c1",
                "FHA loans require a minimum credit score of 580 for 3.5% down payment.",
                ChunkMetadata::new("credit_scoring_manual.md", "FHA Loans"),
                0.9,
            ),
            Chunk::new(
                "c2",
                "Borrowers with scores between 500 and 579 need 10% down.",
                ChunkMetadata::new("credit_scoring_manual.md", "FHA Loans"),
                0.8,
            ),
        ]
    }

    fn pipeline(
        chunks: Vec<Chunk>,
        service: MockCompletionService,
    ) -> (RagPipeline, Arc<MockCompletionService>) {
        let service = Arc::new(service);
        let pipeline = RagPipeline::builder()
            .search_gateway(Arc::new(StaticSearchGateway::new(chunks)))
            .completion_service(service.clone())
            .build()
            .unwrap();
        (pipeline, service)
    }

    #[tokio::test]
    async fn empty_retrieval_skips_generation() {
        let (pipeline, service) = pipeline(Vec::new(), MockCompletionService::new("unused"));

        let response = pipeline.query("What is the FHA minimum?", &QueryOptions::default()).await.unwrap();
        assert_eq!(response.answer, NO_INFORMATION_ANSWER);
        assert!(response.sources.is_empty());
        assert_eq!(response.confidence, 0);
        assert_eq!(response.retrieved_count, 0);
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn heuristic_confidence_without_validation() {
        let (pipeline, service) = pipeline(fha_chunks(), MockCompletionService::new("580."));

        let options = QueryOptions::default().with_reranking(false);
        let response = pipeline.query("FHA minimum credit score?", &options).await.unwrap();
        assert_eq!(response.answer, "580.");
        assert_eq!(response.retrieved_count, 2);
        assert_eq!(response.sources.len(), 2);
        assert_eq!(response.confidence, 91);
        assert!(response.validation.is_none());
        assert_eq!(service.call_count(), 1);
        assert!(service.requests()[0].user_prompt.contains("[Context 1] Source: credit_scoring_manual.md"));
    }

    #[tokio::test]
    async fn validated_confidence_comes_from_judgment() {
        let service = MockCompletionService::new(r#"{"grounded": "Yes", "confidence": 77}"#)
            .queue_reply("580 (Source: credit_scoring_manual.md - FHA Loans)");
        let (pipeline, service) = pipeline(fha_chunks(), service);

        let options = QueryOptions::default().with_validation(true);
        let response = pipeline.query("FHA minimum credit score 580?", &options).await.unwrap();
        assert_eq!(response.confidence, 77);
        assert_eq!(response.validation.as_ref().and_then(|v| v.grounded), Some(true));
        assert_eq!(service.call_count(), 2);
    }

    #[tokio::test]
    async fn validation_failure_keeps_the_answer() {
        let service = MockCompletionService::failing("validator down").queue_reply("580.");
        let (pipeline, _) = pipeline(fha_chunks(), service);

        let options = QueryOptions::default().with_validation(true);
        let response = pipeline.query("FHA?", &options).await.unwrap();
        assert_eq!(response.answer, "580.");
        assert_eq!(response.confidence, 50);
        assert_eq!(response.validation.and_then(|v| v.grounded), None);
    }

    #[tokio::test]
    async fn generation_failure_propagates() {
        let (pipeline, _) = pipeline(fha_chunks(), MockCompletionService::failing("503"));
        let err = pipeline.query("FHA?", &QueryOptions::default()).await.unwrap_err();
        assert!(matches!(err, RagError::GenerationError(_)));
    }

    #[tokio::test]
    async fn retrieval_failure_propagates() {
        let pipeline = RagPipeline::builder()
            .search_gateway(Arc::new(StaticSearchGateway::failing("index offline")))
            .completion_service(Arc::new(MockCompletionService::new("unused")))
            .build()
            .unwrap();
        let err = pipeline.query("FHA?", &QueryOptions::default()).await.unwrap_err();
        assert!(matches!(err, RagError::RetrievalError(_)));
    }

    #[tokio::test]
    async fn batch_records_failures_and_continues() {
        let service = MockCompletionService::new("ok").queue_failure("rate limited");
        let (pipeline, _) = pipeline(fha_chunks(), service);

        let responses = pipeline.batch_query(&["first", "second"], &QueryOptions::default()).await;
        assert_eq!(responses.len(), 2);
        assert!(responses[0].answer.starts_with("Error processing query:"));
        assert!(responses[0].sources.is_empty());
        assert_eq!(responses[1].answer, "ok");
    }

    #[tokio::test]
    async fn custom_reranker_is_used() {
        let pipeline = RagPipeline::builder()
            .search_gateway(Arc::new(StaticSearchGateway::new(fha_chunks())))
            .completion_service(Arc::new(MockCompletionService::new("ok")))
            .reranker(Arc::new(NoOpReranker))
            .build()
            .unwrap();

        let chunks = pipeline.retrieve("FHA 579", &QueryOptions::default()).await.unwrap();
        assert_eq!(chunks[0].id, "c1");
        assert!(chunks.iter().all(|c| c.rerank_score.is_none()));
    }

    #[tokio::test]
    async fn query_with_chunks_returns_full_text() {
        let (pipeline, _) = pipeline(fha_chunks(), MockCompletionService::new("580."));

        let options = QueryOptions::default().with_reranking(false);
        let (response, chunks) = pipeline.query_with_chunks("FHA?", &options).await.unwrap();
        assert_eq!(response.retrieved_count, chunks.len());
        assert_eq!(chunks[1].text, "Borrowers with scores between 500 and 579 need 10% down.");
    }

    #[test]
    fn configured_diversity_weight_reaches_the_retriever() {
        let config = RagConfig::builder().diversity_weight(0.9).build().unwrap();
        let pipeline = RagPipeline::builder()
            .config(config)
            .search_gateway(Arc::new(StaticSearchGateway::new(Vec::new())))
            .completion_service(Arc::new(MockCompletionService::new("unused")))
            .build()
            .unwrap();

        assert_eq!(pipeline.retriever().diversity_weight(), 0.9);
        assert_eq!(pipeline.stats().diversity_weight, 0.9);
    }

    #[test]
    fn builder_requires_services() {
        let err = RagPipeline::builder().build().err().unwrap();
        assert!(matches!(err, RagError::ConfigError(_)));
    }

    #[test]
    fn stats_reports_configuration() {
        let (pipeline, _) = pipeline(Vec::new(), MockCompletionService::new("unused"));
        let stats = pipeline.stats();
        assert_eq!(stats.top_k, 5);
        assert_eq!(stats.similarity_threshold, 0.7);
        assert_eq!(stats.diversity_weight, 0.3);
    }
}
