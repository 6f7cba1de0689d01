//! # policy-rag
//!
//! Grounded question answering over credit-underwriting policy documents.
//!
//! ## Overview
//!
//! A question flows through four stages:
//!
//! 1. [`Retriever`] fetches candidate chunks through a [`SimilaritySearch`]
//!    gateway, then optionally reranks them ([`PolicySignalReranker`]) or
//!    selects a diverse subset by maximal marginal relevance.
//! 2. [`format_context`] renders the chunks as labeled context blocks.
//! 3. [`AnswerGenerator`] asks a [`CompletionService`] for an answer and,
//!    on request, for a groundedness judgment of that answer.
//! 4. [`RagPipeline`] assembles a [`QueryResponse`] with source attributions
//!    and a 0–100 confidence, from either the validator or
//!    [`estimate_confidence`].
//!
//! The embedding model, the vector index and the language model are external
//! services behind the [`EmbeddingProvider`], [`VectorStore`] and
//! [`CompletionService`] traits. [`InMemoryVectorStore`] is provided for
//! development and tests.
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `openai` | `OpenAIEmbeddingProvider` and `OpenAICompatibleChat` (Groq by default) |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use policy_rag::{QueryOptions, RagConfig, RagPipeline, mock::{MockCompletionService, StaticSearchGateway}};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .search_gateway(Arc::new(StaticSearchGateway::new(chunks)))
//!     .completion_service(Arc::new(MockCompletionService::new("580")))
//!     .build()?;
//!
//! let response = pipeline.query("Minimum FHA credit score?", &QueryOptions::default()).await?;
//! ```

pub mod completion;
pub mod confidence;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod gateway;
pub mod generator;
pub mod inmemory;
pub mod mmr;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod reranker;
pub mod response;
pub mod retriever;
pub mod text;
pub mod vectorstore;

pub use completion::{Completion, CompletionRequest, CompletionService};
pub use confidence::{ConfidenceStrategy, HEURISTIC_CONFIDENCE_CAP, estimate_confidence};
pub use config::{RagConfig, RagConfigBuilder};
pub use context::{CONTEXT_SEPARATOR, NO_CONTEXT_FOUND, format_context};
pub use document::{Chunk, ChunkMetadata, IndexedChunk, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use gateway::{DEFAULT_COLLECTION, SimilaritySearch, VectorIndexGateway};
pub use generator::AnswerGenerator;
pub use inmemory::InMemoryVectorStore;
pub use mmr::select_mmr;
#[cfg(feature = "openai")]
pub use openai::{OpenAICompatibleChat, OpenAIEmbeddingProvider};
pub use pipeline::{PipelineStats, QueryOptions, RagPipeline, RagPipelineBuilder};
pub use reranker::{NoOpReranker, PolicySignalReranker, Reranker};
pub use response::{
    GeneratedAnswer, NO_INFORMATION_ANSWER, QueryResponse, SourceAttribution, ValidatedAnswer,
    ValidationJudgment,
};
pub use retriever::Retriever;
pub use vectorstore::VectorStore;
