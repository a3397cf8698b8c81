//! Orchestration over the core types: AI adapters, the matching engine, the
//! in-memory journey tracker and the routing pipeline.

#![allow(async_fn_in_trait)]

pub mod cache;
pub mod error;
pub mod llm;
pub mod matcher;
pub mod matching;
pub mod memory;
pub mod pipeline;
pub mod scorer;

pub use cache::MatchCache;
pub use error::{Error, Result};
pub use llm::{LlmClient, LlmConfig};
pub use matcher::LlmMatchEvaluator;
pub use matching::{MatchingConfig, MatchingEngine};
pub use memory::MemoryStore;
pub use pipeline::{
  AnalysisOutcome, MatchOutcome, Milestone, PipelineConfig, PipelineDeps,
  RoutedIdea, RoutingPipeline,
};
pub use scorer::LlmScorer;
