pub mod binder;
pub mod client;
pub mod embeddings;
pub mod guardrails;
pub mod judge;
pub mod llm;
pub mod pipeline;
pub mod planner;
pub mod prompts;
pub mod rerank;
pub mod retrieve;
