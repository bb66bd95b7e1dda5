//! Crawl orchestration
//!
//! This module ties the layers together:
//! - Feed paging with resumption and retry
//! - Gallery media collection per item
//! - Best-effort media download
//! - Durable per-item commits to the progress store

mod cancel;
mod orchestrator;
mod summary;

pub use cancel::CancelFlag;
pub use orchestrator::CrawlOrchestrator;
pub use summary::CrawlSummary;
