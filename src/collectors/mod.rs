// Collector module.
// Defines the trait and runner for marketplace listing collectors.

pub mod runner;
pub mod upwork;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::job::JobRecord;
use crate::models::seen::SeenSet;

/// Outcome of one extraction pass over a search-results page.
#[derive(Debug, Default, Clone)]
pub struct Extraction {
    /// Newly discovered records, in document order.
    pub records: Vec<JobRecord>,
    /// Cards abandoned mid-parse, collected for logging.
    pub skipped: Vec<CardSkip>,
}

/// A card that could not be turned into a record.
#[derive(Debug, Clone)]
pub struct CardSkip {
    /// Zero-based position of the card on the page.
    pub index: usize,
    pub reason: String,
}

/// Trait that all listing collectors implement.
/// Each collector fetches a search-results page for a niche and returns the
/// listings not yet present in `seen`.
#[async_trait]
pub trait JobCollector: Send + Sync {
    /// Source name used in log lines.
    fn name(&self) -> &str;

    /// Fetch and extract listings for `niche`, recording new identifiers in
    /// `seen`. A non-success fetch status is not an error: it yields an
    /// empty extraction for the tick.
    async fn collect(&self, niche: &str, seen: &mut SeenSet) -> Result<Extraction, AppError>;
}
