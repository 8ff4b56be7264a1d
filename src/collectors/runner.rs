use std::time::Duration;

use crate::collectors::{Extraction, JobCollector};
use crate::models::seen::SeenSet;
use crate::sheets::AppendSink;

/// Main poll loop: fetch, extract, append, sleep, repeat.
/// Exits gracefully on SIGINT/SIGTERM; runs until then.
pub async fn run(
    collector: &dyn JobCollector,
    sink: &dyn AppendSink,
    niche: &str,
    delay_secs: u64,
) -> anyhow::Result<()> {
    let mut seen = SeenSet::new();

    tracing::info!(
        "Starting {} poller for niche '{niche}', polling every {delay_secs}s",
        collector.name()
    );

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received, exiting gracefully");
                break;
            }
            _ = async {
                run_tick(collector, sink, niche, &mut seen).await;
                tracing::info!("Sleeping for {delay_secs} seconds...");
                tokio::time::sleep(Duration::from_secs(delay_secs)).await;
            } => {}
        }
    }

    Ok(())
}

/// One tick: collect new listings and forward them to the sink.
/// Returns (records extracted, rows appended). Nothing in here is fatal:
/// fetch and append failures are logged and the poller keeps going.
pub(crate) async fn run_tick(
    collector: &dyn JobCollector,
    sink: &dyn AppendSink,
    niche: &str,
    seen: &mut SeenSet,
) -> (usize, u32) {
    let extraction = match collector.collect(niche, seen).await {
        Ok(extraction) => extraction,
        Err(e) => {
            tracing::warn!("Failed to fetch listings: {e}");
            Extraction::default()
        }
    };

    for skip in &extraction.skipped {
        tracing::warn!("Error parsing job card {}: {}", skip.index, skip.reason);
    }

    if extraction.records.is_empty() {
        tracing::info!("No new jobs to add.");
        return (0, 0);
    }

    match sink.append(&extraction.records).await {
        Ok(rows) => {
            tracing::info!("{rows} rows appended.");
            (extraction.records.len(), rows)
        }
        Err(e) => {
            // A transient sheet error must not kill a long-running poller.
            tracing::error!("Failed to append rows: {e}");
            (extraction.records.len(), 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::collectors::CardSkip;
    use crate::error::AppError;
    use crate::models::job::{JobRecord, SENTINEL};

    fn record(link: &str) -> JobRecord {
        JobRecord {
            title: "Build a scraper".into(),
            posted_time: SENTINEL.into(),
            location: SENTINEL.into(),
            description: SENTINEL.into(),
            experience_level: SENTINEL.into(),
            budget: SENTINEL.into(),
            project_type: SENTINEL.into(),
            contract_type: SENTINEL.into(),
            skills: SENTINEL.into(),
            activity: SENTINEL.into(),
            client_info: SENTINEL.into(),
            link: link.into(),
        }
    }

    struct FixedCollector(Extraction);

    #[async_trait]
    impl JobCollector for FixedCollector {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn collect(
            &self,
            _niche: &str,
            _seen: &mut SeenSet,
        ) -> Result<Extraction, AppError> {
            Ok(self.0.clone())
        }
    }

    struct FailingCollector;

    #[async_trait]
    impl JobCollector for FailingCollector {
        fn name(&self) -> &str {
            "failing"
        }

        async fn collect(
            &self,
            _niche: &str,
            _seen: &mut SeenSet,
        ) -> Result<Extraction, AppError> {
            Err(AppError::Internal("boom".into()))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl AppendSink for RecordingSink {
        async fn append(&self, records: &[JobRecord]) -> Result<u32, AppError> {
            self.calls.lock().unwrap().push(records.len());
            Ok(records.len() as u32)
        }
    }

    struct FailingSink;

    #[async_trait]
    impl AppendSink for FailingSink {
        async fn append(&self, _records: &[JobRecord]) -> Result<u32, AppError> {
            Err(AppError::Sheets("quota exceeded".into()))
        }
    }

    #[tokio::test]
    async fn tick_forwards_new_records_to_the_sink() {
        let collector = FixedCollector(Extraction {
            records: vec![record("https://example.com/jobs/1"), record("https://example.com/jobs/2")],
            skipped: vec![],
        });
        let sink = RecordingSink::default();
        let mut seen = SeenSet::new();

        let (extracted, appended) = run_tick(&collector, &sink, "rust", &mut seen).await;

        assert_eq!(extracted, 2);
        assert_eq!(appended, 2);
        assert_eq!(*sink.calls.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn empty_tick_never_touches_the_sink() {
        let collector = FixedCollector(Extraction::default());
        let sink = RecordingSink::default();
        let mut seen = SeenSet::new();

        let (extracted, appended) = run_tick(&collector, &sink, "rust", &mut seen).await;

        assert_eq!(extracted, 0);
        assert_eq!(appended, 0);
        assert!(sink.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_is_treated_as_an_empty_tick() {
        let sink = RecordingSink::default();
        let mut seen = SeenSet::new();

        let (extracted, appended) = run_tick(&FailingCollector, &sink, "rust", &mut seen).await;

        assert_eq!(extracted, 0);
        assert_eq!(appended, 0);
        assert!(sink.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_failure_does_not_escape_the_tick() {
        let collector = FixedCollector(Extraction {
            records: vec![record("https://example.com/jobs/1")],
            skipped: vec![CardSkip {
                index: 3,
                reason: "bad card".into(),
            }],
        });
        let mut seen = SeenSet::new();

        let (extracted, appended) = run_tick(&collector, &FailingSink, "rust", &mut seen).await;

        assert_eq!(extracted, 1);
        assert_eq!(appended, 0);
    }
}
