//! "all datasets" fan-out / 跨数据集并发查询
//!
//! Each dataset is queried independently under its own timeout. A failure or
//! timeout becomes [`DatasetOutcome::Skipped`] and contributes nothing; the request
//! as a whole still succeeds.

use futures::stream::{self, StreamExt};
use std::future::Future;
use std::time::Duration;

use crate::error::Result;
use crate::ident::DatasetName;
use crate::models::SearchHit;

/// What one dataset contributed to a fan-out / 单个数据集的结果
#[derive(Debug)]
pub enum DatasetOutcome<T> {
    Hit(T),
    Skipped { dataset: String, reason: String },
}

impl<T> DatasetOutcome<T> {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// Run `query` for every dataset, at most `concurrency` at a time
pub async fn run_fanout<T, F, Fut>(
    datasets: Vec<DatasetName>,
    concurrency: usize,
    timeout: Duration,
    query: F,
) -> Vec<DatasetOutcome<T>>
where
    F: Fn(DatasetName) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    stream::iter(datasets)
        .map(|dataset| {
            let label = dataset.display_name();
            let fut = query(dataset);
            async move {
                match tokio::time::timeout(timeout, fut).await {
                    Ok(Ok(value)) => DatasetOutcome::Hit(value),
                    Ok(Err(e)) => {
                        // source error is only logged, never returned
                        let reason = match std::error::Error::source(&e) {
                            Some(source) => format!("{}: {}", e, source),
                            None => e.to_string(),
                        };
                        tracing::warn!("Skipping dataset {}: {}", label, reason);
                        DatasetOutcome::Skipped { dataset: label, reason }
                    }
                    Err(_) => {
                        tracing::warn!("Skipping dataset {}: timed out after {:?}", label, timeout);
                        DatasetOutcome::Skipped {
                            dataset: label,
                            reason: format!("timed out after {:?}", timeout),
                        }
                    }
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await
}

/// Drop skipped outcomes and keep the payloads
pub fn successful<T>(outcomes: Vec<DatasetOutcome<T>>) -> Vec<T> {
    outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            DatasetOutcome::Hit(value) => Some(value),
            DatasetOutcome::Skipped { .. } => None,
        })
        .collect()
}

/// Year ascending, then score descending. The sort is stable, so the per-dataset
/// title tie-break survives.
pub fn merge_hits(batches: Vec<Vec<SearchHit>>) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = batches.into_iter().flatten().collect();
    hits.sort_by(|a, b| a.year.cmp(&b.year).then(b.score.total_cmp(&a.score)));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn hit(year: &str, title: &str, score: f64) -> SearchHit {
        SearchHit {
            group_no: 1,
            usn: String::new(),
            name: String::new(),
            project_title: title.to_string(),
            guide_name: String::new(),
            outcomes: String::new(),
            proof_link: String::new(),
            ppt_links: String::new(),
            report_links: String::new(),
            score,
            year: year.to_string(),
        }
    }

    #[test]
    fn test_merge_orders_by_year_then_score() {
        let merged = merge_hits(vec![
            vec![hit("2024-25", "a", 3.0), hit("2024-25", "b", 1.0)],
            vec![hit("2023-24", "c", 0.5), hit("2023-24", "d", 0.5), hit("2023-24", "e", 9.0)],
        ]);
        let order: Vec<&str> = merged.iter().map(|h| h.project_title.as_str()).collect();
        assert_eq!(order, vec!["e", "c", "d", "a", "b"]);
    }

    #[tokio::test]
    async fn test_failures_and_timeouts_are_skipped() {
        let names: Vec<DatasetName> = ["a", "b", "c"]
            .iter()
            .map(|n| DatasetName::parse(n).unwrap())
            .collect();

        let outcomes = run_fanout(names, 2, Duration::from_millis(50), |ds| async move {
            match ds.as_str() {
                "a" => Ok(1),
                "b" => Err(AppError::service("boom")),
                _ => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(3)
                }
            }
        })
        .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes.iter().filter(|o| o.is_skipped()).count(), 2);
        assert_eq!(successful(outcomes), vec![1]);
    }
}
