//! Autocomplete candidates / 搜索建议
//!
//! Same matching machinery as the search engine, but every term is a prefix and the
//! output is distinct field values instead of ranked rows.

use std::collections::BTreeSet;
use std::time::Duration;

use sqlx::SqliteConnection;

use super::engine::{is_all_datasets, searchable_schema, MatchTarget};
use super::fanout::{run_fanout, successful};
use super::query::{FtsQuery, SearchMode};
use crate::catalog::SchemaCatalog;
use crate::config::SearchConfig;
use crate::error::{AppError, Result};
use crate::ident::DatasetName;
use crate::store::Store;

/// Values taken from one field of one dataset
pub const PER_FIELD_LIMIT: usize = 5;
/// Hard cap on any suggestion list
pub const MAX_SUGGESTIONS: usize = 10;

#[derive(Clone)]
pub struct SuggestionEngine {
    store: Store,
    catalog: SchemaCatalog,
    config: SearchConfig,
}

impl SuggestionEngine {
    pub fn new(store: Store, config: SearchConfig) -> Self {
        let catalog = SchemaCatalog::new(store.clone());
        Self {
            store,
            catalog,
            config,
        }
    }

    /// Distinct, sorted candidates; never more than [`MAX_SUGGESTIONS`]
    pub async fn suggest(&self, dataset: &str, query: &str, mode: SearchMode) -> Result<Vec<String>> {
        let fts = FtsQuery::parse(query);

        if is_all_datasets(dataset) {
            if fts.is_empty() {
                return Ok(Vec::new());
            }
            let datasets = self.catalog.list_dataset_names().await?;
            let outcomes = run_fanout(
                datasets,
                self.config.fanout_concurrency,
                Duration::from_millis(self.config.dataset_timeout_ms),
                |dataset| {
                    let fts = &fts;
                    async move { self.suggest_dataset(&dataset, fts, mode).await }
                },
            )
            .await;
            let merged: BTreeSet<String> = successful(outcomes).into_iter().flatten().collect();
            return Ok(merged.into_iter().take(MAX_SUGGESTIONS).collect());
        }

        let dataset = self.catalog.resolve(dataset).await?;
        if fts.is_empty() {
            return Ok(Vec::new());
        }
        self.suggest_dataset(&dataset, &fts, mode).await.map_err(|e| {
            tracing::error!("Suggestions for {} failed: {:?}", dataset, e);
            match e {
                AppError::Service { .. } => AppError::service("suggestions failed"),
                other => other,
            }
        })
    }

    pub async fn suggest_dataset(
        &self,
        dataset: &DatasetName,
        fts: &FtsQuery,
        mode: SearchMode,
    ) -> Result<Vec<String>> {
        let schema = searchable_schema(&self.catalog, dataset).await?;
        let target = MatchTarget::for_dataset(dataset, &schema);
        let fields: Vec<&str> = match mode.column() {
            Some(field) => vec![field],
            None => vec!["project_title", "guide_name"],
        };

        let mut conn = self.store.pool().acquire().await?;
        let collected = match target.prepare(&mut conn, dataset).await {
            Ok(()) => collect_fields(&mut conn, &target, dataset, fts, &fields).await,
            Err(e) => Err(e),
        };
        target.release(&mut conn).await;

        Ok(collected?.into_iter().take(MAX_SUGGESTIONS).collect())
    }
}

async fn collect_fields(
    conn: &mut SqliteConnection,
    target: &MatchTarget,
    dataset: &DatasetName,
    fts: &FtsQuery,
    fields: &[&str],
) -> Result<BTreeSet<String>> {
    let mut values = BTreeSet::new();
    for field in fields {
        let value = format!("COALESCE(CAST(d.{} AS TEXT), '')", field);
        let sql = format!(
            "SELECT DISTINCT {value} {from} WHERE {t} MATCH ? AND {value} <> '' ORDER BY 1 ASC LIMIT {limit}",
            value = value,
            from = target.from_clause(dataset),
            t = target.table(),
            limit = PER_FIELD_LIMIT,
        );
        let found: Vec<String> = sqlx::query_scalar(&sql)
            .bind(fts.to_match(Some(field), true))
            .fetch_all(&mut *conn)
            .await?;
        values.extend(found);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::loader::replace_dataset;
    use crate::models::ProjectRecord;

    fn record(group_no: i64, title: &str, guide: &str) -> ProjectRecord {
        ProjectRecord {
            group_no,
            usn: vec![format!("U{}", group_no)],
            name: vec![format!("S{}", group_no)],
            project_title: title.to_string(),
            guide_name: guide.to_string(),
            outcomes: String::new(),
            proof_link: String::new(),
            report_links: String::new(),
            ppt_links: String::new(),
        }
    }

    async fn engine_with(datasets: &[(&str, Vec<ProjectRecord>)]) -> (Store, SuggestionEngine) {
        let store = Store::open_in_memory().await.unwrap();
        crate::db::run_migrations(store.pool()).await.unwrap();
        for (name, records) in datasets {
            let ds = DatasetName::parse(name).unwrap();
            replace_dataset(&store, &ds, "test.csv", records).await.unwrap();
        }
        (store.clone(), SuggestionEngine::new(store, SearchConfig::default()))
    }

    fn smart_titles(offset: i64, count: i64) -> Vec<ProjectRecord> {
        (0..count)
            .map(|i| record(offset + i, &format!("Smart System {:02}", offset + i), "Dr. Rao"))
            .collect()
    }

    #[tokio::test]
    async fn test_title_mode_caps_at_five_sorted() {
        let (_store, engine) = engine_with(&[("2024_25", smart_titles(1, 8))]).await;
        let got = engine.suggest("2024-25", "sma", SearchMode::Title).await.unwrap();
        assert_eq!(got.len(), PER_FIELD_LIMIT);
        assert_eq!(got[0], "Smart System 01");
        assert!(got.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_all_mode_unions_title_and_guide() {
        let (_store, engine) = engine_with(&[(
            "2024_25",
            vec![
                record(1, "Rainfall Predictor", "Dr. Patil"),
                record(2, "Parking Finder", "Dr. Rajan"),
                record(3, "Canteen Billing", "Dr. Shah"),
            ],
        )])
        .await;
        let got = engine.suggest("2024_25", "ra", SearchMode::All).await.unwrap();
        assert_eq!(got, vec!["Dr. Rajan".to_string(), "Rainfall Predictor".to_string()]);
    }

    #[tokio::test]
    async fn test_cross_year_duplicates_collapse_and_cap() {
        let (store, engine) = engine_with(&[
            ("2023_24", smart_titles(1, 8)),
            ("2024_25", smart_titles(1, 8)),
        ])
        .await;
        sqlx::query(r#"CREATE TABLE "2022_23" (foo TEXT)"#)
            .execute(store.pool())
            .await
            .unwrap();

        let got = engine.suggest("all", "smart", SearchMode::All).await.unwrap();
        assert_eq!(got.len(), PER_FIELD_LIMIT);
        let unique: BTreeSet<&String> = got.iter().collect();
        assert_eq!(unique.len(), got.len());

        let mut datasets = Vec::new();
        for (i, year) in ["2019_20", "2020_21", "2021_22"].iter().enumerate() {
            datasets.push((*year, smart_titles(10 * (i as i64 + 1), 5)));
        }
        for (name, records) in &datasets {
            let ds = DatasetName::parse(name).unwrap();
            replace_dataset(&store, &ds, "test.csv", records).await.unwrap();
        }
        let got = engine.suggest("all", "smart", SearchMode::Title).await.unwrap();
        assert_eq!(got.len(), MAX_SUGGESTIONS);
    }

    #[tokio::test]
    async fn test_unknown_dataset_fails() {
        let (_store, engine) = engine_with(&[]).await;
        assert!(matches!(
            engine.suggest("1999-00", "smart", SearchMode::All).await,
            Err(AppError::InvalidDataset(_))
        ));
    }
}
