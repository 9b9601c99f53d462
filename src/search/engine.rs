//! Ranked full-text search over one or all datasets / 搜索引擎
//!
//! A dataset with an `fts_<name>` index is matched against it directly. A dataset
//! without one gets a connection-local temp FTS5 table over project_title and
//! guide_name, built for the query and dropped right after; the same weighting
//! policy applies on both paths.

use sqlx::SqliteConnection;
use std::time::Duration;

use super::fanout::{merge_hits, run_fanout, successful};
use super::query::{weight_args, FtsQuery, SearchMode};
use crate::catalog::{DatasetSchema, SchemaCatalog, OPTIONAL_COLUMNS};
use crate::config::SearchConfig;
use crate::error::{AppError, Result};
use crate::ident::DatasetName;
use crate::models::SearchHit;
use crate::store::Store;

pub use crate::ident::ALL_DATASETS;

pub fn is_all_datasets(requested: &str) -> bool {
    requested.trim().eq_ignore_ascii_case(ALL_DATASETS)
}

const ADHOC_TABLE: &str = "adhoc_rank";

/// Where MATCH runs for one dataset / 匹配来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MatchTarget {
    /// Persistent `fts_<name>` index
    Index(String),
    /// Temp table filled for the duration of one query
    Adhoc,
}

impl MatchTarget {
    pub(crate) fn for_dataset(dataset: &DatasetName, schema: &DatasetSchema) -> Self {
        if schema.has_search_index {
            Self::Index(dataset.quoted_index_table())
        } else {
            Self::Adhoc
        }
    }

    /// Table name usable in MATCH, bm25() and the join condition
    pub(crate) fn table(&self) -> &str {
        match self {
            Self::Index(table) => table,
            Self::Adhoc => ADHOC_TABLE,
        }
    }

    pub(crate) fn weights(&self, mode: SearchMode) -> String {
        match self {
            Self::Index(_) => weight_args(&mode.index_weights()),
            Self::Adhoc => weight_args(&mode.adhoc_weights()),
        }
    }

    /// `FROM <index> JOIN <dataset> AS d` clause
    pub(crate) fn from_clause(&self, dataset: &DatasetName) -> String {
        format!(
            "FROM {t} JOIN main.{d} AS d ON d.group_no = {t}.rowid",
            t = self.table(),
            d = dataset.quoted()
        )
    }

    /// Build the temp table when needed; always pair with [`MatchTarget::release`]
    pub(crate) async fn prepare(&self, conn: &mut SqliteConnection, dataset: &DatasetName) -> Result<()> {
        if *self != Self::Adhoc {
            return Ok(());
        }
        sqlx::query("DROP TABLE IF EXISTS temp.adhoc_rank")
            .execute(&mut *conn)
            .await?;
        sqlx::query(
            "CREATE VIRTUAL TABLE temp.adhoc_rank USING fts5(project_title, guide_name, tokenize='porter unicode61')",
        )
        .execute(&mut *conn)
        .await?;
        let fill = format!(
            "INSERT INTO temp.adhoc_rank(rowid, project_title, guide_name) \
             SELECT CAST(group_no AS INTEGER), COALESCE(CAST(project_title AS TEXT), ''), COALESCE(CAST(guide_name AS TEXT), '') \
             FROM main.{} WHERE group_no IS NOT NULL",
            dataset.quoted()
        );
        sqlx::query(&fill).execute(&mut *conn).await?;
        Ok(())
    }

    pub(crate) async fn release(&self, conn: &mut SqliteConnection) {
        if *self != Self::Adhoc {
            return;
        }
        if let Err(e) = sqlx::query("DROP TABLE IF EXISTS temp.adhoc_rank")
            .execute(&mut *conn)
            .await
        {
            tracing::warn!("Failed to drop temp ranking table: {}", e);
        }
    }
}

/// Column list of a hit; optional columns the dataset lacks read as ''
fn result_columns(schema: &DatasetSchema) -> String {
    let mut cols = vec!["CAST(d.group_no AS INTEGER) AS group_no".to_string()];
    for col in ["usn", "name", "project_title", "guide_name"] {
        cols.push(format!("COALESCE(CAST(d.{c} AS TEXT), '') AS {c}", c = col));
    }
    for col in OPTIONAL_COLUMNS {
        if schema.has_column(col) {
            cols.push(format!("COALESCE(CAST(d.{c} AS TEXT), '') AS {c}", c = col));
        } else {
            cols.push(format!("'' AS {}", col));
        }
    }
    cols.join(", ")
}

#[derive(Debug, sqlx::FromRow)]
struct HitRow {
    group_no: i64,
    usn: String,
    name: String,
    project_title: String,
    guide_name: String,
    outcomes: String,
    proof_link: String,
    report_links: String,
    ppt_links: String,
    score: f64,
}

impl HitRow {
    fn into_hit(self, year: String) -> SearchHit {
        SearchHit {
            group_no: self.group_no,
            usn: self.usn,
            name: self.name,
            project_title: self.project_title,
            guide_name: self.guide_name,
            outcomes: self.outcomes,
            proof_link: self.proof_link,
            ppt_links: self.ppt_links,
            report_links: self.report_links,
            score: self.score,
            year,
        }
    }
}

/// Schema check shared by search and suggestions
pub(crate) async fn searchable_schema(catalog: &SchemaCatalog, dataset: &DatasetName) -> Result<DatasetSchema> {
    let schema = catalog.describe(dataset).await?;
    let missing = schema.missing_required();
    if !missing.is_empty() {
        tracing::warn!("Dataset {} lacks columns: {}", dataset, missing.join(", "));
        return Err(AppError::service(format!("dataset {} cannot be searched", dataset.display_name())));
    }
    Ok(schema)
}

#[derive(Clone)]
pub struct SearchEngine {
    store: Store,
    catalog: SchemaCatalog,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(store: Store, config: SearchConfig) -> Self {
        let catalog = SchemaCatalog::new(store.clone());
        Self {
            store,
            catalog,
            config,
        }
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Search one dataset (display or stored name) or `"all"` / 搜索
    pub async fn search(&self, dataset: &str, query: &str, mode: SearchMode) -> Result<Vec<SearchHit>> {
        let fts = FtsQuery::parse(query);

        if is_all_datasets(dataset) {
            if fts.is_empty() {
                return Ok(Vec::new());
            }
            return self.search_all(&fts, mode).await;
        }

        let dataset = self.catalog.resolve(dataset).await?;
        if fts.is_empty() {
            return Ok(Vec::new());
        }
        self.search_dataset(&dataset, &fts, mode).await.map_err(|e| {
            tracing::error!("Search in {} failed: {:?}", dataset, e);
            match e {
                AppError::Service { .. } => AppError::service("search failed"),
                other => other,
            }
        })
    }

    async fn search_all(&self, fts: &FtsQuery, mode: SearchMode) -> Result<Vec<SearchHit>> {
        let datasets = self.catalog.list_dataset_names().await?;
        let outcomes = run_fanout(
            datasets,
            self.config.fanout_concurrency,
            Duration::from_millis(self.config.dataset_timeout_ms),
            |dataset| async move { self.search_dataset(&dataset, fts, mode).await },
        )
        .await;
        Ok(merge_hits(successful(outcomes)))
    }

    /// Ranked hits of one dataset: score descending, then project_title ascending
    pub async fn search_dataset(
        &self,
        dataset: &DatasetName,
        fts: &FtsQuery,
        mode: SearchMode,
    ) -> Result<Vec<SearchHit>> {
        let schema = searchable_schema(&self.catalog, dataset).await?;
        let target = MatchTarget::for_dataset(dataset, &schema);

        let sql = format!(
            "SELECT {cols}, -bm25({t}, {w}) AS score {from} WHERE {t} MATCH ? \
             ORDER BY score DESC, project_title ASC",
            cols = result_columns(&schema),
            t = target.table(),
            w = target.weights(mode),
            from = target.from_clause(dataset),
        );
        let expr = fts.to_match(mode.column(), false);
        tracing::debug!("Searching {} ({:?}) for {}", dataset, target, expr);

        let mut conn = self.store.pool().acquire().await?;
        let rows = match target.prepare(&mut conn, dataset).await {
            Ok(()) => sqlx::query_as::<_, HitRow>(&sql)
                .bind(&expr)
                .fetch_all(&mut *conn)
                .await
                .map_err(AppError::from),
            Err(e) => Err(e),
        };
        target.release(&mut conn).await;

        let year = dataset.display_name();
        Ok(rows?.into_iter().map(|row| row.into_hit(year.clone())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::loader::replace_dataset;
    use crate::models::ProjectRecord;
    use crate::search::index::drop_search_index;

    fn record(group_no: i64, title: &str, guide: &str) -> ProjectRecord {
        ProjectRecord {
            group_no,
            usn: vec![format!("U{}", group_no)],
            name: vec![format!("Student {}", group_no)],
            project_title: title.to_string(),
            guide_name: guide.to_string(),
            outcomes: String::new(),
            proof_link: String::new(),
            report_links: String::new(),
            ppt_links: String::new(),
        }
    }

    /// Filler rows keep bm25 idf positive for the tested terms
    fn corpus() -> Vec<ProjectRecord> {
        vec![
            record(1, "Neural Crop Monitor", "Dr. Kumar"),
            record(2, "Library Kiosk", "Dr. Neural"),
            record(3, "Parking Finder", "Dr. Mehta"),
            record(4, "Canteen Billing", "Dr. Shah"),
            record(5, "Attendance Tracker", "Dr. Pillai"),
            record(6, "Hostel Portal", "Dr. Joshi"),
        ]
    }

    async fn engine_with(datasets: &[(&str, Vec<ProjectRecord>)]) -> (Store, SearchEngine) {
        let store = Store::open_in_memory().await.unwrap();
        crate::db::run_migrations(store.pool()).await.unwrap();
        for (name, records) in datasets {
            let ds = DatasetName::parse(name).unwrap();
            replace_dataset(&store, &ds, "test.csv", records).await.unwrap();
        }
        let engine = SearchEngine::new(store.clone(), SearchConfig::default());
        (store, engine)
    }

    #[tokio::test]
    async fn test_title_match_outranks_guide_match() {
        let (_store, engine) = engine_with(&[("2024_25", corpus())]).await;
        let hits = engine.search("2024-25", "neural", SearchMode::All).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].group_no, 1);
        assert_eq!(hits[1].group_no, 2);
        assert!(hits[0].score > hits[1].score);
        assert_eq!(hits[0].year, "2024-25");
    }

    #[tokio::test]
    async fn test_mode_restricts_fields() {
        let (_store, engine) = engine_with(&[("2024_25", corpus())]).await;
        let title = engine.search("2024_25", "neural", SearchMode::Title).await.unwrap();
        assert_eq!(title.iter().map(|h| h.group_no).collect::<Vec<_>>(), vec![1]);
        let guide = engine.search("2024_25", "neural", SearchMode::Guide).await.unwrap();
        assert_eq!(guide.iter().map(|h| h.group_no).collect::<Vec<_>>(), vec![2]);
    }

    #[tokio::test]
    async fn test_all_terms_required() {
        let (_store, engine) = engine_with(&[("2024_25", corpus())]).await;
        let hits = engine.search("2024_25", "crop monitor", SearchMode::All).await.unwrap();
        assert_eq!(hits.len(), 1);
        let none = engine.search("2024_25", "crop kiosk", SearchMode::All).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_dataset_without_index_uses_temp_ranking() {
        let (store, engine) = engine_with(&[("2024_25", corpus())]).await;
        let ds = DatasetName::parse("2024_25").unwrap();
        let mut conn = store.pool().acquire().await.unwrap();
        drop_search_index(&mut conn, &ds).await.unwrap();
        drop(conn);

        let hits = engine.search("2024_25", "neural", SearchMode::All).await.unwrap();
        assert_eq!(hits.iter().map(|h| h.group_no).collect::<Vec<_>>(), vec![1, 2]);

        // temp table does not leak into the catalog or the next query
        let again = engine.search("2024_25", "kiosk", SearchMode::Title).await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(engine.catalog().list_datasets().await.unwrap(), vec!["2024-25".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_optional_columns_read_as_empty() {
        let (store, engine) = engine_with(&[]).await;
        sqlx::query(
            r#"CREATE TABLE "legacy" (group_no INTEGER PRIMARY KEY, usn TEXT, name TEXT,
               project_title TEXT, guide_name TEXT)"#,
        )
        .execute(store.pool())
        .await
        .unwrap();
        sqlx::query(r#"INSERT INTO "legacy" VALUES (9, 'U9', 'Ira', 'Solar Tracker', 'Dr. Rao')"#)
            .execute(store.pool())
            .await
            .unwrap();

        let hits = engine.search("legacy", "solar", SearchMode::All).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].proof_link, "");
        assert_eq!(hits[0].ppt_links, "");
    }

    #[tokio::test]
    async fn test_unknown_dataset_fails() {
        let (_store, engine) = engine_with(&[("2024_25", corpus())]).await;
        assert!(matches!(
            engine.search("2031-32", "neural", SearchMode::All).await,
            Err(AppError::InvalidDataset(_))
        ));
    }

    #[tokio::test]
    async fn test_broken_single_dataset_is_service_error() {
        let (store, engine) = engine_with(&[]).await;
        sqlx::query(r#"CREATE TABLE "2023_24" (foo TEXT)"#)
            .execute(store.pool())
            .await
            .unwrap();
        let err = engine.search("2023-24", "neural", SearchMode::All).await.unwrap_err();
        assert_eq!(err.kind(), "ServiceError");
        assert_eq!(err.to_string(), "search failed");
    }

    #[tokio::test]
    async fn test_fan_out_orders_by_year_and_skips_broken_dataset() {
        let (store, engine) = engine_with(&[
            ("2024_25", vec![record(1, "Neural Crop Monitor", "Dr. Kumar")]),
            ("2022_23", corpus()),
        ])
        .await;
        sqlx::query(r#"CREATE TABLE "2023_24" (foo TEXT)"#)
            .execute(store.pool())
            .await
            .unwrap();

        let hits = engine.search("all", "neural", SearchMode::All).await.unwrap();
        let years: Vec<&str> = hits.iter().map(|h| h.year.as_str()).collect();
        assert_eq!(years, vec!["2022-23", "2022-23", "2024-25"]);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_blank_query_returns_nothing() {
        let (_store, engine) = engine_with(&[("2024_25", corpus())]).await;
        assert!(engine.search("all", " ?! ", SearchMode::All).await.unwrap().is_empty());
    }
}
