//! Row-level dataset editing / 数据行编辑
//!
//! Admin edits of single project rows. Column names come from the typed
//! [`RecordPatch`] fields, never from the request. The FTS triggers installed with
//! the search index keep it in step with every write made here.

use sqlx::Arguments;
use sqlx::sqlite::SqliteArguments;

use crate::catalog::{DatasetSchema, SchemaCatalog, OPTIONAL_COLUMNS, REQUIRED_COLUMNS};
use crate::error::{AppError, Result};
use crate::ident::DatasetName;
use crate::ingest::loader::insert_record;
use crate::models::{split_list, ProjectRecord, RecordPatch, LIST_SEPARATOR};
use crate::store::Store;

#[derive(Debug, sqlx::FromRow)]
struct RecordRow {
    group_no: i64,
    usn: String,
    name: String,
    project_title: String,
    guide_name: String,
    outcomes: String,
    proof_link: String,
    report_links: String,
    ppt_links: String,
}

impl From<RecordRow> for ProjectRecord {
    fn from(row: RecordRow) -> Self {
        Self {
            group_no: row.group_no,
            usn: split_list(&row.usn),
            name: split_list(&row.name),
            project_title: row.project_title,
            guide_name: row.guide_name,
            outcomes: row.outcomes,
            proof_link: row.proof_link,
            report_links: row.report_links,
            ppt_links: row.ppt_links,
        }
    }
}

#[derive(Clone)]
pub struct DatasetEditor {
    store: Store,
    catalog: SchemaCatalog,
}

impl DatasetEditor {
    pub fn new(store: Store) -> Self {
        let catalog = SchemaCatalog::new(store.clone());
        Self { store, catalog }
    }

    async fn editable(&self, dataset: &str) -> Result<(DatasetName, DatasetSchema)> {
        let dataset = self.catalog.resolve(dataset).await?;
        let schema = self.catalog.describe(&dataset).await?;
        let missing = schema.missing_required();
        if !missing.is_empty() {
            return Err(AppError::data_format_with_columns(
                format!("Dataset {} lacks columns: {}", dataset.display_name(), missing.join(", ")),
                &schema.columns.iter().cloned().collect::<Vec<_>>(),
            ));
        }
        Ok((dataset, schema))
    }

    /// All rows ordered by group number / 列出全部行
    pub async fn list_rows(&self, dataset: &str) -> Result<Vec<ProjectRecord>> {
        let (dataset, schema) = self.editable(dataset).await?;
        let sql = format!(
            "SELECT {} FROM {} ORDER BY group_no ASC",
            select_columns(&schema),
            dataset.quoted()
        );
        let rows: Vec<RecordRow> = sqlx::query_as(&sql).fetch_all(self.store.pool()).await?;
        Ok(rows.into_iter().map(ProjectRecord::from).collect())
    }

    pub async fn get_row(&self, dataset: &str, group_no: i64) -> Result<ProjectRecord> {
        let (dataset, schema) = self.editable(dataset).await?;
        self.fetch_row(&dataset, &schema, group_no).await
    }

    async fn fetch_row(&self, dataset: &DatasetName, schema: &DatasetSchema, group_no: i64) -> Result<ProjectRecord> {
        let sql = format!(
            "SELECT {} FROM {} WHERE group_no = ?",
            select_columns(schema),
            dataset.quoted()
        );
        let row: Option<RecordRow> = sqlx::query_as(&sql)
            .bind(group_no)
            .fetch_optional(self.store.pool())
            .await?;
        row.map(ProjectRecord::from)
            .ok_or_else(|| AppError::data_format(format!("Group {} not found in {}", group_no, dataset.display_name())))
    }

    /// Add one row; the group number must be positive and unused / 新增行
    pub async fn insert_row(&self, dataset: &str, record: &ProjectRecord) -> Result<()> {
        let (dataset, schema) = self.editable(dataset).await?;
        if record.group_no <= 0 {
            return Err(AppError::data_format("group_no must be a positive integer"));
        }
        let absent: Vec<&str> = OPTIONAL_COLUMNS
            .iter()
            .copied()
            .filter(|c| !schema.has_column(c))
            .collect();
        if !absent.is_empty() {
            return Err(AppError::data_format_with_columns(
                format!("Dataset {} lacks columns: {}", dataset.display_name(), absent.join(", ")),
                &schema.columns.iter().cloned().collect::<Vec<_>>(),
            ));
        }

        let mut conn = self.store.pool().acquire().await?;
        insert_record(&mut conn, &dataset, record)
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    AppError::data_format(format!(
                        "Group {} already exists in {}",
                        record.group_no,
                        dataset.display_name()
                    ))
                } else {
                    e
                }
            })?;
        tracing::info!("Inserted group {} into {}", record.group_no, dataset);
        Ok(())
    }

    /// Apply the fields set in `patch`; returns the updated row / 更新行
    pub async fn update_row(&self, dataset: &str, group_no: i64, patch: &RecordPatch) -> Result<ProjectRecord> {
        let (dataset, schema) = self.editable(dataset).await?;
        if patch.is_empty() {
            return Err(AppError::data_format("No fields to update"));
        }

        let mut sets: Vec<&'static str> = Vec::new();
        let mut args = SqliteArguments::default();
        let mut push = |column: &'static str, value: Option<String>| -> Result<()> {
            if let Some(value) = value {
                if !schema.has_column(column) {
                    return Err(AppError::data_format(format!(
                        "Dataset {} has no column {}",
                        dataset.display_name(),
                        column
                    )));
                }
                sets.push(column);
                args.add(value);
            }
            Ok(())
        };
        push("usn", patch.usn.as_ref().map(|l| l.join(LIST_SEPARATOR)))?;
        push("name", patch.name.as_ref().map(|l| l.join(LIST_SEPARATOR)))?;
        push("project_title", patch.project_title.clone())?;
        push("guide_name", patch.guide_name.clone())?;
        push("outcomes", patch.outcomes.clone())?;
        push("proof_link", patch.proof_link.clone())?;
        push("report_links", patch.report_links.clone())?;
        push("ppt_links", patch.ppt_links.clone())?;
        args.add(group_no);

        let assignments = sets
            .iter()
            .map(|c| format!("{} = ?", c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {} SET {} WHERE group_no = ?", dataset.quoted(), assignments);
        let result = sqlx::query_with(&sql, args).execute(self.store.pool()).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::data_format(format!(
                "Group {} not found in {}",
                group_no,
                dataset.display_name()
            )));
        }

        tracing::info!("Updated group {} in {} ({})", group_no, dataset, sets.join(", "));
        self.fetch_row(&dataset, &schema, group_no).await
    }

    pub async fn delete_row(&self, dataset: &str, group_no: i64) -> Result<()> {
        let (dataset, _) = self.editable(dataset).await?;
        let sql = format!("DELETE FROM {} WHERE group_no = ?", dataset.quoted());
        let result = sqlx::query(&sql).bind(group_no).execute(self.store.pool()).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::data_format(format!(
                "Group {} not found in {}",
                group_no,
                dataset.display_name()
            )));
        }
        tracing::info!("Deleted group {} from {}", group_no, dataset);
        Ok(())
    }
}

fn select_columns(schema: &DatasetSchema) -> String {
    let mut cols = vec!["CAST(group_no AS INTEGER) AS group_no".to_string()];
    for col in REQUIRED_COLUMNS.iter().skip(1) {
        cols.push(format!("COALESCE(CAST({c} AS TEXT), '') AS {c}", c = col));
    }
    for col in OPTIONAL_COLUMNS {
        if schema.has_column(col) {
            cols.push(format!("COALESCE(CAST({c} AS TEXT), '') AS {c}", c = col));
        } else {
            cols.push(format!("'' AS {}", col));
        }
    }
    cols.join(", ")
}
