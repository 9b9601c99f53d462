//! Sheet cleaning and per-group aggregation / 数据清洗与分组
//!
//! Steps after the header is known: drop fully empty rows, forward-fill empty cells
//! (merged cells in the source only carry a value in their first row), coerce the
//! group number, then fold one-row-per-student into one record per group.

use std::collections::BTreeMap;

use super::columns::{resolve_columns, ColumnMap};
use super::header::{normalize_header, HeaderMatch, HeaderPolicy};
use super::sheet::{is_null_like, RawSheet};
use crate::error::{AppError, Result};
use crate::models::ProjectRecord;

/// Output of the cleaning pipeline / 清洗结果
#[derive(Debug, Clone)]
pub struct NormalizedSheet {
    pub header: HeaderMatch,
    pub headers: Vec<String>,
    pub records: Vec<ProjectRecord>,
    pub warnings: Vec<String>,
}

/// Run the whole cleaning pipeline on one parsed sheet
pub fn normalize_sheet(sheet: &RawSheet, policy: &HeaderPolicy) -> Result<NormalizedSheet> {
    let header = policy.detect(sheet);
    let header_row = sheet.row(header.row()).ok_or_else(|| {
        AppError::data_format(format!(
            "Header row {} is beyond the end of the sheet ({} rows)",
            header.row(),
            sheet.len()
        ))
    })?;
    tracing::debug!("Header row chosen: {:?}", header);

    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| normalize_header(cell.as_deref()))
        .collect();
    tracing::debug!("Columns after normalization: {:?}", headers);

    let mut body: Vec<Vec<Option<String>>> = sheet.rows()[header.row() + 1..]
        .iter()
        .filter(|row| row.iter().any(Option::is_some))
        .cloned()
        .collect();
    forward_fill(&mut body);

    let columns = resolve_columns(&headers)?;
    let (records, warnings) = aggregate(&body, &columns);

    if records.is_empty() {
        return Err(AppError::data_format_with_columns(
            "No valid data found in the uploaded file",
            &headers,
        ));
    }

    Ok(NormalizedSheet {
        header,
        headers,
        records,
        warnings,
    })
}

/// Replace each empty cell with the nearest non-empty value above it / 向下填充
pub fn forward_fill(rows: &mut [Vec<Option<String>>]) {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut last: Vec<Option<String>> = vec![None; width];
    for row in rows.iter_mut() {
        for (col, cell) in row.iter_mut().enumerate() {
            match cell {
                Some(value) => last[col] = Some(value.clone()),
                None => *cell = last[col].clone(),
            }
        }
    }
}

/// Positive integer group number from cell text like `3`, `3.0` or ` 12 `
pub fn parse_group_no(text: &str) -> Option<i64> {
    let text = text.trim();
    let value = match text.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            let f = text.parse::<f64>().ok()?;
            if !f.is_finite() || f.fract() != 0.0 {
                return None;
            }
            f as i64
        }
    };
    (value > 0).then_some(value)
}

#[derive(Default)]
struct GroupAccumulator {
    usn: Vec<String>,
    name: Vec<String>,
    project_title: Option<String>,
    guide_name: Option<String>,
    outcomes: Option<String>,
    proof_link: Option<String>,
    report_links: Option<String>,
    ppt_links: Option<String>,
}

fn cell<'a>(row: &'a [Option<String>], index: Option<usize>) -> Option<&'a str> {
    index
        .and_then(|i| row.get(i))
        .and_then(|c| c.as_deref())
        .filter(|text| !is_null_like(text))
}

fn keep_first(slot: &mut Option<String>, value: Option<&str>) {
    if slot.is_none() {
        *slot = value.map(str::to_string);
    }
}

/// Fold student rows into one record per group number, ordered by group number
pub fn aggregate(rows: &[Vec<Option<String>>], columns: &ColumnMap) -> (Vec<ProjectRecord>, Vec<String>) {
    let mut groups: BTreeMap<i64, GroupAccumulator> = BTreeMap::new();
    let mut dropped = 0usize;

    for row in rows {
        let Some(group_no) = cell(row, Some(columns.group_no)).and_then(parse_group_no) else {
            dropped += 1;
            continue;
        };
        let acc = groups.entry(group_no).or_default();

        if let Some(usn) = cell(row, Some(columns.usn)) {
            acc.usn.push(usn.to_string());
        }
        if let Some(name) = cell(row, Some(columns.name)) {
            acc.name.push(name.to_string());
        }
        keep_first(&mut acc.project_title, cell(row, Some(columns.project_title)));
        keep_first(&mut acc.guide_name, cell(row, Some(columns.guide_name)));
        keep_first(&mut acc.outcomes, cell(row, Some(columns.outcomes)));
        keep_first(&mut acc.proof_link, cell(row, Some(columns.proof_link)));
        keep_first(&mut acc.report_links, cell(row, columns.report_links));
        keep_first(&mut acc.ppt_links, cell(row, columns.ppt_links));
    }

    if dropped > 0 {
        tracing::debug!("Dropped {} rows without a usable group number", dropped);
    }

    let mut warnings = Vec::new();
    let records = groups
        .into_iter()
        .map(|(group_no, acc)| {
            if acc.usn.len() != acc.name.len() {
                let warning = format!(
                    "Group {} has {} USNs but {} names",
                    group_no,
                    acc.usn.len(),
                    acc.name.len()
                );
                tracing::warn!("{}", warning);
                warnings.push(warning);
            }
            ProjectRecord {
                group_no,
                usn: acc.usn,
                name: acc.name,
                project_title: acc.project_title.unwrap_or_default(),
                guide_name: acc.guide_name.unwrap_or_default(),
                outcomes: acc.outcomes.unwrap_or_default(),
                proof_link: acc.proof_link.unwrap_or_default(),
                report_links: acc.report_links.unwrap_or_default(),
                ppt_links: acc.ppt_links.unwrap_or_default(),
            }
        })
        .collect();

    (records, warnings)
}
