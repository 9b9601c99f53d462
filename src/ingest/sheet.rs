//! Raw tabular input / 原始表格
//!
//! Uploads are parsed into a [`RawSheet`]: a rectangular grid of optional cell
//! texts with no header interpretation yet.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;

use crate::error::{AppError, Result};
use crate::utils::get_ext;

/// Tokens read as "no value", the way spreadsheet exports usually spell it
const NULL_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Whether a cell text should be treated as empty
pub fn is_null_like(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || NULL_TOKENS.contains(&text)
}

fn clean_cell(text: &str) -> Option<String> {
    if is_null_like(text) {
        None
    } else {
        Some(text.trim().to_string())
    }
}

/// Parser selection by file extension / 按扩展名选择解析器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Workbook,
}

impl SheetFormat {
    /// `.csv` is comma separated; anything else is handed to the workbook reader
    pub fn from_file_name(file_name: &str) -> Self {
        match get_ext(file_name).as_str() {
            "csv" => Self::Csv,
            _ => Self::Workbook,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSheet {
    rows: Vec<Vec<Option<String>>>,
}

impl RawSheet {
    /// Build from ragged rows; short rows are padded with empty cells
    pub fn from_rows(rows: Vec<Vec<Option<String>>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { rows }
    }

    /// Test and fixture helper: cells given as text, null-like text becomes empty
    pub fn from_text_rows<S: AsRef<str>>(rows: &[Vec<S>]) -> Self {
        Self::from_rows(
            rows.iter()
                .map(|row| row.iter().map(|c| clean_cell(c.as_ref())).collect())
                .collect(),
        )
    }

    pub fn parse(file_name: &str, bytes: &[u8]) -> Result<Self> {
        match SheetFormat::from_file_name(file_name) {
            SheetFormat::Csv => Self::parse_csv(bytes),
            SheetFormat::Workbook => Self::parse_workbook(bytes),
        }
    }

    pub fn parse_csv(bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| AppError::data_format(format!("File read error: {}", e)))?;
            rows.push(record.iter().map(clean_cell).collect());
        }
        Ok(Self::from_rows(rows))
    }

    /// First sheet of an xlsx/xls/xlsb/ods workbook / 读取第一个工作表
    pub fn parse_workbook(bytes: &[u8]) -> Result<Self> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| AppError::data_format(format!("File read error: {}", e)))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| AppError::data_format("Workbook contains no sheets"))?
            .map_err(|e| AppError::data_format(format!("File read error: {}", e)))?;

        // calamine trims leading empty rows; keep the source row positions
        let start_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
        let mut rows: Vec<Vec<Option<String>>> = vec![Vec::new(); start_row];
        rows.extend(
            range
                .rows()
                .map(|row| row.iter().map(workbook_cell).collect::<Vec<_>>()),
        );
        Ok(Self::from_rows(rows))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn row(&self, index: usize) -> Option<&[Option<String>]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }
}

/// Render one workbook cell as text; whole floats lose their `.0` / 单元格转文本
pub fn workbook_cell(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => clean_cell(s),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            Some((*f as i64).to_string())
        }
        other => clean_cell(&other.to_string()),
    }
}
