//! Header-row detection / 表头行识别
//!
//! Source sheets carry a title block above the real header. The header is the first
//! row within `scan_rows` that has a cell containing both "GROUP" and "NO"; when no
//! row qualifies, `fallback_row` is used. The fallback matches the layout of the
//! departmental exports (two title rows, header on the third).

use super::sheet::RawSheet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderPolicy {
    pub scan_rows: usize,
    pub fallback_row: usize,
}

impl Default for HeaderPolicy {
    fn default() -> Self {
        Self {
            scan_rows: 5,
            fallback_row: 2,
        }
    }
}

/// How the header row was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMatch {
    Detected(usize),
    Fallback(usize),
}

impl HeaderMatch {
    pub fn row(self) -> usize {
        match self {
            Self::Detected(row) | Self::Fallback(row) => row,
        }
    }
}

impl HeaderPolicy {
    pub fn detect(&self, sheet: &RawSheet) -> HeaderMatch {
        let scan = self.scan_rows.min(sheet.len());
        for (index, row) in sheet.rows()[..scan].iter().enumerate() {
            let marked = row.iter().flatten().any(|cell| {
                let upper = cell.to_uppercase();
                upper.contains("GROUP") && upper.contains("NO")
            });
            if marked {
                return HeaderMatch::Detected(index);
            }
        }
        HeaderMatch::Fallback(self.fallback_row)
    }
}

/// Trim, uppercase, fold newlines and drop literal backslash artifacts / 规范化表头
pub fn normalize_header(cell: Option<&str>) -> String {
    let Some(text) = cell else {
        return String::new();
    };
    text.trim()
        .to_uppercase()
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .replace("\\N", "")
        .replace('\\', "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(rows: &[&[&str]]) -> RawSheet {
        RawSheet::from_text_rows(&rows.iter().map(|r| r.to_vec()).collect::<Vec<_>>())
    }

    #[test]
    fn test_detects_header_in_second_row() {
        let s = sheet(&[
            &["DEPARTMENT OF CSE", "", ""],
            &["Group No", "USN", "Name"],
            &["1", "U1", "Alice"],
        ]);
        assert_eq!(HeaderPolicy::default().detect(&s), HeaderMatch::Detected(1));
    }

    #[test]
    fn test_falls_back_to_third_row() {
        let s = sheet(&[
            &["Title", ""],
            &["Batch 2024", ""],
            &["TEAM", "USN"],
            &["1", "U1"],
            &["2", "U2"],
            &["3", "U3"],
        ]);
        let found = HeaderPolicy::default().detect(&s);
        assert_eq!(found, HeaderMatch::Fallback(2));
        assert_eq!(found.row(), 2);
    }

    #[test]
    fn test_marker_beyond_scan_window_is_ignored() {
        let mut rows: Vec<Vec<&str>> = vec![vec!["x"]; 5];
        rows.push(vec!["GROUP NO"]);
        let s = RawSheet::from_text_rows(&rows);
        assert_eq!(HeaderPolicy::default().detect(&s), HeaderMatch::Fallback(2));
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header(Some(" Group\nNo ")), "GROUP NO");
        assert_eq!(normalize_header(Some("Guide\\nName")), "GUIDENAME");
        assert_eq!(normalize_header(Some("proof\\link")), "PROOFLINK");
        assert_eq!(normalize_header(None), "");
    }
}
