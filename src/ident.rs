//! Validated SQL identifiers / 经过校验的标识符
//!
//! Dataset tables are addressed by name in dynamically built SQL, so every name
//! goes through [`DatasetName::parse`] before it can reach a query string.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::{AppError, Result};

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{1,63}$").expect("static identifier pattern"));

/// Prefix reserved for full-text index tables / 索引表前缀
///
/// FTS5 cannot create a virtual table whose name starts with a digit, and dataset
/// names usually do (`2024_25`), so the index name leads with letters.
pub const SEARCH_INDEX_PREFIX: &str = "fts_";

/// Pseudo-dataset selecting every dataset at once / 全部数据集
pub const ALL_DATASETS: &str = "all";

/// Table names that are never datasets / 系统内部表
pub const RESERVED_TABLES: &[&str] = &[
    "sqlite_sequence",
    "sqlite_schema",
    "sqlite_master",
    "sqlite_stat1",
    "sqlite_stat4",
    "_sqlx_migrations",
    "dataset_imports",
];

/// Whether a raw table name passes the identifier allowlist
pub fn is_safe_identifier(raw: &str) -> bool {
    IDENT_RE.is_match(raw)
}

/// Whether a table name belongs to the store or the application itself
pub fn is_reserved_table(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    lower.starts_with("sqlite_")
        || lower.starts_with(SEARCH_INDEX_PREFIX)
        || RESERVED_TABLES.contains(&lower.as_str())
}

/// Name of one dataset table, e.g. `2024_25` / 数据集表名
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatasetName(String);

impl DatasetName {
    /// Accept a stored table name (`2024_25`) or its display form (`2024-25`)
    pub fn parse(raw: &str) -> Result<Self> {
        let stored = raw.trim().replace('-', "_");
        if !is_safe_identifier(&stored) {
            return Err(AppError::InvalidIdentifier(raw.to_string()));
        }
        Ok(Self(stored))
    }

    /// Stricter check for names that are about to be created / 新建数据集名校验
    pub fn parse_new(raw: &str) -> Result<Self> {
        let name = Self::parse(raw)?;
        if is_reserved_table(&name.0) || name.0.eq_ignore_ascii_case(ALL_DATASETS) {
            return Err(AppError::InvalidIdentifier(raw.to_string()));
        }
        Ok(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display label with `_` rendered as `-` / 展示名
    pub fn display_name(&self) -> String {
        self.0.replace('_', "-")
    }

    /// Double-quoted form for SQL text
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }

    /// Bare name of the FTS5 index table
    pub fn index_table(&self) -> String {
        format!("{}{}", SEARCH_INDEX_PREFIX, self.0)
    }

    pub fn quoted_index_table(&self) -> String {
        format!("\"{}\"", self.index_table())
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for DatasetName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_display_and_stored_forms() {
        assert_eq!(DatasetName::parse("2024_25").unwrap().as_str(), "2024_25");
        assert_eq!(DatasetName::parse("2024-25").unwrap().as_str(), "2024_25");
        assert_eq!(DatasetName::parse("2024_25").unwrap().display_name(), "2024-25");
    }

    #[test]
    fn test_parse_rejects_injection_and_length() {
        assert!(DatasetName::parse("").is_err());
        assert!(DatasetName::parse("x\"; DROP TABLE y; --").is_err());
        assert!(DatasetName::parse("a b").is_err());
        assert!(DatasetName::parse(&"a".repeat(63)).is_ok());
        assert!(matches!(
            DatasetName::parse(&"a".repeat(64)),
            Err(AppError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_parse_new_rejects_reserved_names() {
        assert!(DatasetName::parse_new("sqlite_master").is_err());
        assert!(DatasetName::parse_new("dataset_imports").is_err());
        assert!(DatasetName::parse_new("fts_2024_25").is_err());
        assert!(DatasetName::parse_new("FTS_2024_25").is_err());
        assert!(DatasetName::parse_new("2024_25_fts").is_ok());
        assert!(DatasetName::parse_new("2024_25").is_ok());
    }

    #[test]
    fn test_parse_new_rejects_all_selector() {
        assert!(DatasetName::parse_new("all").is_err());
        assert!(DatasetName::parse_new("ALL").is_err());
        assert!(DatasetName::parse_new(" All ").is_err());
        assert!(DatasetName::parse_new("all_2024").is_ok());
    }

    #[test]
    fn test_index_tables_are_reserved() {
        assert!(is_reserved_table("fts_2024_25"));
        assert!(is_reserved_table("SQLITE_MASTER"));
        assert!(!is_reserved_table("2024_25"));
    }

    #[test]
    fn test_quoted_forms() {
        let name = DatasetName::parse("2023_24").unwrap();
        assert_eq!(name.quoted(), "\"2023_24\"");
        assert_eq!(name.index_table(), "fts_2023_24");
        assert_eq!(name.quoted_index_table(), "\"fts_2023_24\"");
    }
}
