//! Query text -> FTS5 match expression / 查询解析
//!
//! Free text is split on anything that is not a letter or digit. Every term becomes
//! a quoted phrase so user input can never inject FTS5 operators; phrases are
//! implicitly AND-ed ("all terms, any order").

use serde::{Deserialize, Serialize};

use super::index::INDEX_WEIGHTS;

/// Which fields a query is matched against / 搜索范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    All,
    Title,
    Guide,
}

impl SearchMode {
    /// Column the match is restricted to, `None` for the combined field
    pub fn column(self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Title => Some("project_title"),
            Self::Guide => Some("guide_name"),
        }
    }

    /// bm25 weights for the persistent index (project_title, guide_name, outcomes, usn, name)
    pub fn index_weights(self) -> [f64; 5] {
        match self {
            Self::All => INDEX_WEIGHTS,
            Self::Title => [1.0, 0.0, 0.0, 0.0, 0.0],
            Self::Guide => [0.0, 1.0, 0.0, 0.0, 0.0],
        }
    }

    /// bm25 weights for the on-the-fly index (project_title, guide_name)
    pub fn adhoc_weights(self) -> [f64; 2] {
        match self {
            Self::All => [INDEX_WEIGHTS[0], INDEX_WEIGHTS[1]],
            Self::Title => [1.0, 0.0],
            Self::Guide => [0.0, 1.0],
        }
    }
}

/// Parsed query terms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtsQuery {
    terms: Vec<String>,
}

impl FtsQuery {
    pub fn parse(text: &str) -> Self {
        let terms = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();
        Self { terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Build the MATCH argument. `prefix` makes every term a prefix query (suggestions).
    pub fn to_match(&self, column: Option<&str>, prefix: bool) -> String {
        self.terms
            .iter()
            .map(|term| {
                let star = if prefix { "*" } else { "" };
                match column {
                    Some(col) => format!("{{{}}} : \"{}\"{}", col, term, star),
                    None => format!("\"{}\"{}", term, star),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Render weights as bm25() trailing arguments
pub(crate) fn weight_args(weights: &[f64]) -> String {
    weights
        .iter()
        .map(|w| format!("{:.2}", w))
        .collect::<Vec<_>>()
        .join(", ")
}
