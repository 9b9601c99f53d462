use serde::{Deserialize, Serialize};

/// Separator used when student lists are flattened for storage / 学生列表分隔符
pub const LIST_SEPARATOR: &str = ", ";

/// One student group's project, the canonical row of a dataset / 项目记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub group_no: i64,
    #[serde(with = "student_list")]
    pub usn: Vec<String>,
    #[serde(with = "student_list")]
    pub name: Vec<String>,
    pub project_title: String,
    pub guide_name: String,
    #[serde(default)]
    pub outcomes: String,
    #[serde(default)]
    pub proof_link: String,
    #[serde(default)]
    pub report_links: String,
    #[serde(default)]
    pub ppt_links: String,
}

impl ProjectRecord {
    pub fn usn_text(&self) -> String {
        self.usn.join(LIST_SEPARATOR)
    }

    pub fn name_text(&self) -> String {
        self.name.join(LIST_SEPARATOR)
    }
}

/// Split a stored list back into its entries
pub fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Partial update for one row; `None` leaves the column untouched / 行更新
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordPatch {
    #[serde(default, with = "optional_student_list")]
    pub usn: Option<Vec<String>>,
    #[serde(default, with = "optional_student_list")]
    pub name: Option<Vec<String>>,
    pub project_title: Option<String>,
    pub guide_name: Option<String>,
    pub outcomes: Option<String>,
    pub proof_link: Option<String>,
    pub report_links: Option<String>,
    pub ppt_links: Option<String>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.usn.is_none()
            && self.name.is_none()
            && self.project_title.is_none()
            && self.guide_name.is_none()
            && self.outcomes.is_none()
            && self.proof_link.is_none()
            && self.report_links.is_none()
            && self.ppt_links.is_none()
    }
}

/// A ranked record returned by a search; never persisted / 搜索结果
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub group_no: i64,
    pub usn: String,
    pub name: String,
    pub project_title: String,
    pub guide_name: String,
    pub outcomes: String,
    pub proof_link: String,
    pub ppt_links: String,
    pub report_links: String,
    /// Relevance score, higher is better
    #[serde(rename = "rank")]
    pub score: f64,
    /// Display label of the source dataset
    #[serde(rename = "project_year")]
    pub year: String,
}

/// Stored lists travel as one comma-joined string
mod student_list {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(list: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&list.join(super::LIST_SEPARATOR))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(super::split_list(&text))
    }
}

mod optional_student_list {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<String>>, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?;
        Ok(text.map(|t| super::split_list(&t)))
    }
}
