//! Text helper functions / 工具函数

/// Get file extension (lowercase) / 获取文件扩展名
pub fn get_ext(path: &str) -> String {
    std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Lowercase with spaces and underscores removed, for loose header comparison
/// 去除空格和下划线后小写
pub fn compact_key(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_ext() {
        assert_eq!(get_ext("Projects 2024.XLSX"), "xlsx");
        assert_eq!(get_ext("/tmp/batch.csv"), "csv");
        assert_eq!(get_ext("noext"), "");
    }

    #[test]
    fn test_compact_key() {
        assert_eq!(compact_key("GROUP NO"), "groupno");
        assert_eq!(compact_key("project_title"), "projecttitle");
        assert_eq!(compact_key(" Guide\tName "), "guidename");
    }
}
