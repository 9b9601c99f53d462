//! Error taxonomy shared by the catalog, ingestion and search modules / 错误类型

use thiserror::Error;

/// Crate-wide result alias / 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Dataset or column name failed the identifier allowlist / 非法标识符
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Ingestion could not map a canonical field onto any sheet header / 缺少必需列
    #[error("missing column for `{field}`; available columns: {}", available.join(", "))]
    MissingColumn {
        field: &'static str,
        available: Vec<String>,
    },

    /// Unreadable upload or nothing usable left after cleaning / 数据格式错误
    #[error("data format error: {message}")]
    DataFormat {
        message: String,
        available: Vec<String>,
    },

    /// Requested dataset is not in the catalog / 未知数据集
    #[error("unknown dataset: {0}")]
    InvalidDataset(String),

    /// Store unreachable or a query failed for reasons outside user input / 服务错误
    #[error("{message}")]
    Service {
        message: String,
        #[source]
        source: Option<sqlx::Error>,
    },
}

impl AppError {
    pub fn data_format(message: impl Into<String>) -> Self {
        Self::DataFormat {
            message: message.into(),
            available: Vec::new(),
        }
    }

    pub fn data_format_with_columns(message: impl Into<String>, available: &[String]) -> Self {
        Self::DataFormat {
            message: message.into(),
            available: available.to_vec(),
        }
    }

    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
            source: None,
        }
    }

    /// Whether the caller can fix this by changing the request / 是否为用户输入错误
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Service { .. })
    }

    /// Stable machine-readable kind for API payloads
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier(_) => "InvalidIdentifier",
            Self::MissingColumn { .. } => "MissingColumn",
            Self::DataFormat { .. } => "DataFormatError",
            Self::InvalidDataset(_) => "InvalidDataset",
            Self::Service { .. } => "ServiceError",
        }
    }

    /// Whether the store rejected a write on a unique or primary key
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Service {
                source: Some(sqlx::Error::Database(db)),
                ..
            } => db.is_unique_violation(),
            _ => false,
        }
    }

    /// Observed header set, when the error carries one
    pub fn available_columns(&self) -> Option<&[String]> {
        match self {
            Self::MissingColumn { available, .. } => Some(available),
            Self::DataFormat { available, .. } if !available.is_empty() => Some(available),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        Self::Service {
            message: "store operation failed".to_string(),
            source: Some(error),
        }
    }
}
