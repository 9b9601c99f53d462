//! Dataset administration: uploads, row editing, reindex / 数据集管理
//!
//! Authentication is handled outside this service; the routes are mounted as-is.

pub mod tables;
pub mod upload;
