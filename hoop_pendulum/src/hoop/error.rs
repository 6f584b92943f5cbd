//! # 错误类型
//!
//! 轨迹文件加载失败时返回的错误。所有变体都属于"输入格式错误"：
//! 任何一个都会中止整个加载过程，不做部分恢复。

use std::path::PathBuf;
use thiserror::Error;

/// 轨迹加载错误
#[derive(Debug, Error)]
pub enum TrajectoryError {
    /// 文件不存在或无法读取
    #[error("cannot read trajectory file {path}: {source}")]
    Unreadable {
        /// 文件路径
        path: PathBuf,
        /// 底层IO错误
        #[source]
        source: std::io::Error,
    },

    /// 文件中没有任何数据行
    #[error("trajectory contains no rows")]
    Empty,

    /// 某一行的字段少于4个 (t q1 q2 q3)
    #[error("line {line}: expected at least 4 columns, found {found}")]
    TooFewColumns {
        /// 行号（从1开始）
        line: usize,
        /// 实际字段数
        found: usize,
    },

    /// 前4列中有无法解析或非有限的数值
    #[error("line {line}, column {column}: {token:?} is not a finite number")]
    BadNumber {
        /// 行号（从1开始）
        line: usize,
        /// 列号（从1开始）
        column: usize,
        /// 原始文本
        token: String,
    },
}

impl TrajectoryError {
    /// 创建文件读取错误
    #[must_use]
    pub fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Unreadable {
            path: path.into(),
            source,
        }
    }

    /// 创建字段数不足错误
    #[must_use]
    pub const fn too_few_columns(line: usize, found: usize) -> Self {
        Self::TooFewColumns { line, found }
    }

    /// 创建数值解析错误
    #[must_use]
    pub fn bad_number(line: usize, column: usize, token: impl Into<String>) -> Self {
        Self::BadNumber {
            line,
            column,
            token: token.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TrajectoryError::too_few_columns(3, 2);
        assert_eq!(err.to_string(), "line 3: expected at least 4 columns, found 2");

        let err = TrajectoryError::bad_number(7, 2, "abc");
        assert_eq!(
            err.to_string(),
            "line 7, column 2: \"abc\" is not a finite number"
        );

        let err = TrajectoryError::unreadable(
            "missing.txt",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(err.to_string().starts_with("cannot read trajectory file missing.txt"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
