//! Error types for plugkit
//!
//! 모든 에러를 중앙에서 관리

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// plugkit 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 아카이브 / 매니페스트 관련
    // ========================================================================
    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Manifest parse error: {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Invalid handler name: {0:?}")]
    InvalidHandlerName(String),

    // ========================================================================
    // 플러그인 상태 관련
    // ========================================================================
    #[error("Plugin already installed: code {0:?}")]
    DuplicateCode(String),

    #[error("Plugin directory already exists: {}", .0.display())]
    DirectoryExists(PathBuf),

    #[error("New/old plugin code is different: expected {expected:?}, found {found:?}")]
    CodeMismatch { expected: String, found: String },

    #[error("New/old plugin name is different: expected {expected:?}, found {found:?}")]
    NameMismatch { expected: String, found: String },

    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    // ========================================================================
    // 저장소 관련
    // ========================================================================
    #[error("Persistence error: {0}")]
    Persistence(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::Archive(_)
                | Error::ManifestParse { .. }
                | Error::InvalidManifest(_)
                | Error::InvalidHandlerName(_)
                | Error::DuplicateCode(_)
                | Error::DirectoryExists(_)
                | Error::CodeMismatch { .. }
                | Error::NameMismatch { .. }
                | Error::PluginNotFound(_)
        )
    }

    /// 저장소 계층에서 올라온 에러인지 확인
    pub fn is_persistence(&self) -> bool {
        matches!(self, Error::Persistence(_))
    }

    /// 매니페스트 파싱 에러 생성 헬퍼
    pub fn manifest_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::ManifestParse {
            path: path.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Persistence(e.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
