//! Config - 통합 설정 관리
//!
//! - `plugkit.rs` - PluginSystemConfig (플러그인 디렉토리, DB, 매니페스트 파일명)

mod plugkit;

pub use plugkit::{
    PluginSystemConfig, DEFAULT_CONFIG_FILE, DEFAULT_DATABASE_FILE, DEFAULT_EVENT_FILE,
    PLUGKIT_CONFIG_FILE,
};
