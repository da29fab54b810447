//! # plugkit-foundation
//!
//! Foundation layer for plugkit:
//! - Error: 공통 에러 타입 (`Error`, `Result`)
//! - Config: 플러그인 시스템 설정 (`PluginSystemConfig`)
//! - Storage: SQLite 플러그인 카탈로그, JsonStore (설정 레이어)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  plugkit-core (PluginLifecycleManager, PluginRegistry)  │
//! │                     │                                   │
//! │          ┌─────────┴─────────┐                         │
//! │          ▼                   ▼                         │
//! │   Storage (SQLite)     PluginSystemConfig (JSON)       │
//! │   plugins              pluginsDir / dataDir            │
//! │   plugin_event_handlers                                │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    PluginSystemConfig, DEFAULT_CONFIG_FILE, DEFAULT_DATABASE_FILE, DEFAULT_EVENT_FILE,
    PLUGKIT_CONFIG_FILE,
};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{
    // JSON (범용)
    JsonStore,
    // SQLite (플러그인 카탈로그)
    NewEventHandler,
    NewPlugin,
    PluginEventHandlerRecord,
    PluginEventHandlerRepository,
    PluginRecord,
    PluginRepository,
    Storage,
    HANDLER_TYPE_FIRST,
    HANDLER_TYPE_LAST,
    SOURCE_LOCAL,
};
