//! Storage module for plugkit
//!
//! - `db`: SQLite - 플러그인 카탈로그 (스키마, 마이그레이션, 트랜잭션)
//! - `plugin`: 플러그인 / 이벤트 핸들러 레포지토리
//! - `json`: JSON - 범용 파일 저장/로드

mod db;
mod json;
mod plugin;

// SQLite Storage
pub use db::Storage;

// Plugin catalog
pub use plugin::{
    NewEventHandler, NewPlugin, PluginEventHandlerRecord, PluginEventHandlerRepository,
    PluginRecord, PluginRepository, HANDLER_TYPE_FIRST, HANDLER_TYPE_LAST, SOURCE_LOCAL,
};

// JSON Storage (범용)
pub use json::JsonStore;
