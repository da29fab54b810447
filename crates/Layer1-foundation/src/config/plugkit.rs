//! Plugin System Config - 플러그인 시스템 설정
//!
//! 글로벌(~/.config/plugkit/plugins.json)과 프로젝트(.plugkit/plugins.json)
//! 설정을 병합하여 사용합니다. 값이 없는 항목은 기본값으로 해석됩니다.

use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 설정 파일명
pub const PLUGKIT_CONFIG_FILE: &str = "plugins.json";

/// 플러그인 메타데이터 매니페스트 파일명
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// 이벤트 바인딩 매니페스트 파일명
pub const DEFAULT_EVENT_FILE: &str = "event.yml";

/// SQLite 데이터베이스 파일명
pub const DEFAULT_DATABASE_FILE: &str = "plugkit.db";

// ============================================================================
// PluginSystemConfig
// ============================================================================

/// 플러그인 시스템 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PluginSystemConfig {
    /// 플러그인 설치 루트 (`<pluginsDir>/<name>`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins_dir: Option<PathBuf>,

    /// 런타임 데이터 디렉토리 (DB 위치)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// DB 파일명
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_file: Option<String>,

    /// 스크래치 디렉토리 상위 경로 (없으면 OS temp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,

    /// 메타데이터 매니페스트 파일명
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<String>,

    /// 이벤트 바인딩 매니페스트 파일명
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_file: Option<String>,
}

impl PluginSystemConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 플러그인 루트와 데이터 디렉토리를 지정하여 생성
    pub fn with_dirs(plugins_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugins_dir: Some(plugins_dir.into()),
            data_dir: Some(data_dir.into()),
            ..Self::default()
        }
    }

    /// 빌더 패턴: 스크래치 디렉토리 상위 경로 설정
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(temp_dir.into());
        self
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 현재 디렉토리 프로젝트 병합 로드
    pub fn load() -> Result<Self> {
        Self::load_layered(&JsonStore::default_layers()?)
    }

    /// 레이어를 순서대로 병합. 뒤쪽 레이어의 값이 우선하고,
    /// `plugins.json`이 없는 레이어는 건너뜁니다.
    pub fn load_layered(layers: &[JsonStore]) -> Result<Self> {
        let mut config = Self::new();
        for layer in layers {
            if let Some(layer_config) = layer.load_optional::<Self>(PLUGKIT_CONFIG_FILE)? {
                config.merge(layer_config);
            }
        }
        Ok(config)
    }

    /// 특정 저장소에서 로드 (파일이 없으면 기본값)
    pub fn load_from(store: &JsonStore) -> Result<Self> {
        Ok(store
            .load_optional(PLUGKIT_CONFIG_FILE)?
            .unwrap_or_default())
    }

    /// 특정 저장소에 저장
    pub fn save_to(&self, store: &JsonStore) -> Result<()> {
        store.save(PLUGKIT_CONFIG_FILE, self)
    }

    /// 다른 설정의 값이 있는 항목만 덮어쓰기
    pub fn merge(&mut self, other: PluginSystemConfig) {
        if other.plugins_dir.is_some() {
            self.plugins_dir = other.plugins_dir;
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.database_file.is_some() {
            self.database_file = other.database_file;
        }
        if other.temp_dir.is_some() {
            self.temp_dir = other.temp_dir;
        }
        if other.config_file.is_some() {
            self.config_file = other.config_file;
        }
        if other.event_file.is_some() {
            self.event_file = other.event_file;
        }
    }

    // ========================================================================
    // 해석된 값
    // ========================================================================

    /// 플러그인 루트 (기본: ./app/Plugin)
    pub fn plugins_dir(&self) -> PathBuf {
        self.plugins_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("app").join("Plugin"))
    }

    /// 데이터 디렉토리 (기본: ~/.plugkit)
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".plugkit")
        })
    }

    pub fn database_file(&self) -> &str {
        self.database_file.as_deref().unwrap_or(DEFAULT_DATABASE_FILE)
    }

    /// 스크래치 디렉토리 상위 경로
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn config_file(&self) -> &str {
        self.config_file.as_deref().unwrap_or(DEFAULT_CONFIG_FILE)
    }

    pub fn event_file(&self) -> &str {
        self.event_file.as_deref().unwrap_or(DEFAULT_EVENT_FILE)
    }

    /// 플러그인 이름으로 영구 디렉토리 계산
    pub fn plugin_dir(&self, name: &str) -> PathBuf {
        self.plugins_dir().join(name)
    }
}
