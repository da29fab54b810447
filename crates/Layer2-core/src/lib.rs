//! plugkit-core: Plugin lifecycle runtime
//!
//! Layer2 - 플러그인 설치/업데이트/활성화/비활성화/제거
//!
//! # 주요 모듈
//!
//! - `plugin`: 아카이브 추출, 매니페스트 검증, 카탈로그, 라이프사이클 매니저
//!
//! # 사용 예시
//!
//! ```ignore
//! use plugkit_core::{ApplicationContext, HookRegistry, PluginLifecycleManager};
//! use plugkit_foundation::{PluginSystemConfig, Storage};
//!
//! let config = PluginSystemConfig::load()?;
//! let ctx = ApplicationContext::new(config.clone(), Storage::from_config(&config)?);
//! let manager = PluginLifecycleManager::from_context(&ctx, Arc::new(HookRegistry::new()));
//!
//! // 설치
//! let plugin = manager.install(Path::new("sample.tar.gz"), &ctx).await?;
//!
//! // 이벤트 디스패치 순서
//! let handlers = manager.registry().handlers_for_event("front.index")?;
//! ```

pub mod plugin;

// Re-exports: Plugin lifecycle
pub use plugin::{
    is_valid_name, ApplicationContext, ArchiveExtractor, EventBinding, EventBindings,
    HookRegistry, LifecycleHooks, LifecycleStep, ManifestReader, ManifestValidator,
    PluginLifecycleManager, PluginManifest, PluginRegistry, ScratchDir, MAX_NAME_LEN,
};

// Re-exports: Foundation
pub use plugkit_foundation::{
    Error, PluginEventHandlerRecord, PluginRecord, PluginSystemConfig, Result, Storage,
};
