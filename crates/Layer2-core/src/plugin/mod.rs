//! # Plugin System
//!
//! 아카이브 기반 플러그인 라이프사이클
//!
//! ## 개요
//!
//! 플러그인은 gzip tar 아카이브로 배포되며, 루트에 두 매니페스트를 가집니다:
//! - `config.yml`: code, name, version, event (엔트리포인트)
//! - `event.yml`: 이벤트 → `[handler, type]` 목록
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  PluginLifecycleManager                     │
//! │   install / update / enable / disable / uninstall           │
//! │                                                             │
//! │  ┌──────────────────┐  ┌──────────────────┐                │
//! │  │ ArchiveExtractor │  │ ManifestReader   │                │
//! │  │  + ScratchDir    │  │ ManifestValidator│                │
//! │  └──────────────────┘  └──────────────────┘                │
//! │            │                     │                          │
//! │  ┌─────────┴──────────┐  ┌───────┴────────────────────────┐│
//! │  │  PluginRegistry    │  │  HookRegistry                  ││
//! │  │  (SQLite catalog)  │  │  name -> Arc<dyn LifecycleHooks>││
//! │  └────────────────────┘  └────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 예시
//!
//! ```ignore
//! let config = PluginSystemConfig::load()?;
//! let storage = Storage::from_config(&config)?;
//! let ctx = ApplicationContext::new(config, storage);
//!
//! let hooks = Arc::new(HookRegistry::new());
//! hooks.register("Sample", Arc::new(SamplePluginManager)).await;
//!
//! let manager = PluginLifecycleManager::from_context(&ctx, hooks);
//! let plugin = manager.install(Path::new("sample.tar.gz"), &ctx).await?;
//! manager.disable(&plugin, &ctx).await?;
//! manager.uninstall(&plugin, &ctx).await?;
//! ```

mod archive;
mod context;
mod hooks;
mod manager;
mod manifest;
mod name;
mod registry;
mod traits;
mod validator;

pub use archive::{ArchiveExtractor, ScratchDir};
pub use context::ApplicationContext;
pub use hooks::HookRegistry;
pub use manager::PluginLifecycleManager;
pub use manifest::{EventBinding, EventBindings, ManifestReader, PluginManifest};
pub use name::{is_valid_name, MAX_NAME_LEN};
pub use registry::PluginRegistry;
pub use traits::{LifecycleHooks, LifecycleStep};
pub use validator::ManifestValidator;
