//! Hook Registry - 플러그인 이름별 라이프사이클 콜백 저장소
//!
//! 플러그인 이름(`PluginManifest::name`)으로 콜백 구현을 찾습니다.
//! 등록되지 않은 플러그인은 콜백 없이 진행합니다.

use super::context::ApplicationContext;
use super::manifest::PluginManifest;
use super::traits::{LifecycleHooks, LifecycleStep};
use plugkit_foundation::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// 콜백 레지스트리
#[derive(Default)]
pub struct HookRegistry {
    /// 플러그인 이름 -> 콜백
    hooks: RwLock<HashMap<String, Arc<dyn LifecycleHooks>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 콜백 등록. 같은 이름이 있으면 교체하고 이전 값을 반환
    pub async fn register(
        &self,
        name: impl Into<String>,
        hooks: Arc<dyn LifecycleHooks>,
    ) -> Option<Arc<dyn LifecycleHooks>> {
        let name = name.into();
        let mut map = self.hooks.write().await;

        let previous = map.insert(name.clone(), hooks);
        if previous.is_some() {
            warn!("Replaced lifecycle hooks for plugin {}", name);
        } else {
            info!("Registered lifecycle hooks for plugin {}", name);
        }
        previous
    }

    /// 콜백 등록 해제
    pub async fn unregister(&self, name: &str) -> Option<Arc<dyn LifecycleHooks>> {
        self.hooks.write().await.remove(name)
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn LifecycleHooks>> {
        self.hooks.read().await.get(name).cloned()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.hooks.read().await.contains_key(name)
    }

    /// 등록된 플러그인 이름 목록 (정렬)
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.hooks.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// 해당 단계의 콜백 실행
    ///
    /// 콜백이 없으면 `Ok(false)`, 실행했으면 `Ok(true)`.
    /// 콜백 에러는 그대로 전파됩니다.
    pub async fn invoke(
        &self,
        step: LifecycleStep,
        manifest: &PluginManifest,
        ctx: &ApplicationContext,
    ) -> Result<bool> {
        // 콜백 실행 중 락을 잡지 않도록 먼저 꺼냄
        let Some(hooks) = self.get(&manifest.name).await else {
            debug!("No lifecycle hooks for plugin {} ({})", manifest.name, step);
            return Ok(false);
        };

        debug!("Invoking {} hook for plugin {}", step, manifest.name);
        match step {
            LifecycleStep::Install => hooks.install(manifest, ctx).await?,
            LifecycleStep::Update => hooks.update(manifest, ctx).await?,
            LifecycleStep::Enable => hooks.enable(manifest, ctx).await?,
            LifecycleStep::Disable => hooks.disable(manifest, ctx).await?,
            LifecycleStep::Uninstall => hooks.uninstall(manifest, ctx).await?,
        }

        Ok(true)
    }
}
