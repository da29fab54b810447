//! Plugin Lifecycle Manager - 설치/업데이트/활성화/비활성화/제거
//!
//! ## 단계 순서
//!
//! - install: 스크래치 추출 → 매니페스트 검증 → code 중복 검사 → 디렉토리 생성
//!   → 추출 → 등록 → `install` 콜백
//! - update: 스크래치 추출 → code/name 일치 검사 → 덮어쓰기 → 등록 갱신 → `update` 콜백
//! - enable/disable: 플래그 저장 → 디스크의 매니페스트로 콜백
//! - uninstall: `uninstall` 콜백 → 등록 해제 → 디렉토리 삭제
//!
//! 어느 단계든 실패하면 이후 단계는 실행되지 않습니다.
//!
//! install은 추출 이후 실패 시 보상 처리를 합니다: 새로 만든 디렉토리를 지우고,
//! 등록까지 끝난 상태라면 등록도 해제합니다. update는 덮어쓴 파일을 되돌리지 않습니다.

use super::archive::{ArchiveExtractor, ScratchDir};
use super::context::ApplicationContext;
use super::hooks::HookRegistry;
use super::manifest::{EventBindings, ManifestReader, PluginManifest};
use super::registry::PluginRegistry;
use super::traits::LifecycleStep;
use super::validator::ManifestValidator;
use plugkit_foundation::{Error, PluginRecord, PluginSystemConfig, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 플러그인 라이프사이클 매니저
pub struct PluginLifecycleManager {
    /// 디렉토리 / 매니페스트 파일명 설정
    config: PluginSystemConfig,

    /// 영속 카탈로그
    registry: PluginRegistry,

    /// 플러그인 콜백
    hooks: Arc<HookRegistry>,
}

impl PluginLifecycleManager {
    pub fn new(
        config: PluginSystemConfig,
        registry: PluginRegistry,
        hooks: Arc<HookRegistry>,
    ) -> Self {
        Self {
            config,
            registry,
            hooks,
        }
    }

    /// 컨텍스트의 설정과 저장소를 공유하여 생성
    pub fn from_context(ctx: &ApplicationContext, hooks: Arc<HookRegistry>) -> Self {
        Self::new(
            ctx.config().clone(),
            PluginRegistry::new(ctx.storage().clone()),
            hooks,
        )
    }

    pub fn config(&self) -> &PluginSystemConfig {
        &self.config
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    /// 플러그인 영구 디렉토리
    pub fn plugin_dir(&self, name: &str) -> PathBuf {
        self.config.plugin_dir(name)
    }

    // ========================================================================
    // Install
    // ========================================================================

    /// 아카이브에서 신규 플러그인 설치
    pub async fn install(&self, archive: &Path, ctx: &ApplicationContext) -> Result<PluginRecord> {
        info!("Installing plugin from {}", archive.display());

        let (manifest, bindings) = self.inspect_archive(archive).await?;

        if self.registry.find_by_code(&manifest.code)?.is_some() {
            return Err(Error::DuplicateCode(manifest.code));
        }

        let dir = self.plugin_dir(&manifest.name);
        self.create_plugin_dir(&dir).await?;

        if let Err(e) = self.extract(archive, &dir).await {
            self.discard_dir(&dir).await;
            return Err(e);
        }

        let record = match self.registry.register(&manifest, &bindings) {
            Ok(record) => record,
            Err(e) => {
                self.discard_dir(&dir).await;
                return Err(e);
            }
        };

        if let Err(e) = self.hooks.invoke(LifecycleStep::Install, &manifest, ctx).await {
            error!("Install hook failed for plugin {}: {}", manifest.code, e);
            if let Err(cleanup) = self.registry.soft_delete(&record) {
                warn!(
                    "Failed to unregister plugin {} after hook failure: {}",
                    manifest.code, cleanup
                );
            }
            self.discard_dir(&dir).await;
            return Err(e);
        }

        info!(
            "Installed plugin {} ({} v{}) into {}",
            record.code,
            record.name,
            record.version,
            dir.display()
        );
        Ok(record)
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// 설치된 플러그인을 새 아카이브로 업데이트
    pub async fn update(
        &self,
        plugin: &PluginRecord,
        archive: &Path,
        ctx: &ApplicationContext,
    ) -> Result<PluginRecord> {
        info!("Updating plugin {} from {}", plugin.code, archive.display());

        let current = self.active_record(plugin)?;
        let (manifest, bindings) = self.inspect_archive(archive).await?;

        if manifest.code != current.code {
            return Err(Error::CodeMismatch {
                expected: current.code,
                found: manifest.code,
            });
        }
        if manifest.name != current.name {
            return Err(Error::NameMismatch {
                expected: current.name,
                found: manifest.name,
            });
        }

        let dir = self.plugin_dir(&manifest.name);
        self.extract(archive, &dir).await?;

        let record = self.registry.apply_update(&current, &manifest, &bindings)?;
        self.hooks.invoke(LifecycleStep::Update, &manifest, ctx).await?;

        info!("Updated plugin {} to v{}", record.code, record.version);
        Ok(record)
    }

    // ========================================================================
    // Enable / Disable
    // ========================================================================

    pub async fn enable(
        &self,
        plugin: &PluginRecord,
        ctx: &ApplicationContext,
    ) -> Result<PluginRecord> {
        self.toggle(plugin, true, ctx).await
    }

    pub async fn disable(
        &self,
        plugin: &PluginRecord,
        ctx: &ApplicationContext,
    ) -> Result<PluginRecord> {
        self.toggle(plugin, false, ctx).await
    }

    async fn toggle(
        &self,
        plugin: &PluginRecord,
        enabled: bool,
        ctx: &ApplicationContext,
    ) -> Result<PluginRecord> {
        let current = self.active_record(plugin)?;
        let dir = self.plugin_dir(&current.name);

        let record = self.registry.set_enabled(&current, enabled)?;

        // 메모리가 아닌 디스크의 매니페스트로 콜백
        let manifest = self.read_manifest(&dir)?;
        let step = if enabled {
            LifecycleStep::Enable
        } else {
            LifecycleStep::Disable
        };
        self.hooks.invoke(step, &manifest, ctx).await?;

        Ok(record)
    }

    // ========================================================================
    // Uninstall
    // ========================================================================

    /// 플러그인 제거: 콜백 → 등록 해제 → 디렉토리 삭제
    ///
    /// 콜백은 플러그인이 아직 등록된 (활성화 상태일 수 있는) 동안 실행됩니다.
    pub async fn uninstall(
        &self,
        plugin: &PluginRecord,
        ctx: &ApplicationContext,
    ) -> Result<PluginRecord> {
        info!("Uninstalling plugin {}", plugin.code);

        let current = self.active_record(plugin)?;
        let dir = self.plugin_dir(&current.name);

        let manifest = self.read_manifest(&dir)?;
        self.hooks
            .invoke(LifecycleStep::Uninstall, &manifest, ctx)
            .await?;

        let record = self.registry.soft_delete(&current)?;

        if tokio::fs::metadata(&dir).await.is_ok() {
            tokio::fs::remove_dir_all(&dir).await?;
        }

        info!("Uninstalled plugin {} ({})", record.code, dir.display());
        Ok(record)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// 스크래치 디렉토리에 풀어 매니페스트를 읽고 검증. 스크래치는 항상 삭제됨
    async fn inspect_archive(&self, archive: &Path) -> Result<(PluginManifest, EventBindings)> {
        let scratch = ScratchDir::create(&self.config.temp_dir())?;
        debug!(
            "Inspecting {} in {}",
            archive.display(),
            scratch.path().display()
        );

        let loaded = match self.extract(archive, scratch.path()).await {
            Ok(_) => self.read_manifests(scratch.path()),
            Err(e) => Err(e),
        };

        if let Err(e) = scratch.remove() {
            warn!("Failed to remove scratch directory: {}", e);
        }
        loaded
    }

    /// 블로킹 추출을 전용 스레드에서 실행
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<usize> {
        let archive = archive.to_path_buf();
        let dest = dest.to_path_buf();

        tokio::task::spawn_blocking(move || ArchiveExtractor::extract(&archive, &dest))
            .await
            .map_err(|e| Error::Internal(format!("extraction task failed: {}", e)))?
    }

    fn read_manifest(&self, dir: &Path) -> Result<PluginManifest> {
        let value = ManifestReader::read(&dir.join(self.config.config_file()))?;
        ManifestValidator::validate(&value)
    }

    fn read_manifests(&self, dir: &Path) -> Result<(PluginManifest, EventBindings)> {
        let manifest = self.read_manifest(dir)?;
        let events = ManifestReader::read(&dir.join(self.config.event_file()))?;
        let bindings = EventBindings::from_value(&events)?;
        Ok((manifest, bindings))
    }

    /// 삭제되지 않은 최신 레코드
    fn active_record(&self, plugin: &PluginRecord) -> Result<PluginRecord> {
        match self.registry.get(plugin.id)? {
            Some(record) if !record.deleted => Ok(record),
            _ => Err(Error::PluginNotFound(plugin.code.clone())),
        }
    }

    /// 영구 디렉토리 생성. 이미 있으면 `DirectoryExists`
    async fn create_plugin_dir(&self, dir: &Path) -> Result<()> {
        if let Some(parent) = dir.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        match tokio::fs::create_dir(dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(Error::DirectoryExists(dir.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 보상 처리용 디렉토리 삭제 (실패는 로그만)
    async fn discard_dir(&self, dir: &Path) {
        if let Err(e) = tokio::fs::remove_dir_all(dir).await {
            warn!("Failed to remove plugin directory {}: {}", dir.display(), e);
        }
    }
}
