//! Plugin traits - 라이프사이클 콜백 인터페이스

use super::context::ApplicationContext;
use super::manifest::PluginManifest;
use async_trait::async_trait;
use plugkit_foundation::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// LifecycleStep - 라이프사이클 단계
// ============================================================================

/// 플러그인 라이프사이클 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStep {
    Install,
    Update,
    Enable,
    Disable,
    Uninstall,
}

impl LifecycleStep {
    pub const ALL: [LifecycleStep; 5] = [
        LifecycleStep::Install,
        LifecycleStep::Update,
        LifecycleStep::Enable,
        LifecycleStep::Disable,
        LifecycleStep::Uninstall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStep::Install => "install",
            LifecycleStep::Update => "update",
            LifecycleStep::Enable => "enable",
            LifecycleStep::Disable => "disable",
            LifecycleStep::Uninstall => "uninstall",
        }
    }
}

impl fmt::Display for LifecycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleStep {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        LifecycleStep::ALL
            .into_iter()
            .find(|step| step.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Internal(format!("unknown lifecycle step: {}", s)))
    }
}

// ============================================================================
// LifecycleHooks - 플러그인 제공 콜백
// ============================================================================

/// 플러그인이 라이프사이클 단계마다 실행할 콜백
///
/// 모든 메서드는 기본 구현이 no-op이므로 필요한 단계만 구현하면 됩니다.
/// 에러를 반환하면 해당 작업이 그 에러로 실패합니다.
///
/// ```ignore
/// struct SamplePluginManager;
///
/// #[async_trait]
/// impl LifecycleHooks for SamplePluginManager {
///     async fn install(&self, manifest: &PluginManifest, ctx: &ApplicationContext) -> Result<()> {
///         // 초기 데이터 준비 등
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    /// 파일 추출과 등록이 끝난 뒤 호출
    async fn install(&self, _manifest: &PluginManifest, _ctx: &ApplicationContext) -> Result<()> {
        Ok(())
    }

    /// 파일 덮어쓰기와 등록 갱신 뒤 호출
    async fn update(&self, _manifest: &PluginManifest, _ctx: &ApplicationContext) -> Result<()> {
        Ok(())
    }

    /// 활성화 플래그 저장 뒤 호출
    async fn enable(&self, _manifest: &PluginManifest, _ctx: &ApplicationContext) -> Result<()> {
        Ok(())
    }

    /// 비활성화 플래그 저장 뒤 호출
    async fn disable(&self, _manifest: &PluginManifest, _ctx: &ApplicationContext) -> Result<()> {
        Ok(())
    }

    /// 등록 해제와 파일 삭제 전에 호출
    async fn uninstall(&self, _manifest: &PluginManifest, _ctx: &ApplicationContext) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_round_trip_names() {
        for step in LifecycleStep::ALL {
            assert_eq!(step.to_string().parse::<LifecycleStep>().unwrap(), step);
        }
        assert_eq!("Enable".parse::<LifecycleStep>().unwrap(), LifecycleStep::Enable);
        assert!("reinstall".parse::<LifecycleStep>().is_err());
    }

    #[test]
    fn test_step_serde() {
        let json = serde_json::to_string(&LifecycleStep::Uninstall).unwrap();
        assert_eq!(json, "\"uninstall\"");
    }
}
