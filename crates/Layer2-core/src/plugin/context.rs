//! ApplicationContext - 콜백에 전달되는 호스트 컨텍스트

use plugkit_foundation::{PluginSystemConfig, Storage};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

/// 호스트 애플리케이션 컨텍스트
///
/// 라이프사이클 콜백은 이 컨텍스트를 통해 설정과 카탈로그 저장소에 접근합니다.
/// 호스트가 넘기고 싶은 임의의 값은 `values`에 담습니다.
#[derive(Debug, Clone)]
pub struct ApplicationContext {
    config: PluginSystemConfig,
    storage: Storage,
    values: HashMap<String, Value>,
}

impl ApplicationContext {
    pub fn new(config: PluginSystemConfig, storage: Storage) -> Self {
        Self {
            config,
            storage,
            values: HashMap::new(),
        }
    }

    /// 호스트 값 추가 (builder)
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn config(&self) -> &PluginSystemConfig {
        &self.config
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// 플러그인 설치 디렉토리
    pub fn plugin_dir(&self, name: &str) -> PathBuf {
        self.config.plugin_dir(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_values() {
        let config = PluginSystemConfig::with_dirs("/srv/app/Plugin", "/srv/data");
        let ctx = ApplicationContext::new(config, Storage::in_memory().unwrap())
            .with_value("shop_name", json!("EC Shop"));

        assert_eq!(ctx.value("shop_name"), Some(&json!("EC Shop")));
        assert!(ctx.value("missing").is_none());
        assert_eq!(
            ctx.plugin_dir("Sample"),
            PathBuf::from("/srv/app/Plugin/Sample")
        );
    }
}
