//! Plugin Registry - 영속 플러그인 카탈로그
//!
//! 플러그인 레코드와 이벤트 핸들러 레코드를 관리합니다.
//! 각 변경 작업은 하나의 SQLite 트랜잭션으로 실행되며,
//! 실패하면 해당 작업의 변경은 모두 롤백됩니다.

use super::manifest::{EventBindings, PluginManifest};
use super::name::is_valid_name;
use plugkit_foundation::{
    Error, NewEventHandler, NewPlugin, PluginEventHandlerRecord, PluginEventHandlerRepository,
    PluginRecord, PluginRepository, Result, Storage, SOURCE_LOCAL,
};
use tracing::{debug, info};

/// 플러그인 카탈로그
#[derive(Debug, Clone)]
pub struct PluginRegistry {
    storage: Storage,
}

impl PluginRegistry {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    // ========================================================================
    // 변경 작업
    // ========================================================================

    /// 신규 플러그인과 핸들러 등록 (enabled = true)
    ///
    /// 핸들러 이름이 규칙에 맞지 않으면 `InvalidHandlerName`으로 실패하고
    /// 플러그인 행을 포함한 모든 변경이 롤백됩니다.
    pub fn register(
        &self,
        manifest: &PluginManifest,
        bindings: &EventBindings,
    ) -> Result<PluginRecord> {
        let record = self.storage.transaction(|tx| {
            let plugins = PluginRepository::new(tx);

            if plugins.find_by_code(&manifest.code)?.is_some() {
                return Err(Error::DuplicateCode(manifest.code.clone()));
            }

            let plugin_id = plugins.insert(&NewPlugin {
                code: manifest.code.clone(),
                name: manifest.name.clone(),
                version: manifest.version.clone(),
                class_name: manifest.event.clone(),
                enabled: true,
                source: SOURCE_LOCAL,
            })?;

            let handlers = PluginEventHandlerRepository::new(tx);
            for binding in bindings {
                if !is_valid_name(&binding.handler) {
                    return Err(Error::InvalidHandlerName(binding.handler.clone()));
                }
                let priority = handlers.calc_new_priority(&binding.event, &binding.handler_type)?;
                handlers.insert(&NewEventHandler {
                    plugin_id,
                    event: binding.event.clone(),
                    handler: binding.handler.clone(),
                    handler_type: binding.handler_type.clone(),
                    priority,
                })?;
            }

            load_plugin(&plugins, plugin_id)
        })?;

        info!(
            "Registered plugin {} ({} v{}) with {} handlers",
            record.code,
            record.name,
            record.version,
            bindings.len()
        );
        Ok(record)
    }

    /// 업데이트 반영: name/version/class_name 갱신, 새 핸들러만 추가
    ///
    /// 기존 핸들러 행은 수정하거나 삭제하지 않습니다. 새 매니페스트에서
    /// 빠진 핸들러도 활성 상태로 남습니다.
    pub fn apply_update(
        &self,
        plugin: &PluginRecord,
        manifest: &PluginManifest,
        bindings: &EventBindings,
    ) -> Result<PluginRecord> {
        let record = self.storage.transaction(|tx| {
            let plugins = PluginRepository::new(tx);
            let mut record = load_active(&plugins, plugin.id)?;

            record.name = manifest.name.clone();
            record.version = manifest.version.clone();
            record.class_name = manifest.event.clone();
            plugins.update(&record)?;

            let handlers = PluginEventHandlerRepository::new(tx);
            let mut added = 0;
            for binding in bindings {
                if !is_valid_name(&binding.handler) {
                    return Err(Error::InvalidHandlerName(binding.handler.clone()));
                }
                if handlers
                    .find_active(record.id, &binding.event, &binding.handler)?
                    .is_some()
                {
                    continue;
                }
                let priority = handlers.calc_new_priority(&binding.event, &binding.handler_type)?;
                handlers.insert(&NewEventHandler {
                    plugin_id: record.id,
                    event: binding.event.clone(),
                    handler: binding.handler.clone(),
                    handler_type: binding.handler_type.clone(),
                    priority,
                })?;
                added += 1;
            }
            debug!("Plugin {}: {} new handlers", record.code, added);

            load_plugin(&plugins, record.id)
        })?;

        info!("Updated plugin {} to v{}", record.code, record.version);
        Ok(record)
    }

    /// 활성화 플래그 저장. 핸들러 행은 건드리지 않음
    pub fn set_enabled(&self, plugin: &PluginRecord, enabled: bool) -> Result<PluginRecord> {
        let record = self.storage.transaction(|tx| {
            let plugins = PluginRepository::new(tx);
            let mut record = load_active(&plugins, plugin.id)?;
            record.enabled = enabled;
            plugins.update(&record)?;
            load_plugin(&plugins, record.id)
        })?;

        info!(
            "Plugin {} {}",
            record.code,
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(record)
    }

    /// 소프트 삭제: 플러그인 deleted = true, enabled = false, 소유 핸들러 deleted = true
    pub fn soft_delete(&self, plugin: &PluginRecord) -> Result<PluginRecord> {
        let record = self.storage.transaction(|tx| {
            let plugins = PluginRepository::new(tx);
            let mut record = load_active(&plugins, plugin.id)?;
            record.deleted = true;
            record.enabled = false;
            plugins.update(&record)?;

            let removed =
                PluginEventHandlerRepository::new(tx).soft_delete_by_plugin_id(record.id)?;
            debug!("Plugin {}: {} handlers soft-deleted", record.code, removed);

            load_plugin(&plugins, record.id)
        })?;

        info!("Unregistered plugin {}", record.code);
        Ok(record)
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// ID로 조회 (삭제된 플러그인 포함)
    pub fn get(&self, id: i64) -> Result<Option<PluginRecord>> {
        self.storage
            .with_connection(|conn| PluginRepository::new(conn).find_by_id(id))
    }

    /// code로 활성 플러그인 조회
    pub fn find_by_code(&self, code: &str) -> Result<Option<PluginRecord>> {
        self.storage
            .with_connection(|conn| PluginRepository::new(conn).find_by_code(code))
    }

    pub fn list(&self, include_deleted: bool) -> Result<Vec<PluginRecord>> {
        self.storage
            .with_connection(|conn| PluginRepository::new(conn).find_all(include_deleted))
    }

    /// 플러그인의 활성 핸들러
    pub fn handlers_of(&self, plugin: &PluginRecord) -> Result<Vec<PluginEventHandlerRecord>> {
        self.storage.with_connection(|conn| {
            PluginEventHandlerRepository::new(conn).find_by_plugin_id(plugin.id, false)
        })
    }

    /// 이벤트 디스패치 순서대로 핸들러 조회 (활성화된 플러그인만)
    pub fn handlers_for_event(&self, event: &str) -> Result<Vec<PluginEventHandlerRecord>> {
        self.storage.with_connection(|conn| {
            PluginEventHandlerRepository::new(conn).find_dispatchable(event)
        })
    }
}

fn load_plugin(plugins: &PluginRepository<'_>, id: i64) -> Result<PluginRecord> {
    plugins
        .find_by_id(id)?
        .ok_or_else(|| Error::PluginNotFound(format!("id {}", id)))
}

/// 삭제되지 않은 플러그인만 반환
fn load_active(plugins: &PluginRepository<'_>, id: i64) -> Result<PluginRecord> {
    match plugins.find_by_id(id)? {
        Some(record) if !record.deleted => Ok(record),
        Some(record) => Err(Error::PluginNotFound(format!(
            "{} (uninstalled)",
            record.code
        ))),
        None => Err(Error::PluginNotFound(format!("id {}", id))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::manifest::EventBinding;
    use crate::plugin::validator::ManifestValidator;

    fn manifest(code: &str, name: &str, version: &str) -> PluginManifest {
        let yaml = format!(
            "code: {}\nname: {}\nversion: {}\nevent: SampleEvent\n",
            code, name, version
        );
        ManifestValidator::validate(&serde_yaml::from_str(&yaml).unwrap()).unwrap()
    }

    fn bindings(items: &[(&str, &str, &str)]) -> EventBindings {
        EventBindings::new(
            items
                .iter()
                .map(|(event, handler, handler_type)| EventBinding {
                    event: event.to_string(),
                    handler: handler.to_string(),
                    handler_type: handler_type.to_string(),
                })
                .collect(),
        )
    }

    fn registry() -> PluginRegistry {
        PluginRegistry::new(Storage::in_memory().unwrap())
    }

    #[test]
    fn test_register_creates_plugin_and_handlers() {
        let registry = registry();
        let record = registry
            .register(
                &manifest("sample01", "Sample", "1.0.0"),
                &bindings(&[("front.index", "onIndex", "service")]),
            )
            .unwrap();

        assert_eq!(record.code, "sample01");
        assert_eq!(record.class_name.as_deref(), Some("SampleEvent"));
        assert!(record.enabled);
        assert!(!record.deleted);
        assert_eq!(record.source, SOURCE_LOCAL);

        let handlers = registry.handlers_of(&record).unwrap();
        assert_eq!(handlers.len(), 1);
        assert_eq!(handlers[0].event, "front.index");
        assert_eq!(handlers[0].handler, "onIndex");
        assert_eq!(handlers[0].handler_type, "service");
        assert_eq!(handlers[0].priority, 0);
    }

    #[test]
    fn test_register_duplicate_code() {
        let registry = registry();
        registry
            .register(&manifest("sample01", "Sample", "1.0.0"), &EventBindings::default())
            .unwrap();

        let err = registry
            .register(&manifest("sample01", "Other", "2.0.0"), &EventBindings::default())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateCode(code) if code == "sample01"));
        assert_eq!(registry.list(true).unwrap().len(), 1);
    }

    #[test]
    fn test_register_invalid_handler_rolls_back() {
        let registry = registry();
        let err = registry
            .register(
                &manifest("sample01", "Sample", "1.0.0"),
                &bindings(&[
                    ("front.index", "onIndex", "service"),
                    ("front.index", "bad-handler", "service"),
                ]),
            )
            .unwrap_err();

        assert!(matches!(err, Error::InvalidHandlerName(h) if h == "bad-handler"));
        assert!(registry.list(true).unwrap().is_empty());
        assert!(registry.handlers_for_event("front.index").unwrap().is_empty());
    }

    #[test]
    fn test_priority_across_plugins() {
        let registry = registry();
        registry
            .register(
                &manifest("a", "A", "1"),
                &bindings(&[
                    ("front.index", "onA", "service"),
                    ("front.index", "onA2", "service"),
                    ("front.index", "onFirst", "first"),
                ]),
            )
            .unwrap();
        let b = registry
            .register(
                &manifest("b", "B", "1"),
                &bindings(&[("front.index", "onB", "service")]),
            )
            .unwrap();

        let handlers = registry.handlers_of(&b).unwrap();
        assert_eq!(handlers[0].priority, 2);

        let order: Vec<_> = registry
            .handlers_for_event("front.index")
            .unwrap()
            .into_iter()
            .map(|h| (h.handler, h.priority))
            .collect();
        assert_eq!(
            order,
            vec![
                ("onFirst".to_string(), 0),
                ("onA".to_string(), 0),
                ("onA2".to_string(), 1),
                ("onB".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_apply_update_is_insert_only() {
        let registry = registry();
        let record = registry
            .register(
                &manifest("sample01", "Sample", "1.0.0"),
                &bindings(&[
                    ("front.index", "onIndex", "service"),
                    ("front.index", "onRemoved", "service"),
                ]),
            )
            .unwrap();

        let updated = registry
            .apply_update(
                &record,
                &manifest("sample01", "Sample", "1.1.0"),
                &bindings(&[
                    ("front.index", "onIndex", "last"),
                    ("front.index", "onNew", "service"),
                ]),
            )
            .unwrap();

        assert_eq!(updated.version, "1.1.0");

        let handlers = registry.handlers_of(&updated).unwrap();
        let summary: Vec<_> = handlers
            .iter()
            .map(|h| (h.handler.as_str(), h.handler_type.as_str(), h.priority))
            .collect();
        // onIndex 기존 행 유지 (type 변경 무시), onRemoved 유지, onNew 추가
        assert_eq!(
            summary,
            vec![
                ("onIndex", "service", 0),
                ("onRemoved", "service", 1),
                ("onNew", "service", 2),
            ]
        );
    }

    #[test]
    fn test_set_enabled_and_dispatch() {
        let registry = registry();
        let record = registry
            .register(
                &manifest("sample01", "Sample", "1.0.0"),
                &bindings(&[("front.index", "onIndex", "service")]),
            )
            .unwrap();

        let disabled = registry.set_enabled(&record, false).unwrap();
        assert!(!disabled.enabled);
        assert!(registry.handlers_for_event("front.index").unwrap().is_empty());
        // 핸들러 행은 그대로
        assert_eq!(registry.handlers_of(&disabled).unwrap().len(), 1);

        let enabled = registry.set_enabled(&disabled, true).unwrap();
        assert!(enabled.enabled);
        assert_eq!(registry.handlers_for_event("front.index").unwrap().len(), 1);
    }

    #[test]
    fn test_soft_delete() {
        let registry = registry();
        let record = registry
            .register(
                &manifest("sample01", "Sample", "1.0.0"),
                &bindings(&[
                    ("front.index", "onIndex", "service"),
                    ("admin.order", "onOrder", "first"),
                ]),
            )
            .unwrap();

        let deleted = registry.soft_delete(&record).unwrap();
        assert!(deleted.deleted);
        assert!(!deleted.enabled);
        assert!(registry.handlers_of(&deleted).unwrap().is_empty());
        assert!(registry.find_by_code("sample01").unwrap().is_none());
        assert!(registry.get(record.id).unwrap().is_some());

        // 삭제된 플러그인은 변경 불가
        assert!(matches!(
            registry.set_enabled(&deleted, true),
            Err(Error::PluginNotFound(_))
        ));
        assert!(matches!(
            registry.soft_delete(&deleted),
            Err(Error::PluginNotFound(_))
        ));

        // 같은 code로 재설치 가능
        let again = registry
            .register(&manifest("sample01", "Sample", "2.0.0"), &EventBindings::default())
            .unwrap();
        assert_ne!(again.id, record.id);
        assert_eq!(registry.list(false).unwrap().len(), 1);
        assert_eq!(registry.list(true).unwrap().len(), 2);
    }

    #[test]
    fn test_handlers_for_event_runs_last_after_service() {
        let registry = registry();
        registry
            .register(
                &manifest("sample01", "Sample", "1.0.0"),
                &bindings(&[
                    ("front.index", "onIndex", "service"),
                    ("front.index", "onIndexLast", "last"),
                    ("front.index", "onIndexFirst", "first"),
                ]),
            )
            .unwrap();

        let order: Vec<_> = registry
            .handlers_for_event("front.index")
            .unwrap()
            .into_iter()
            .map(|h| h.handler)
            .collect();
        assert_eq!(order, vec!["onIndexFirst", "onIndex", "onIndexLast"]);
    }

    #[test]
    fn test_apply_update_invalid_handler_rolls_back() {
        let registry = registry();
        let record = registry
            .register(
                &manifest("sample01", "Sample", "1.0.0"),
                &bindings(&[("front.index", "onIndex", "service")]),
            )
            .unwrap();

        let err = registry
            .apply_update(
                &record,
                &manifest("sample01", "Sample", "2.0.0"),
                &bindings(&[
                    ("front.index", "onNew", "service"),
                    ("front.index", "bad handler", "service"),
                ]),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidHandlerName(h) if h == "bad handler"));

        let current = registry.get(record.id).unwrap().unwrap();
        assert_eq!(current.version, "1.0.0");
        assert_eq!(current.updated_at, record.updated_at);

        let handlers: Vec<_> = registry
            .handlers_of(&current)
            .unwrap()
            .into_iter()
            .map(|h| h.handler)
            .collect();
        assert_eq!(handlers, vec!["onIndex"]);
    }
}
