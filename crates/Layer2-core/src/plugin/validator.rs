//! Manifest validation

use super::manifest::{scalar_string, PluginManifest};
use super::name::is_valid_name;
use plugkit_foundation::{Error, Result};
use serde_yaml::Value;
use std::collections::BTreeMap;

const KNOWN_KEYS: [&str; 4] = ["code", "name", "version", "event"];

/// `config.yml` 검증기
pub struct ManifestValidator;

impl ManifestValidator {
    /// 파싱된 YAML 값을 검증해 `PluginManifest`로 변환
    ///
    /// - `code`, `name`: 필수, 심볼 이름 규칙
    /// - `event`: 선택, 값이 있으면 심볼 이름 규칙
    /// - `version`: 필수, 비어 있지 않음
    pub fn validate(value: &Value) -> Result<PluginManifest> {
        let mapping = value
            .as_mapping()
            .ok_or_else(|| Error::InvalidManifest("manifest must be a mapping".into()))?;

        let field = |key: &str| mapping.get(key).and_then(scalar_string);

        let code = field("code")
            .filter(|c| is_valid_name(c))
            .ok_or_else(|| Error::InvalidManifest("code is missing or not a valid name".into()))?;

        let name = field("name")
            .filter(|n| is_valid_name(n))
            .ok_or_else(|| Error::InvalidManifest("name is missing or not a valid name".into()))?;

        let event = match mapping.get("event") {
            None | Some(Value::Null) => None,
            Some(v) => {
                let event = scalar_string(v)
                    .ok_or_else(|| Error::InvalidManifest("event must be a string".into()))?;
                if event.is_empty() {
                    None
                } else if is_valid_name(&event) {
                    Some(event)
                } else {
                    return Err(Error::InvalidManifest(format!(
                        "event {:?} is not a valid name",
                        event
                    )));
                }
            }
        };

        let version = field("version")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::InvalidManifest("version is missing".into()))?;

        let extra: BTreeMap<String, Value> = mapping
            .iter()
            .filter_map(|(k, v)| Some((k.as_str()?.to_string(), v.clone())))
            .filter(|(k, _)| !KNOWN_KEYS.contains(&k.as_str()))
            .collect();

        Ok(PluginManifest {
            code,
            name,
            version,
            event,
            extra,
        })
    }
}
