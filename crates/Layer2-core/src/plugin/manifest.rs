//! Plugin manifest - `config.yml` / `event.yml` 모델과 읽기

use plugkit_foundation::{Error, Result};
use serde::Serialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

// ============================================================================
// PluginManifest
// ============================================================================

/// 검증을 통과한 플러그인 매니페스트 (`config.yml`)
///
/// `ManifestValidator::validate`로만 생성됩니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginManifest {
    /// 불변 식별자
    pub code: String,

    /// 표시 이름이자 설치 디렉토리 이름
    pub name: String,

    pub version: String,

    /// 엔트리포인트 심볼 (선택)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,

    /// 그 외 서술 필드 (description, author 등)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PluginManifest {
    /// 서술 필드 조회
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// 엔트리포인트. 레지스트리의 `class_name`으로 저장됨
    pub fn class_name(&self) -> Option<&str> {
        self.event.as_deref()
    }
}

// ============================================================================
// EventBindings
// ============================================================================

/// 이벤트 하나에 묶인 핸들러
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBinding {
    pub event: String,
    pub handler: String,
    pub handler_type: String,
}

/// `event.yml` 내용. 선언 순서를 유지합니다.
///
/// ```yaml
/// front.index:
///   - [onIndex, service]
///   - [onIndexLast, last]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EventBindings {
    bindings: Vec<EventBinding>,
}

impl EventBindings {
    pub fn new(bindings: Vec<EventBinding>) -> Self {
        Self { bindings }
    }

    /// YAML 값에서 구조를 읽음. 비어 있는 문서는 바인딩 없음으로 취급.
    ///
    /// 핸들러 이름 규칙은 여기서 검사하지 않습니다 (등록 시점에 검사).
    pub fn from_value(value: &Value) -> Result<Self> {
        let mapping = match value {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(m) => m,
            _ => {
                return Err(Error::InvalidManifest(
                    "event bindings must be a mapping of event to handler list".into(),
                ))
            }
        };

        let mut bindings = Vec::new();
        for (key, handlers) in mapping {
            let event = scalar_string(key).ok_or_else(|| {
                Error::InvalidManifest(format!("event name must be a string: {:?}", key))
            })?;

            let items = match handlers {
                Value::Null => continue,
                Value::Sequence(items) => items,
                _ => {
                    return Err(Error::InvalidManifest(format!(
                        "handlers of event {:?} must be a list",
                        event
                    )))
                }
            };

            for item in items {
                let pair = match item {
                    Value::Sequence(pair) if pair.len() == 2 => pair,
                    _ => {
                        return Err(Error::InvalidManifest(format!(
                            "handler of event {:?} must be [handler, type]",
                            event
                        )))
                    }
                };

                let handler = scalar_string(&pair[0]).ok_or_else(|| {
                    Error::InvalidManifest(format!(
                        "handler name of event {:?} must be a string",
                        event
                    ))
                })?;
                let handler_type = scalar_string(&pair[1]).ok_or_else(|| {
                    Error::InvalidManifest(format!(
                        "handler type of event {:?} must be a string",
                        event
                    ))
                })?;

                bindings.push(EventBinding {
                    event: event.clone(),
                    handler,
                    handler_type,
                });
            }
        }

        Ok(Self { bindings })
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<'a> IntoIterator for &'a EventBindings {
    type Item = &'a EventBinding;
    type IntoIter = std::slice::Iter<'a, EventBinding>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.iter()
    }
}

/// 문자열 또는 숫자 스칼라를 문자열로
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ============================================================================
// ManifestReader
// ============================================================================

/// YAML 매니페스트 파일 리더
pub struct ManifestReader;

impl ManifestReader {
    /// 파일을 읽어 YAML 값으로 파싱. 빈 파일은 `Value::Null`.
    pub fn read(path: &Path) -> Result<Value> {
        if !path.is_file() {
            return Err(Error::manifest_parse(path, "file not found"));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::manifest_parse(path, e.to_string()))?;

        if content.trim().is_empty() {
            debug!("Manifest {} is empty", path.display());
            return Ok(Value::Null);
        }

        serde_yaml::from_str(&content).map_err(|e| Error::manifest_parse(path, e.to_string()))
    }
}
