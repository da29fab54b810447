//! JSON 설정 레이어
//!
//! `plugins.json` 같은 설정 파일이 놓이는 디렉토리 하나를 나타냅니다.
//! 글로벌(~/.config/plugkit)과 프로젝트(.plugkit) 레이어를 순서대로 겹쳐 씁니다.

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 글로벌 레이어 디렉토리 이름
const GLOBAL_DIR_NAME: &str = "plugkit";

/// 프로젝트 레이어 디렉토리 이름
const PROJECT_DIR_NAME: &str = ".plugkit";

/// JSON 설정 저장소 (디렉토리 하나)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// 글로벌 레이어. OS 설정 디렉토리가 없으면 `None`
    pub fn global() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::new(dir.join(GLOBAL_DIR_NAME)))
    }

    /// `root` 아래 프로젝트 레이어
    pub fn project(root: impl AsRef<Path>) -> Self {
        Self::new(root.as_ref().join(PROJECT_DIR_NAME))
    }

    /// 기본 레이어 목록: 글로벌 → 현재 디렉토리 프로젝트 (뒤쪽이 우선)
    pub fn default_layers() -> Result<Vec<Self>> {
        let cwd = std::env::current_dir()
            .map_err(|e| Error::Config(format!("Cannot get current directory: {}", e)))?;

        let mut layers: Vec<Self> = Self::global().into_iter().collect();
        layers.push(Self::project(cwd));
        Ok(layers)
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.base_dir.join(filename)
    }

    /// 파일이 없으면 `None`, 파싱 실패는 `Error::Config`
    pub fn load_optional<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.file_path(filename);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Config layer {} not present", path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::Config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// 저장. 같은 디렉토리의 임시 파일에 쓴 뒤 rename 하므로
    /// 중간에 실패해도 기존 파일은 그대로 남습니다.
    pub fn save<T: Serialize>(&self, filename: &str, data: &T) -> Result<()> {
        std::fs::create_dir_all(&self.base_dir).map_err(|e| {
            Error::Config(format!(
                "Failed to create {}: {}",
                self.base_dir.display(),
                e
            ))
        })?;

        let path = self.file_path(filename);
        let mut content = serde_json::to_string_pretty(data)
            .map_err(|e| Error::Config(format!("Failed to serialize: {}", e)))?;
        content.push('\n');

        let staging = self.file_path(&format!(".{}.tmp", filename));
        std::fs::write(&staging, content)
            .and_then(|_| std::fs::rename(&staging, &path))
            .map_err(|e| {
                let _ = std::fs::remove_file(&staging);
                Error::Config(format!("Failed to write {}: {}", path.display(), e))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_save_creates_dir_and_leaves_no_staging_file() {
        let temp = TempDir::new().unwrap();
        let store = JsonStore::project(temp.path());

        let mut data = HashMap::new();
        data.insert("pluginsDir".to_string(), "/srv/plugins".to_string());
        store.save("plugins.json", &data).unwrap();

        let dir = temp.path().join(".plugkit");
        let files: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(files, vec!["plugins.json".to_string()]);

        let loaded: HashMap<String, String> = store.load_optional("plugins.json").unwrap().unwrap();
        assert_eq!(loaded.get("pluginsDir").map(String::as_str), Some("/srv/plugins"));
    }

    #[test]
    fn test_load_optional_missing() {
        let temp = TempDir::new().unwrap();
        let store = JsonStore::new(temp.path());
        let loaded: Option<HashMap<String, String>> = store.load_optional("missing.json").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_broken_json_is_config_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("broken.json"), "{ not json").unwrap();
        let store = JsonStore::new(temp.path());
        let result: Result<Option<HashMap<String, String>>> = store.load_optional("broken.json");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_default_layers_end_with_project() {
        let layers = JsonStore::default_layers().unwrap();
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(layers.last(), Some(&JsonStore::project(cwd)));
    }
}
