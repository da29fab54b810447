//! Plugin archive extraction
//!
//! 플러그인 배포 단위는 gzip 압축 tar 아카이브입니다. 추출은 두 단계로 진행:
//!
//! 1. 모든 엔트리 경로를 검사 (절대 경로, `..`, 밖을 가리키는 링크 거부)
//! 2. 검사를 통과한 경우에만 대상 디렉토리에 풀기
//!
//! 하나라도 실패하면 전체 작업이 실패합니다.

use flate2::read::GzDecoder;
use plugkit_foundation::{Error, Result};
use std::fs::File;
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::{debug, warn};

// ============================================================================
// ArchiveExtractor
// ============================================================================

/// gzip tar 아카이브 추출기
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    /// `archive`의 모든 엔트리를 `dest` 아래에 추출. 기존 파일은 덮어씀.
    ///
    /// 추출된 엔트리 수를 반환합니다.
    pub fn extract(archive: &Path, dest: &Path) -> Result<usize> {
        Self::validate(archive)?;

        std::fs::create_dir_all(dest).map_err(|e| {
            Error::Archive(format!("cannot create {}: {}", dest.display(), e))
        })?;

        let mut tar = Self::open(archive)?;
        tar.set_overwrite(true);

        let mut count = 0;
        for entry in tar.entries().map_err(|e| archive_error(archive, e))? {
            let mut entry = entry.map_err(|e| archive_error(archive, e))?;
            let unpacked = entry
                .unpack_in(dest)
                .map_err(|e| archive_error(archive, e))?;
            if !unpacked {
                // validate()를 통과했다면 도달하지 않음
                return Err(Error::Archive(format!(
                    "{}: entry escapes destination",
                    archive.display()
                )));
            }
            count += 1;
        }

        debug!(
            "Extracted {} entries from {} into {}",
            count,
            archive.display(),
            dest.display()
        );
        Ok(count)
    }

    /// 엔트리 경로만 검사 (파일시스템에 쓰지 않음)
    pub fn validate(archive: &Path) -> Result<()> {
        let mut tar = Self::open(archive)?;

        for entry in tar.entries().map_err(|e| archive_error(archive, e))? {
            let entry = entry.map_err(|e| archive_error(archive, e))?;
            let path = entry
                .path()
                .map_err(|e| archive_error(archive, e))?
                .into_owned();

            if !is_contained(Path::new(""), &path) {
                warn!("Rejecting archive entry outside destination: {:?}", path);
                return Err(Error::Archive(format!(
                    "{}: unsafe entry path {:?}",
                    archive.display(),
                    path
                )));
            }

            let entry_type = entry.header().entry_type();
            if matches!(entry_type, EntryType::Symlink | EntryType::Link) {
                let target = entry
                    .link_name()
                    .map_err(|e| archive_error(archive, e))?
                    .map(|t| t.into_owned())
                    .unwrap_or_default();

                // 심볼릭 링크는 엔트리 위치 기준, 하드 링크는 아카이브 루트 기준
                let base = match entry_type {
                    EntryType::Symlink => path.parent().map(Path::to_path_buf).unwrap_or_default(),
                    _ => PathBuf::new(),
                };

                if !is_contained(&base, &target) {
                    warn!("Rejecting archive link {:?} -> {:?}", path, target);
                    return Err(Error::Archive(format!(
                        "{}: link {:?} points outside destination",
                        archive.display(),
                        path
                    )));
                }
            }
        }

        Ok(())
    }

    fn open(archive: &Path) -> Result<Archive<GzDecoder<File>>> {
        let file = File::open(archive).map_err(|e| archive_error(archive, e))?;
        Ok(Archive::new(GzDecoder::new(file)))
    }
}

fn archive_error(archive: &Path, e: std::io::Error) -> Error {
    Error::Archive(format!("{}: {}", archive.display(), e))
}

/// `base.join(path)`가 루트를 벗어나지 않는지 (어휘적으로) 확인
fn is_contained(base: &Path, path: &Path) -> bool {
    let mut depth: usize = 0;

    for component in base.components().chain(path.components()) {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }

    true
}

// ============================================================================
// ScratchDir
// ============================================================================

/// 아카이브 검사용 임시 디렉토리. Drop 시 삭제됩니다.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    removed: bool,
}

impl ScratchDir {
    /// `parent` 아래에 고유한 이름으로 생성
    pub fn create(parent: &Path) -> Result<Self> {
        let path = parent.join(format!("plugkit_plugin_{}", uuid::Uuid::new_v4().simple()));
        std::fs::create_dir_all(&path)?;
        debug!("Created scratch directory {}", path.display());

        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 명시적 삭제. 실패를 호출자에게 알려야 할 때 사용
    pub fn remove(mut self) -> Result<()> {
        self.removed = true;
        if self.path.exists() {
            std::fs::remove_dir_all(&self.path)?;
        }
        Ok(())
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.removed || !self.path.exists() {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            warn!(
                "Failed to remove scratch directory {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tar::{Builder, Header};
    use tempfile::TempDir;

    fn write_archive(path: &Path, build: impl FnOnce(&mut Builder<GzEncoder<File>>)) {
        let file = File::create(path).unwrap();
        let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
        build(&mut builder);
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn append_file(builder: &mut Builder<GzEncoder<File>>, name: &str, data: &[u8]) {
        let mut header = Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, name, data).unwrap();
    }

    /// set_path 검사를 우회해 원시 이름을 기록 (악성 아카이브 재현용)
    fn append_raw(builder: &mut Builder<GzEncoder<File>>, name: &str, data: &[u8]) {
        let mut header = Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(EntryType::Regular);
        {
            let gnu = header.as_gnu_mut().unwrap();
            gnu.name[..name.len()].copy_from_slice(name.as_bytes());
        }
        header.set_cksum();
        builder.append(&header, data).unwrap();
    }

    #[test]
    fn test_extract_nested_files() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("plugin.tar.gz");
        write_archive(&archive, |b| {
            append_file(b, "config.yml", b"code: sample01\n");
            append_file(b, "Resource/template/index.twig", b"<p>hi</p>");
        });

        let dest = temp.path().join("out");
        let count = ArchiveExtractor::extract(&archive, &dest).unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            std::fs::read_to_string(dest.join("config.yml")).unwrap(),
            "code: sample01\n"
        );
        assert!(dest.join("Resource/template/index.twig").exists());
    }

    #[test]
    fn test_extract_overwrites_existing() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("plugin.tar.gz");
        write_archive(&archive, |b| append_file(b, "a.txt", b"new"));

        let dest = temp.path().join("out");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("a.txt"), "old").unwrap();
        std::fs::write(dest.join("keep.txt"), "kept").unwrap();

        ArchiveExtractor::extract(&archive, &dest).unwrap();

        assert_eq!(std::fs::read_to_string(dest.join("a.txt")).unwrap(), "new");
        assert!(dest.join("keep.txt").exists());
    }

    #[test]
    fn test_rejects_parent_traversal() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("evil.tar.gz");
        write_archive(&archive, |b| {
            append_file(b, "config.yml", b"code: x\n");
            append_raw(b, "../evil.txt", b"pwned");
        });

        let dest = temp.path().join("out");
        let err = ArchiveExtractor::extract(&archive, &dest).unwrap_err();

        assert!(matches!(err, Error::Archive(_)));
        assert!(!temp.path().join("evil.txt").exists());
        // 검사 단계에서 실패하므로 아무것도 쓰지 않음
        assert!(!dest.join("config.yml").exists());
    }

    #[test]
    fn test_rejects_absolute_path() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("evil.tar.gz");
        write_archive(&archive, |b| append_raw(b, "/tmp/plugkit_evil.txt", b"pwned"));

        assert!(matches!(
            ArchiveExtractor::validate(&archive),
            Err(Error::Archive(_))
        ));
    }

    #[test]
    fn test_rejects_escaping_symlink() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("link.tar.gz");
        write_archive(&archive, |b| {
            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::Symlink);
            header.set_size(0);
            header.set_mode(0o777);
            b.append_link(&mut header, "dir/link", "../../outside").unwrap();
        });

        assert!(matches!(
            ArchiveExtractor::validate(&archive),
            Err(Error::Archive(_))
        ));
    }

    #[test]
    fn test_missing_or_corrupt_archive() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.tar.gz");
        assert!(matches!(
            ArchiveExtractor::extract(&missing, temp.path()),
            Err(Error::Archive(_))
        ));

        let corrupt = temp.path().join("corrupt.tar.gz");
        std::fs::write(&corrupt, b"definitely not gzip").unwrap();
        assert!(matches!(
            ArchiveExtractor::validate(&corrupt),
            Err(Error::Archive(_))
        ));
    }

    #[test]
    fn test_is_contained() {
        assert!(is_contained(Path::new(""), Path::new("a/b/../c")));
        assert!(is_contained(Path::new("dir"), Path::new("../sibling")));
        assert!(!is_contained(Path::new("dir"), Path::new("../../up")));
        assert!(!is_contained(Path::new(""), Path::new("/etc/passwd")));
    }

    #[test]
    fn test_scratch_dir_removed_on_drop() {
        let temp = TempDir::new().unwrap();
        let path = {
            let scratch = ScratchDir::create(temp.path()).unwrap();
            std::fs::write(scratch.path().join("f"), "x").unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());

        let scratch = ScratchDir::create(temp.path()).unwrap();
        let path = scratch.path().to_path_buf();
        scratch.remove().unwrap();
        assert!(!path.exists());
    }
}
