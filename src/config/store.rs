//! On-disk locations and persistence for config.yaml and sessions.yaml.
//!
//! Both documents are read whole, modified in memory, and written back whole.
//! There is no locking: two concurrent invocations may race and the last
//! writer wins.

use crate::config::env::EnvSnapshot;
use crate::config::schema::{ConfigDocument, SessionDocument};
use crate::{Error, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that relocates both documents.
pub const CONFIG_DIR_ENV: &str = "IZ_CONFIG_DIR";

pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const SESSIONS_FILE_NAME: &str = "sessions.yaml";

/// Format of the timestamp embedded in backup file names.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Locations of the two persisted documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub config_file: PathBuf,
    pub sessions_file: PathBuf,
}

/// Both documents loaded for one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Documents {
    pub config: ConfigDocument,
    pub sessions: SessionDocument,
}

impl Documents {
    pub fn load(paths: &ConfigPaths) -> Result<Self> {
        Ok(Self {
            config: paths.load_config()?,
            sessions: paths.load_sessions()?,
        })
    }
}

/// One document copied aside by a reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupRecord {
    pub original: PathBuf,
    pub backup: PathBuf,
}

/// Result of a reset: which documents were backed up and removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetOutcome {
    pub timestamp: String,
    pub backups: Vec<BackupRecord>,
}

impl ConfigPaths {
    /// Both documents inside a single directory.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            config_file: dir.join(CONFIG_FILE_NAME),
            sessions_file: dir.join(SESSIONS_FILE_NAME),
        }
    }

    /// Default locations: `$IZ_CONFIG_DIR` if set, otherwise `<config_dir>/iz`.
    pub fn resolve(env: &EnvSnapshot) -> Result<Self> {
        if let Some(dir) = env.get(CONFIG_DIR_ENV) {
            return Ok(Self::in_dir(Path::new(dir)));
        }
        let base = dirs::config_dir()
            .ok_or_else(|| Error::Other("Could not determine config directory".to_string()))?;
        Ok(Self::in_dir(&base.join("iz")))
    }

    /// Load config.yaml. A missing or empty file yields an empty document.
    pub fn load_config(&self) -> Result<ConfigDocument> {
        read_document(&self.config_file)
    }

    pub fn save_config(&self, doc: &ConfigDocument) -> Result<()> {
        write_document(&self.config_file, doc)
    }

    /// Load sessions.yaml. A missing or empty file yields an empty document.
    pub fn load_sessions(&self) -> Result<SessionDocument> {
        read_document(&self.sessions_file)
    }

    pub fn save_sessions(&self, doc: &SessionDocument) -> Result<()> {
        write_document(&self.sessions_file, doc)
    }

    /// Documents that currently exist on disk.
    pub fn existing_documents(&self) -> Vec<&Path> {
        [self.config_file.as_path(), self.sessions_file.as_path()]
            .into_iter()
            .filter(|p| p.exists())
            .collect()
    }

    /// Back up and delete both documents, stamping backups with the current local time.
    pub fn reset(&self) -> Result<ResetOutcome> {
        self.reset_with_timestamp(&backup_timestamp(Local::now()))
    }

    /// Back up and delete both documents using one timestamp for every backup.
    ///
    /// All copies are made before anything is deleted, so a failed backup
    /// leaves the originals in place.
    pub fn reset_with_timestamp(&self, timestamp: &str) -> Result<ResetOutcome> {
        let existing = self.existing_documents();
        if existing.is_empty() {
            return Err(Error::NothingToReset);
        }

        let mut backups = Vec::with_capacity(existing.len());
        for original in &existing {
            let backup = backup_path(original, timestamp);
            fs::copy(original, &backup).map_err(|e| Error::file(&backup, e))?;
            let perms = fs::metadata(original)
                .map_err(|e| Error::file(original, e))?
                .permissions();
            fs::set_permissions(&backup, perms).map_err(|e| Error::file(&backup, e))?;
            tracing::debug!(original = %original.display(), backup = %backup.display(), "backed up document");
            backups.push(BackupRecord {
                original: original.to_path_buf(),
                backup,
            });
        }

        for record in &backups {
            fs::remove_file(&record.original).map_err(|e| Error::file(&record.original, e))?;
        }

        Ok(ResetOutcome {
            timestamp: timestamp.to_string(),
            backups,
        })
    }
}

/// Render a backup timestamp (`YYYYMMDD_HHMMSS`).
pub fn backup_timestamp(now: DateTime<Local>) -> String {
    now.format(BACKUP_TIMESTAMP_FORMAT).to_string()
}

/// `<dir>/<file>.backup.<timestamp>`
pub fn backup_path(original: &Path, timestamp: &str) -> PathBuf {
    let name = original
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    original.with_file_name(format!("{}.backup.{}", name, timestamp))
}

fn read_document<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "document missing, using defaults");
        return Ok(T::default());
    }
    let content = fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(&content).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a document through a sibling temp file, then rename over the target.
fn write_document<T: Serialize>(path: &Path, doc: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::file(parent, e))?;
    }
    let content = serde_yaml::to_string(doc)?;
    let tmp = path.with_extension("yaml.tmp");
    fs::write(&tmp, content).map_err(|e| Error::file(&tmp, e))?;
    restrict_permissions(&tmp)?;
    fs::rename(&tmp, path).map_err(|e| Error::file(path, e))?;
    tracing::debug!(path = %path.display(), "wrote document");
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use crate::config::schema::DOCUMENT_FILE_MODE;
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(DOCUMENT_FILE_MODE))
        .map_err(|e| Error::file(path, e))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{Profile, Session};
    use crate::test_utils::{TestEnv, env_of};
    use chrono::TimeZone;

    #[test]
    fn test_resolve_honours_config_dir_env() {
        let env = env_of(&[(CONFIG_DIR_ENV, "/tmp/iz-test")]);
        let paths = ConfigPaths::resolve(&env).unwrap();
        assert_eq!(paths.config_file, PathBuf::from("/tmp/iz-test/config.yaml"));
        assert_eq!(
            paths.sessions_file,
            PathBuf::from("/tmp/iz-test/sessions.yaml")
        );
    }

    #[test]
    fn test_load_missing_documents_gives_defaults() {
        let env = TestEnv::new();
        let paths = env.paths();
        assert_eq!(paths.load_config().unwrap(), ConfigDocument::default());
        assert_eq!(paths.load_sessions().unwrap(), SessionDocument::default());
    }

    #[test]
    fn test_save_and_load_config() {
        let env = TestEnv::new();
        let mut doc = ConfigDocument::new();
        doc.timeout = Some(45);
        doc.profiles.insert(
            "sandbox".to_string(),
            Profile {
                leader_url: "http://sandbox.example.com".to_string(),
                ..Default::default()
            },
        );
        env.write_config(&doc);

        let loaded = env.paths().load_config().unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let env = TestEnv::new();
        let paths = env.paths();
        fs::write(&paths.config_file, "profiles: [not, a, map]\n").unwrap();

        let err = paths.load_config().unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn test_save_creates_missing_directory() {
        let env = TestEnv::new();
        let paths = ConfigPaths::in_dir(&env.path().join("nested").join("iz"));
        paths.save_sessions(&SessionDocument::default()).unwrap();
        assert!(paths.sessions_file.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_documents_written_with_0600() {
        use std::os::unix::fs::PermissionsExt;

        let env = TestEnv::new();
        env.write_config(&ConfigDocument::default());
        env.write_sessions(&SessionDocument::default());

        let paths = env.paths();
        for path in [&paths.config_file, &paths.sessions_file] {
            let mode = fs::metadata(path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600, "{} has mode {:o}", path.display(), mode);
        }
    }

    // ==================== Reset Tests ====================

    #[test]
    fn test_backup_timestamp_format() {
        let at = Local.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(backup_timestamp(at), "20260307_090501");
    }

    #[test]
    fn test_reset_nothing_to_reset() {
        let env = TestEnv::new();
        let err = env.paths().reset().unwrap_err();
        assert!(matches!(err, Error::NothingToReset));
    }

    #[test]
    fn test_reset_backs_up_both_with_same_timestamp() {
        let env = TestEnv::new();
        env.write_config(&ConfigDocument {
            timeout: Some(12),
            ..Default::default()
        });
        let mut sessions = SessionDocument::default();
        sessions.sessions.insert("prod".to_string(), Session::default());
        env.write_sessions(&sessions);

        let paths = env.paths();
        let outcome = paths.reset_with_timestamp("20260101_120000").unwrap();

        assert_eq!(outcome.backups.len(), 2);
        for record in &outcome.backups {
            let name = record.backup.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.ends_with(".backup.20260101_120000"), "{}", name);
            assert!(record.backup.exists());
            assert!(!record.original.exists());
        }

        let backup = fs::read_to_string(&outcome.backups[0].backup).unwrap();
        assert!(backup.contains("timeout: 12"));
    }

    #[test]
    fn test_reset_with_only_config_present() {
        let env = TestEnv::new();
        env.write_config(&ConfigDocument::default());

        let outcome = env.paths().reset().unwrap();
        assert_eq!(outcome.backups.len(), 1);
        assert_eq!(outcome.backups[0].original, env.paths().config_file);
    }

    #[cfg(unix)]
    #[test]
    fn test_reset_preserves_permissions_on_backup() {
        use std::os::unix::fs::PermissionsExt;

        let env = TestEnv::new();
        let paths = env.paths();
        fs::write(&paths.config_file, "timeout: 5\n").unwrap();
        fs::set_permissions(&paths.config_file, fs::Permissions::from_mode(0o640)).unwrap();

        let outcome = paths.reset().unwrap();
        let mode = fs::metadata(&outcome.backups[0].backup)
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o640);
    }
}
