use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    types::CredentialRecord,
};

/// Durable home of the single credential record.
pub trait CredentialStore: Send + Sync {
    /// Read the current record. Never served from a cache.
    fn load(&self) -> Result<CredentialRecord>;

    /// Replace the record atomically.
    fn save(&self, record: &CredentialRecord) -> Result<()>;

    /// Advisory lock shared by every process that uses this store.
    fn lock_file(&self) -> Result<Option<fd_lock::RwLock<File>>> {
        Ok(None)
    }
}

/// File-based credential storage, by default at
/// `~/.config/qtrade/credentials.json`.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the location named by `config`.
    pub fn from_config(config: &qtrade_config::QtradeConfig) -> Self {
        Self::new(qtrade_config::credentials_path(config))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the initial record from a manually obtained refresh token.
    pub fn seed(&self, refresh_token: &str) -> Result<()> {
        self.save(&CredentialRecord::seed(refresh_token))
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }
}

impl CredentialStore for TokenStore {
    fn load(&self) -> Result<CredentialRecord> {
        let data = std::fs::read(&self.path).map_err(|source| Error::StoreUnavailable {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_slice(&data).map_err(|source| Error::CorruptRecord {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, record: &CredentialRecord) -> Result<()> {
        let write_err = |source: std::io::Error| Error::StoreWrite {
            path: self.path.clone(),
            source,
        };
        let dir = self.dir();
        std::fs::create_dir_all(dir).map_err(write_err)?;

        let data = serde_json::to_vec_pretty(record).map_err(|e| write_err(e.into()))?;

        // Written next to the target so the final rename stays on one filesystem.
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(write_err)?;
        }
        tmp.write_all(&data).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        #[cfg(unix)]
        {
            if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
                warn!(dir = %dir.display(), error = %e, "failed to sync credential directory");
            }
        }

        debug!(
            path = %self.path.display(),
            expires_at = record.expires_at,
            "saved credential record"
        );
        Ok(())
    }

    fn lock_file(&self) -> Result<Option<fd_lock::RwLock<File>>> {
        let path = self.lock_path();
        let unavailable = |source: std::io::Error| Error::StoreUnavailable {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(self.dir()).map_err(unavailable)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(unavailable)?;
        Ok(Some(fd_lock::RwLock::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use {secrecy::Secret, std::io::ErrorKind};

    use super::*;

    fn record(refresh: &str, expires_at: u64) -> CredentialRecord {
        CredentialRecord {
            access_token: Secret::new("access-1".into()),
            refresh_token: Secret::new(refresh.into()),
            api_server: "https://api05.iq.questrade.com/".into(),
            expires_at,
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("credentials.json"));
        let rec = record("refresh-1", 1_700_000_000);

        store.save(&rec).unwrap();
        assert_eq!(store.load().unwrap(), rec);
    }

    #[test]
    fn save_creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested/deeper/credentials.json"));
        store.save(&record("r", 1)).unwrap();
        assert_eq!(store.load().unwrap().expires_at, 1);
    }

    #[test]
    fn missing_file_is_store_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("absent.json"));
        match store.load() {
            Err(Error::StoreUnavailable { source, .. }) => {
                assert_eq!(source.kind(), ErrorKind::NotFound)
            },
            other => panic!("expected StoreUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn garbage_is_corrupt_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();
        let err = TokenStore::new(&path).load().unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { .. }));
        assert!(err.needs_reseed());
    }

    #[test]
    fn missing_field_is_corrupt_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(
            &path,
            r#"{"access_token":"a","refresh_token":"r","expires_at":5}"#,
        )
        .unwrap();
        assert!(matches!(
            TokenStore::new(&path).load(),
            Err(Error::CorruptRecord { .. })
        ));
    }

    #[test]
    fn overwrite_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("credentials.json"));
        store.save(&record("first", 1)).unwrap();
        store.save(&record("second", 2)).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("credentials.json")]);

        let loaded = store.load().unwrap();
        assert_eq!(loaded, record("second", 2));
    }

    #[test]
    fn failed_persist_leaves_target_and_directory_untouched() {
        let dir = tempfile::tempdir().unwrap();

        // A non-empty directory squatting on the target makes the final rename fail.
        let store = TokenStore::new(dir.path().join("credentials.json"));
        std::fs::create_dir(store.path()).unwrap();
        std::fs::write(store.path().join("occupant"), "x").unwrap();

        let err = store.save(&record("lost", 20)).unwrap_err();
        assert!(matches!(err, Error::StoreWrite { .. }));

        assert_eq!(
            std::fs::read_to_string(store.path().join("occupant")).unwrap(),
            "x"
        );
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("credentials.json")]);
    }

    #[test]
    fn non_utf8_content_is_corrupt_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let err = TokenStore::new(&path).load().unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { .. }));
        assert!(err.needs_reseed());
    }

    #[cfg(unix)]
    #[test]
    fn credential_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("credentials.json"));
        store.save(&record("r", 1)).unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn seed_writes_expired_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("credentials.json"));
        store.seed("manual-token").unwrap();
        let rec = store.load().unwrap();
        assert_eq!(rec, CredentialRecord::seed("manual-token"));
        assert!(!rec.is_fresh(0, 0));
    }

    #[test]
    fn lock_file_is_exclusive_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("credentials.json"));
        let mut first = store.lock_file().unwrap().unwrap();
        let mut second = store.lock_file().unwrap().unwrap();

        let guard = first.try_write().unwrap();
        assert!(second.try_write().is_err());
        drop(guard);
        assert!(second.try_write().is_ok());
        assert!(dir.path().join("credentials.json.lock").exists());
    }
}
