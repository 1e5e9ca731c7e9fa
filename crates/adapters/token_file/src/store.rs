//! JSON token file.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use evnex_bridge_app::ports::{TokenStore, TokenStoreError};
use evnex_bridge_domain::token::TokenSet;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::error::TokenFileError;

/// File name inside the configuration directory.
pub const TOKEN_FILE_NAME: &str = "evnex_session.json";

/// Entries stay untyped so a malformed sibling survives a rewrite.
type TokenMap = Map<String, Value>;

/// Token store backed by `<config_dir>/evnex_session.json`.
#[derive(Debug, Clone)]
pub struct JsonTokenFile {
    path: PathBuf,
}

impl JsonTokenFile {
    /// Store in the default file of `config_dir`.
    #[must_use]
    pub fn in_dir(config_dir: impl AsRef<Path>) -> Self {
        Self::new(config_dir.as_ref().join(TOKEN_FILE_NAME))
    }

    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole map; an unreadable file or a non-object is an empty map.
    fn read_map(&self) -> TokenMap {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return TokenMap::new(),
            Err(err) => {
                error!(path = %self.path.display(), error = %err, "Failed to read token file");
                return TokenMap::new();
            }
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                error!(path = %self.path.display(), "Token file is not a JSON object, ignoring it");
                TokenMap::new()
            }
            Err(err) => {
                error!(path = %self.path.display(), error = %err, "Malformed token file, ignoring it");
                TokenMap::new()
            }
        }
    }

    fn write_map(&self, map: &TokenMap) -> Result<(), TokenFileError> {
        let payload = serde_json::to_vec_pretty(map).map_err(TokenFileError::Encode)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(write_error(dir))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let mut file = open_private(&tmp).map_err(write_error(&tmp))?;
        file.write_all(&payload).map_err(write_error(&tmp))?;
        file.sync_all().map_err(write_error(&tmp))?;
        fs::rename(&tmp, &self.path).map_err(write_error(&self.path))?;
        Ok(())
    }
}

fn write_error(path: &Path) -> impl FnOnce(io::Error) -> TokenFileError + use<> {
    let path = path.to_path_buf();
    move |source| TokenFileError::Write { path, source }
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<fs::File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

impl TokenStore for JsonTokenFile {
    fn load(&self, key: &str) -> Option<TokenSet> {
        let entry = self.read_map().remove(key)?;
        match serde_json::from_value(entry) {
            Ok(tokens) => Some(tokens),
            Err(err) => {
                error!(path = %self.path.display(), entry = key, error = %err, "Malformed token entry, ignoring it");
                None
            }
        }
    }

    fn save(&self, key: &str, tokens: &TokenSet) -> Result<(), TokenStoreError> {
        let entry = serde_json::to_value(tokens).map_err(TokenFileError::Encode)?;
        let mut map = self.read_map();
        map.insert(key.to_string(), entry);
        self.write_map(&map)?;
        debug!(path = %self.path.display(), entry = key, "Saved session tokens");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(n: u32) -> TokenSet {
        TokenSet {
            id_token: Some(format!("id-{n}")),
            refresh_token: Some(format!("refresh-{n}")),
            access_token: Some(format!("access-{n}")),
        }
    }

    #[test]
    fn should_return_none_when_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTokenFile::in_dir(dir.path());
        assert_eq!(store.load("entry-1"), None);
    }

    #[test]
    fn should_round_trip_saved_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTokenFile::in_dir(dir.path());

        store.save("entry-1", &tokens(1)).unwrap();

        assert_eq!(store.load("entry-1"), Some(tokens(1)));
        assert_eq!(store.load("entry-2"), None);
    }

    #[test]
    fn should_keep_latest_save_and_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTokenFile::in_dir(dir.path());

        store.save("entry-1", &tokens(1)).unwrap();
        store.save("entry-2", &tokens(2)).unwrap();
        store.save("entry-1", &tokens(3)).unwrap();

        assert_eq!(store.load("entry-1"), Some(tokens(3)));
        assert_eq!(store.load("entry-2"), Some(tokens(2)));
    }

    #[test]
    fn should_treat_malformed_file_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTokenFile::in_dir(dir.path());
        fs::write(store.path(), "{not json").unwrap();

        assert_eq!(store.load("entry-1"), None);

        store.save("entry-1", &tokens(1)).unwrap();
        assert_eq!(store.load("entry-1"), Some(tokens(1)));
    }

    #[test]
    fn should_keep_malformed_sibling_entry_when_saving() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTokenFile::in_dir(dir.path());
        fs::write(
            store.path(),
            r#"{"other": {"id_token": "i", "refresh_token": "r", "access_token": 42}}"#,
        )
        .unwrap();

        assert_eq!(store.load("other"), None);
        store.save("entry-1", &tokens(1)).unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["other"]["access_token"], Value::from(42));
        assert_eq!(store.load("entry-1"), Some(tokens(1)));
    }

    #[test]
    fn should_treat_non_object_file_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTokenFile::in_dir(dir.path());
        fs::write(store.path(), "[1, 2]").unwrap();

        assert_eq!(store.load("entry-1"), None);
        store.save("entry-1", &tokens(1)).unwrap();
        assert_eq!(store.load("entry-1"), Some(tokens(1)));
    }

    #[test]
    fn should_write_null_for_absent_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTokenFile::in_dir(dir.path());

        store.save("entry-1", &TokenSet::default()).unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["entry-1"]["access_token"], Value::Null);
    }

    #[test]
    fn should_create_missing_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTokenFile::in_dir(dir.path().join("nested"));

        store.save("entry-1", &tokens(1)).unwrap();

        assert!(store.path().exists());
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn should_restrict_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = JsonTokenFile::in_dir(dir.path());
        store.save("entry-1", &tokens(1)).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
