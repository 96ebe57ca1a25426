//! YAML configuration for the `cloudstatic` tool.
//!
//! # Storage layout
//!
//! ```text
//! ~/.cloudstatic/
//!   config.yaml     (mode 0600, written by `cloudstatic init`)
//!   manifest/       (default manifest directory, mode 0700)
//! ```
//!
//! # API pattern
//!
//! Every function touching the home directory has two forms:
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

/// Transfers, upserts, and removals each run with at most this many
/// operations in flight unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Manifest collection used when none is configured.
pub const DEFAULT_COLLECTION: &str = "cloudStatic";

pub const CONFIG_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where synced objects are written and how they are addressed publicly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory that plays the role of the remote namespace root.
    pub root: PathBuf,
    /// Public URL prefix; remote paths are appended to it verbatim.
    pub base_url: String,
}

/// Where the manifest document store keeps its collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestConfig {
    pub dir: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
}

/// Root of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub version: u32,
    pub storage: StorageConfig,
    pub manifest: ManifestConfig,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub follow_symlinks: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Config {
    /// A config with defaults for everything but the storage location.
    pub fn new(storage_root: PathBuf, base_url: impl Into<String>, manifest_dir: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            version: CONFIG_VERSION,
            storage: StorageConfig {
                root: storage_root,
                base_url: base_url.into(),
            },
            manifest: ManifestConfig {
                dir: manifest_dir,
                collection: default_collection(),
            },
            concurrency: DEFAULT_CONCURRENCY,
            follow_symlinks: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "concurrency",
                reason: "must be at least 1".into(),
            });
        }
        if self.manifest.collection.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "manifest.collection",
                reason: "must not be empty".into(),
            });
        }
        if self.storage.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "storage.base_url",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_owned()
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.cloudstatic/` — pure, no I/O.
pub fn config_dir_at(home: &Path) -> PathBuf {
    home.join(".cloudstatic")
}

/// `<home>/.cloudstatic/config.yaml` — pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    config_dir_at(home).join("config.yaml")
}

/// `<home>/.cloudstatic/manifest/` — pure, no I/O.
pub fn default_manifest_dir_at(home: &Path) -> PathBuf {
    config_dir_at(home).join("manifest")
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load and validate the config file at an explicit path.
///
/// Returns `ConfigError::ConfigNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let config: Config = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    config.validate()?;
    Ok(config)
}

/// Load `<home>/.cloudstatic/config.yaml`.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    load_from(&config_path_at(home))
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save the config to `<home>/.cloudstatic/config.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &Config) -> Result<(), ConfigError> {
    config.validate()?;
    let dir = config_dir_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        set_dir_permissions(&dir)?;
    }
    let path = config_path_at(home);
    let tmp_path = path.with_file_name("config.yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    save_at(&home()?, config)
}

// ---------------------------------------------------------------------------
// 4. Init
// ---------------------------------------------------------------------------

/// Write a fresh config pointing at `storage_root`.
///
/// If `manifest_dir` is `None`, the manifest lives under
/// `<home>/.cloudstatic/manifest/`. An existing config is replaced, keeping
/// its `created_at`.
pub fn init_at(
    home: &Path,
    storage_root: PathBuf,
    base_url: &str,
    manifest_dir: Option<PathBuf>,
) -> Result<Config, ConfigError> {
    let manifest_dir = manifest_dir.unwrap_or_else(|| default_manifest_dir_at(home));
    let mut config = Config::new(storage_root, base_url.trim_end_matches('/'), manifest_dir);

    let path = config_path_at(home);
    if path.exists() {
        if let Ok(existing) = load_from(&path) {
            config.created_at = existing.created_at;
        }
    }

    save_at(home, &config)?;
    Ok(config)
}

/// `init_at` convenience wrapper.
pub fn init(
    storage_root: PathBuf,
    base_url: &str,
    manifest_dir: Option<PathBuf>,
) -> Result<Config, ConfigError> {
    init_at(&home()?, storage_root, base_url, manifest_dir)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn sample(home: &Path) -> Config {
        Config::new(
            home.join("public"),
            "http://localhost:7901/uploads",
            default_manifest_dir_at(home),
        )
    }

    #[test]
    fn config_path_is_correct() {
        let home = TempDir::new().unwrap();
        assert!(config_path_at(home.path()).ends_with(".cloudstatic/config.yaml"));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let home = TempDir::new().unwrap();
        let config = sample(home.path());
        save_at(home.path(), &config).expect("save");
        let loaded = load_at(home.path()).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn atomic_write_cleans_up_tmp() {
        let home = TempDir::new().unwrap();
        save_at(home.path(), &sample(home.path())).expect("save");
        let tmp = config_path_at(home.path()).with_file_name("config.yaml.tmp");
        assert!(!tmp.exists(), ".tmp must be gone after successful save");
    }

    #[test]
    #[cfg(unix)]
    fn saved_config_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let home = TempDir::new().unwrap();
        save_at(home.path(), &sample(home.path())).expect("save");
        let mode = std::fs::metadata(config_path_at(home.path()))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn load_missing_returns_not_found() {
        let home = TempDir::new().unwrap();
        let err = load_at(home.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigNotFound { .. }));
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let home = TempDir::new().unwrap();
        let dir = config_dir_at(home.path());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            config_path_at(home.path()),
            "version: 1\n\
             storage:\n  root: /srv/public\n  base_url: http://cdn.example\n\
             manifest:\n  dir: /srv/manifest\n\
             created_at: 2024-01-01T00:00:00Z\n\
             updated_at: 2024-01-01T00:00:00Z\n",
        )
        .unwrap();

        let config = load_at(home.path()).expect("load");
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.manifest.collection, DEFAULT_COLLECTION);
        assert!(!config.follow_symlinks);
    }

    #[rstest]
    #[case::zero_concurrency("concurrency")]
    #[case::blank_collection("manifest.collection")]
    #[case::blank_base_url("storage.base_url")]
    fn invalid_values_are_rejected(#[case] field: &str) {
        let home = TempDir::new().unwrap();
        let mut config = sample(home.path());
        match field {
            "concurrency" => config.concurrency = 0,
            "manifest.collection" => config.manifest.collection = "  ".into(),
            _ => config.storage.base_url = String::new(),
        }
        let err = config.validate().unwrap_err();
        match err {
            ConfigError::Invalid { field: got, .. } => assert_eq!(got, field),
            other => panic!("expected invalid, got {other:?}"),
        }
    }

    #[test]
    fn init_trims_trailing_slash_and_defaults_manifest_dir() {
        let home = TempDir::new().unwrap();
        let config = init_at(
            home.path(),
            home.path().join("public"),
            "http://localhost:7901/uploads/",
            None,
        )
        .expect("init");
        assert_eq!(config.storage.base_url, "http://localhost:7901/uploads");
        assert_eq!(config.manifest.dir, default_manifest_dir_at(home.path()));
        assert!(config_path_at(home.path()).exists());
    }

    #[test]
    fn reinit_keeps_created_at() {
        let home = TempDir::new().unwrap();
        let first = init_at(home.path(), home.path().join("a"), "http://a", None).expect("init");
        let second = init_at(home.path(), home.path().join("b"), "http://b", None).expect("re-init");
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.storage.root, home.path().join("b"));
    }
}
