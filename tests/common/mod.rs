use std::fs;
use std::path::PathBuf;
use tablechat::config::ServerConfig;
use tablechat::session::{SessionStore, SessionTexts};
use tablechat::storage::SledStore;
use tempfile::TempDir;

/// Server configuration pointing at a mock server
#[allow(dead_code)]
pub fn server_config(uri: &str) -> ServerConfig {
    ServerConfig {
        base_url: uri.to_string(),
        ..ServerConfig::default()
    }
}

/// Session store backed by a fresh sled database in a temp dir
#[allow(dead_code)]
pub fn create_temp_store() -> (SessionStore, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let store = open_store_at(&tmp.path().join("sessions.db"));
    (store, tmp)
}

/// Open the session store persisted at `path`
#[allow(dead_code)]
pub fn open_store_at(path: &std::path::Path) -> SessionStore {
    let backend = SledStore::open(path).expect("failed to open sled store");
    SessionStore::open(Box::new(backend), SessionTexts::default())
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
