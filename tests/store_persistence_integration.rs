//! JSON file store persistence tests.

use std::sync::Arc;
use std::time::Duration;

use hostwatch::{Host, JsonFileStore, KeyValueStore, MonitorConfig, Status};

fn store_at(dir: &tempfile::TempDir) -> Arc<JsonFileStore> {
    let path = dir.path().join("state.json");
    Arc::new(JsonFileStore::open(path).expect("store should open"))
}

#[test]
fn test_registry_round_trip_through_reopened_store() {
    let dir = tempfile::tempdir().expect("tempdir should create");

    {
        let mut config = MonitorConfig::new(store_at(&dir) as Arc<dyn KeyValueStore>);
        config.add_host("svc.example.com", 443);
        config.add_host("10.0.0.1", 22);
        config
            .set_socket_timeout(Duration::from_millis(1234))
            .expect("timeout is non-zero");
        config.save().expect("save should succeed");
    }

    // A brand-new store instance reads the same file from disk.
    let mut reloaded = MonitorConfig::new(store_at(&dir) as Arc<dyn KeyValueStore>);
    assert_eq!(reloaded.registry().len(), 2);
    assert_eq!(
        reloaded.registry()[&Host::new("svc.example.com", 443)],
        Status::default()
    );
    assert_eq!(reloaded.socket_timeout(), Duration::from_millis(1234));
}

#[test]
fn test_corrupt_state_file_recovers_as_empty() {
    let dir = tempfile::tempdir().expect("tempdir should create");
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{this is not json").expect("seed write should succeed");

    let store = JsonFileStore::open(&path).expect("corrupt file must not fail open");
    assert_eq!(store.get("hosts"), None);

    let mut config = MonitorConfig::new(Arc::new(store) as Arc<dyn KeyValueStore>);
    assert!(
        config.registry().is_empty(),
        "corrupt state must recover as an empty registry"
    );
}

#[test]
fn test_save_leaves_no_temporary_file() {
    let dir = tempfile::tempdir().expect("tempdir should create");
    let store = store_at(&dir);

    store
        .put_many(&[("hosts".to_string(), "{}".to_string())])
        .expect("put should succeed");

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .expect("tempdir should list")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(
        leftovers.is_empty(),
        "atomic write must clean up its temporary file, found {leftovers:?}"
    );
    assert!(dir.path().join("state.json").exists());
}

#[test]
fn test_clear_empties_the_snapshot_on_disk() {
    let dir = tempfile::tempdir().expect("tempdir should create");

    {
        let store = store_at(&dir);
        store
            .put_many(&[("hosts".to_string(), "{}".to_string())])
            .expect("put should succeed");
        store.clear().expect("clear should succeed");
    }

    let reopened = store_at(&dir);
    assert_eq!(
        reopened.get("hosts"),
        None,
        "cleared state must stay cleared after a reopen"
    );
}

#[test]
fn test_put_many_is_visible_as_one_commit() {
    let dir = tempfile::tempdir().expect("tempdir should create");
    let store = store_at(&dir);

    store
        .put_many(&[
            ("socketTimeoutMs".to_string(), "1500".to_string()),
            ("maxAttempts".to_string(), "5".to_string()),
        ])
        .expect("put should succeed");

    let reopened = store_at(&dir);
    assert_eq!(reopened.get("socketTimeoutMs").as_deref(), Some("1500"));
    assert_eq!(reopened.get("maxAttempts").as_deref(), Some("5"));
}
