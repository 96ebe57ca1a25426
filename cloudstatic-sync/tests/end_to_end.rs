use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cloudstatic_core::{config, RemotePath};
use cloudstatic_sync::{
    CloudStatic, JsonManifestBackend, LocalStorage, RecordingObserver, SyncError, SyncEvent,
};
use tempfile::TempDir;

struct Fixture {
    _public: TempDir,
    manifest_dir: TempDir,
    site: TempDir,
    engine: CloudStatic,
}

async fn fixture() -> Fixture {
    let public = TempDir::new().expect("public");
    let manifest_dir = TempDir::new().expect("manifest");
    let site = TempDir::new().expect("site");

    let base_url = format!("file://{}/test-uploadfs", public.path().display());
    let engine = CloudStatic::init(
        Arc::new(LocalStorage::new(public.path().join("test-uploadfs"), base_url)),
        Arc::new(JsonManifestBackend::new(manifest_dir.path())),
        None,
    )
    .await
    .expect("init");

    Fixture {
        _public: public,
        manifest_dir,
        site,
        engine,
    }
}

/// Resolve a `file://` URL the way an HTTP fetch would resolve a public URL.
fn fetch(url: &str) -> Option<String> {
    let path = url.strip_prefix("file://").expect("file url");
    fs::read_to_string(PathBuf::from(path)).ok()
}

fn write_site(dir: &Path) {
    fs::write(dir.join("hello.txt"), "hello").unwrap();
    fs::write(dir.join("goodbye.txt"), "goodbye").unwrap();
    fs::create_dir_all(dir.join("subdir")).unwrap();
    fs::write(dir.join("subdir").join("nested.txt"), "nested").unwrap();
}

fn manifest_keys(dir: &Path) -> Vec<String> {
    let raw = fs::read_to_string(dir.join("cloudStatic.json")).expect("manifest file");
    let json: serde_json::Value = serde_json::from_str(&raw).expect("manifest json");
    json["entries"]
        .as_array()
        .expect("entries")
        .iter()
        .map(|e| e["remote_path"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn sync_update_remove_scenario() {
    let fx = fixture().await;
    write_site(fx.site.path());

    fx.engine
        .sync_folder(fx.site.path(), "/cloud-static-test")
        .await
        .expect("first sync");

    let base = fx.engine.get_url("/cloud-static-test");
    assert_eq!(fetch(&format!("{base}/hello.txt")).as_deref(), Some("hello"));
    assert_eq!(fetch(&format!("{base}/goodbye.txt")).as_deref(), Some("goodbye"));
    assert_eq!(fetch(&format!("{base}/subdir/nested.txt")).as_deref(), Some("nested"));

    fs::remove_file(fx.site.path().join("goodbye.txt")).unwrap();
    fs::write(fx.site.path().join("hello.txt"), "hello2").unwrap();
    let report = fx
        .engine
        .sync_folder(fx.site.path(), "/cloud-static-test")
        .await
        .expect("update sync");
    assert_eq!(
        report.reconcile.removed,
        vec![RemotePath::from("/cloud-static-test/goodbye.txt")]
    );

    assert_eq!(fetch(&format!("{base}/hello.txt")).as_deref(), Some("hello2"));
    assert_eq!(fetch(&format!("{base}/goodbye.txt")), None);
    assert_eq!(fetch(&format!("{base}/subdir/nested.txt")).as_deref(), Some("nested"));
    assert_eq!(
        manifest_keys(fx.manifest_dir.path()),
        vec![
            "/cloud-static-test/hello.txt",
            "/cloud-static-test/subdir/nested.txt"
        ]
    );

    fx.engine
        .remove_folder("/cloud-static-test", &[])
        .await
        .expect("remove folder");

    assert_eq!(fetch(&format!("{base}/hello.txt")), None);
    assert_eq!(fetch(&format!("{base}/goodbye.txt")), None);
    assert_eq!(fetch(&format!("{base}/subdir/nested.txt")), None);
    assert!(manifest_keys(fx.manifest_dir.path()).is_empty());
}

#[tokio::test]
async fn manifest_survives_new_handle() {
    let fx = fixture().await;
    write_site(fx.site.path());
    fx.engine
        .sync_folder(fx.site.path(), "/site")
        .await
        .expect("sync");

    // A fresh handle over the same backends sees the persisted manifest.
    let public = fx.engine.get_url("");
    let root = PathBuf::from(public.strip_prefix("file://").unwrap());
    let observer = Arc::new(RecordingObserver::new());
    let second = CloudStatic::builder()
        .storage(Arc::new(LocalStorage::new(&root, public.clone())))
        .manifest(Arc::new(JsonManifestBackend::new(fx.manifest_dir.path())))
        .observer(observer.clone())
        .init()
        .await
        .expect("second init");

    let report = second.remove_folder("/site", &[]).await.expect("remove");
    assert_eq!(report.removed.len(), 3);
    let forgotten = observer
        .events()
        .iter()
        .filter(|e| matches!(e, SyncEvent::Forgotten { .. }))
        .count();
    assert_eq!(forgotten, 3);
    assert!(!root.join("site").join("hello.txt").exists());
}

#[tokio::test]
async fn externally_deleted_object_is_reconciled() {
    let fx = fixture().await;
    write_site(fx.site.path());
    fx.engine
        .sync_folder(fx.site.path(), "/site")
        .await
        .expect("sync");

    let goodbye_url = fx.engine.get_url("/site/goodbye.txt");
    fs::remove_file(goodbye_url.strip_prefix("file://").unwrap()).unwrap();
    fs::remove_file(fx.site.path().join("goodbye.txt")).unwrap();

    let report = fx
        .engine
        .sync_folder(fx.site.path(), "/site")
        .await
        .expect("already-absent object must not fail the sync");
    assert_eq!(
        report.reconcile.already_absent,
        vec![RemotePath::from("/site/goodbye.txt")]
    );
    assert!(!manifest_keys(fx.manifest_dir.path()).contains(&"/site/goodbye.txt".to_string()));
}

#[tokio::test]
async fn from_config_wires_local_backends() {
    let home = TempDir::new().expect("home");
    let site = TempDir::new().expect("site");
    write_site(site.path());

    let public = home.path().join("public");
    let cfg = config::init_at(
        home.path(),
        public.clone(),
        "http://localhost:7901/uploads",
        None,
    )
    .expect("config init");

    let engine = CloudStatic::from_config(&cfg).await.expect("from_config");
    engine.sync_folder(site.path(), "/docs").await.expect("sync");

    assert_eq!(
        fs::read_to_string(public.join("docs").join("hello.txt")).unwrap(),
        "hello"
    );
    assert!(config::default_manifest_dir_at(home.path())
        .join("cloudStatic.json")
        .exists());
    assert_eq!(
        engine.get_url("/docs/hello.txt"),
        "http://localhost:7901/uploads/docs/hello.txt"
    );
}

#[tokio::test]
async fn missing_local_folder_is_enumeration_error() {
    let fx = fixture().await;
    let err = fx
        .engine
        .sync_folder(fx.site.path().join("does-not-exist"), "/site")
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Enumeration { .. }), "got: {err}");
    assert!(err.to_string().contains("does-not-exist"));
}

#[tokio::test]
async fn directory_replaced_by_file_syncs_after_folder_is_removed() {
    let fx = fixture().await;
    let sub = fx.site.path().join("sub");
    fs::create_dir_all(&sub).unwrap();
    fs::write(sub.join("x"), "x").unwrap();
    fs::write(fx.site.path().join("index.html"), "index").unwrap();
    fx.engine
        .sync_folder(fx.site.path(), "/site")
        .await
        .expect("first sync");

    fx.engine
        .remove_folder("/site", &[])
        .await
        .expect("remove folder");
    let site_dir = PathBuf::from(
        fx.engine
            .get_url("/site")
            .strip_prefix("file://")
            .unwrap()
            .to_owned(),
    );
    assert!(!site_dir.join("sub").exists(), "emptied directories are pruned");

    fs::remove_dir_all(&sub).unwrap();
    fs::write(&sub, "now a file").unwrap();
    let report = fx
        .engine
        .sync_folder(fx.site.path(), "/site")
        .await
        .expect("a path that used to be a directory can hold an object");

    assert_eq!(report.copied.len(), 2);
    assert_eq!(
        fetch(&fx.engine.get_url("/site/sub")).as_deref(),
        Some("now a file")
    );
}

#[tokio::test]
async fn directory_replaced_by_file_recovers_on_retry() {
    let fx = fixture().await;
    let sub = fx.site.path().join("sub");
    fs::create_dir_all(&sub).unwrap();
    fs::write(sub.join("x"), "x").unwrap();
    fx.engine
        .sync_folder(fx.site.path(), "/site")
        .await
        .expect("first sync");

    fs::remove_dir_all(&sub).unwrap();
    fs::write(&sub, "now a file").unwrap();
    fs::write(fx.site.path().join("other.txt"), "other").unwrap();

    // The stale object under `sub/` still occupies the path.
    let err = fx
        .engine
        .sync_folder(fx.site.path(), "/site")
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Transfer { failed: 1, total: 2, .. }), "got: {err}");
    assert!(manifest_keys(fx.manifest_dir.path()).contains(&"/site/other.txt".to_string()));

    // Purging everything but the new object clears the way for a clean retry.
    fx.engine
        .remove_folder("/site", &[RemotePath::from("/site/other.txt")])
        .await
        .expect("remove stale objects");
    let report = fx
        .engine
        .sync_folder(fx.site.path(), "/site")
        .await
        .expect("retry converges");

    assert!(report.reconcile.removed.is_empty());
    assert_eq!(
        manifest_keys(fx.manifest_dir.path()),
        vec!["/site/other.txt", "/site/sub"]
    );
    assert_eq!(
        fetch(&fx.engine.get_url("/site/sub")).as_deref(),
        Some("now a file")
    );
}
