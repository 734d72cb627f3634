//! Store-level behavior specific to the SQL implementation.

use treehub_core::error::ErrorKind;
use treehub_database::{MoveBatch, TreeStore};
use treehub_entity::{Directory, File, FileVersion};
use uuid::Uuid;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_root_is_unique() {
    let Some(app) = TestApp::new().await else { return };

    let again = app.store.insert_root(&Directory::root()).await.unwrap();
    assert_eq!(again.id, app.root.id);
    assert_eq!(app.store.list_directories().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_insert_ignores_caller_chain() {
    let Some(app) = TestApp::new().await else { return };
    let a = app.mkdir("a", &app.root).await;

    let mut forged = Directory::new_child("b", &a);
    forged.ancestors = vec![Uuid::new_v4(), Uuid::new_v4()];
    let b = app.store.insert_directory(&forged).await.unwrap().unwrap();
    assert_eq!(b.ancestors, vec![app.root.id, a.id]);

    let orphan = Directory::new_child("c", &Directory::root());
    assert!(app.store.insert_directory(&orphan).await.unwrap().is_none());
}

#[tokio::test]
async fn test_stale_move_batch_is_rejected() {
    let Some(app) = TestApp::new().await else { return };
    let a = app.mkdir("a", &app.root).await;
    let c = app.mkdir("c", &app.root).await;

    let batch = MoveBatch {
        directory_id: a.id,
        parent_id: c.id,
        expected: vec![Uuid::new_v4()],
        ancestors: c.child_ancestors(),
        descendants: Vec::new(),
    };
    let err = app.store.apply_move(&batch).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let unchanged = app.store.find_directory(a.id).await.unwrap().unwrap();
    assert_eq!(unchanged.parent_id, Some(app.root.id));
}

#[tokio::test]
async fn test_search_escapes_wildcards() {
    let Some(app) = TestApp::new().await else { return };
    app.mkdir("100%_done", &app.root).await;
    app.mkdir("100 done", &app.root).await;

    let found = app.store.search_directories("%_").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "100%_done");

    let found = app.store.search_directories("DONE").await.unwrap();
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn test_current_version_and_sizes() {
    let Some(app) = TestApp::new().await else { return };
    let a = app.mkdir("a", &app.root).await;

    let file = File::new_in("f.bin", &a);
    let first = FileVersion::new(file.id, "f.bin", "application/octet-stream", 100, "v1.bin");
    app.store.insert_file(&file, &first).await.unwrap().unwrap();

    let mut second = FileVersion::new(file.id, "f.bin", "application/octet-stream", 30, "v2.bin");
    second.created_at = first.created_at + chrono::Duration::seconds(1);
    app.store.insert_version(&second).await.unwrap().unwrap();

    let current = app.store.current_versions(&[file.id]).await.unwrap();
    assert_eq!(current[&file.id].key, "v2.bin");

    assert_eq!(app.store.sum_version_sizes(a.id).await.unwrap(), Some(130));
    assert_eq!(app.store.sum_current_version_sizes(a.id).await.unwrap(), Some(30));
    assert_eq!(app.store.count_descendants(a.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_outbox_round_trip() {
    let Some(app) = TestApp::new().await else { return };

    let file = File::new_in("x", &app.root);
    let version = FileVersion::new(file.id, "x", "text/plain", 1, "x.key");
    app.store.insert_file(&file, &version).await.unwrap().unwrap();

    let deletion = app.store.delete_file(file.id).await.unwrap().unwrap();
    assert_eq!(deletion.blob_keys, vec!["x.key".to_string()]);

    app.store.record_blob_failure("x.key", "unreachable").await.unwrap();
    let pending = app.store.pending_blob_deletions(10, 5).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].attempts, 1);
    assert!(app.store.pending_blob_deletions(10, 1).await.unwrap().is_empty());

    assert_eq!(app.store.ack_blob_deletions(&["x.key".to_string()]).await.unwrap(), 1);
    assert!(app.store.pending_blob_deletions(10, 5).await.unwrap().is_empty());
}
