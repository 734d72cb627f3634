//! The tree engine end to end over PostgreSQL.

use treehub_core::error::ErrorKind;
use treehub_database::TreeStore;
use treehub_service::CreateFileInput;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_move_rewrites_every_descendant() {
    let Some(app) = TestApp::new().await else { return };
    let root = &app.root;
    let a = app.mkdir("A", root).await;
    let b = app.mkdir("B", &a).await;
    let c = app.mkdir("C", root).await;
    let d = app.mkdir("D", &b).await;

    let (file, _) = app
        .services
        .files
        .create_file(CreateFileInput {
            name: "deep.txt".into(),
            directory_id: d.id,
            mime_type: String::new(),
            size: 5,
            key: None,
        })
        .await
        .unwrap();

    let moved = app.services.directories.move_directory(a.id, c.id).await.unwrap();
    assert_eq!(moved.ancestors, vec![root.id, c.id]);

    let b = app.store.find_directory(b.id).await.unwrap().unwrap();
    let d = app.store.find_directory(d.id).await.unwrap().unwrap();
    let file = app.store.find_file(file.id).await.unwrap().unwrap();
    assert_eq!(b.ancestors, vec![root.id, c.id, a.id]);
    assert_eq!(d.ancestors, vec![root.id, c.id, a.id, b.id]);
    assert_eq!(file.ancestors, vec![root.id, c.id, a.id, b.id, d.id]);

    let under_c = app.store.descendant_directories(c.id).await.unwrap();
    assert_eq!(under_c.len(), 3);
}

#[tokio::test]
async fn test_move_into_own_subtree_is_rejected() {
    let Some(app) = TestApp::new().await else { return };
    let a = app.mkdir("A", &app.root).await;
    let b = app.mkdir("B", &a).await;

    let err = app.services.directories.move_directory(a.id, b.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidTarget);
}

#[tokio::test]
async fn test_delete_directory_cascades() {
    let Some(app) = TestApp::new().await else { return };
    let a = app.mkdir("A", &app.root).await;
    let b = app.mkdir("B", &a).await;
    let keep = app.mkdir("keep", &app.root).await;

    for (name, dir) in [("one.txt", &a), ("two.txt", &b)] {
        app.services
            .files
            .create_file(CreateFileInput {
                name: name.into(),
                directory_id: dir.id,
                mime_type: String::new(),
                size: 1,
                key: None,
            })
            .await
            .unwrap();
    }

    assert!(app.services.directories.delete_directory(a.id).await.unwrap());
    assert!(app.store.find_directory(a.id).await.unwrap().is_none());
    assert!(app.store.find_directory(b.id).await.unwrap().is_none());
    assert!(app.store.find_directory(keep.id).await.unwrap().is_some());
    assert!(app.store.descendant_files(app.root.id).await.unwrap().is_empty());
    assert!(app.store.pending_blob_deletions(10, 10).await.unwrap().is_empty());
}
