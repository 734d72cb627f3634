//! Directory maintenance: chains, moves, reserved names and deletes.

mod common;

use std::sync::Arc;

use treehub_core::config::TreeConfig;
use treehub_core::error::ErrorKind;
use treehub_service::CreateVersionInput;
use uuid::Uuid;

use common::{harness, harness_with};

#[tokio::test]
async fn test_create_computes_chains() {
    let h = harness().await;
    let a = h.mkdir("A", h.root.id).await;
    let b = h.mkdir("B", a.id).await;
    let f = h.touch("b.txt", b.id, 1).await;

    assert!(h.root.ancestors.is_empty());
    assert_eq!(a.ancestors, vec![h.root.id]);
    assert_eq!(b.ancestors, vec![h.root.id, a.id]);
    assert_eq!(f.ancestors, vec![h.root.id, a.id, b.id]);
    h.assert_chains_consistent().await;
}

#[tokio::test]
async fn test_get_directory_is_stable() {
    let h = harness().await;
    let a = h.mkdir("A", h.root.id).await;
    let first = h.services.directories.get_directory(a.id).await.unwrap();
    let second = h.services.directories.get_directory(a.id).await.unwrap();
    assert_eq!(first, second);
    assert!(h.services.directories.get_directory(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_under_missing_parent() {
    let h = harness().await;
    let err = h
        .services
        .directories
        .create_directory("orphan", Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_move_rewrites_subtree() {
    let h = harness().await;
    let r = h.root.id;
    let a = h.mkdir("A", r).await;
    let b = h.mkdir("B", a.id).await;
    let c = h.mkdir("C", r).await;
    let deep = h.mkdir("D", b.id).await;
    let f = h.touch("deep.txt", deep.id, 4).await;

    let moved = h.services.directories.move_directory(a.id, c.id).await.unwrap();

    assert_eq!(moved.ancestors, vec![r, c.id]);
    assert_eq!(moved.parent_id, Some(c.id));
    assert_eq!(h.dir(b.id).await.ancestors, vec![r, c.id, a.id]);
    assert_eq!(h.dir(deep.id).await.ancestors, vec![r, c.id, a.id, b.id]);
    let f = h.services.files.get_file(f.id).await.unwrap().unwrap();
    assert_eq!(f.ancestors, vec![r, c.id, a.id, b.id, deep.id]);
    h.assert_chains_consistent().await;
}

#[tokio::test]
async fn test_move_back_up_shortens_chains() {
    let h = harness().await;
    let r = h.root.id;
    let a = h.mkdir("A", r).await;
    let b = h.mkdir("B", a.id).await;
    let s = h.mkdir("S", b.id).await;
    let t = h.mkdir("T", s.id).await;

    h.services.directories.move_directory(s.id, r).await.unwrap();

    assert_eq!(h.dir(s.id).await.ancestors, vec![r]);
    assert_eq!(h.dir(t.id).await.ancestors, vec![r, s.id]);
    h.assert_chains_consistent().await;
}

#[tokio::test]
async fn test_move_rejects_cycles() {
    let h = harness().await;
    let a = h.mkdir("A", h.root.id).await;
    let b = h.mkdir("B", a.id).await;
    let dirs = &h.services.directories;

    assert_eq!(dirs.move_directory(a.id, b.id).await.unwrap_err().kind, ErrorKind::InvalidTarget);
    assert_eq!(dirs.move_directory(a.id, a.id).await.unwrap_err().kind, ErrorKind::InvalidTarget);
    assert_eq!(
        dirs.move_directory(h.root.id, a.id).await.unwrap_err().kind,
        ErrorKind::InvalidTarget
    );
    assert_eq!(
        dirs.move_directory(a.id, Uuid::new_v4()).await.unwrap_err().kind,
        ErrorKind::NotFound
    );
    assert_eq!(h.dir(a.id).await.ancestors, vec![h.root.id]);
}

#[tokio::test]
async fn test_reserved_root_name() {
    let h = harness().await;
    let a = h.mkdir("A", h.root.id).await;
    let dirs = &h.services.directories;

    for name in ["root", "ROOT", "Root"] {
        assert_eq!(
            dirs.create_directory(name, h.root.id).await.unwrap_err().kind,
            ErrorKind::ReservedName
        );
        assert_eq!(dirs.rename_directory(a.id, name).await.unwrap_err().kind, ErrorKind::ReservedName);
    }
    assert_eq!(
        dirs.rename_directory(h.root.id, "home").await.unwrap_err().kind,
        ErrorKind::ReservedName
    );
    assert_eq!(dirs.delete_directory(h.root.id).await.unwrap_err().kind, ErrorKind::ReservedName);
    assert_eq!(
        dirs.rename_directory(Uuid::new_v4(), "x").await.unwrap_err().kind,
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn test_rename_leaves_chains_alone() {
    let h = harness().await;
    let a = h.mkdir("A", h.root.id).await;
    let b = h.mkdir("B", a.id).await;

    let renamed = h.services.directories.rename_directory(a.id, "Archive").await.unwrap();
    assert_eq!(renamed.name, "Archive");
    assert_eq!(renamed.ancestors, a.ancestors);
    assert_eq!(h.dir(b.id).await.ancestors, b.ancestors);
}

#[tokio::test]
async fn test_delete_cascades_rows_and_blobs() {
    let h = harness().await;
    let a = h.mkdir("A", h.root.id).await;
    let b = h.mkdir("B", a.id).await;
    let f1 = h.touch("one.txt", a.id, 10).await;
    let f2 = h.touch("two.txt", b.id, 20).await;
    h.services
        .versions
        .create_file_version(CreateVersionInput {
            file_id: f2.id,
            name: String::new(),
            mime_type: String::new(),
            size: 25,
            key: None,
        })
        .await
        .unwrap();
    let keep = h.touch("keep.txt", h.root.id, 1).await;

    assert!(h.services.directories.delete_directory(a.id).await.unwrap());

    assert!(h.services.directories.get_directory(a.id).await.unwrap().is_none());
    assert!(h.services.directories.get_directory(b.id).await.unwrap().is_none());
    assert!(h.services.files.get_file(f1.id).await.unwrap().is_none());
    assert!(h.services.files.get_file(f2.id).await.unwrap().is_none());
    assert!(h.services.files.get_file(keep.id).await.unwrap().is_some());
    assert_eq!(h.blobs.deleted().len(), 3);
    assert_eq!(h.store.pending_len().await, 0);

    let err = h.services.directories.delete_directory(a.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_failed_blob_deletes_are_reaped_later() {
    let h = harness().await;
    let a = h.mkdir("A", h.root.id).await;
    h.touch("x.bin", a.id, 1).await;
    h.touch("y.bin", a.id, 1).await;

    h.blobs.set_failing(true);
    assert!(h.services.directories.delete_directory(a.id).await.unwrap());
    assert!(h.blobs.deleted().is_empty());
    assert_eq!(h.store.pending_len().await, 2);

    h.blobs.set_failing(false);
    let report = h.services.reclaimer.drain(100, 10).await.unwrap();
    assert_eq!(report.deleted, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(h.store.pending_len().await, 0);
    assert_eq!(h.blobs.deleted().len(), 2);
}

#[tokio::test]
async fn test_cascade_limit() {
    let h = harness_with(TreeConfig {
        max_cascade_rows: 3,
        ..TreeConfig::default()
    })
    .await;
    let a = h.mkdir("A", h.root.id).await;
    let c = h.mkdir("C", h.root.id).await;
    for i in 0..3 {
        h.touch(&format!("f{i}"), a.id, 1).await;
    }

    let err = h.services.directories.move_directory(a.id, c.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(h.dir(a.id).await.parent_id, Some(h.root.id));

    let err = h.services.directories.delete_directory(a.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    assert!(h.services.directories.delete_directory(c.id).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_crossing_moves_cannot_form_a_cycle() {
    for _ in 0..20 {
        let h = Arc::new(harness().await);
        let a = h.mkdir("A", h.root.id).await;
        let b = h.mkdir("B", h.root.id).await;
        h.mkdir("under-a", a.id).await;
        h.mkdir("under-b", b.id).await;

        let h1 = Arc::clone(&h);
        let h2 = Arc::clone(&h);
        let first = tokio::spawn(async move { h1.services.directories.move_directory(a.id, b.id).await });
        let second = tokio::spawn(async move { h2.services.directories.move_directory(b.id, a.id).await });
        let (first, second) = (first.await.unwrap(), second.await.unwrap());

        assert!(first.is_ok() != second.is_ok(), "exactly one move must win");
        let loser = first.err().or(second.err()).unwrap();
        assert_eq!(loser.kind, ErrorKind::InvalidTarget);
        h.assert_chains_consistent().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_moves_keep_chains_consistent() {
    let h = Arc::new(
        harness_with(TreeConfig {
            max_move_retries: 16,
            ..TreeConfig::default()
        })
        .await,
    );
    let mut dirs = Vec::new();
    for i in 0..6 {
        let d = h.mkdir(&format!("d{i}"), h.root.id).await;
        h.mkdir(&format!("d{i}-child"), d.id).await;
        h.touch(&format!("d{i}.txt"), d.id, 1).await;
        dirs.push(d.id);
    }

    let mut tasks = Vec::new();
    for i in 0..dirs.len() {
        let h = Arc::clone(&h);
        let (source, target) = (dirs[i], dirs[(i + 1) % dirs.len()]);
        tasks.push(tokio::spawn(async move {
            h.services.directories.move_directory(source, target).await
        }));
    }
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => {}
            Err(e) => assert_eq!(e.kind, ErrorKind::InvalidTarget),
        }
    }
    h.assert_chains_consistent().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_move_racing_ancestor_delete() {
    for _ in 0..20 {
        let h = Arc::new(harness().await);
        let a = h.mkdir("A", h.root.id).await;
        let mid = h.mkdir("mid", a.id).await;
        let x = h.mkdir("X", mid.id).await;
        let x_child = h.mkdir("X-child", x.id).await;
        h.touch("x.txt", x.id, 3).await;
        h.touch("deep.txt", x_child.id, 4).await;
        let t = h.mkdir("T", h.root.id).await;
        let (a_id, x_id, t_id) = (a.id, x.id, t.id);

        let h1 = Arc::clone(&h);
        let h2 = Arc::clone(&h);
        let moving = tokio::spawn(async move { h1.services.directories.move_directory(x_id, t_id).await });
        let deleting = tokio::spawn(async move { h2.services.directories.delete_directory(a_id).await });
        let (moved, deleted) = (moving.await.unwrap(), deleting.await.unwrap());

        assert!(deleted.unwrap());
        match moved {
            Ok(_) => {
                let x_now = h.dir(x.id).await;
                assert_eq!(x_now.parent_id, Some(t.id));
                assert_eq!(h.dir(x_child.id).await.ancestors, x_now.child_ancestors());
            }
            Err(e) => {
                assert!(matches!(e.kind, ErrorKind::NotFound | ErrorKind::Conflict));
                assert!(h.services.directories.get_directory(x.id).await.unwrap().is_none());
                assert!(h.services.directories.get_directory(x_child.id).await.unwrap().is_none());
            }
        }
        h.assert_chains_consistent().await;
        h.assert_files_have_versions().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_file_moves_racing_directory_delete() {
    for _ in 0..20 {
        let h = Arc::new(harness().await);
        let a = h.mkdir("A", h.root.id).await;
        let sub = h.mkdir("sub", a.id).await;
        let t = h.mkdir("T", h.root.id).await;
        let leaving = h.touch("leaving.txt", sub.id, 5).await;
        let arriving = h.touch("arriving.txt", t.id, 6).await;
        let (a_id, sub_id, t_id) = (a.id, sub.id, t.id);
        let (leaving_id, arriving_id) = (leaving.id, arriving.id);

        let (h1, h2, h3) = (Arc::clone(&h), Arc::clone(&h), Arc::clone(&h));
        let out = tokio::spawn(async move { h1.services.files.move_file(leaving_id, t_id).await });
        let into = tokio::spawn(async move { h2.services.files.move_file(arriving_id, sub_id).await });
        let deleting = tokio::spawn(async move { h3.services.directories.delete_directory(a_id).await });
        let (out, into, deleted) = (out.await.unwrap(), into.await.unwrap(), deleting.await.unwrap());

        assert!(deleted.unwrap());
        for (file_id, result) in [(leaving.id, out), (arriving.id, into)] {
            let stored = h.services.files.get_file(file_id).await.unwrap();
            match result {
                Ok(moved) if moved.directory_id == t.id => {
                    assert_eq!(stored.map(|f| f.directory_id), Some(t.id));
                }
                // Moved into the subtree before it was deleted.
                Ok(_) => assert!(stored.is_none()),
                Err(e) => {
                    assert!(matches!(e.kind, ErrorKind::NotFound | ErrorKind::Conflict));
                    if let Some(file) = stored {
                        assert_ne!(file.directory_id, sub.id);
                    }
                }
            }
        }
        h.assert_chains_consistent().await;
        h.assert_files_have_versions().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_version_upload_racing_directory_delete() {
    for _ in 0..20 {
        let h = Arc::new(harness().await);
        let a = h.mkdir("A", h.root.id).await;
        let file = h.touch("report.txt", a.id, 1).await;
        let (a_id, file_id) = (a.id, file.id);

        let (h1, h2) = (Arc::clone(&h), Arc::clone(&h));
        let upload = tokio::spawn(async move {
            h1.services
                .versions
                .create_file_version(CreateVersionInput {
                    file_id,
                    name: String::new(),
                    mime_type: String::new(),
                    size: 2,
                    key: None,
                })
                .await
        });
        let deleting = tokio::spawn(async move { h2.services.directories.delete_directory(a_id).await });
        let (upload, deleted) = (upload.await.unwrap(), deleting.await.unwrap());

        assert!(deleted.unwrap());
        assert!(h.services.files.get_file(file.id).await.unwrap().is_none());
        match upload {
            // A version that landed first went down with the subtree.
            Ok((version, _)) => {
                assert!(h.services.versions.get_file_version(version.id).await.unwrap().is_none());
                assert!(h.blobs.deleted().contains(&version.key));
            }
            Err(e) => assert_eq!(e.kind, ErrorKind::NotFound),
        }
        h.assert_chains_consistent().await;
    }
}

#[tokio::test]
async fn test_breadcrumbs_and_tree() {
    let h = harness().await;
    let a = h.mkdir("A", h.root.id).await;
    let b = h.mkdir("B", a.id).await;
    let z = h.mkdir("Z", a.id).await;
    h.touch("in-b.txt", b.id, 1).await;
    h.touch("in-b2.txt", b.id, 1).await;

    let crumbs = h.services.directories.get_breadcrumbs(b.id).await.unwrap();
    let names: Vec<&str> = crumbs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["root", "A", "B"]);

    let tree = h.services.directories.get_directory_tree(a.id).await.unwrap();
    assert_eq!(tree.total_directories(), 3);
    assert_eq!(tree.children.len(), 2);
    assert_eq!(tree.children[0].id, b.id);
    assert_eq!(tree.children[0].file_count, 2);
    assert_eq!(tree.children[1].id, z.id);
    assert_eq!(tree.children[1].depth, 2);
}

#[tokio::test]
async fn test_children_search_and_listing() {
    let h = harness().await;
    let photos = h.mkdir("Photos", h.root.id).await;
    h.mkdir("photo-raw", photos.id).await;
    h.mkdir("Docs", h.root.id).await;
    h.touch("top.txt", h.root.id, 1).await;

    let children = h.services.directories.get_directory_children(h.root.id).await.unwrap();
    assert_eq!(children.directories.len(), 2);
    assert_eq!(children.files.len(), 1);

    let found = h.services.directories.find_directories("photo").await.unwrap();
    assert_eq!(found.len(), 2);

    let all = h.services.directories.list_directories().await.unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(h.services.directories.get_root().await.unwrap().id, h.root.id);
    assert_eq!(h.services.directories.ensure_root().await.unwrap().id, h.root.id);
}
