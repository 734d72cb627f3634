//! Files, versions and download URLs.

mod common;

use std::time::Duration;

use treehub_core::error::ErrorKind;
use treehub_core::types::PageRequest;
use treehub_service::{CreateFileInput, CreateVersionInput};
use uuid::Uuid;

use common::harness;

#[tokio::test]
async fn test_create_file_returns_upload_url() {
    let h = harness().await;
    let (file, url) = h
        .services
        .files
        .create_file(CreateFileInput {
            name: "photo.PNG".into(),
            directory_id: h.root.id,
            mime_type: String::new(),
            size: 2048,
            key: None,
        })
        .await
        .unwrap();

    assert_eq!(file.ancestors, vec![h.root.id]);
    assert!(url.starts_with("memory://put/"));
    assert!(url.ends_with(".png"));

    let versions = h.services.versions.get_file_versions(file.id, None).await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].mime_type, "image/png");
    assert_eq!(versions[0].size, 2048);
}

#[tokio::test]
async fn test_create_file_keeps_given_key() {
    let h = harness().await;
    let (file, url) = h
        .services
        .files
        .create_file(CreateFileInput {
            name: "a.txt".into(),
            directory_id: h.root.id,
            mime_type: "text/plain".into(),
            size: 1,
            key: Some("uploads/a.txt".into()),
        })
        .await
        .unwrap();
    assert_eq!(url, "memory://put/uploads/a.txt");
    let versions = h.services.versions.get_file_versions(file.id, None).await.unwrap();
    assert_eq!(versions[0].key, "uploads/a.txt");
}

#[tokio::test]
async fn test_create_file_validation() {
    let h = harness().await;
    let files = &h.services.files;
    let input = |directory_id, size, name: &str| CreateFileInput {
        name: name.into(),
        directory_id,
        mime_type: String::new(),
        size,
        key: None,
    };

    assert_eq!(
        files.create_file(input(Uuid::new_v4(), 1, "x")).await.unwrap_err().kind,
        ErrorKind::NotFound
    );
    assert_eq!(
        files.create_file(input(h.root.id, -1, "x")).await.unwrap_err().kind,
        ErrorKind::Validation
    );
    assert_eq!(
        files.create_file(input(h.root.id, 1, " ")).await.unwrap_err().kind,
        ErrorKind::Validation
    );
}

#[tokio::test]
async fn test_move_and_rename_file() {
    let h = harness().await;
    let a = h.mkdir("a", h.root.id).await;
    let b = h.mkdir("b", a.id).await;
    let f = h.touch("draft.md", h.root.id, 3).await;

    let moved = h.services.files.move_file(f.id, b.id).await.unwrap();
    assert_eq!(moved.directory_id, b.id);
    assert_eq!(moved.ancestors, vec![h.root.id, a.id, b.id]);

    let renamed = h.services.files.rename_file(f.id, "final.md").await.unwrap();
    assert_eq!(renamed.name, "final.md");
    assert_eq!(renamed.ancestors, moved.ancestors);

    assert_eq!(
        h.services.files.move_file(f.id, Uuid::new_v4()).await.unwrap_err().kind,
        ErrorKind::NotFound
    );
    assert_eq!(
        h.services.files.rename_file(Uuid::new_v4(), "x").await.unwrap_err().kind,
        ErrorKind::NotFound
    );
    h.assert_chains_consistent().await;
}

#[tokio::test]
async fn test_delete_file_removes_versions_and_blobs() {
    let h = harness().await;
    let f = h.touch("a.txt", h.root.id, 1).await;
    for size in [2, 3] {
        h.services
            .versions
            .create_file_version(CreateVersionInput {
                file_id: f.id,
                name: String::new(),
                mime_type: String::new(),
                size,
                key: None,
            })
            .await
            .unwrap();
    }

    assert!(h.services.files.delete_file(f.id).await.unwrap());
    assert!(h.services.files.get_file(f.id).await.unwrap().is_none());
    assert!(h.services.versions.get_file_versions(f.id, None).await.unwrap().is_empty());
    assert_eq!(h.blobs.deleted().len(), 3);
    assert_eq!(
        h.services.files.delete_file(f.id).await.unwrap_err().kind,
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn test_versions_newest_first_and_paginated() {
    let h = harness().await;
    let f = h.touch("log.txt", h.root.id, 1).await;
    for size in 2..=5 {
        tokio::time::sleep(Duration::from_millis(5)).await;
        h.services
            .versions
            .create_file_version(CreateVersionInput {
                file_id: f.id,
                name: format!("log-{size}.txt"),
                mime_type: String::new(),
                size,
                key: None,
            })
            .await
            .unwrap();
    }

    let versions = &h.services.versions;
    let first = versions
        .get_file_versions(f.id, Some(PageRequest::new(1, 2)))
        .await
        .unwrap();
    let sizes: Vec<i64> = first.iter().map(|v| v.size).collect();
    assert_eq!(sizes, vec![5, 4]);

    let last = versions
        .get_file_versions(f.id, Some(PageRequest::new(3, 2)))
        .await
        .unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].size, 1);

    let fetched = versions.get_file_version(first[0].id).await.unwrap().unwrap();
    assert_eq!(fetched.name, "log-5.txt");
}

#[tokio::test]
async fn test_version_for_missing_file() {
    let h = harness().await;
    let err = h
        .services
        .versions
        .create_file_version(CreateVersionInput {
            file_id: Uuid::new_v4(),
            name: "x".into(),
            mime_type: String::new(),
            size: 1,
            key: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_request_download() {
    let h = harness().await;
    let url = h
        .services
        .versions
        .request_file_download("abc.bin")
        .await
        .unwrap();
    assert_eq!(url, "memory://get/abc.bin");
    assert!(h.services.versions.request_file_download("../x").await.is_err());
}
