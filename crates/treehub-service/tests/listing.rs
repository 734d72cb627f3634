//! Subtree listings and aggregates.

mod common;

use std::time::Duration;

use treehub_core::types::{ContentSort, ContentSortField, PageRequest, SortDirection};
use treehub_entity::ContentKind;
use treehub_service::CreateVersionInput;
use uuid::Uuid;

use common::harness;

#[tokio::test]
async fn test_contents_cover_the_whole_subtree() {
    let h = harness().await;
    let a = h.mkdir("a", h.root.id).await;
    let b = h.mkdir("b", a.id).await;
    h.touch("deep.txt", b.id, 7).await;
    h.touch("outside.txt", h.root.id, 1).await;

    let rows = h
        .services
        .contents
        .get_directory_contents(a.id, None, None)
        .await
        .unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["b", "deep.txt"]);

    let dir_row = &rows[0];
    assert_eq!(dir_row.kind, ContentKind::Directory);
    assert_eq!((dir_row.size, dir_row.mime_type.as_str(), dir_row.key.as_str()), (0, "", ""));
    assert_eq!(rows[1].size, 7);
    assert_eq!(rows[1].mime_type, "text/plain");
}

#[tokio::test]
async fn test_file_rows_use_latest_version() {
    let h = harness().await;
    let f = h.touch("report.pdf", h.root.id, 100).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let (latest, _) = h
        .services
        .versions
        .create_file_version(CreateVersionInput {
            file_id: f.id,
            name: String::new(),
            mime_type: "application/pdf".into(),
            size: 250,
            key: Some("report-v2.pdf".into()),
        })
        .await
        .unwrap();

    let rows = h
        .services
        .contents
        .get_directory_contents(h.root.id, None, None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].size, 250);
    assert_eq!(rows[0].key, latest.key);
}

#[tokio::test]
async fn test_pagination_slices_sorted_rows() {
    let h = harness().await;
    let bucket = h.mkdir("bucket", h.root.id).await;
    for i in 1..=25 {
        h.touch(&format!("file-{i:02}"), bucket.id, i).await;
    }
    let contents = &h.services.contents;

    let page2 = contents
        .get_directory_contents(bucket.id, Some(PageRequest::new(2, 10)), None)
        .await
        .unwrap();
    let names: Vec<String> = page2.iter().map(|r| r.name.clone()).collect();
    let expected: Vec<String> = (11..=20).map(|i| format!("file-{i:02}")).collect();
    assert_eq!(names, expected);

    let page3 = contents
        .get_directory_contents(bucket.id, Some(PageRequest::new(3, 10)), None)
        .await
        .unwrap();
    assert_eq!(page3.len(), 5);
    assert_eq!(page3[4].name, "file-25");

    let page4 = contents
        .get_directory_contents(bucket.id, Some(PageRequest::new(4, 10)), None)
        .await
        .unwrap();
    assert!(page4.is_empty());

    let default_page = contents
        .get_directory_contents(bucket.id, None, None)
        .await
        .unwrap();
    assert_eq!(default_page.len(), 20);
}

#[tokio::test]
async fn test_sort_by_name_merges_kinds() {
    let h = harness().await;
    h.mkdir("beta", h.root.id).await;
    h.touch("alpha.txt", h.root.id, 1).await;
    h.mkdir("delta", h.root.id).await;
    h.touch("gamma.txt", h.root.id, 1).await;

    for direction in [SortDirection::Asc, SortDirection::Desc] {
        let rows = h
            .services
            .contents
            .get_directory_contents(
                h.root.id,
                None,
                Some(ContentSort::new(ContentSortField::Name, direction)),
            )
            .await
            .unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alpha.txt", "beta", "delta", "gamma.txt"]);
    }
}

#[tokio::test]
async fn test_sort_by_size_puts_directories_first() {
    let h = harness().await;
    h.mkdir("b-dir", h.root.id).await;
    h.mkdir("a-dir", h.root.id).await;
    h.touch("large", h.root.id, 900).await;
    h.touch("small", h.root.id, 9).await;

    let rows = h
        .services
        .contents
        .get_directory_contents(
            h.root.id,
            None,
            Some(ContentSort::new(ContentSortField::Size, SortDirection::Desc)),
        )
        .await
        .unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["b-dir", "a-dir", "small", "large"]);
}

#[tokio::test]
async fn test_unknown_directory_yields_empty_results() {
    let h = harness().await;
    let missing = Uuid::new_v4();
    assert!(
        h.services
            .contents
            .get_directory_contents(missing, None, None)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(h.services.aggregates.count_directory_children(missing).await.unwrap(), 0);
    assert_eq!(h.services.aggregates.get_directory_size(missing).await.unwrap(), None);
}

#[tokio::test]
async fn test_count_and_sizes() {
    let h = harness().await;
    let a = h.mkdir("a", h.root.id).await;
    let empty = h.mkdir("empty", a.id).await;
    let f = h.touch("f.bin", a.id, 100).await;
    h.touch("g.bin", empty.id, 5).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    h.services
        .versions
        .create_file_version(CreateVersionInput {
            file_id: f.id,
            name: String::new(),
            mime_type: String::new(),
            size: 30,
            key: None,
        })
        .await
        .unwrap();

    let aggregates = &h.services.aggregates;
    assert_eq!(aggregates.count_directory_children(a.id).await.unwrap(), 3);
    // Every version counts, superseded ones included.
    assert_eq!(aggregates.get_directory_size(a.id).await.unwrap(), Some(135));
    assert_eq!(aggregates.get_directory_current_size(a.id).await.unwrap(), Some(35));

    let bare = h.mkdir("bare", h.root.id).await;
    assert_eq!(aggregates.get_directory_size(bare.id).await.unwrap(), None);
    assert_eq!(aggregates.get_directory_current_size(bare.id).await.unwrap(), None);
}

#[tokio::test]
async fn test_directory_size_overflow_is_an_error() {
    let h = harness().await;
    let a = h.mkdir("a", h.root.id).await;
    h.touch("huge-1.bin", a.id, i64::MAX).await;
    h.touch("huge-2.bin", a.id, i64::MAX).await;

    let err = h.services.aggregates.get_directory_size(a.id).await.unwrap_err();
    assert_eq!(err.kind, treehub_core::error::ErrorKind::Database);
    assert!(h.services.aggregates.get_directory_current_size(a.id).await.is_err());
}
