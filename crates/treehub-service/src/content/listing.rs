//! Directory content listings over the full subtree.

use std::cmp::Ordering;
use std::sync::Arc;

use uuid::Uuid;

use treehub_core::config::TreeConfig;
use treehub_core::result::AppResult;
use treehub_core::types::{ContentSort, ContentSortField, PageRequest, SortDirection};
use treehub_database::TreeStore;
use treehub_entity::ContentRow;

/// Lists everything below a directory, sorted and paginated.
#[derive(Debug, Clone)]
pub struct ContentService {
    store: Arc<dyn TreeStore>,
    default_page_length: u64,
}

impl ContentService {
    /// Creates a new content service.
    pub fn new(store: Arc<dyn TreeStore>, config: &TreeConfig) -> Self {
        Self {
            store,
            default_page_length: config.default_page_length,
        }
    }

    /// Every file and directory whose ancestors contain `id`, at any depth.
    ///
    /// Files are described by their latest version. An unknown id yields
    /// an empty page, as does a page past the end.
    pub async fn get_directory_contents(
        &self,
        id: Uuid,
        page: Option<PageRequest>,
        sort: Option<ContentSort>,
    ) -> AppResult<Vec<ContentRow>> {
        let files = self.store.descendant_files(id).await?;
        let directories = self.store.descendant_directories(id).await?;

        let file_ids: Vec<Uuid> = files.iter().map(|f| f.id).collect();
        let current = self.store.current_versions(&file_ids).await?;

        let file_rows = files
            .iter()
            .map(|f| ContentRow::from_file(f, current.get(&f.id)))
            .collect();
        let directory_rows = directories.iter().map(ContentRow::from_directory).collect();

        let sorted = sort_contents(file_rows, directory_rows, sort.unwrap_or_default());
        let page = page.unwrap_or(PageRequest::new(1, self.default_page_length));
        Ok(page.apply(sorted))
    }
}

/// Order listing rows.
///
/// Sorting by `name` merges both kinds into one ascending sequence and
/// ignores the direction; equal names keep files before directories.
/// Any other field puts directories first, ordered by name in the
/// requested direction, then files ordered ascending by the field.
pub fn sort_contents(
    mut files: Vec<ContentRow>,
    mut directories: Vec<ContentRow>,
    sort: ContentSort,
) -> Vec<ContentRow> {
    if sort.field == ContentSortField::Name {
        files.append(&mut directories);
        files.sort_by(|a, b| a.name.cmp(&b.name));
        return files;
    }

    directories.sort_by(|a, b| match sort.direction() {
        SortDirection::Asc => a.name.cmp(&b.name),
        SortDirection::Desc => b.name.cmp(&a.name),
    });
    files.sort_by(|a, b| compare_field(a, b, sort.field));
    directories.append(&mut files);
    directories
}

fn compare_field(a: &ContentRow, b: &ContentRow, field: ContentSortField) -> Ordering {
    match field {
        ContentSortField::Name => a.name.cmp(&b.name),
        ContentSortField::Size => a.size.cmp(&b.size),
        ContentSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        ContentSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}
