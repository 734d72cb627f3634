//! Display rows shared by the table output of several commands.

use serde::Serialize;
use tabled::Tabled;

use treehub_entity::{ContentKind, ContentRow, Directory, File, FileVersion};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Directory display row
#[derive(Debug, Serialize, Tabled)]
pub struct DirectoryRow {
    /// Directory ID
    pub id: String,
    /// Name
    pub name: String,
    /// Parent ID
    pub parent: String,
    /// Depth below the root
    pub depth: usize,
    /// Updated at
    pub updated_at: String,
}

impl From<&Directory> for DirectoryRow {
    fn from(d: &Directory) -> Self {
        Self {
            id: d.id.to_string(),
            name: d.name.clone(),
            parent: d.parent_id.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
            depth: d.depth(),
            updated_at: d.updated_at.format(TIME_FORMAT).to_string(),
        }
    }
}

/// File display row
#[derive(Debug, Serialize, Tabled)]
pub struct FileRow {
    /// File ID
    pub id: String,
    /// Name
    pub name: String,
    /// Containing directory ID
    pub directory: String,
    /// Updated at
    pub updated_at: String,
}

impl From<&File> for FileRow {
    fn from(f: &File) -> Self {
        Self {
            id: f.id.to_string(),
            name: f.name.clone(),
            directory: f.directory_id.to_string(),
            updated_at: f.updated_at.format(TIME_FORMAT).to_string(),
        }
    }
}

/// File version display row
#[derive(Debug, Serialize, Tabled)]
pub struct VersionRow {
    /// Version ID
    pub id: String,
    /// Name at upload time
    pub name: String,
    /// MIME type
    pub mime_type: String,
    /// Size in bytes
    pub size: i64,
    /// Blob key
    pub key: String,
    /// Created at
    pub created_at: String,
}

impl From<&FileVersion> for VersionRow {
    fn from(v: &FileVersion) -> Self {
        Self {
            id: v.id.to_string(),
            name: v.name.clone(),
            mime_type: v.mime_type.clone(),
            size: v.size,
            key: v.key.clone(),
            created_at: v.created_at.format(TIME_FORMAT).to_string(),
        }
    }
}

/// Listing display row
#[derive(Debug, Serialize, Tabled)]
pub struct EntryRow {
    /// `dir` or `file`
    pub kind: &'static str,
    /// Name
    pub name: String,
    /// Current size in bytes
    pub size: i64,
    /// Current MIME type
    pub mime_type: String,
    /// ID
    pub id: String,
}

impl From<&ContentRow> for EntryRow {
    fn from(row: &ContentRow) -> Self {
        Self {
            kind: match row.kind {
                ContentKind::Directory => "dir",
                ContentKind::File => "file",
            },
            name: row.name.clone(),
            size: row.size,
            mime_type: row.mime_type.clone(),
            id: row.id.to_string(),
        }
    }
}
