//! Writing dissolved polygons and the source document attachment.

use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dissolve::DissolvedPolygon;
use crate::error::{AsbuiltError, Result};

/// Stable identity of a committed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRef {
    pub object_id: i64,
    /// `GLOBALID`, e.g. `{3F2504E0-4F89-11D3-9A0C-0305E82C3301}`.
    pub global_id: String,
}

/// A dissolved polygon as stored in a destination collection.
#[derive(Debug, Clone)]
pub struct CommittedPolygon {
    pub row: RowRef,
    pub polygon: DissolvedPolygon,
    pub created_date: NaiveDateTime,
}

/// Binary attachment linked to a committed row.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Destination collection for as-built polygons and their attachments.
pub trait OutputCollection {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Insert every polygon inside one transaction. On error nothing is
    /// persisted.
    fn insert_polygons(
        &mut self,
        polygons: &[DissolvedPolygon],
    ) -> std::result::Result<Vec<RowRef>, Self::Error>;

    /// Most recently created row, ties broken by insertion order.
    fn newest_row(&self) -> std::result::Result<Option<RowRef>, Self::Error>;

    /// Store an attachment against `target`, returning the attachment id.
    fn insert_attachment(
        &mut self,
        target: &RowRef,
        attachment: Attachment,
    ) -> std::result::Result<i64, Self::Error>;
}

/// Commit dissolved polygons as one all-or-nothing batch.
pub fn commit_polygons<C: OutputCollection>(
    dest: &mut C,
    polygons: &[DissolvedPolygon],
) -> Result<Vec<RowRef>> {
    let rows = dest
        .insert_polygons(polygons)
        .map_err(AsbuiltError::transaction)?;
    info!(rows = rows.len(), "committed as-built polygons");
    Ok(rows)
}

/// Attach the file at `path` to the newest row of `dest`, named `name`.
pub fn attach_source<C: OutputCollection>(dest: &mut C, path: &Path, name: &str) -> Result<RowRef> {
    let target = dest
        .newest_row()
        .map_err(AsbuiltError::transaction)?
        .ok_or_else(|| AsbuiltError::AttachmentTargetNotFound(name.to_string()))?;

    let data = std::fs::read(path).map_err(|source| AsbuiltError::AttachmentRead {
        path: path.display().to_string(),
        source,
    })?;
    let size = data.len();
    let attachment = Attachment {
        name: name.to_string(),
        content_type: content_type(path).to_string(),
        data,
    };
    let id = dest
        .insert_attachment(&target, attachment)
        .map_err(AsbuiltError::transaction)?;
    info!(
        attachment_id = id,
        object_id = target.object_id,
        global_id = %target.global_id,
        bytes = size,
        "attached source document"
    );
    Ok(target)
}

/// MIME type from the file extension.
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("tif" | "tiff") => "image/tiff",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("dwg") => "image/vnd.dwg",
        _ => "application/octet-stream",
    }
}
