//! In-process destination collection.
//!
//! Mirrors the DuckDB tables: polygon rows get an increasing object id, a
//! fresh GLOBALID and the batch's creation timestamp. A batch that violates a
//! constraint is rejected as a whole.

use arrow::record_batch::RecordBatch;
use asbuilt_core::{
    Attachment, CommittedPolygon, DissolvedPolygon, OutputCollection, RowRef, asbuilt,
};
use chrono::{NaiveDateTime, Utc};
use tracing::debug;

use crate::{StoreError, new_global_id};

#[derive(Debug, Clone)]
pub struct StoredAttachment {
    pub attachment_id: i64,
    pub rel_object_id: i64,
    pub rel_global_id: String,
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    polygons: Vec<CommittedPolygon>,
    attachments: Vec<StoredAttachment>,
    next_object_id: i64,
    next_attachment_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn polygons(&self) -> &[CommittedPolygon] {
        &self.polygons
    }

    pub fn attachments(&self) -> &[StoredAttachment] {
        &self.attachments
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn attachment_count(&self) -> usize {
        self.attachments.len()
    }

    /// All committed polygons as one Arrow batch in object id order.
    pub fn polygons_batch(&self) -> Result<RecordBatch, StoreError> {
        Ok(asbuilt::polygons_batch(&self.polygons)?)
    }

    /// Insert a batch with an explicit creation timestamp.
    pub fn insert_polygons_at(
        &mut self,
        polygons: &[DissolvedPolygon],
        created_date: NaiveDateTime,
    ) -> Result<Vec<RowRef>, StoreError> {
        for polygon in polygons {
            check_constraints(polygon)?;
        }

        let mut staged = Vec::with_capacity(polygons.len());
        let mut next = self.next_object_id;
        for polygon in polygons {
            next += 1;
            staged.push(CommittedPolygon {
                row: RowRef {
                    object_id: next,
                    global_id: new_global_id(),
                },
                polygon: polygon.clone(),
                created_date,
            });
        }

        let rows = staged.iter().map(|p| p.row.clone()).collect();
        self.next_object_id = next;
        self.polygons.extend(staged);
        debug!(rows = polygons.len(), "inserted polygons into memory store");
        Ok(rows)
    }
}

fn check_constraints(polygon: &DissolvedPolygon) -> Result<(), StoreError> {
    if polygon.geometry.0.is_empty() {
        return Err(StoreError::Constraint("shape is empty".into()));
    }
    if polygon.provenance.source_document.is_empty() {
        return Err(StoreError::Constraint("hyperlink is empty".into()));
    }
    Ok(())
}

impl OutputCollection for MemoryStore {
    type Error = StoreError;

    fn insert_polygons(
        &mut self,
        polygons: &[DissolvedPolygon],
    ) -> Result<Vec<RowRef>, StoreError> {
        self.insert_polygons_at(polygons, Utc::now().naive_utc())
    }

    fn newest_row(&self) -> Result<Option<RowRef>, StoreError> {
        Ok(self
            .polygons
            .iter()
            .max_by_key(|p| (p.created_date, p.row.object_id))
            .map(|p| p.row.clone()))
    }

    fn insert_attachment(
        &mut self,
        target: &RowRef,
        attachment: Attachment,
    ) -> Result<i64, StoreError> {
        if !self.polygons.iter().any(|p| p.row == *target) {
            return Err(StoreError::UnknownRow(target.global_id.clone()));
        }
        self.next_attachment_id += 1;
        self.attachments.push(StoredAttachment {
            attachment_id: self.next_attachment_id,
            rel_object_id: target.object_id,
            rel_global_id: target.global_id.clone(),
            name: attachment.name,
            content_type: attachment.content_type,
            data: attachment.data,
        });
        Ok(self.next_attachment_id)
    }
}
