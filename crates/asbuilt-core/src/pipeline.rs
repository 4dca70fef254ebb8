//! End-to-end run: buffer → merge flags → dissolve → commit → attach.

use std::fmt;
use std::path::Path;

use tracing::{info, warn};

use crate::commit::{OutputCollection, RowRef, attach_source, commit_polygons};
use crate::dissolve::dissolve;
use crate::error::{AsbuiltError, Result};
use crate::feature::SelectedFeature;
use crate::merge::merge_group_flags;
use crate::provenance::RunConfig;
use crate::record::{SkippedFeature, build_records};

/// Outcome of a run that reached the commit step.
#[derive(Debug)]
pub struct RunSummary {
    pub buffered: usize,
    pub skipped: Vec<SkippedFeature>,
    /// Records whose flags widened during the group merge.
    pub flags_merged: usize,
    pub rows: Vec<RowRef>,
    pub attachment: Option<RowRef>,
    /// Set when the polygons were committed but the source document could
    /// not be attached.
    pub attachment_error: Option<AsbuiltError>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Committed {} as-built polygon(s) from {} buffer(s); skipped {} feature(s)",
            self.rows.len(),
            self.buffered,
            self.skipped.len()
        )?;
        if let Some(row) = &self.attachment {
            write!(f, "; attached source to {}", row.global_id)?;
        }
        if let Some(err) = &self.attachment_error {
            write!(f, "; source document not attached: {err}")?;
        }
        Ok(())
    }
}

/// Run the whole pipeline for one selection.
///
/// Configuration, provenance and selection problems fail before anything is
/// written. Polygon writes are one transaction. The attachment is written
/// afterwards; if it fails the committed polygons stay in place and the
/// failure is reported in [`RunSummary::attachment_error`].
pub fn run<C: OutputCollection>(
    features: &[SelectedFeature],
    config: &RunConfig,
    dest: &mut C,
) -> Result<RunSummary> {
    config.validate()?;
    if features.is_empty() {
        return Err(AsbuiltError::NoSelection);
    }
    let provenance = config.provenance()?;
    info!(
        source = %provenance.source_document,
        features = features.len(),
        "creating as-built buffers"
    );

    let mut table = build_records(features, &provenance, &config.buffer);
    if table.records.is_empty() {
        warn!(
            skipped = table.skipped.len(),
            "no selected feature could be buffered"
        );
        return Err(AsbuiltError::NoSelection);
    }

    let buffered = table.records.len();
    let flags_merged = merge_group_flags(&mut table.records);
    let polygons = dissolve(table.records);
    let rows = commit_polygons(dest, &polygons)?;

    let (attachment, attachment_error) = if config.attach_source {
        match attach_source(
            dest,
            Path::new(&config.source_document_path),
            &provenance.document_file,
        ) {
            Ok(row) => (Some(row), None),
            Err(err) => {
                warn!(
                    rows = rows.len(),
                    error = %err,
                    "polygons committed without attachment"
                );
                (None, Some(err))
            }
        }
    } else {
        (None, None)
    };

    Ok(RunSummary {
        buffered,
        skipped: table.skipped,
        flags_merged,
        rows,
        attachment,
        attachment_error,
    })
}
