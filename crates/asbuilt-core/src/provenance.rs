//! Run configuration and provenance derivation.
//!
//! The provenance key is the document hyperlink: the configured document path
//! with everything before the `originals` anchor replaced by `..\`, e.g.
//!
//! ```text
//! \\fileserver\records\originals\P56\12345_site.pdf
//!   -> ..\originals\P56\12345_site.pdf
//! ```
//!
//! From it come the document file name (`12345_site.pdf`), the folder tag
//! (third segment, `P56`) and the record number (`1234`, see
//! [`record_number`]).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::buffer::BufferConfig;
use crate::error::{AsbuiltError, Result};
use crate::feature::SelectedFeature;

/// Path segment that every as-built document path passes through.
pub const ANCHOR_TOKEN: &str = "originals";
/// Replacement for everything before [`ANCHOR_TOKEN`].
pub const RELATIVE_PARENT: &str = "..\\";

/// Immutable settings for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub source_document_path: String,
    /// `YYYY-MM-DD`.
    pub record_date: Option<String>,
    pub project_number: Option<String>,
    pub buffer: BufferConfig,
    pub attach_source: bool,
}

impl RunConfig {
    pub fn new(source_document_path: impl Into<String>, offset_distance: f64) -> Self {
        Self {
            source_document_path: source_document_path.into(),
            record_date: None,
            project_number: None,
            buffer: BufferConfig::new(offset_distance),
            attach_source: false,
        }
    }

    /// Set the record date from raw picker input; see [`normalize_record_date`].
    pub fn with_record_date(mut self, raw: &str) -> Result<Self> {
        self.record_date = normalize_record_date(raw)?;
        Ok(self)
    }

    /// Set the project number; blank input clears it.
    pub fn with_project_number(mut self, raw: &str) -> Self {
        let trimmed = raw.trim();
        self.project_number = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn with_attach_source(mut self, attach: bool) -> Self {
        self.attach_source = attach;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.buffer.validate()?;
        if let Some(date) = &self.record_date {
            parse_date(date)?;
        }
        Ok(())
    }

    /// Derive the provenance metadata shared by every record of this run.
    pub fn provenance(&self) -> Result<Provenance> {
        let hyperlink = hyperlink(&self.source_document_path)?;
        let document_file = base_name(&hyperlink).to_string();
        if document_file.is_empty() {
            return Err(ambiguous(&self.source_document_path, "path has no file name"));
        }
        let folder_tag = hyperlink
            .split(['\\', '/'])
            .nth(2)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ambiguous(
                    &self.source_document_path,
                    "no folder segment after the anchor",
                )
            })?
            .to_string();

        Ok(Provenance {
            record_number: record_number(&document_file),
            source_document: hyperlink,
            document_file,
            folder_tag,
            record_date: self.record_date.clone(),
            project_number: self.project_number.clone(),
        })
    }
}

/// Provenance metadata attached to every buffer of a run.
///
/// `source_document` is the merge key; the remaining fields ride along into
/// the dissolve key and the output row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provenance {
    /// `HYPERLINK`
    pub source_document: String,
    /// `PBCWUDFILE`
    pub document_file: String,
    /// `P56FOLDER`
    pub folder_tag: String,
    /// `ASBUILTNO`
    pub record_number: String,
    /// `ASBUILTDATE`
    pub record_date: Option<String>,
    /// `WUDPROJECTNUM`
    pub project_number: Option<String>,
}

/// Replace everything before the first `originals` with `..\`.
pub fn hyperlink(path: &str) -> Result<String> {
    let path = path.trim();
    let start = path
        .find(ANCHOR_TOKEN)
        .ok_or_else(|| ambiguous(path, "missing `originals` anchor"))?;
    Ok(format!("{RELATIVE_PARENT}{}", &path[start..]))
}

/// First 7 characters of the file stem, or the first 4 when the file name has
/// an underscore in 5th position (short numbering scheme).
pub fn record_number(document_file: &str) -> String {
    let stem = match document_file.rfind('.') {
        Some(dot) if dot > 0 => &document_file[..dot],
        _ => document_file,
    };
    let take = if document_file.chars().nth(4) == Some('_') {
        4
    } else {
        7
    };
    stem.chars().take(take).collect()
}

/// Keep the date part of picker input (`"2024-03-01 12:00:00"` → `2024-03-01`).
/// Blank input means no date.
pub fn normalize_record_date(raw: &str) -> Result<Option<String>> {
    let date = raw.trim().split(' ').next().unwrap_or_default();
    if date.is_empty() {
        return Ok(None);
    }
    parse_date(date)?;
    Ok(Some(date.to_string()))
}

fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| AsbuiltError::Config(format!("record date {date:?} is not YYYY-MM-DD: {e}")))
}

/// Write `SOURCE` and `ASBUILTDATE` onto each selected feature, returning how
/// many features changed.
pub fn stamp_selection(features: &mut [SelectedFeature], provenance: &Provenance) -> usize {
    let mut changed = 0;
    for feature in features.iter_mut() {
        if feature.source.as_deref() != Some(provenance.source_document.as_str())
            || feature.asbuilt_date != provenance.record_date
        {
            feature.source = Some(provenance.source_document.clone());
            feature.asbuilt_date = provenance.record_date.clone();
            changed += 1;
        }
    }
    changed
}

fn base_name(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

fn ambiguous(path: &str, reason: &str) -> AsbuiltError {
    AsbuiltError::AmbiguousProvenance {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}
