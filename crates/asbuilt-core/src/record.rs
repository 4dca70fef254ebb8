//! Intermediate buffer table: one record per successfully buffered feature.

use geo_types::Polygon;
use tracing::{info, warn};

use crate::buffer::{BufferConfig, buffer_feature};
use crate::commodity::{CommodityFlags, classify};
use crate::feature::SelectedFeature;
use crate::provenance::Provenance;

#[derive(Debug, Clone)]
pub struct BufferRecord {
    pub provenance: Provenance,
    pub flags: CommodityFlags,
    pub geometry: Polygon<f64>,
    /// `LifeCycleStatusRemoved`; always `No` for new buffers.
    pub removed: bool,
}

impl BufferRecord {
    pub fn source_document(&self) -> &str {
        &self.provenance.source_document
    }
}

/// A feature that could not be buffered.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFeature {
    /// Position in the input selection.
    pub index: usize,
    pub layer: Option<String>,
    pub reason: String,
}

/// Working set built from one selection.
#[derive(Debug, Default)]
pub struct BufferTable {
    pub records: Vec<BufferRecord>,
    pub skipped: Vec<SkippedFeature>,
}

/// Buffer and classify every feature. Features that fail to buffer are
/// recorded in [`BufferTable::skipped`] and the rest of the batch continues.
pub fn build_records(
    features: &[SelectedFeature],
    provenance: &Provenance,
    buffer: &BufferConfig,
) -> BufferTable {
    let mut table = BufferTable {
        records: Vec::with_capacity(features.len()),
        skipped: Vec::new(),
    };

    for (index, feature) in features.iter().enumerate() {
        match buffer_feature(feature, buffer) {
            Ok(geometry) => table.records.push(BufferRecord {
                provenance: provenance.clone(),
                flags: classify(feature.water_type()),
                geometry,
                removed: false,
            }),
            Err(e) => {
                warn!(
                    index,
                    layer = feature.layer.as_deref().unwrap_or("-"),
                    error = %e,
                    "skipping feature"
                );
                table.skipped.push(SkippedFeature {
                    index,
                    layer: feature.layer.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        buffered = table.records.len(),
        skipped = table.skipped.len(),
        distance = buffer.offset_distance,
        "built buffer records"
    );
    table
}
