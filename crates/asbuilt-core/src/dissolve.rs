//! Dissolve merged buffer records into one multi-part polygon per attribute tuple.

use std::collections::HashMap;

use geo::{Area, BooleanOps};
use geo_types::{Geometry, MultiPolygon};
use tracing::debug;
use wkt::ToWkt;

use crate::commodity::CommodityFlags;
use crate::error::{AsbuiltError, Result};
use crate::provenance::Provenance;
use crate::record::BufferRecord;

/// Full attribute tuple a dissolve groups by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DissolveKey {
    pub provenance: Provenance,
    pub flags: CommodityFlags,
    pub removed: bool,
}

/// One output polygon: the union of every buffer sharing its [`DissolveKey`].
#[derive(Debug, Clone)]
pub struct DissolvedPolygon {
    pub provenance: Provenance,
    pub flags: CommodityFlags,
    pub removed: bool,
    pub geometry: MultiPolygon<f64>,
    /// Number of buffer records unioned into this polygon.
    pub members: usize,
}

impl DissolvedPolygon {
    pub fn area(&self) -> f64 {
        self.geometry.unsigned_area()
    }

    pub fn part_count(&self) -> usize {
        self.geometry.0.len()
    }

    /// Geometry as `MULTIPOLYGON` WKT.
    pub fn to_wkt(&self) -> String {
        self.geometry.wkt_string()
    }
}

/// Group records by provenance, flags and removed status and union each
/// group's geometry. Overlapping buffers collapse; disjoint ones become
/// separate parts. Output follows the first appearance of each key.
pub fn dissolve(records: Vec<BufferRecord>) -> Vec<DissolvedPolygon> {
    let mut index: HashMap<DissolveKey, usize> = HashMap::new();
    let mut out: Vec<DissolvedPolygon> = Vec::new();

    for record in records {
        let key = DissolveKey {
            provenance: record.provenance,
            flags: record.flags,
            removed: record.removed,
        };
        let piece = MultiPolygon::new(vec![record.geometry]);
        match index.get(&key).copied() {
            Some(i) => {
                let target = &mut out[i];
                target.geometry = target.geometry.union(&piece);
                target.members += 1;
            }
            None => {
                index.insert(key.clone(), out.len());
                out.push(DissolvedPolygon {
                    provenance: key.provenance,
                    flags: key.flags,
                    removed: key.removed,
                    geometry: piece,
                    members: 1,
                });
            }
        }
    }

    for polygon in &out {
        debug!(
            source = %polygon.provenance.source_document,
            members = polygon.members,
            parts = polygon.part_count(),
            "dissolved group"
        );
    }
    out
}

/// Parse `POLYGON` or `MULTIPOLYGON` WKT back into a multi-polygon.
pub fn parse_multipolygon(wkt: &str) -> Result<MultiPolygon<f64>> {
    use std::str::FromStr;
    let parsed = wkt::Wkt::<f64>::from_str(wkt)
        .map_err(|e| AsbuiltError::InvalidGeometry(format!("WKT parse error: {e:?}")))?;
    let geometry: Geometry<f64> = parsed
        .try_into()
        .map_err(|e: wkt::conversion::Error| AsbuiltError::InvalidGeometry(format!("{e:?}")))?;
    match geometry {
        Geometry::MultiPolygon(mp) => Ok(mp),
        Geometry::Polygon(p) => Ok(MultiPolygon::new(vec![p])),
        other => Err(AsbuiltError::InvalidGeometry(format!(
            "expected polygonal WKT, got {other:?}"
        ))),
    }
}
