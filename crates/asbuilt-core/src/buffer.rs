//! Round buffers around points and polylines.
//!
//! A point buffer is a disk; a polyline buffer is the union of one capsule per
//! segment, which gives round caps and round joins. Arcs are approximated with
//! `quadrant_segments` chords per quarter circle at fixed angles, so the buffer
//! for a smaller distance always lies inside the buffer for a larger one.

use std::f64::consts::{FRAC_PI_2, PI};

use geo::{Area, BooleanOps};
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AsbuiltError, Result};
use crate::feature::{GeometryKind, SelectedFeature};

/// Chords per quarter circle.
pub const DEFAULT_QUADRANT_SEGMENTS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Offset distance in the linear unit of the working frame.
    pub offset_distance: f64,
    #[serde(default = "default_quadrant_segments")]
    pub quadrant_segments: u32,
}

fn default_quadrant_segments() -> u32 {
    DEFAULT_QUADRANT_SEGMENTS
}

impl BufferConfig {
    pub fn new(offset_distance: f64) -> Self {
        Self {
            offset_distance,
            quadrant_segments: DEFAULT_QUADRANT_SEGMENTS,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.offset_distance.is_finite() || self.offset_distance <= 0.0 {
            return Err(AsbuiltError::Config(format!(
                "offset distance must be a positive number, got {}",
                self.offset_distance
            )));
        }
        if self.quadrant_segments == 0 {
            return Err(AsbuiltError::Config(
                "quadrant segments must be at least 1".into(),
            ));
        }
        Ok(())
    }

    fn step(&self) -> f64 {
        FRAC_PI_2 / self.quadrant_segments as f64
    }
}

/// Buffer one selected feature according to its geometry type.
pub fn buffer_feature(feature: &SelectedFeature, config: &BufferConfig) -> Result<Polygon<f64>> {
    let coords = to_coords(&feature.vertices)?;
    match feature.geometry_type {
        GeometryKind::Point => match coords.as_slice() {
            [center] => buffer_point(*center, config),
            _ => Err(AsbuiltError::InvalidGeometry(format!(
                "point feature needs exactly one vertex, got {}",
                coords.len()
            ))),
        },
        GeometryKind::Polyline => buffer_polyline(&coords, config),
    }
}

/// Disk of radius `offset_distance` around `center`.
pub fn buffer_point(center: Coord<f64>, config: &BufferConfig) -> Result<Polygon<f64>> {
    config.validate()?;
    let n = 4 * config.quadrant_segments;
    let step = config.step();
    let r = config.offset_distance;
    let ring: Vec<Coord<f64>> = (0..n)
        .map(|i| {
            let a = i as f64 * step;
            Coord {
                x: center.x + r * a.cos(),
                y: center.y + r * a.sin(),
            }
        })
        .collect();
    Ok(Polygon::new(LineString::from(ring), vec![]))
}

/// Minkowski sum of the polyline with a disk of radius `offset_distance`.
pub fn buffer_polyline(vertices: &[Coord<f64>], config: &BufferConfig) -> Result<Polygon<f64>> {
    config.validate()?;
    let mut path: Vec<Coord<f64>> = Vec::with_capacity(vertices.len());
    for &c in vertices {
        if path.last() != Some(&c) {
            path.push(c);
        }
    }
    if vertices.len() < 2 {
        return Err(AsbuiltError::InvalidGeometry(format!(
            "polyline needs at least two vertices, got {}",
            vertices.len()
        )));
    }
    if path.len() < 2 {
        return Err(AsbuiltError::InvalidGeometry(
            "polyline has zero length".into(),
        ));
    }

    let mut merged = MultiPolygon::new(vec![]);
    for pair in path.windows(2) {
        let capsule = MultiPolygon::new(vec![capsule(pair[0], pair[1], config)]);
        merged = if merged.0.is_empty() {
            capsule
        } else {
            merged.union(&capsule)
        };
    }

    // A connected path yields one polygon; keep the largest if the overlay
    // leaves slivers behind.
    let parts = merged.0.len();
    let polygon = merged
        .0
        .into_iter()
        .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))
        .ok_or_else(|| AsbuiltError::InvalidGeometry("empty polyline buffer".into()))?;
    if parts > 1 {
        debug!(parts, "polyline buffer produced slivers, kept largest part");
    }
    Ok(polygon)
}

/// Convex stadium around segment `a`→`b`: a half disk at each end joined by
/// the two offset edges.
fn capsule(a: Coord<f64>, b: Coord<f64>, config: &BufferConfig) -> Polygon<f64> {
    let heading = (b.y - a.y).atan2(b.x - a.x);
    let half = 2 * config.quadrant_segments;
    let step = config.step();
    let r = config.offset_distance;

    let mut ring = Vec::with_capacity(2 * (half as usize + 1));
    for (center, start) in [(b, heading - FRAC_PI_2), (a, heading + FRAC_PI_2)] {
        for i in 0..=half {
            let t = start + i as f64 * step;
            ring.push(Coord {
                x: center.x + r * t.cos(),
                y: center.y + r * t.sin(),
            });
        }
    }
    debug_assert!((half as f64 * step - PI).abs() < 1e-9);
    Polygon::new(LineString::from(ring), vec![])
}

fn to_coords(vertices: &[(f64, f64)]) -> Result<Vec<Coord<f64>>> {
    vertices
        .iter()
        .map(|&(x, y)| {
            if x.is_finite() && y.is_finite() {
                Ok(Coord { x, y })
            } else {
                Err(AsbuiltError::InvalidGeometry(format!(
                    "non-finite vertex ({x}, {y})"
                )))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Contains;
    use geo_types::Point;

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    #[test]
    fn point_buffer_is_closed_disk() {
        let poly = buffer_point(c(100.0, 200.0), &BufferConfig::new(10.0)).unwrap();
        let ring = &poly.exterior().0;
        assert_eq!(ring.first(), ring.last());
        // 32 chords plus the closing vertex.
        assert_eq!(ring.len(), 33);
        let area = poly.unsigned_area();
        let disk = PI * 100.0;
        assert!((area - disk).abs() / disk < 0.01, "area {area}");
        for v in &ring[..ring.len() - 1] {
            let d = ((v.x - 100.0).powi(2) + (v.y - 200.0).powi(2)).sqrt();
            assert!((d - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn finer_segments_approach_true_area() {
        let mut config = BufferConfig::new(10.0);
        config.quadrant_segments = 64;
        let area = buffer_point(c(0.0, 0.0), &config).unwrap().unsigned_area();
        assert!((area - PI * 100.0).abs() < 0.1);
    }

    #[test]
    fn straight_line_buffer_is_stadium() {
        let poly = buffer_polyline(&[c(0.0, 0.0), c(100.0, 0.0)], &BufferConfig::new(5.0)).unwrap();
        let expected = 100.0 * 10.0 + PI * 25.0;
        let area = poly.unsigned_area();
        assert!((area - expected).abs() / expected < 0.01, "area {area}");
        assert!(poly.contains(&Point::new(50.0, 4.9)));
        assert!(poly.contains(&Point::new(-4.9, 0.0)));
        assert!(!poly.contains(&Point::new(50.0, 5.1)));
    }

    #[test]
    fn bent_line_has_round_join() {
        let poly = buffer_polyline(
            &[c(0.0, 0.0), c(50.0, 0.0), c(50.0, 50.0)],
            &BufferConfig::new(5.0),
        )
        .unwrap();
        // Outside corner is rounded, so the square corner point lies outside.
        assert!(!poly.contains(&Point::new(54.9, -4.9)));
        assert!(poly.contains(&Point::new(53.0, -3.0)));
        assert!(poly.interiors().is_empty());
    }

    #[test]
    fn duplicate_vertices_are_collapsed() {
        let poly = buffer_polyline(
            &[c(0.0, 0.0), c(0.0, 0.0), c(10.0, 0.0)],
            &BufferConfig::new(1.0),
        )
        .unwrap();
        assert!(poly.unsigned_area() > 20.0);
    }

    #[test]
    fn area_monotonic_in_distance() {
        let path = [c(0.0, 0.0), c(30.0, 10.0), c(35.0, 40.0), c(0.0, 45.0)];
        let mut prev_line = 0.0;
        let mut prev_point = 0.0;
        for d in [0.5, 1.0, 2.0, 5.0, 10.0, 25.0, 60.0] {
            let config = BufferConfig::new(d);
            let line = buffer_polyline(&path, &config).unwrap().unsigned_area();
            let point = buffer_point(c(3.0, 4.0), &config).unwrap().unsigned_area();
            assert!(line >= prev_line, "line area shrank at d={d}");
            assert!(point >= prev_point, "point area shrank at d={d}");
            prev_line = line;
            prev_point = point;
        }
    }

    #[test]
    fn zero_length_line_rejected() {
        let err = buffer_polyline(&[c(1.0, 1.0), c(1.0, 1.0)], &BufferConfig::new(5.0)).unwrap_err();
        assert!(matches!(err, AsbuiltError::InvalidGeometry(_)));
    }

    #[test]
    fn single_vertex_line_rejected() {
        let err = buffer_polyline(&[c(1.0, 1.0)], &BufferConfig::new(5.0)).unwrap_err();
        assert!(matches!(err, AsbuiltError::InvalidGeometry(_)));
    }

    #[test]
    fn point_feature_with_no_vertices_rejected() {
        let mut feature = SelectedFeature::point(0.0, 0.0, "Potable");
        feature.vertices.clear();
        let err = buffer_feature(&feature, &BufferConfig::new(5.0)).unwrap_err();
        assert!(matches!(err, AsbuiltError::InvalidGeometry(_)));
    }

    #[test]
    fn non_finite_vertex_rejected() {
        let feature = SelectedFeature::point(f64::NAN, 0.0, "Potable");
        let err = buffer_feature(&feature, &BufferConfig::new(5.0)).unwrap_err();
        assert!(matches!(err, AsbuiltError::InvalidGeometry(_)));
    }

    #[test]
    fn non_positive_distance_rejected() {
        for d in [0.0, -1.0, f64::INFINITY] {
            let err = buffer_point(c(0.0, 0.0), &BufferConfig::new(d)).unwrap_err();
            assert!(matches!(err, AsbuiltError::Config(_)));
        }
    }
}
