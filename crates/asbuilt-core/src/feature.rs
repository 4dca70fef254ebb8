//! Selected input features handed over by the host application.

use serde::{Deserialize, Serialize};

/// Geometry type of a selected feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    Polyline,
}

/// One already-selected, already-eligible point or line feature.
///
/// Vertices are in a projected, linear-unit frame. A point carries exactly one
/// vertex; a polyline carries its vertices in drawing order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedFeature {
    pub geometry_type: GeometryKind,
    pub vertices: Vec<(f64, f64)>,
    /// Categorical `WATERTYPE` attribute, e.g. `"Potable"`.
    #[serde(default)]
    pub water_type: Option<String>,
    /// Layer the feature was selected from, used for log context only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    /// `SOURCE` attribute (hyperlink to the as-built document).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// `ASBUILTDATE` attribute, `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asbuilt_date: Option<String>,
}

impl SelectedFeature {
    pub fn point(x: f64, y: f64, water_type: &str) -> Self {
        Self {
            geometry_type: GeometryKind::Point,
            vertices: vec![(x, y)],
            water_type: Some(water_type.to_string()),
            layer: None,
            source: None,
            asbuilt_date: None,
        }
    }

    pub fn polyline(vertices: Vec<(f64, f64)>, water_type: &str) -> Self {
        Self {
            geometry_type: GeometryKind::Polyline,
            vertices,
            water_type: Some(water_type.to_string()),
            layer: None,
            source: None,
            asbuilt_date: None,
        }
    }

    pub fn water_type(&self) -> &str {
        self.water_type.as_deref().unwrap_or_default()
    }
}
