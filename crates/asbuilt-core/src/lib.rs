//! As-built coverage polygons: buffer selected features, merge commodity flags
//! per source document, dissolve, and commit to a destination collection.

pub mod buffer;
pub mod commit;
pub mod commodity;
pub mod dissolve;
pub mod error;
pub mod feature;
pub mod merge;
pub mod pipeline;
pub mod provenance;
pub mod record;
pub mod schema;

pub use buffer::{BufferConfig, buffer_feature};
pub use commit::{
    Attachment, CommittedPolygon, OutputCollection, RowRef, attach_source, commit_polygons,
};
pub use commodity::{Commodity, CommodityFlags, classify};
pub use dissolve::{DissolvedPolygon, dissolve};
pub use error::{AsbuiltError, Result};
pub use feature::{GeometryKind, SelectedFeature};
pub use merge::merge_group_flags;
pub use pipeline::{RunSummary, run};
pub use provenance::{Provenance, RunConfig, stamp_selection};
pub use record::{BufferRecord, BufferTable, SkippedFeature, build_records};
pub use schema::asbuilt;
