//! Vertical card display for committed as-built polygons.

use arrow::array::{Array, StringArray};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};

const MAX_SHAPE_CHARS: usize = 96;

// ── Column groupings ──

const PROVENANCE: &[&str] = &[
    "pbcwudfile",
    "hyperlink",
    "p56folder",
    "asbuiltno",
    "asbuiltdate",
    "wudprojectnum",
];

const COMMODITIES: &[&str] = &[
    "water",
    "sewer",
    "reclaimed",
    "raw",
    "other",
    "lifecyclestatusremoved",
];

const GEOMETRY: &[&str] = &["srid", "shape"];

const TIMESTAMPS: &[&str] = &["created_date"];

/// Print one polygon row as a card grouped by column section.
pub fn print_polygon_card(batch: &RecordBatch, row: usize) -> anyhow::Result<()> {
    let object_id = cell(batch, "objectid", row)?.unwrap_or_default();
    let global_id = get_utf8(batch, "globalid", row).unwrap_or_default();

    println!("=== polygon {object_id} {global_id} ===");
    println!();

    print_section(batch, row, "Provenance", PROVENANCE)?;
    print_section(batch, row, "Commodities", COMMODITIES)?;
    print_section(batch, row, "Geometry", GEOMETRY)?;
    print_section(batch, row, "Timestamps", TIMESTAMPS)?;
    Ok(())
}

/// Drop the first `skip` rows across a sequence of batches.
pub fn skip_rows(batches: Vec<RecordBatch>, mut skip: usize) -> Vec<RecordBatch> {
    let mut kept = Vec::with_capacity(batches.len());
    for batch in batches {
        let rows = batch.num_rows();
        if skip >= rows {
            skip -= rows;
            continue;
        }
        kept.push(batch.slice(skip, rows - skip));
        skip = 0;
    }
    kept
}

// ── Section rendering ──

fn print_section(
    batch: &RecordBatch,
    row: usize,
    header: &str,
    cols: &[&str],
) -> anyhow::Result<()> {
    let mut lines = Vec::new();
    for &col_name in cols {
        let Some(value) = cell(batch, col_name, row)? else {
            continue;
        };
        let value = if col_name == "shape" {
            truncate(&value, MAX_SHAPE_CHARS)
        } else {
            value
        };
        lines.push(format!("  {col_name:<24} {value}"));
    }
    if lines.is_empty() {
        return Ok(());
    }

    println!("{header}");
    for line in lines {
        println!("{line}");
    }
    println!();
    Ok(())
}

// ── Helpers ──

/// Render a single cell with Arrow's display formatting; `None` when the
/// column is missing or the value is null.
fn cell(batch: &RecordBatch, col_name: &str, row: usize) -> anyhow::Result<Option<String>> {
    let Some(col) = batch.column_by_name(col_name) else {
        return Ok(None);
    };
    if col.is_null(row) {
        return Ok(None);
    }
    let formatter = ArrayFormatter::try_new(col.as_ref(), &FormatOptions::default())?;
    Ok(Some(formatter.value(row).to_string()))
}

fn get_utf8(batch: &RecordBatch, col_name: &str, row: usize) -> Option<String> {
    let col = batch.column_by_name(col_name)?;
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(row).to_string())
}

fn truncate(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &value[..cut]),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::Int64Array;
    use arrow::datatypes::{DataType, Field, Schema};

    fn batch(ids: &[i64]) -> RecordBatch {
        let schema = Schema::new(vec![Field::new("objectid", DataType::Int64, false)]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(Int64Array::from(ids.to_vec()))],
        )
        .unwrap()
    }

    #[test]
    fn skip_rows_spans_batches() {
        let kept = skip_rows(vec![batch(&[1, 2]), batch(&[3, 4, 5])], 3);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].num_rows(), 2);
        assert_eq!(cell(&kept[0], "objectid", 0).unwrap().as_deref(), Some("4"));
    }

    #[test]
    fn missing_column_renders_nothing() {
        assert!(cell(&batch(&[1]), "shape", 0).unwrap().is_none());
    }

    #[test]
    fn truncate_long_shapes() {
        assert_eq!(truncate("MULTIPOLYGON", 5), "MULTI...");
        assert_eq!(truncate("POINT", 5), "POINT");
    }
}
