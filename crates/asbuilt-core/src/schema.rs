/// Arrow schema definitions for the as-built polygon layer.
pub mod asbuilt {
    use std::sync::Arc;

    use arrow::array::{
        ArrayRef, Date32Array, Int32Array, Int64Array, StringArray, TimestampMicrosecondArray,
    };
    use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
    use arrow::error::ArrowError;
    use arrow::record_batch::RecordBatch;
    use chrono::NaiveDate;

    use crate::commit::CommittedPolygon;
    use crate::commodity::{Commodity, yes_no};
    use crate::provenance::Provenance;

    pub const POLYGONS_TABLE: &str = "asbuilt_polygons";
    pub const ATTACHMENTS_TABLE: &str = "asbuilt_polygons__attach";
    /// Projected, foot-based working frame of the output layer.
    pub const SRID: i32 = 2236;

    /// Schema for committed as-built polygons.
    pub fn polygons_schema() -> Schema {
        let mut fields = vec![
            Field::new("objectid", DataType::Int64, false),
            Field::new("globalid", DataType::Utf8, false),
            Field::new("pbcwudfile", DataType::Utf8, true),
            Field::new("hyperlink", DataType::Utf8, false),
            Field::new("p56folder", DataType::Utf8, true),
            Field::new("asbuiltno", DataType::Utf8, true),
            Field::new("asbuiltdate", DataType::Date32, true),
            Field::new("wudprojectnum", DataType::Utf8, true),
        ];
        fields.extend(
            Commodity::ALL
                .iter()
                .map(|c| Field::new(c.column(), DataType::Utf8, false)),
        );
        fields.extend([
            Field::new("lifecyclestatusremoved", DataType::Utf8, false),
            Field::new("shape", DataType::Utf8, false),
            Field::new("srid", DataType::Int32, false),
            Field::new(
                "created_date",
                DataType::Timestamp(TimeUnit::Microsecond, None),
                false,
            ),
        ]);
        Schema::new(fields)
    }

    /// Schema for the attachment table.
    pub fn attachments_schema() -> Schema {
        Schema::new(vec![
            Field::new("attachmentid", DataType::Int64, false),
            Field::new("rel_objectid", DataType::Int64, false),
            Field::new("rel_globalid", DataType::Utf8, false),
            Field::new("att_name", DataType::Utf8, false),
            Field::new("content_type", DataType::Utf8, true),
            Field::new("data_size", DataType::Int64, false),
            Field::new("data", DataType::Binary, false),
        ])
    }

    /// Build a [`polygons_schema`] batch from committed rows.
    pub fn polygons_batch(rows: &[CommittedPolygon]) -> Result<RecordBatch, ArrowError> {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from_iter_values(
                rows.iter().map(|r| r.row.object_id),
            )),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| r.row.global_id.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| provenance(r).document_file.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| provenance(r).source_document.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| provenance(r).folder_tag.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| provenance(r).record_number.as_str()),
            )),
            Arc::new(Date32Array::from_iter(rows.iter().map(|r| {
                provenance(r)
                    .record_date
                    .as_deref()
                    .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
                    .map(|d| (d - epoch).num_days() as i32)
            }))),
            Arc::new(StringArray::from_iter(
                rows.iter().map(|r| provenance(r).project_number.as_deref()),
            )),
        ];
        for commodity in Commodity::ALL {
            columns.push(Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| yes_no(r.polygon.flags.get(commodity))),
            )));
        }
        columns.push(Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| yes_no(r.polygon.removed)),
        )));
        columns.push(Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.polygon.to_wkt()),
        )));
        columns.push(Arc::new(Int32Array::from_iter_values(
            rows.iter().map(|_| SRID),
        )));
        columns.push(Arc::new(TimestampMicrosecondArray::from_iter_values(
            rows.iter().map(|r| r.created_date.and_utc().timestamp_micros()),
        )));

        RecordBatch::try_new(Arc::new(polygons_schema()), columns)
    }

    fn provenance(row: &CommittedPolygon) -> &Provenance {
        &row.polygon.provenance
    }
}

#[cfg(test)]
mod tests {
    use super::asbuilt;
    use crate::commit::{CommittedPolygon, RowRef};
    use crate::commodity::classify;
    use crate::dissolve::DissolvedPolygon;
    use crate::provenance::Provenance;
    use arrow::array::{Array, Date32Array, StringArray};
    use geo_types::{MultiPolygon, polygon};

    #[test]
    fn polygons_schema_has_expected_fields() {
        let schema = asbuilt::polygons_schema();
        assert_eq!(schema.fields().len(), 17);
        assert!(schema.field_with_name("hyperlink").is_ok());
        assert!(schema.field_with_name("reclaimed").is_ok());
        assert!(schema.field_with_name("created_date").is_ok());
    }

    #[test]
    fn attachments_schema_has_expected_fields() {
        let schema = asbuilt::attachments_schema();
        assert_eq!(schema.fields().len(), 7);
        assert!(schema.field_with_name("rel_globalid").is_ok());
    }

    #[test]
    fn polygons_batch_renders_rows() {
        let row = CommittedPolygon {
            row: RowRef {
                object_id: 7,
                global_id: "{A}".into(),
            },
            polygon: DissolvedPolygon {
                provenance: Provenance {
                    source_document: r"..\originals\P56\1234_x.pdf".into(),
                    document_file: "1234_x.pdf".into(),
                    folder_tag: "P56".into(),
                    record_number: "1234".into(),
                    record_date: Some("1970-01-11".into()),
                    project_number: None,
                },
                flags: classify("Reclaimed"),
                removed: false,
                geometry: MultiPolygon::new(vec![
                    polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)],
                ]),
                members: 1,
            },
            created_date: chrono::DateTime::from_timestamp(0, 0).unwrap().naive_utc(),
        };
        let batch = asbuilt::polygons_batch(&[row]).unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.num_columns(), 17);

        let reclaimed = batch
            .column_by_name("reclaimed")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(reclaimed.value(0), "Yes");
        let date = batch
            .column_by_name("asbuiltdate")
            .unwrap()
            .as_any()
            .downcast_ref::<Date32Array>()
            .unwrap();
        assert_eq!(date.value(0), 10);
        assert!(batch.column_by_name("wudprojectnum").unwrap().is_null(0));
    }
}
