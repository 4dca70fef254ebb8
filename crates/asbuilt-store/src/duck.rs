//! DuckDB destination collection for as-built polygons and their attachments.

use std::path::Path;

use arrow::record_batch::RecordBatch;
use asbuilt_core::asbuilt::{ATTACHMENTS_TABLE, POLYGONS_TABLE, SRID};
use asbuilt_core::commodity::yes_no;
use asbuilt_core::{Attachment, Commodity, DissolvedPolygon, OutputCollection, RowRef};
use chrono::{NaiveDateTime, Utc};
use duckdb::{Connection, OptionalExt, params};
use tracing::info;

use crate::{StoreError, new_global_id};

const SCHEMA_SQL: &str = "
CREATE SEQUENCE IF NOT EXISTS asbuilt_polygons_objectid START 1;
CREATE SEQUENCE IF NOT EXISTS asbuilt_polygons__attach_id START 1;

CREATE TABLE IF NOT EXISTS asbuilt_polygons (
    objectid BIGINT PRIMARY KEY DEFAULT nextval('asbuilt_polygons_objectid'),
    globalid VARCHAR NOT NULL UNIQUE,
    pbcwudfile VARCHAR,
    hyperlink VARCHAR NOT NULL CHECK (hyperlink <> ''),
    p56folder VARCHAR,
    asbuiltno VARCHAR,
    asbuiltdate DATE,
    wudprojectnum VARCHAR,
    water VARCHAR NOT NULL CHECK (water IN ('Yes', 'No')),
    sewer VARCHAR NOT NULL CHECK (sewer IN ('Yes', 'No')),
    reclaimed VARCHAR NOT NULL CHECK (reclaimed IN ('Yes', 'No')),
    raw VARCHAR NOT NULL CHECK (raw IN ('Yes', 'No')),
    other VARCHAR NOT NULL CHECK (other IN ('Yes', 'No')),
    lifecyclestatusremoved VARCHAR NOT NULL,
    shape VARCHAR NOT NULL,
    srid INTEGER NOT NULL,
    created_date TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS asbuilt_polygons__attach (
    attachmentid BIGINT PRIMARY KEY DEFAULT nextval('asbuilt_polygons__attach_id'),
    rel_objectid BIGINT NOT NULL,
    rel_globalid VARCHAR NOT NULL REFERENCES asbuilt_polygons (globalid),
    att_name VARCHAR NOT NULL,
    content_type VARCHAR,
    data_size BIGINT NOT NULL,
    data BLOB NOT NULL
);
";

const INSERT_POLYGON_SQL: &str = "
INSERT INTO asbuilt_polygons (
    globalid, pbcwudfile, hyperlink, p56folder, asbuiltno, asbuiltdate, wudprojectnum,
    water, sewer, reclaimed, raw, other, lifecyclestatusremoved, shape, srid, created_date
) VALUES (?, ?, ?, ?, ?, ?::DATE, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?::TIMESTAMP)
RETURNING objectid";

/// DuckDB store holding the `asbuilt_polygons` layer and its attachment table.
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
/// Tables are created on open if missing. Polygon batches are written in a
/// single transaction that rolls back when dropped uncommitted.
pub struct DuckStore {
    conn: Connection,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_schema(conn)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::with_schema(conn)
    }

    fn with_schema(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    // ── Counts ──

    /// Number of rows in the polygon table.
    pub fn polygon_count(&self) -> Result<usize, StoreError> {
        self.count_table(POLYGONS_TABLE)
    }

    /// Number of rows in the attachment table.
    pub fn attachment_count(&self) -> Result<usize, StoreError> {
        self.count_table(ATTACHMENTS_TABLE)
    }

    fn count_table(&self, table: &str) -> Result<usize, StoreError> {
        let sql = format!("SELECT count(*)::BIGINT AS cnt FROM {table}");
        let mut stmt = self.conn.prepare(&sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        let batch = batches.first().ok_or(StoreError::NoResults)?;
        let col = batch
            .column(0)
            .as_any()
            .downcast_ref::<arrow::array::Int64Array>()
            .ok_or_else(|| StoreError::Other("count column not i64".into()))?;
        Ok(col.value(0) as usize)
    }

    // ── Writes ──

    /// Insert a batch with an explicit creation timestamp.
    pub fn insert_polygons_at(
        &mut self,
        polygons: &[DissolvedPolygon],
        created_date: NaiveDateTime,
    ) -> Result<Vec<RowRef>, StoreError> {
        let created = created_date.format("%Y-%m-%d %H:%M:%S%.6f").to_string();
        let tx = self.conn.transaction()?;
        let mut rows = Vec::with_capacity(polygons.len());
        {
            let mut stmt = tx.prepare(INSERT_POLYGON_SQL)?;
            for polygon in polygons {
                let p = &polygon.provenance;
                let flags: Vec<&str> = Commodity::ALL
                    .iter()
                    .map(|c| yes_no(polygon.flags.get(*c)))
                    .collect();
                let global_id = new_global_id();
                let object_id: i64 = stmt.query_row(
                    params![
                        global_id,
                        p.document_file,
                        p.source_document,
                        p.folder_tag,
                        p.record_number,
                        p.record_date,
                        p.project_number,
                        flags[0],
                        flags[1],
                        flags[2],
                        flags[3],
                        flags[4],
                        yes_no(polygon.removed),
                        polygon.to_wkt(),
                        SRID,
                        created,
                    ],
                    |row| row.get(0),
                )?;
                rows.push(RowRef {
                    object_id,
                    global_id,
                });
            }
        }
        tx.commit()?;
        info!(rows = rows.len(), "inserted polygons into duckdb");
        Ok(rows)
    }

    // ── Reads ──

    /// All polygon rows in object id order.
    pub fn polygons_batch(&self) -> Result<Vec<RecordBatch>, StoreError> {
        self.query_arrow(&format!("SELECT * FROM {POLYGONS_TABLE} ORDER BY objectid"))
    }

    /// Bytes of the latest attachment linked to `global_id`.
    pub fn attachment_data(&self, global_id: &str) -> Result<Vec<u8>, StoreError> {
        let sql = format!(
            "SELECT data FROM {ATTACHMENTS_TABLE} WHERE rel_globalid = ? \
             ORDER BY attachmentid DESC LIMIT 1"
        );
        self.conn
            .query_row(&sql, [global_id], |row| row.get(0))
            .optional()?
            .ok_or(StoreError::NoResults)
    }

    // ── Escape hatch ──

    /// Execute arbitrary SQL and return Arrow RecordBatches.
    pub fn query_arrow(&self, sql: &str) -> Result<Vec<RecordBatch>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        Ok(batches)
    }

    /// Access the underlying DuckDB connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl OutputCollection for DuckStore {
    type Error = StoreError;

    fn insert_polygons(
        &mut self,
        polygons: &[DissolvedPolygon],
    ) -> Result<Vec<RowRef>, StoreError> {
        self.insert_polygons_at(polygons, Utc::now().naive_utc())
    }

    fn newest_row(&self) -> Result<Option<RowRef>, StoreError> {
        let sql = format!(
            "SELECT objectid, globalid FROM {POLYGONS_TABLE} \
             ORDER BY created_date DESC, objectid DESC LIMIT 1"
        );
        let row = self
            .conn
            .query_row(&sql, [], |row| {
                Ok(RowRef {
                    object_id: row.get(0)?,
                    global_id: row.get(1)?,
                })
            })
            .optional()?;
        Ok(row)
    }

    fn insert_attachment(
        &mut self,
        target: &RowRef,
        attachment: Attachment,
    ) -> Result<i64, StoreError> {
        let tx = self.conn.transaction()?;
        let exists: i64 = tx.query_row(
            &format!(
                "SELECT count(*)::BIGINT FROM {POLYGONS_TABLE} WHERE objectid = ? AND globalid = ?"
            ),
            params![target.object_id, target.global_id],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(StoreError::UnknownRow(target.global_id.clone()));
        }
        let size = attachment.data.len() as i64;
        let id: i64 = tx.query_row(
            &format!(
                "INSERT INTO {ATTACHMENTS_TABLE} \
                 (rel_objectid, rel_globalid, att_name, content_type, data_size, data) \
                 VALUES (?, ?, ?, ?, ?, ?) RETURNING attachmentid"
            ),
            params![
                target.object_id,
                target.global_id,
                attachment.name,
                attachment.content_type,
                size,
                attachment.data,
            ],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asbuilt_core::{CommodityFlags, Provenance, asbuilt, classify};
    use chrono::DateTime;
    use geo_types::{MultiPolygon, polygon};

    fn dissolved(doc: &str, water_type: &str) -> DissolvedPolygon {
        DissolvedPolygon {
            provenance: Provenance {
                source_document: doc.to_string(),
                document_file: "12345_site.pdf".into(),
                folder_tag: "P56".into(),
                record_number: "12345_s".into(),
                record_date: Some("2024-03-01".into()),
                project_number: Some("WUD 21-104".into()),
            },
            flags: classify(water_type),
            removed: false,
            geometry: MultiPolygon::new(vec![
                polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
            ]),
            members: 1,
        }
    }

    fn at(secs: i64) -> NaiveDateTime {
        DateTime::from_timestamp(secs, 0).unwrap().naive_utc()
    }

    #[test]
    fn open_in_memory_creates_empty_tables() {
        let store = DuckStore::open().unwrap();
        assert_eq!(store.polygon_count().unwrap(), 0);
        assert_eq!(store.attachment_count().unwrap(), 0);
        assert!(store.newest_row().unwrap().is_none());
    }

    #[test]
    fn insert_returns_sequential_ids() {
        let mut store = DuckStore::open().unwrap();
        let rows = store
            .insert_polygons(&[dissolved("a", "Potable"), dissolved("b", "Sewage")])
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[1].object_id > rows[0].object_id);
        assert_eq!(store.polygon_count().unwrap(), 2);
    }

    #[test]
    fn failed_batch_rolls_back() {
        let mut store = DuckStore::open().unwrap();
        let result = store.insert_polygons(&[dissolved("a", "Potable"), dissolved("", "Raw")]);
        assert!(matches!(result, Err(StoreError::DuckDb(_))));
        assert_eq!(store.polygon_count().unwrap(), 0);
    }

    #[test]
    fn newest_row_orders_by_created_then_objectid() {
        let mut store = DuckStore::open().unwrap();
        let late = store
            .insert_polygons_at(&[dissolved("a", "Potable")], at(2_000))
            .unwrap();
        store
            .insert_polygons_at(&[dissolved("b", "Potable")], at(1_000))
            .unwrap();
        assert_eq!(store.newest_row().unwrap().unwrap(), late[0]);

        let tied = store
            .insert_polygons_at(
                &[dissolved("c", "Potable"), dissolved("d", "Raw")],
                at(3_000),
            )
            .unwrap();
        assert_eq!(store.newest_row().unwrap().unwrap(), tied[1]);
    }

    #[test]
    fn attachment_round_trip() {
        let mut store = DuckStore::open().unwrap();
        let rows = store.insert_polygons(&[dissolved("a", "Potable")]).unwrap();
        let id = store
            .insert_attachment(
                &rows[0],
                Attachment {
                    name: "12345_site.pdf".into(),
                    content_type: "application/pdf".into(),
                    data: b"%PDF-1.4".to_vec(),
                },
            )
            .unwrap();
        assert!(id > 0);
        assert_eq!(store.attachment_count().unwrap(), 1);
        assert_eq!(store.attachment_data(&rows[0].global_id).unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn attachment_to_unknown_row_fails() {
        let mut store = DuckStore::open().unwrap();
        let ghost = RowRef {
            object_id: 42,
            global_id: "{GHOST}".into(),
        };
        let err = store
            .insert_attachment(
                &ghost,
                Attachment {
                    name: "x.pdf".into(),
                    content_type: "application/pdf".into(),
                    data: vec![0],
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownRow(_)));
        assert_eq!(store.attachment_count().unwrap(), 0);
    }

    #[test]
    fn polygons_batch_matches_core_schema() {
        let mut store = DuckStore::open().unwrap();
        let mut flags = CommodityFlags::default();
        flags.water = true;
        flags.sewer = true;
        let mut polygon = dissolved("a", "Potable");
        polygon.flags = flags;
        store.insert_polygons(&[polygon]).unwrap();

        let batches = store.polygons_batch().unwrap();
        let batch = &batches[0];
        assert_eq!(batch.num_rows(), 1);
        let expected = asbuilt::polygons_schema();
        let names: Vec<&str> = batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        let expected_names: Vec<&str> = expected.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, expected_names);

        let sewer = batch
            .column_by_name("sewer")
            .unwrap()
            .as_any()
            .downcast_ref::<arrow::array::StringArray>()
            .unwrap();
        assert_eq!(sewer.value(0), "Yes");
    }

    #[test]
    fn persistent_store_survives_reopen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let db_path = tmp.path().join("asbuilt.duckdb");

        let mut store = DuckStore::open_persistent(&db_path).unwrap();
        assert!(db_path.exists());
        let rows = store.insert_polygons(&[dissolved("a", "Potable")]).unwrap();
        drop(store);

        let store = DuckStore::open_persistent(&db_path).unwrap();
        assert_eq!(store.polygon_count().unwrap(), 1);
        assert_eq!(store.newest_row().unwrap().unwrap(), rows[0]);
    }
}
