//! Commodity flag propagation across buffers that share a source document.

use std::collections::HashMap;

use tracing::debug;

use crate::commodity::CommodityFlags;
use crate::record::BufferRecord;

/// OR together the flags of every record with the same `source_document` and
/// write the union back onto each of them.
///
/// Grouping is by exact key equality only. One pass accumulates the union per
/// key, a second pass writes it back. Returns the number of records whose
/// flags changed; a second call on the same slice returns 0.
pub fn merge_group_flags(records: &mut [BufferRecord]) -> usize {
    let mut groups: HashMap<&str, CommodityFlags> = HashMap::new();
    for record in records.iter() {
        let acc = groups.entry(record.source_document()).or_default();
        *acc = acc.union(record.flags);
    }
    let groups: HashMap<String, CommodityFlags> = groups
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

    let mut changed = 0;
    for record in records.iter_mut() {
        let merged = groups[record.source_document()];
        if merged != record.flags {
            debug_assert!(record.flags.is_subset_of(&merged));
            record.flags = merged;
            changed += 1;
        }
    }

    debug!(groups = groups.len(), changed, "merged commodity flags");
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commodity::classify;
    use crate::provenance::Provenance;
    use geo_types::polygon;

    fn record(doc: &str, water_type: &str) -> BufferRecord {
        BufferRecord {
            provenance: Provenance {
                source_document: doc.to_string(),
                document_file: "doc.pdf".into(),
                folder_tag: "P1".into(),
                record_number: "doc".into(),
                record_date: None,
                project_number: None,
            },
            flags: classify(water_type),
            geometry: polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)],
            removed: false,
        }
    }

    #[test]
    fn group_members_share_union() {
        let mut records = vec![
            record("a", "Potable"),
            record("a", "Sewage"),
            record("b", "Raw"),
            record("a", "Treated"),
        ];
        let originals: Vec<CommodityFlags> = records.iter().map(|r| r.flags).collect();
        let changed = merge_group_flags(&mut records);
        assert_eq!(changed, 3);

        let expected_a = originals[0].union(originals[1]).union(originals[3]);
        for i in [0, 1, 3] {
            assert_eq!(records[i].flags, expected_a);
        }
        assert!(expected_a.water && expected_a.sewer && expected_a.other);
        assert!(!expected_a.raw && !expected_a.reclaimed);
        assert_eq!(records[2].flags, originals[2]);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut records = vec![
            record("a", "Potable"),
            record("a", "Reclaimed"),
            record("b", "Sewage"),
        ];
        merge_group_flags(&mut records);
        let once: Vec<CommodityFlags> = records.iter().map(|r| r.flags).collect();
        assert_eq!(merge_group_flags(&mut records), 0);
        let twice: Vec<CommodityFlags> = records.iter().map(|r| r.flags).collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn flags_only_widen() {
        let mut records = vec![record("a", "Potable"), record("a", "Raw")];
        let before: Vec<CommodityFlags> = records.iter().map(|r| r.flags).collect();
        merge_group_flags(&mut records);
        for (b, r) in before.iter().zip(&records) {
            assert!(b.is_subset_of(&r.flags));
        }
    }

    #[test]
    fn keys_are_exact() {
        let mut records = vec![record("a", "Potable"), record("A", "Sewage")];
        assert_eq!(merge_group_flags(&mut records), 0);
        assert!(!records[0].flags.sewer);
    }

    #[test]
    fn empty_input() {
        assert_eq!(merge_group_flags(&mut []), 0);
    }
}
