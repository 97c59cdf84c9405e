//! Deletion-marker handling that runs beneath the attached iterators.

use strata_core::{Key, PartialKey, Record};

/// Drop every put hidden by a deletion marker.
///
/// Input must be in key order. A marker hides all versions of its cell at or
/// before its timestamp, which in key order are exactly the records that
/// follow it within the same cell. With `keep_markers` the markers
/// themselves are kept so a later compaction can still apply them.
pub(crate) fn apply_deletes(records: impl IntoIterator<Item = Record>, keep_markers: bool) -> Vec<Record> {
    let mut out = Vec::new();
    let mut deleted_cell: Option<Key> = None;

    for record in records {
        if let Some(marker) = &deleted_cell {
            if marker.equals(&record.key, PartialKey::RowFamilyQualifierVisibility) {
                continue;
            }
            deleted_cell = None;
        }

        if record.key.deleted {
            deleted_cell = Some(record.key.clone());
            if keep_markers {
                out.push(record);
            }
            continue;
        }
        out.push(record);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(row: &str, cq: &str, ts: i64) -> Record {
        Record::new(Key::new(row, "f", cq, ts), ts.to_string())
    }

    fn delete(row: &str, cq: &str, ts: i64) -> Record {
        Record::new(Key::new(row, "f", cq, ts).into_delete(), "")
    }

    fn timestamps(records: &[Record]) -> Vec<(i64, bool)> {
        records.iter().map(|r| (r.key.timestamp, r.key.deleted)).collect()
    }

    #[test]
    fn test_marker_hides_older_versions() {
        let input = vec![put("a", "q", 9), delete("a", "q", 5), put("a", "q", 5), put("a", "q", 2)];
        assert_eq!(timestamps(&apply_deletes(input.clone(), false)), vec![(9, false)]);
        assert_eq!(
            timestamps(&apply_deletes(input, true)),
            vec![(9, false), (5, true)]
        );
    }

    #[test]
    fn test_marker_scoped_to_cell() {
        let input = vec![delete("a", "q", 5), put("a", "q", 1), put("a", "r", 1), put("b", "q", 1)];
        let out = apply_deletes(input, false);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].key.qualifier, "r");
        assert_eq!(out[1].key.row, "b");
    }

    #[test]
    fn test_visibility_is_part_of_cell() {
        let hidden = Record::new(Key::new("a", "f", "q", 1), "x");
        let other = Record::new(Key::new("a", "f", "q", 1).with_visibility("secret"), "y");
        let input = vec![delete("a", "q", 5), hidden, other];
        let out = apply_deletes(input, false);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key.visibility, "secret");
    }

    #[test]
    fn test_older_markers_collapse() {
        let input = vec![delete("a", "q", 8), delete("a", "q", 4), put("a", "q", 3)];
        assert_eq!(timestamps(&apply_deletes(input, true)), vec![(8, true)]);
    }
}
