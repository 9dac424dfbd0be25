//! Detection of repeated submissions within a one-hour window
//!
//! Records sharing exactly the same (age, weight, height) form a partition;
//! within a partition, sorted by timestamp, a record is flagged when it
//! arrived less than an hour after its immediate predecessor. This is an
//! adjacent-diff check, not an any-pair check: a record 61 minutes behind
//! its predecessor is never flagged, even when an older member of the
//! partition is closer in time.

use std::collections::HashMap;

use super::record::Record;

/// Seconds below which two adjacent submissions count as duplicates
const DUPLICATE_WINDOW_SECS: i64 = 3600;

/// Partition key over exact (age, weight, height) equality.
///
/// f64 values are compared by bit pattern so the key is hashable; NaN and
/// missing values never reach the key because such records are excluded
/// from comparison altogether.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct AttrKey {
    age: u64,
    weight: u64,
    height: u64,
}

impl AttrKey {
    fn from_record(rec: &Record) -> Option<AttrKey> {
        let finite = |v: Option<f64>| v.filter(|x| !x.is_nan());
        Some(AttrKey {
            age: finite(rec.age)?.to_bits(),
            weight: finite(rec.weight)?.to_bits(),
            height: finite(rec.height)?.to_bits(),
        })
    }
}

/// Flag records that repeat the same person attributes within one hour.
///
/// Returns one flag per record, aligned with the input order. Records
/// missing any of age, weight or height are never compared and always get
/// `false`; the same holds for records without a timestamp, which cannot be
/// placed on the time axis. The first record of every partition is `false`.
pub fn flag_duplicates(records: &[Record]) -> Vec<bool> {
    let mut partitions: HashMap<AttrKey, Vec<usize>> = HashMap::new();
    for (idx, rec) in records.iter().enumerate() {
        if rec.timestamp.is_none() {
            continue;
        }
        if let Some(key) = AttrKey::from_record(rec) {
            partitions.entry(key).or_default().push(idx);
        }
    }

    let mut flags = vec![false; records.len()];
    for members in partitions.values_mut() {
        // Stable sort: ties keep input order
        members.sort_by_key(|&idx| records[idx].timestamp);
        for pair in members.windows(2) {
            if let (Some(prev), Some(curr)) =
                (records[pair[0]].timestamp, records[pair[1]].timestamp)
            {
                if (curr - prev).num_seconds() < DUPLICATE_WINDOW_SECS {
                    flags[pair[1]] = true;
                }
            }
        }
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(age: f64, weight: f64, height: f64, minute: u32) -> Record {
        Record {
            age: Some(age),
            weight: Some(weight),
            height: Some(height),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(10 + minute / 60, minute % 60, 0),
            ..Record::default()
        }
    }

    #[test]
    fn first_of_partition_is_never_flagged() {
        let records = vec![rec(25.0, 70.0, 170.0, 0), rec(25.0, 70.0, 170.0, 30)];
        assert_eq!(flag_duplicates(&records), vec![false, true]);
    }

    #[test]
    fn chain_of_adjacent_duplicates() {
        // 30 minutes apart pairwise: all but the first flag
        let records = vec![
            rec(25.0, 70.0, 170.0, 0),
            rec(25.0, 70.0, 170.0, 30),
            rec(25.0, 70.0, 170.0, 60),
            rec(25.0, 70.0, 170.0, 90),
        ];
        assert_eq!(flag_duplicates(&records), vec![false, true, true, true]);
    }

    #[test]
    fn adjacent_diff_not_nearest_neighbor() {
        // third record is 61 minutes after its immediate predecessor, so it
        // does not flag even though the first record is further back still
        let records = vec![
            rec(25.0, 70.0, 170.0, 0),
            rec(25.0, 70.0, 170.0, 59),
            rec(25.0, 70.0, 170.0, 120),
        ];
        assert_eq!(flag_duplicates(&records), vec![false, true, false]);
    }

    #[test]
    fn differing_attributes_never_share_a_partition() {
        let records = vec![rec(25.0, 70.0, 170.0, 0), rec(25.0, 70.0, 171.0, 10)];
        assert_eq!(flag_duplicates(&records), vec![false, false]);
    }

    #[test]
    fn missing_attribute_is_always_false() {
        let mut incomplete = rec(25.0, 70.0, 170.0, 10);
        incomplete.age = None;
        let records = vec![rec(25.0, 70.0, 170.0, 0), incomplete];
        assert_eq!(flag_duplicates(&records), vec![false, false]);
    }

    #[test]
    fn missing_timestamp_is_always_false() {
        let mut untimed = rec(25.0, 70.0, 170.0, 10);
        untimed.timestamp = None;
        let records = vec![rec(25.0, 70.0, 170.0, 0), untimed, rec(25.0, 70.0, 170.0, 20)];
        assert_eq!(flag_duplicates(&records), vec![false, false, true]);
    }

    #[test]
    fn flags_align_with_input_order() {
        // later timestamp listed first: flag lands on the later record
        let records = vec![rec(25.0, 70.0, 170.0, 30), rec(25.0, 70.0, 170.0, 0)];
        assert_eq!(flag_duplicates(&records), vec![true, false]);
    }

    #[test]
    fn idempotent_over_repeated_runs() {
        let records = vec![
            rec(25.0, 70.0, 170.0, 0),
            rec(25.0, 70.0, 170.0, 30),
            rec(40.0, 90.0, 180.0, 15),
        ];
        let first = flag_duplicates(&records);
        let second = flag_duplicates(&records);
        assert_eq!(first, second);
    }
}
