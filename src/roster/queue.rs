//! Deferred-duty queue reconciliation.

use std::collections::BTreeSet;

use serde::ser::{Serialize, Serializer};

use crate::models::QueueEntry;

/// One member's pending deferrals, in retrieval order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberQueue {
    pub member_id: i64,
    pub entries: Vec<QueueEntry>,
}

/// Pending deferrals grouped by member.
///
/// Members keep the order in which they first appear in the input; entries keep
/// retrieval order, so the last entry of a member is the one consumed first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizedQueue {
    members: Vec<MemberQueue>,
}

impl OrganizedQueue {
    /// Group `entries` by member. Nothing is dropped or deduplicated.
    pub fn organize(entries: impl IntoIterator<Item = QueueEntry>) -> Self {
        let mut members: Vec<MemberQueue> = Vec::new();
        for entry in entries {
            match members.iter_mut().find(|q| q.member_id == entry.member_id) {
                Some(queue) => queue.entries.push(entry),
                None => members.push(MemberQueue {
                    member_id: entry.member_id,
                    entries: vec![entry],
                }),
            }
        }
        Self { members }
    }

    /// Drop every member in `assigned` entirely.
    ///
    /// Members already on duty in the anchor schedule are not slated from the queue in
    /// the same prediction.
    pub fn without_members(mut self, assigned: &BTreeSet<i64>) -> Self {
        self.members.retain(|q| !assigned.contains(&q.member_id));
        self
    }

    pub fn entry_count(&self) -> usize {
        self.members.iter().map(|q| q.entries.len()).sum()
    }

    #[cfg(test)]
    pub fn member_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.members.iter().map(|q| q.member_id)
    }

    #[cfg(test)]
    pub fn entries_of(&self, member_id: i64) -> Option<&[QueueEntry]> {
        self.members
            .iter()
            .find(|q| q.member_id == member_id)
            .map(|q| q.entries.as_slice())
    }

    /// Fold the queue into day buckets of member ids.
    ///
    /// Each bucket takes the newest remaining entry of every member, except members
    /// placed in the previous bucket. Bucket `i` feeds predicted day `i`. Every entry
    /// ends up in exactly one bucket; a bucket may be empty when all remaining members
    /// served the day before.
    pub fn into_buckets(mut self) -> Vec<Vec<i64>> {
        let mut buckets: Vec<Vec<i64>> = Vec::new();
        while !self.members.is_empty() {
            let previous: &[i64] = buckets.last().map(Vec::as_slice).unwrap_or(&[]);
            let mut bucket = Vec::new();
            for queue in &mut self.members {
                if previous.contains(&queue.member_id) {
                    continue;
                }
                if let Some(entry) = queue.entries.pop() {
                    bucket.push(entry.member_id);
                }
            }
            self.members.retain(|q| !q.entries.is_empty());
            buckets.push(bucket);
        }
        buckets
    }
}

impl Serialize for OrganizedQueue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.members.iter().map(|q| (q.member_id, &q.entries)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(id: &str, member_id: i64, day: u32) -> QueueEntry {
        QueueEntry {
            id: id.to_string(),
            member_id,
            deferred_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            status: 0,
            created_at: String::new(),
        }
    }

    #[test]
    fn test_organize_groups_in_first_seen_order() {
        let queue = OrganizedQueue::organize(vec![
            entry("a", 7, 1),
            entry("b", 3, 2),
            entry("c", 7, 3),
        ]);

        assert_eq!(queue.member_ids().collect::<Vec<_>>(), vec![7, 3]);
        let sevens: Vec<&str> = queue
            .entries_of(7)
            .unwrap()
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(sevens, vec!["a", "c"]);
        assert_eq!(queue.entry_count(), 3);
    }

    #[test]
    fn test_without_members_drops_whole_queue() {
        let queue = OrganizedQueue::organize(vec![
            entry("a", 7, 1),
            entry("b", 7, 2),
            entry("c", 3, 3),
        ]);
        let assigned = BTreeSet::from([7]);

        let eligible = queue.without_members(&assigned);
        assert_eq!(eligible.member_ids().collect::<Vec<_>>(), vec![3]);
        assert!(eligible.entries_of(7).is_none());
    }

    #[test]
    fn test_buckets_skip_consecutive_days() {
        let queue = OrganizedQueue::organize(vec![
            entry("a", 5, 1),
            entry("b", 5, 2),
            entry("c", 6, 3),
        ]);

        let buckets = queue.into_buckets();
        assert_eq!(buckets, vec![vec![5, 6], vec![], vec![5]]);
    }

    #[test]
    fn test_buckets_consume_every_entry_once() {
        let queue = OrganizedQueue::organize(vec![
            entry("a", 1, 1),
            entry("b", 2, 1),
            entry("c", 1, 2),
            entry("d", 2, 2),
            entry("e", 1, 3),
        ]);

        let buckets = queue.into_buckets();
        let total: usize = buckets.iter().map(Vec::len).sum();
        assert_eq!(total, 5);
        for pair in buckets.windows(2) {
            assert!(pair[0].iter().all(|m| !pair[1].contains(m)));
        }
    }

    #[test]
    fn test_empty_queue_has_no_buckets() {
        assert!(OrganizedQueue::default().into_buckets().is_empty());
    }

    #[test]
    fn test_serializes_as_member_map() {
        let queue = OrganizedQueue::organize(vec![entry("a", 9, 1)]);
        let value = serde_json::to_value(&queue).unwrap();
        assert_eq!(value["9"][0]["id"], "a");
    }
}
