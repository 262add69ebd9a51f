//! Round-robin candidate selection.
//!
//! The rotation pool is ordered by ascending member id. That order is what makes the
//! rotation fair, so it never depends on how the store happens to return members.

use crate::models::{AssignmentStatus, Member, Schedule};

use super::RosterError;

/// Resume point of the rotation: the pool and the position of the last member used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationCursor {
    pool: Vec<i64>,
    position: usize,
}

impl RotationCursor {
    /// Build a cursor over `pool` resuming after `marker`.
    ///
    /// The pool is sorted and deduplicated first.
    pub fn new(pool: impl IntoIterator<Item = i64>, marker: i64) -> Result<Self, RosterError> {
        let mut pool: Vec<i64> = pool.into_iter().collect();
        pool.sort_unstable();
        pool.dedup();
        let position = pool
            .binary_search(&marker)
            .map_err(|_| RosterError::MarkerNotInPool { member_id: marker })?;
        Ok(Self { pool, position })
    }

    /// Cursor over the members eligible for rotation.
    pub fn from_members(members: &[Member], marker: i64) -> Result<Self, RosterError> {
        Self::new(
            members.iter().filter(|m| m.in_rotation()).map(|m| m.id),
            marker,
        )
    }

    /// Cursor resuming after the marker of a committed schedule.
    pub fn resolve(members: &[Member], anchor: &Schedule) -> Result<Self, RosterError> {
        Self::from_members(members, find_marker(anchor)?)
    }

    pub fn pool(&self) -> &[i64] {
        &self.pool
    }

    /// The member the rotation last stopped at.
    pub fn marker(&self) -> i64 {
        self.pool[self.position]
    }

    /// Take the next `count` members, wrapping around the pool as often as needed.
    ///
    /// A non-positive `count` takes nothing.
    pub fn take(&mut self, count: i64) -> Vec<i64> {
        let count = usize::try_from(count).unwrap_or(0);
        let mut picked = Vec::with_capacity(count.min(self.pool.len()));
        for _ in 0..count {
            self.position = (self.position + 1) % self.pool.len();
            picked.push(self.pool[self.position]);
        }
        picked
    }
}

/// Locate the rotation marker in the `pre` list of a committed schedule.
///
/// Entries are scanned in order; a pending entry before the marker means the schedule
/// was never settled.
pub fn find_marker(schedule: &Schedule) -> Result<i64, RosterError> {
    for assignment in &schedule.pre {
        match assignment.status {
            AssignmentStatus::Pending => {
                return Err(RosterError::MarkerStatus {
                    date: schedule.date,
                    member_id: assignment.member_id,
                })
            }
            AssignmentStatus::Marker => return Ok(assignment.member_id),
            AssignmentStatus::Confirmed => continue,
        }
    }
    Err(RosterError::MarkerIntegrity {
        date: schedule.date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assignment, GENERAL_MEMBER_TYPE};
    use chrono::NaiveDate;

    fn anchor(pre: Vec<Assignment>) -> Schedule {
        let mut schedule = Schedule::empty(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        schedule.pre = pre;
        schedule
    }

    fn member(id: i64, member_type: i64, status: i64) -> Member {
        Member {
            id,
            name: None,
            member_type,
            status,
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_take_starts_after_marker_and_wraps() {
        let mut cursor = RotationCursor::new(vec![1, 2, 3, 4, 5, 6], 3).unwrap();
        assert_eq!(cursor.take(8), vec![4, 5, 6, 1, 2, 3, 4, 5]);
        assert_eq!(cursor.marker(), 5);
        assert_eq!(cursor.take(2), vec![6, 1]);
    }

    #[test]
    fn test_take_matches_modular_formula() {
        let pool = vec![10, 20, 30, 40, 50];
        for m in 0..pool.len() {
            let mut cursor = RotationCursor::new(pool.clone(), pool[m]).unwrap();
            let picked = cursor.take(12);
            for (k, id) in picked.iter().enumerate() {
                assert_eq!(*id, pool[(m + k + 1) % pool.len()]);
            }
        }
    }

    #[test]
    fn test_non_positive_count_takes_nothing() {
        let mut cursor = RotationCursor::new(vec![1, 2, 3], 2).unwrap();
        assert!(cursor.take(0).is_empty());
        assert!(cursor.take(-5).is_empty());
        assert_eq!(cursor.marker(), 2);
    }

    #[test]
    fn test_take_far_beyond_pool_size() {
        let mut cursor = RotationCursor::new(vec![1, 2, 3], 2).unwrap();
        let picked = cursor.take(10_000);
        assert_eq!(picked.len(), 10_000);
        assert_eq!(&picked[..4], &[3, 1, 2, 3]);
        assert_eq!(cursor.marker(), picked[9_999]);
    }

    #[test]
    fn test_pool_order_is_independent_of_input_order() {
        let mut cursor = RotationCursor::new(vec![6, 2, 4, 1, 5, 3, 3], 3).unwrap();
        assert_eq!(cursor.pool(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(cursor.take(3), vec![4, 5, 6]);
    }

    #[test]
    fn test_marker_must_be_in_pool() {
        let members = vec![
            member(1, GENERAL_MEMBER_TYPE, 1),
            member(2, GENERAL_MEMBER_TYPE, 0),
            member(3, 2, 1),
        ];
        assert!(RotationCursor::from_members(&members, 1).is_ok());
        assert!(matches!(
            RotationCursor::from_members(&members, 2),
            Err(RosterError::MarkerNotInPool { member_id: 2 })
        ));
        assert!(matches!(
            RotationCursor::from_members(&members, 3),
            Err(RosterError::MarkerNotInPool { member_id: 3 })
        ));
    }

    #[test]
    fn test_find_marker_skips_confirmed_entries() {
        let schedule = anchor(vec![Assignment::confirmed(9), Assignment::marker(4)]);
        assert_eq!(find_marker(&schedule).unwrap(), 4);
    }

    #[test]
    fn test_find_marker_missing() {
        let schedule = anchor(vec![Assignment::confirmed(9)]);
        assert!(matches!(
            find_marker(&schedule),
            Err(RosterError::MarkerIntegrity { .. })
        ));
    }

    #[test]
    fn test_find_marker_rejects_pending_entry() {
        let schedule = anchor(vec![
            Assignment {
                member_id: 7,
                status: AssignmentStatus::Pending,
            },
            Assignment::marker(4),
        ]);
        assert!(matches!(
            find_marker(&schedule),
            Err(RosterError::MarkerStatus { member_id: 7, .. })
        ));
    }
}
