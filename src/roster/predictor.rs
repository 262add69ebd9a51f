//! Schedule prediction.
//!
//! Deferred-duty demand is placed in the middle of the day starting at slot 4; the
//! rotation fills the remaining seats starting at slot 1.

use chrono::NaiveDate;

use crate::calendar::WorkingCalendar;
use crate::models::{
    Assignment, MainSlots, PredictedSchedule, Schedule, DAILY_HEADCOUNT, GENERAL_MEMBER_TYPE,
    SLOT_COUNT,
};

use super::{OrganizedQueue, RosterError, RosterStore, RotationCursor};

/// First slot that receives deferred members.
pub const QUEUE_START_SLOT: usize = 4;

/// First slot that receives rotation members.
pub const ROTATION_START_SLOT: usize = 1;

/// Derives upcoming schedules from the store's current state.
pub struct Predictor<'a, S: ?Sized> {
    store: &'a S,
    calendar: WorkingCalendar,
}

impl<'a, S: RosterStore + ?Sized> Predictor<'a, S> {
    pub fn new(store: &'a S, calendar: WorkingCalendar) -> Self {
        Self { store, calendar }
    }

    /// Predict `day_delta` working days of schedules.
    ///
    /// The window always starts right after the latest committed schedule. When
    /// `start_date` lies further ahead, the working days strictly between the two are
    /// added to the window so the rotation stays continuous.
    pub async fn predict(
        &self,
        start_date: NaiveDate,
        day_delta: u32,
    ) -> Result<Vec<PredictedSchedule>, RosterError> {
        let anchor = self
            .store
            .latest_schedule()
            .await?
            .ok_or(RosterError::NoBaseline)?;

        let days = self.window_len(anchor.date, start_date, day_delta);
        let first_day = self.calendar.first_predictable_day(anchor.date);

        let queue = self.eligible_queue(&anchor).await?;
        let queued = queue.entry_count();
        let buckets = queue.into_buckets();
        let needed = (days * DAILY_HEADCOUNT) as i64 - queued as i64;

        let mut cursor = self.cursor_after(&anchor).await?;
        let marker = cursor.marker();

        tracing::debug!(
            anchor = %anchor.date,
            first_day = %first_day,
            days,
            queued,
            needed,
            pool = cursor.pool().len(),
            marker,
            "Predicting schedules"
        );

        let rotation = cursor.take(needed);

        Ok(pack_window(
            &self.calendar,
            first_day,
            days,
            &buckets,
            rotation,
            marker,
        ))
    }

    /// The next `count` rotation members after the marker of `anchor`.
    pub async fn select(&self, anchor: &Schedule, count: i64) -> Result<Vec<i64>, RosterError> {
        let mut cursor = self.cursor_after(anchor).await?;
        Ok(cursor.take(count))
    }

    /// Pending deferrals of members not already serving in `anchor`.
    pub async fn eligible_queue(&self, anchor: &Schedule) -> Result<OrganizedQueue, RosterError> {
        let assigned = anchor.confirmed_members();
        let pending = self.store.pending_queue(&assigned).await?;
        Ok(OrganizedQueue::organize(pending).without_members(&assigned))
    }

    /// `day_delta` plus the catch-up days between `last_committed` and `start_date`.
    pub fn window_len(
        &self,
        last_committed: NaiveDate,
        start_date: NaiveDate,
        day_delta: u32,
    ) -> usize {
        day_delta as usize + self.calendar.catch_up_days(last_committed, start_date) as usize
    }

    async fn cursor_after(&self, anchor: &Schedule) -> Result<RotationCursor, RosterError> {
        let pool = self.store.members_of_type(GENERAL_MEMBER_TYPE).await?;
        match RotationCursor::resolve(&pool, anchor) {
            Err(RosterError::MarkerNotInPool { member_id }) => {
                let state = match self.store.member(member_id).await? {
                    Some(member) if !member.is_active() => "inactive",
                    Some(_) => "exempt from rotation",
                    None => "unknown",
                };
                tracing::warn!(member_id, state, "Rotation marker is not in the pool");
                Err(RosterError::MarkerNotInPool { member_id })
            }
            other => other,
        }
    }
}

/// Lay out `days` predicted schedules starting at `first_day`.
///
/// `buckets[i]` is placed on day `i` from [`QUEUE_START_SLOT`]; rotation members are
/// consumed in order from [`ROTATION_START_SLOT`] until each day is full. Each schedule's
/// `pre` list carries a marker on the last rotation member placed that day, so committing
/// a prediction unchanged continues the rotation where it stopped. Members that cannot be
/// seated are reported in `overflow` instead of being dropped silently.
pub fn pack_window(
    calendar: &WorkingCalendar,
    first_day: NaiveDate,
    days: usize,
    buckets: &[Vec<i64>],
    rotation: Vec<i64>,
    marker: i64,
) -> Vec<PredictedSchedule> {
    let mut rotation = rotation.into_iter();
    let mut marker = marker;
    let mut predicted: Vec<PredictedSchedule> = calendar
        .working_days_from(first_day, days)
        .into_iter()
        .enumerate()
        .map(|(i, date)| {
            let mut schedule = Schedule::empty(date);

            let deferred = buckets.get(i).map(Vec::as_slice).unwrap_or(&[]);
            let mut overflow = fill_from(
                &mut schedule.main,
                QUEUE_START_SLOT,
                deferred.iter().copied(),
            );

            let free = DAILY_HEADCOUNT - schedule.main.headcount();
            let todays: Vec<i64> = rotation.by_ref().take(free).collect();
            if let Some(&last) = todays.last() {
                marker = last;
            }
            // empty: at most `free` members were taken
            overflow.extend(fill_from(
                &mut schedule.main,
                ROTATION_START_SLOT,
                todays,
            ));
            schedule.pre.push(Assignment::marker(marker));

            if !overflow.is_empty() {
                tracing::warn!(
                    date = %date,
                    members = ?overflow,
                    "Members do not fit into the day"
                );
            }

            PredictedSchedule {
                schedule,
                verified: false,
                overflow,
            }
        })
        .collect();

    let unscheduled: Vec<i64> = buckets.iter().skip(days).flatten().copied().collect();
    if !unscheduled.is_empty() {
        tracing::warn!(
            members = ?unscheduled,
            "Deferred members fall beyond the window and are not seated"
        );
    }

    let leftover: Vec<i64> = rotation.collect();
    if !leftover.is_empty() {
        tracing::warn!(members = ?leftover, "Rotation members left over after the window");
        if let Some(last) = predicted.last_mut() {
            last.overflow.extend(leftover);
        }
    }

    predicted
}

/// Seat `ids` from slot `start` upward, filling each slot before moving on.
/// Returns the ids that found no free seat.
fn fill_from(main: &mut MainSlots, start: usize, ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut slot = start;
    let mut unplaced = Vec::new();
    for id in ids {
        while slot <= SLOT_COUNT && main.is_full(slot) {
            slot += 1;
        }
        if !main.try_push(slot, Assignment::confirmed(id)) {
            unplaced.push(id);
        }
    }
    unplaced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssignmentStatus, Member, QueueEntry, SLOT_CAPACITY};
    use crate::roster::memory::MemoryStore;
    use chrono::{Datelike, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn member(id: i64) -> Member {
        Member {
            id,
            name: None,
            member_type: GENERAL_MEMBER_TYPE,
            status: 1,
            updated_at: String::new(),
        }
    }

    fn pending(id: &str, member_id: i64) -> QueueEntry {
        QueueEntry {
            id: id.to_string(),
            member_id,
            deferred_date: date(2024, 1, 2),
            status: 0,
            created_at: String::new(),
        }
    }

    fn anchor(day: NaiveDate, marker: i64) -> Schedule {
        let mut schedule = Schedule::empty(day);
        schedule.pre.push(Assignment::marker(marker));
        schedule
    }

    fn store() -> MemoryStore {
        MemoryStore {
            members: (1..=6).map(member).collect(),
            ..Default::default()
        }
        .with_schedule(anchor(date(2024, 1, 10), 3))
    }

    fn ids(slot: &[Assignment]) -> Vec<i64> {
        slot.iter().map(|a| a.member_id).collect()
    }

    #[tokio::test]
    async fn test_single_day_cycles_the_pool() {
        let store = store();
        let predictor = Predictor::new(&store, WorkingCalendar::default());

        let predicted = predictor.predict(date(2024, 1, 11), 1).await.unwrap();
        assert_eq!(predicted.len(), 1);

        let day = &predicted[0];
        assert_eq!(day.schedule.date, date(2024, 1, 11));
        assert!(!day.verified);
        assert!(day.overflow.is_empty());

        let seated: Vec<i64> = day.schedule.main.iter().map(|a| a.member_id).collect();
        assert_eq!(
            seated,
            vec![4, 5, 6, 1, 2, 3, 4, 5, 6, 1, 2, 3, 4, 5, 6, 1]
        );
        assert_eq!(ids(day.schedule.main.slot(1)), vec![4, 5]);
        assert_eq!(day.schedule.pre, vec![Assignment::marker(1)]);
    }

    #[tokio::test]
    async fn test_deferred_member_lands_in_slot_four() {
        let mut store = store();
        store.queue.push(pending("q1", 5));
        let predictor = Predictor::new(&store, WorkingCalendar::default());

        let predicted = predictor.predict(date(2024, 1, 11), 1).await.unwrap();
        let main = &predicted[0].schedule.main;

        assert_eq!(main.slot(4)[0].member_id, 5);
        assert_eq!(main.slot(4).len(), 2);
        assert_eq!(main.headcount(), 16);
        // 15 rotation members: slots 1-3 take six, the seventh joins member 5 in slot 4
        assert_eq!(ids(main.slot(3)), vec![2, 3]);
        assert_eq!(ids(main.slot(4)), vec![5, 4]);
    }

    #[tokio::test]
    async fn test_serving_members_are_not_taken_from_queue() {
        let mut store = store();
        let mut anchor = anchor(date(2024, 1, 10), 3);
        anchor.main.try_push(1, Assignment::confirmed(5));
        store.schedules.insert(anchor.date, anchor);
        store.queue.push(pending("q1", 5));
        store.queue.push(pending("q2", 2));
        let predictor = Predictor::new(&store, WorkingCalendar::default());

        let predicted = predictor.predict(date(2024, 1, 11), 1).await.unwrap();
        let main = &predicted[0].schedule.main;
        assert_eq!(main.slot(4)[0].member_id, 2);
        assert_eq!(main.headcount(), 16);
    }

    #[tokio::test]
    async fn test_window_skips_rest_day_without_losing_days() {
        let store = store();
        let predictor = Predictor::new(&store, WorkingCalendar::default());

        let predicted = predictor.predict(date(2024, 1, 11), 4).await.unwrap();
        let dates: Vec<NaiveDate> = predicted.iter().map(|p| p.schedule.date).collect();
        assert_eq!(
            dates,
            vec![
                date(2024, 1, 11),
                date(2024, 1, 12),
                date(2024, 1, 14),
                date(2024, 1, 15)
            ]
        );
        for day in &predicted {
            assert_ne!(day.schedule.date.weekday(), Weekday::Sat);
            for slot in 1..=SLOT_COUNT {
                assert!(day.schedule.main.slot(slot).len() <= SLOT_CAPACITY);
            }
            let json = serde_json::to_value(&day.schedule.main).unwrap();
            assert_eq!(json.as_object().unwrap().len(), SLOT_COUNT);
        }
    }

    #[tokio::test]
    async fn test_rotation_continues_across_days() {
        let store = store();
        let predictor = Predictor::new(&store, WorkingCalendar::default());

        let predicted = predictor.predict(date(2024, 1, 11), 2).await.unwrap();
        // day one ends on member 1, so day two resumes at member 2
        assert_eq!(predicted[0].schedule.pre, vec![Assignment::marker(1)]);
        assert_eq!(ids(predicted[1].schedule.main.slot(1)), vec![2, 3]);
        assert_eq!(predicted[1].schedule.pre, vec![Assignment::marker(5)]);
    }

    #[tokio::test]
    async fn test_future_start_extends_window() {
        let store = store();
        let predictor = Predictor::new(&store, WorkingCalendar::default());

        // 11th, 12th and 14th lie strictly between the anchor and the 15th
        let predicted = predictor.predict(date(2024, 1, 15), 1).await.unwrap();
        assert_eq!(predicted.len(), 4);
        assert_eq!(predicted[0].schedule.date, date(2024, 1, 11));
        assert_eq!(predicted[3].schedule.date, date(2024, 1, 15));
    }

    #[tokio::test]
    async fn test_zero_days_predicts_nothing() {
        let store = store();
        let predictor = Predictor::new(&store, WorkingCalendar::default());
        assert!(predictor
            .predict(date(2024, 1, 11), 0)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_prediction_is_deterministic() {
        let mut store = store();
        store.queue.push(pending("q1", 5));
        store.queue.push(pending("q2", 5));
        store.queue.push(pending("q3", 2));
        let predictor = Predictor::new(&store, WorkingCalendar::default());

        let first = predictor.predict(date(2024, 1, 11), 3).await.unwrap();
        let second = predictor.predict(date(2024, 1, 11), 3).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_deferrals_are_spread_over_days() {
        let mut store = store();
        store.queue.push(pending("q1", 5));
        store.queue.push(pending("q2", 5));
        let predictor = Predictor::new(&store, WorkingCalendar::default());

        let predicted = predictor.predict(date(2024, 1, 11), 3).await.unwrap();
        assert_eq!(predicted[0].schedule.main.slot(4)[0].member_id, 5);
        // the day after, member 5 is not taken from the queue again
        assert_ne!(predicted[1].schedule.main.slot(4)[0].member_id, 5);
        assert_eq!(predicted[2].schedule.main.slot(4)[0].member_id, 5);
        let total: usize = predicted.iter().map(|p| p.schedule.main.headcount()).sum();
        assert_eq!(total, 48);
    }

    #[tokio::test]
    async fn test_no_baseline() {
        let store = MemoryStore {
            members: (1..=6).map(member).collect(),
            ..Default::default()
        };
        let predictor = Predictor::new(&store, WorkingCalendar::default());
        assert!(matches!(
            predictor.predict(date(2024, 1, 11), 1).await,
            Err(RosterError::NoBaseline)
        ));
    }

    #[tokio::test]
    async fn test_marker_errors_propagate() {
        let mut missing = store();
        missing
            .schedules
            .insert(date(2024, 1, 10), Schedule::empty(date(2024, 1, 10)));
        let predictor = Predictor::new(&missing, WorkingCalendar::default());
        assert!(matches!(
            predictor.predict(date(2024, 1, 11), 1).await,
            Err(RosterError::MarkerIntegrity { .. })
        ));

        let mut pending_pre = store();
        let mut broken = Schedule::empty(date(2024, 1, 10));
        broken.pre.push(Assignment {
            member_id: 2,
            status: AssignmentStatus::Pending,
        });
        pending_pre.schedules.insert(broken.date, broken);
        let predictor = Predictor::new(&pending_pre, WorkingCalendar::default());
        assert!(matches!(
            predictor.predict(date(2024, 1, 11), 1).await,
            Err(RosterError::MarkerStatus { member_id: 2, .. })
        ));

        let mut deactivated = store();
        deactivated.members[2].status = 0;
        let predictor = Predictor::new(&deactivated, WorkingCalendar::default());
        assert!(matches!(
            predictor.predict(date(2024, 1, 11), 1).await,
            Err(RosterError::MarkerNotInPool { member_id: 3 })
        ));
    }

    #[tokio::test]
    async fn test_select_reads_marker_of_given_schedule() {
        let store = store();
        let predictor = Predictor::new(&store, WorkingCalendar::default());
        let picked = predictor
            .select(&anchor(date(2024, 1, 9), 6), 3)
            .await
            .unwrap();
        assert_eq!(picked, vec![1, 2, 3]);
        assert!(predictor
            .select(&anchor(date(2024, 1, 9), 6), -1)
            .await
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_pack_window_reports_overflow() {
        let calendar = WorkingCalendar::default();
        let crowd: Vec<i64> = (100..112).collect();
        let predicted = pack_window(&calendar, date(2024, 1, 11), 1, &[crowd], vec![1, 2], 9);

        let day = &predicted[0];
        // slots 4 to 8 hold ten deferred members, the last two do not fit
        assert_eq!(day.overflow, vec![110, 111]);
        assert_eq!(ids(day.schedule.main.slot(8)), vec![108, 109]);
        assert_eq!(ids(day.schedule.main.slot(1)), vec![1, 2]);
        assert_eq!(day.schedule.pre, vec![Assignment::marker(2)]);
    }

    #[test]
    fn test_pack_window_keeps_marker_when_no_rotation() {
        let calendar = WorkingCalendar::default();
        let predicted = pack_window(&calendar, date(2024, 1, 11), 1, &[], Vec::new(), 9);
        assert_eq!(predicted[0].schedule.pre, vec![Assignment::marker(9)]);
        assert_eq!(predicted[0].schedule.main.headcount(), 0);
    }

    #[test]
    fn test_pack_window_leaves_later_buckets_unseated() {
        let calendar = WorkingCalendar::default();
        let buckets = vec![vec![5], vec![], vec![5, 7]];
        let rotation: Vec<i64> = (1..=15).collect();
        let predicted = pack_window(&calendar, date(2024, 1, 11), 1, &buckets, rotation, 9);

        assert_eq!(predicted.len(), 1);
        let day = &predicted[0];
        assert!(day.overflow.is_empty());
        assert_eq!(day.schedule.main.headcount(), DAILY_HEADCOUNT);
        assert!(day.schedule.main.iter().all(|a| a.member_id != 7));
    }

    #[test]
    fn test_pack_window_rotation_fills_around_deferred_members() {
        let calendar = WorkingCalendar::default();
        // slots 4 and 5 are full of deferred members, rotation has to skip them
        let buckets = vec![vec![101, 102, 103, 104]];
        let rotation: Vec<i64> = (1..=12).collect();
        let predicted = pack_window(&calendar, date(2024, 1, 11), 1, &buckets, rotation, 9);

        let day = &predicted[0];
        assert!(day.overflow.is_empty());
        assert_eq!(day.schedule.main.headcount(), DAILY_HEADCOUNT);
        assert_eq!(ids(day.schedule.main.slot(3)), vec![5, 6]);
        assert_eq!(ids(day.schedule.main.slot(6)), vec![7, 8]);
        assert_eq!(day.schedule.pre, vec![Assignment::marker(12)]);
    }

    #[test]
    fn test_window_len_adds_catch_up() {
        let store = store();
        let predictor = Predictor::new(&store, WorkingCalendar::default());
        assert_eq!(predictor.window_len(date(2024, 1, 10), date(2024, 1, 11), 2), 2);
        assert_eq!(predictor.window_len(date(2024, 1, 10), date(2024, 1, 15), 1), 4);
    }

    #[test]
    fn test_pack_window_reports_leftover_rotation() {
        let calendar = WorkingCalendar::default();
        let rotation: Vec<i64> = (1..=18).collect();
        let predicted = pack_window(&calendar, date(2024, 1, 11), 1, &[], rotation, 9);
        assert_eq!(predicted[0].overflow, vec![17, 18]);
    }
}
