//! Schedule model.
//!
//! A schedule is the duty plan of one working day: eight numbered slots of up to two
//! members each, plus the `pre` list carrying the rotation marker.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of duty slots per day.
pub const SLOT_COUNT: usize = 8;

/// Members per slot.
pub const SLOT_CAPACITY: usize = 2;

/// Members needed to staff one full day.
pub const DAILY_HEADCOUNT: usize = SLOT_COUNT * SLOT_CAPACITY;

/// Role of an assignment inside a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum AssignmentStatus {
    /// Not resolved yet (`0`).
    Pending,
    /// Serving (`1`).
    Confirmed,
    /// Resume point of the rotation (`-1`).
    Marker,
}

impl From<AssignmentStatus> for i64 {
    fn from(status: AssignmentStatus) -> Self {
        match status {
            AssignmentStatus::Pending => 0,
            AssignmentStatus::Confirmed => 1,
            AssignmentStatus::Marker => -1,
        }
    }
}

impl TryFrom<i64> for AssignmentStatus {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AssignmentStatus::Pending),
            1 => Ok(AssignmentStatus::Confirmed),
            -1 => Ok(AssignmentStatus::Marker),
            other => Err(format!("unknown assignment status {}", other)),
        }
    }
}

/// One member placed in a slot or in the `pre` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    #[serde(alias = "id")]
    pub member_id: i64,
    pub status: AssignmentStatus,
}

impl Assignment {
    pub fn confirmed(member_id: i64) -> Self {
        Self {
            member_id,
            status: AssignmentStatus::Confirmed,
        }
    }

    pub fn marker(member_id: i64) -> Self {
        Self {
            member_id,
            status: AssignmentStatus::Marker,
        }
    }
}

/// The eight duty slots of a day.
///
/// Serialized as a map keyed `"1"` to `"8"`; decoding rejects any other shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Vec<Assignment>>",
    into = "BTreeMap<String, Vec<Assignment>>"
)]
pub struct MainSlots {
    slots: [Vec<Assignment>; SLOT_COUNT],
}

impl MainSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assignments in slot `number` (1-based). Out-of-range numbers yield an empty slice.
    pub fn slot(&self, number: usize) -> &[Assignment] {
        match number.checked_sub(1).and_then(|i| self.slots.get(i)) {
            Some(slot) => slot.as_slice(),
            None => &[],
        }
    }

    pub fn is_full(&self, number: usize) -> bool {
        self.slot(number).len() >= SLOT_CAPACITY
    }

    /// Put `assignment` into slot `number`. Returns false when the slot is full or
    /// does not exist.
    pub fn try_push(&mut self, number: usize, assignment: Assignment) -> bool {
        match number.checked_sub(1).and_then(|i| self.slots.get_mut(i)) {
            Some(slot) if slot.len() < SLOT_CAPACITY => {
                slot.push(assignment);
                true
            }
            _ => false,
        }
    }

    /// All assignments in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Assignment> {
        self.slots.iter().flatten()
    }

    pub fn headcount(&self) -> usize {
        self.slots.iter().map(Vec::len).sum()
    }
}

/// Decoding error for [`MainSlots`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotShapeError(String);

impl fmt::Display for SlotShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid slot layout: {}", self.0)
    }
}

impl std::error::Error for SlotShapeError {}

impl TryFrom<BTreeMap<String, Vec<Assignment>>> for MainSlots {
    type Error = SlotShapeError;

    fn try_from(map: BTreeMap<String, Vec<Assignment>>) -> Result<Self, Self::Error> {
        let mut main = MainSlots::new();
        for (key, assignments) in map {
            let number = key
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=SLOT_COUNT).contains(n))
                .ok_or_else(|| SlotShapeError(format!("unknown slot key {:?}", key)))?;
            if assignments.len() > SLOT_CAPACITY {
                return Err(SlotShapeError(format!(
                    "slot {} holds {} assignments, at most {} allowed",
                    number,
                    assignments.len(),
                    SLOT_CAPACITY
                )));
            }
            main.slots[number - 1] = assignments;
        }
        Ok(main)
    }
}

impl From<MainSlots> for BTreeMap<String, Vec<Assignment>> {
    fn from(main: MainSlots) -> Self {
        main.slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| ((i + 1).to_string(), slot))
            .collect()
    }
}

/// The duty plan of one day. The date is the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(alias = "_id")]
    pub date: NaiveDate,
    #[serde(default)]
    pub main: MainSlots,
    #[serde(default)]
    pub pre: Vec<Assignment>,
}

impl Schedule {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            main: MainSlots::new(),
            pre: Vec::new(),
        }
    }

    /// Ids of members confirmed in either `main` or `pre`.
    pub fn confirmed_members(&self) -> BTreeSet<i64> {
        self.main
            .iter()
            .chain(self.pre.iter())
            .filter(|a| a.status == AssignmentStatus::Confirmed)
            .map(|a| a.member_id)
            .collect()
    }
}

/// A schedule as returned to clients, tagged with whether it has been committed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleView {
    #[serde(flatten)]
    pub schedule: Schedule,
    pub verified: bool,
}

impl ScheduleView {
    pub fn committed(schedule: Schedule) -> Self {
        Self {
            schedule,
            verified: true,
        }
    }
}

/// A schedule produced by the predictor. Never persisted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictedSchedule {
    #[serde(flatten)]
    pub schedule: Schedule,
    /// Always false; a prediction becomes verified only once committed.
    pub verified: bool,
    /// Members that could not be placed because every slot was full.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub overflow: Vec<i64>,
}

/// Request body for replacing an existing schedule.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScheduleRequest {
    #[serde(default)]
    pub main: MainSlots,
    #[serde(default)]
    pub pre: Vec<Assignment>,
}
