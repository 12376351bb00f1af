// libs/appointment-cell/src/services/conflict.rs
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::{Appointment, AppointmentStatus, TimeSlot};
use crate::services::slots::SlotCandidate;

/// Two appointments for the same doctor must start more than this many
/// seconds apart. A difference of exactly the window is a conflict.
pub const CONFLICT_WINDOW_SECONDS: i64 = 900;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConflictPolicy {
    /// When set, cancelled appointments no longer block nearby slots.
    pub ignore_cancelled: bool,
}

impl ConflictPolicy {
    pub fn counts(&self, status: AppointmentStatus) -> bool {
        !(self.ignore_cancelled && status == AppointmentStatus::Cancelled)
    }
}

/// Pure proximity check between a candidate start and a doctor's existing
/// appointments.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictChecker {
    policy: ConflictPolicy,
}

impl ConflictChecker {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// First appointment within the window of `candidate`, skipping the
    /// appointment with id `exclude` (the one being moved, on reschedule).
    pub fn find_conflict<'a>(
        &self,
        candidate: DateTime<Utc>,
        existing: &'a [Appointment],
        exclude: Option<&str>,
    ) -> Option<&'a Appointment> {
        existing
            .iter()
            .filter(|appt| Some(appt.appointment_id.as_str()) != exclude)
            .filter(|appt| self.policy.counts(appt.status))
            .find(|appt| within_window(candidate, appt.date_time))
    }

    pub fn is_disabled(&self, candidate: DateTime<Utc>, existing: &[Appointment]) -> bool {
        self.find_conflict(candidate, existing, None).is_some()
    }

    /// Tag every candidate slot with whether it is blocked by `existing`.
    pub fn evaluate(&self, candidates: &[SlotCandidate], existing: &[Appointment]) -> Vec<TimeSlot> {
        let slots: Vec<TimeSlot> = candidates
            .iter()
            .map(|candidate| TimeSlot {
                time: candidate.label(),
                starts_at: candidate.starts_at,
                is_disabled: self.is_disabled(candidate.starts_at, existing),
            })
            .collect();

        debug!(
            "Evaluated {} slots against {} appointments, {} disabled",
            slots.len(),
            existing.len(),
            slots.iter().filter(|s| s.is_disabled).count()
        );
        slots
    }
}

fn within_window(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    (a - b).num_milliseconds().abs() <= CONFLICT_WINDOW_SECONDS * 1000
}
