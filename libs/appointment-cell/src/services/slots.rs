// libs/appointment-cell/src/services/slots.rs
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use tracing::warn;

use crate::models::AppointmentError;

pub const WORKDAY_START_HOUR: u32 = 9;
pub const WORKDAY_END_HOUR: u32 = 17;
pub const SLOT_MINUTES: i64 = 30;

/// A slot start resolved to an absolute instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotCandidate {
    pub time: NaiveTime,
    pub starts_at: DateTime<Utc>,
}

impl SlotCandidate {
    pub fn label(&self) -> String {
        self.time.format("%H:%M").to_string()
    }
}

/// Produces the fixed slot grid of a working day, 09:00 inclusive to 17:00
/// exclusive in 30 minute steps, in the clinic's time zone.
#[derive(Debug, Clone, Copy)]
pub struct SlotGenerator {
    offset: FixedOffset,
}

impl Default for SlotGenerator {
    fn default() -> Self {
        Self::utc()
    }
}

impl SlotGenerator {
    pub fn utc() -> Self {
        Self {
            offset: FixedOffset::east_opt(0).expect("zero offset is valid"),
        }
    }

    pub fn with_offset_minutes(minutes: i32) -> Self {
        match minutes.checked_mul(60).and_then(FixedOffset::east_opt) {
            Some(offset) => Self { offset },
            None => {
                warn!("Clinic UTC offset of {} minutes is out of range, using UTC", minutes);
                Self::utc()
            }
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Wall-clock slot starts for any day. Freshly built on every call.
    pub fn slot_times(&self) -> Vec<NaiveTime> {
        let mut times = Vec::new();
        let Some(mut current) = NaiveTime::from_hms_opt(WORKDAY_START_HOUR, 0, 0) else {
            return times;
        };
        let Some(end) = NaiveTime::from_hms_opt(WORKDAY_END_HOUR, 0, 0) else {
            return times;
        };

        while current < end {
            times.push(current);
            current += Duration::minutes(SLOT_MINUTES);
        }
        times
    }

    pub fn candidates(&self, date: NaiveDate) -> Vec<SlotCandidate> {
        self.slot_times()
            .into_iter()
            .map(|time| SlotCandidate {
                time,
                starts_at: self.resolve_unchecked(date, time),
            })
            .collect()
    }

    /// Resolve a requested slot label (`HH:MM`, or `hh:mm AM`) on `date`.
    /// Only labels on the slot grid are accepted.
    pub fn resolve(&self, date: NaiveDate, label: &str) -> Result<SlotCandidate, AppointmentError> {
        let time = parse_slot_label(label).ok_or_else(|| {
            AppointmentError::ValidationError(format!("'{}' is not a valid time", label))
        })?;

        if !self.slot_times().contains(&time) {
            return Err(AppointmentError::ValidationError(format!(
                "{} is not a bookable slot",
                time.format("%H:%M")
            )));
        }

        Ok(SlotCandidate {
            time,
            starts_at: self.resolve_unchecked(date, time),
        })
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    fn resolve_unchecked(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        // Fixed offsets have no gaps or folds, so the mapping is unique.
        let local = date.and_time(time);
        match self.offset.from_local_datetime(&local).single() {
            Some(instant) => instant.with_timezone(&Utc),
            None => Utc.from_utc_datetime(&(local - self.offset)),
        }
    }
}

fn parse_slot_label(label: &str) -> Option<NaiveTime> {
    let label = label.trim();
    NaiveTime::parse_from_str(label, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(&label.to_uppercase(), "%I:%M %p"))
        .ok()
}
