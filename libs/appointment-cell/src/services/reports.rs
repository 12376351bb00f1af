// libs/appointment-cell/src/services/reports.rs
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::HierarchicalStore;

use crate::models::{Appointment, AppointmentError, AppointmentReport, AppointmentStatus};
use crate::services::repository::AppointmentRepository;
use crate::services::slots::SlotGenerator;

/// Calendar window a report covers, in clinic local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Day(NaiveDate),
    Month { year: i32, month: u32 },
}

impl ReportPeriod {
    /// Parse a `YYYY-MM` month.
    pub fn month(value: &str) -> Result<Self, AppointmentError> {
        let first = NaiveDate::parse_from_str(&format!("{}-01", value.trim()), "%Y-%m-%d")
            .map_err(|_| AppointmentError::ValidationError(format!("'{}' is not a YYYY-MM month", value)))?;
        Ok(ReportPeriod::Month {
            year: first.year(),
            month: first.month(),
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        match *self {
            ReportPeriod::Day(day) => date == day,
            ReportPeriod::Month { year, month } => date.year() == year && date.month() == month,
        }
    }
}

/// Clinic-wide appointment and prescription counts.
pub struct AppointmentReportService {
    repository: AppointmentRepository,
    slots: SlotGenerator,
}

impl AppointmentReportService {
    pub fn new(config: &AppConfig, store: Arc<dyn HierarchicalStore>) -> Self {
        Self {
            repository: AppointmentRepository::new(store),
            slots: SlotGenerator::with_offset_minutes(config.clinic_utc_offset_minutes),
        }
    }

    pub async fn report(&self, period: ReportPeriod) -> Result<AppointmentReport, AppointmentError> {
        debug!("Building report for {:?}", period);

        let appointments = self.repository.all_appointments().await?;
        let mut report = summarize(
            appointments
                .iter()
                .filter(|a| period.contains(self.slots.local_date(a.date_time))),
        );

        report.prescriptions = self
            .repository
            .prescription_dates()
            .await?
            .iter()
            .filter_map(|raw| match DateTime::parse_from_rfc3339(raw) {
                Ok(issued) => Some(issued),
                Err(e) => {
                    warn!("Ignoring prescription with unreadable date '{}': {}", raw, e);
                    None
                }
            })
            .filter(|issued| period.contains(self.slots.local_date(issued.with_timezone(&Utc))))
            .count() as u32;

        Ok(report)
    }
}

fn summarize<'a>(appointments: impl Iterator<Item = &'a Appointment>) -> AppointmentReport {
    appointments.fold(AppointmentReport::default(), |mut report, appointment| {
        report.total += 1;
        match appointment.status {
            AppointmentStatus::Completed => report.completed += 1,
            AppointmentStatus::Cancelled => report.cancelled += 1,
            AppointmentStatus::Rescheduled => report.rescheduled += 1,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed | AppointmentStatus::Unknown => {}
        }
        report
    })
}
