// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Map};
use tracing::{debug, info, warn};

use notification_cell::{dispatch_in_background, Notification, NotificationDispatcher, NotificationTemplate};
use shared_config::AppConfig;
use shared_database::{HierarchicalStore, Subscription};

use crate::models::{
    Actor, Appointment, AppointmentError, AppointmentKey, AppointmentStatus, BookAppointmentRequest,
    DoctorProfile, DoctorSummary, RescheduleAppointmentRequest, TimeSlot,
};
use crate::services::conflict::{ConflictChecker, ConflictPolicy};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::repository::AppointmentRepository;
use crate::services::slots::SlotGenerator;

/// Filters for a doctor's appointment list.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoctorListing {
    pub date: Option<NaiveDate>,
    pub pending_only: bool,
}

pub struct AppointmentBookingService {
    repository: AppointmentRepository,
    slots: SlotGenerator,
    conflicts: ConflictChecker,
    lifecycle: AppointmentLifecycleService,
    notifier: Arc<dyn NotificationDispatcher>,
    poll_interval: Duration,
}

impl AppointmentBookingService {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn HierarchicalStore>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            repository: AppointmentRepository::new(store),
            slots: SlotGenerator::with_offset_minutes(config.clinic_utc_offset_minutes),
            conflicts: ConflictChecker::new(ConflictPolicy {
                ignore_cancelled: config.conflict_ignore_cancelled,
            }),
            lifecycle: AppointmentLifecycleService::new(),
            notifier,
            poll_interval: Duration::from_secs(config.subscription_poll_seconds.max(1)),
        }
    }

    pub fn slot_generator(&self) -> SlotGenerator {
        self.slots
    }

    /// The day's 16 slots for a doctor, each tagged with whether an existing
    /// appointment blocks it.
    pub async fn available_slots(&self, doctor_id: &str, date: NaiveDate) -> Result<Vec<TimeSlot>, AppointmentError> {
        debug!("Generating slots for doctor {} on {}", doctor_id, date);

        let existing = self.repository.doctor_appointments(doctor_id).await?;
        Ok(self.conflicts.evaluate(&self.slots.candidates(date), &existing))
    }

    /// Book a slot for `patient_id`.
    ///
    /// The doctor's appointments are re-read right before the write and the
    /// slot is checked again; a conflict aborts without writing. There is no
    /// lock between that read and the write, so two clients racing for nearby
    /// slots can both succeed.
    pub async fn book_appointment(
        &self,
        patient_id: &str,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        info!("Booking appointment for patient {} with doctor {}", patient_id, request.doctor_id);

        let slot = self.slots.resolve(request.date, &request.time)?;

        let patient = self
            .repository
            .patient_contact(patient_id)
            .await?
            .ok_or(AppointmentError::PatientNotFound)?;
        let doctor = self
            .repository
            .doctor_profile(&request.doctor_id)
            .await?
            .ok_or(AppointmentError::DoctorNotFound)?;

        let existing = self.repository.doctor_appointments(&request.doctor_id).await?;
        if let Some(conflict) = self.conflicts.find_conflict(slot.starts_at, &existing, None) {
            warn!(
                "Booking conflict for doctor {} at {} (existing appointment {})",
                request.doctor_id, slot.starts_at, conflict.appointment_id
            );
            return Err(AppointmentError::BookingConflict);
        }

        let appointment = Appointment {
            appointment_id: self.repository.next_id(),
            doctor_id: request.doctor_id.clone(),
            patient_id: patient_id.to_string(),
            date_time: slot.starts_at,
            patient_name: patient.name.clone(),
            doctor_name: doctor.name.clone(),
            note: request.note.unwrap_or_default(),
            status: AppointmentStatus::Pending,
            email: patient.email.clone(),
        };
        self.repository.insert(&appointment).await?;

        self.notify(
            Notification::new(NotificationTemplate::NewBooking)
                .with("doctorEmail", doctor_email(&appointment.doctor_id, &doctor))
                .with("patientName", appointment.patient_name.clone())
                .with("patientAge", patient.age.unwrap_or_default())
                .with("healthNumber", patient.health_number.unwrap_or_default())
                .with("date", self.display_time(appointment.date_time))
                .with("note", appointment.note.clone()),
        );

        info!("Appointment {} booked with doctor {}", appointment.appointment_id, appointment.doctor_id);
        Ok(appointment)
    }

    /// Confirm or cancel. Rescheduling goes through [`Self::reschedule`].
    pub async fn update_status(
        &self,
        actor: Actor,
        caller_id: &str,
        key: &AppointmentKey,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Updating status of {} to {}", key.appointment_id, new_status);

        if new_status == AppointmentStatus::Rescheduled {
            return Err(AppointmentError::ValidationError(
                "Rescheduling needs a new date and time; use the reschedule operation".to_string(),
            ));
        }

        let mut appointment = self.owned_appointment(actor, caller_id, key).await?;
        self.lifecycle
            .validate_status_transition(appointment.status, new_status, actor)?;

        let mut fields = Map::new();
        fields.insert("Status".to_string(), json!(new_status.to_string()));
        self.repository.update_fields(key, fields).await?;
        appointment.status = new_status;

        if new_status == AppointmentStatus::Confirmed {
            self.notify(
                Notification::new(NotificationTemplate::Confirmation)
                    .with("patientEmail", appointment.email.clone())
                    .with("doctorName", appointment.doctor_name.clone())
                    .with("date", self.display_time(appointment.date_time)),
            );
        }

        info!("Appointment {} is now {}", appointment.appointment_id, new_status);
        Ok(appointment)
    }

    /// Move a patient's appointment to a new slot. The record keeps its id
    /// and is updated in place with the new time and status `Rescheduled`.
    pub async fn reschedule(
        &self,
        patient_id: &str,
        key: &AppointmentKey,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        info!("Rescheduling appointment {} to {} {}", key.appointment_id, request.date, request.time);

        let mut appointment = self.owned_appointment(Actor::Patient, patient_id, key).await?;
        self.lifecycle.validate_status_transition(
            appointment.status,
            AppointmentStatus::Rescheduled,
            Actor::Patient,
        )?;

        let slot = self.slots.resolve(request.date, &request.time)?;
        let existing = self.repository.doctor_appointments(&key.doctor_id).await?;
        if let Some(conflict) = self
            .conflicts
            .find_conflict(slot.starts_at, &existing, Some(&key.appointment_id))
        {
            warn!(
                "Reschedule conflict for doctor {} at {} (existing appointment {})",
                key.doctor_id, slot.starts_at, conflict.appointment_id
            );
            return Err(AppointmentError::BookingConflict);
        }

        let mut fields = Map::new();
        fields.insert("DateTime".to_string(), json!(slot.starts_at));
        fields.insert("Status".to_string(), json!(AppointmentStatus::Rescheduled.to_string()));
        self.repository.update_fields(key, fields).await?;

        appointment.date_time = slot.starts_at;
        appointment.status = AppointmentStatus::Rescheduled;
        Ok(appointment)
    }

    pub async fn doctor_appointments(
        &self,
        doctor_id: &str,
        listing: DoctorListing,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut appointments: Vec<Appointment> = self
            .repository
            .doctor_appointments(doctor_id)
            .await?
            .into_iter()
            .filter(|a| !listing.pending_only || a.status == AppointmentStatus::Pending)
            .filter(|a| listing.date.map_or(true, |d| self.slots.local_date(a.date_time) == d))
            .collect();

        appointments.sort_by_key(|a| a.date_time);
        Ok(appointments)
    }

    pub async fn doctors(&self) -> Result<Vec<DoctorSummary>, AppointmentError> {
        self.repository.doctor_directory().await
    }

    pub async fn patient_appointments(&self, patient_id: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let mut appointments = self.repository.patient_appointments(patient_id).await?;
        appointments.sort_by_key(|a| a.date_time);
        Ok(appointments)
    }

    /// Live view of a doctor's appointment subtree. Polling stops when the
    /// returned handle is dropped or unsubscribed.
    pub fn watch_doctor_appointments(&self, doctor_id: &str) -> Subscription {
        Subscription::spawn(
            self.repository.store(),
            AppointmentRepository::doctor_path(doctor_id),
            self.poll_interval,
        )
    }

    async fn owned_appointment(
        &self,
        actor: Actor,
        caller_id: &str,
        key: &AppointmentKey,
    ) -> Result<Appointment, AppointmentError> {
        let owner = match actor {
            Actor::Doctor => &key.doctor_id,
            Actor::Patient => &key.patient_id,
        };
        if owner != caller_id {
            warn!("{:?} {} tried to modify appointment {}", actor, caller_id, key.appointment_id);
            return Err(AppointmentError::AuthError(
                "Appointment belongs to another user".to_string(),
            ));
        }
        self.repository.find(key).await
    }

    fn notify(&self, notification: Notification) {
        dispatch_in_background(Arc::clone(&self.notifier), notification);
    }

    fn display_time(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.slots.offset())
            .format("%Y-%m-%d at %H:%M")
            .to_string()
    }
}

/// Doctor keys are e-mails with `.com` stripped; profiles written without an
/// `email` field get it rebuilt from the key.
fn doctor_email(doctor_id: &str, profile: &DoctorProfile) -> String {
    profile
        .email
        .clone()
        .unwrap_or_else(|| format!("{}.com", doctor_id))
}
