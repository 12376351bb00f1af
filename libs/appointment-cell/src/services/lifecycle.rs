// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, info, warn};

use crate::models::{Actor, AppointmentError, AppointmentStatus};

#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that `actor` may move an appointment from `current` to `new`.
    pub fn validate_status_transition(
        &self,
        current: AppointmentStatus,
        new: AppointmentStatus,
        actor: Actor,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {} by {:?}", current, new, actor);

        if !self.get_valid_transitions(current, actor).contains(&new) {
            warn!("Invalid status transition attempted: {} -> {} by {:?}", current, new, actor);
            return Err(AppointmentError::InvalidTransition { from: current, to: new });
        }

        info!("Status transition validated: {} -> {}", current, new);
        Ok(())
    }

    /// All statuses `actor` may move an appointment to from `current`.
    pub fn get_valid_transitions(&self, current: AppointmentStatus, actor: Actor) -> Vec<AppointmentStatus> {
        match (current, actor) {
            (AppointmentStatus::Pending, Actor::Doctor) => {
                vec![AppointmentStatus::Confirmed, AppointmentStatus::Cancelled]
            }
            (AppointmentStatus::Pending, Actor::Patient) => {
                vec![AppointmentStatus::Cancelled, AppointmentStatus::Rescheduled]
            }
            (AppointmentStatus::Confirmed, Actor::Patient) => vec![AppointmentStatus::Rescheduled],
            // Terminal or read-only
            (AppointmentStatus::Confirmed, Actor::Doctor)
            | (AppointmentStatus::Cancelled, _)
            | (AppointmentStatus::Rescheduled, _)
            | (AppointmentStatus::Completed, _)
            | (AppointmentStatus::Unknown, _) => vec![],
        }
    }

    pub fn is_terminal(&self, status: AppointmentStatus) -> bool {
        self.get_valid_transitions(status, Actor::Doctor).is_empty()
            && self.get_valid_transitions(status, Actor::Patient).is_empty()
    }
}
