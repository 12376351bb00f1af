use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTemplate {
    /// Sent to the doctor when a patient requests an appointment.
    NewBooking,
    /// Sent to the patient when the doctor confirms.
    Confirmation,
    /// Sent to the patient when a prescription is recorded.
    Prescription,
}

impl fmt::Display for NotificationTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationTemplate::NewBooking => write!(f, "new_booking"),
            NotificationTemplate::Confirmation => write!(f, "confirmation"),
            NotificationTemplate::Prescription => write!(f, "prescription"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub template: NotificationTemplate,
    pub variables: Map<String, Value>,
}

impl Notification {
    pub fn new(template: NotificationTemplate) -> Self {
        Self {
            template,
            variables: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.variables.insert(key.to_string(), value.into());
        self
    }

    pub fn variable(&self, key: &str) -> Option<&str> {
        self.variables.get(key).and_then(Value::as_str)
    }
}
