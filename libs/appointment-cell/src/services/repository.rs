// libs/appointment-cell/src/services/repository.rs
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use shared_database::store::children;
use shared_database::{join_path, HierarchicalStore};

use crate::models::{
    Appointment, AppointmentError, AppointmentKey, AppointmentRecord, DoctorProfile, DoctorSummary,
    PatientContact,
};

const APPOINTMENTS_ROOT: &str = "appointments";

/// Typed access to the appointment, doctor and user subtrees.
#[derive(Clone)]
pub struct AppointmentRepository {
    store: Arc<dyn HierarchicalStore>,
}

impl AppointmentRepository {
    pub fn new(store: Arc<dyn HierarchicalStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn HierarchicalStore> {
        Arc::clone(&self.store)
    }

    pub fn doctor_path(doctor_id: &str) -> String {
        join_path(&[APPOINTMENTS_ROOT, doctor_id])
    }

    pub fn next_id(&self) -> String {
        self.store.push_key()
    }

    /// Fresh snapshot of every appointment held by one doctor.
    pub async fn doctor_appointments(&self, doctor_id: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let snapshot = self.store.read(&Self::doctor_path(doctor_id)).await?;
        let appointments = snapshot
            .map(|tree| flatten_doctor(doctor_id, &tree))
            .unwrap_or_default();

        debug!("Loaded {} appointments for doctor {}", appointments.len(), doctor_id);
        Ok(appointments)
    }

    pub async fn all_appointments(&self) -> Result<Vec<Appointment>, AppointmentError> {
        let Some(tree) = self.store.read(APPOINTMENTS_ROOT).await? else {
            return Ok(Vec::new());
        };

        Ok(children(&tree)
            .flat_map(|(doctor_id, doctor_tree)| flatten_doctor(doctor_id, doctor_tree))
            .collect())
    }

    /// Every appointment of one patient, across all doctors.
    pub async fn patient_appointments(&self, patient_id: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let Some(tree) = self.store.read(APPOINTMENTS_ROOT).await? else {
            return Ok(Vec::new());
        };

        let mut appointments = Vec::new();
        for (doctor_id, doctor_tree) in children(&tree) {
            if let Some(patient_tree) = doctor_tree.get(patient_id) {
                appointments.extend(flatten_patient(doctor_id, patient_id, patient_tree));
            }
        }
        Ok(appointments)
    }

    pub async fn find(&self, key: &AppointmentKey) -> Result<Appointment, AppointmentError> {
        let record = self
            .store
            .read(&key.path())
            .await?
            .ok_or(AppointmentError::NotFound)?;

        Ok(decode::<AppointmentRecord>(&key.path(), record)
            .ok_or_else(|| AppointmentError::ValidationError("Stored appointment is malformed".to_string()))?
            .into_appointment(key.clone()))
    }

    /// Write a new appointment with one multi-path update at the root.
    pub async fn insert(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        let record = serde_json::to_value(AppointmentRecord::from(appointment))
            .map_err(|e| AppointmentError::ValidationError(e.to_string()))?;

        let mut updates = Map::new();
        updates.insert(appointment.key().path(), record);
        self.store.update("", updates).await?;

        debug!("Stored appointment {}", appointment.appointment_id);
        Ok(())
    }

    /// Overwrite individual fields of an existing record in place.
    pub async fn update_fields(&self, key: &AppointmentKey, fields: Map<String, Value>) -> Result<(), AppointmentError> {
        self.store.update(&key.path(), fields).await?;
        Ok(())
    }

    pub async fn doctor_profile(&self, doctor_id: &str) -> Result<Option<DoctorProfile>, AppointmentError> {
        let path = join_path(&["doctors", doctor_id]);
        Ok(self
            .store
            .read(&path)
            .await?
            .and_then(|value| decode(&path, value)))
    }

    /// Every readable profile under `doctors`, sorted by name.
    pub async fn doctor_directory(&self) -> Result<Vec<DoctorSummary>, AppointmentError> {
        let Some(tree) = self.store.read("doctors").await? else {
            return Ok(Vec::new());
        };

        let mut doctors: Vec<DoctorSummary> = children(&tree)
            .filter_map(|(doctor_id, value)| {
                let profile: DoctorProfile = decode(&join_path(&["doctors", doctor_id]), value.clone())?;
                Some(DoctorSummary {
                    doctor_id: doctor_id.clone(),
                    name: profile.name,
                    specialty: profile.specialty,
                    image: profile.image,
                })
            })
            .collect();

        doctors.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.doctor_id.cmp(&b.doctor_id)));
        Ok(doctors)
    }

    pub async fn patient_contact(&self, patient_id: &str) -> Result<Option<PatientContact>, AppointmentError> {
        let path = join_path(&["users", patient_id]);
        Ok(self
            .store
            .read(&path)
            .await?
            .and_then(|value| decode(&path, value)))
    }

    /// Raw `date` values of every prescription in the store.
    pub async fn prescription_dates(&self) -> Result<Vec<String>, AppointmentError> {
        let Some(tree) = self.store.read("prescriptions").await? else {
            return Ok(Vec::new());
        };

        Ok(children(&tree)
            .flat_map(|(_, per_doctor)| children(per_doctor))
            .flat_map(|(_, per_patient)| children(per_patient))
            .filter_map(|(_, prescription)| prescription.get("date").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!("Skipping malformed record at '{}': {}", path, e);
            None
        }
    }
}

fn flatten_doctor(doctor_id: &str, tree: &Value) -> Vec<Appointment> {
    children(tree)
        .flat_map(|(patient_id, patient_tree)| flatten_patient(doctor_id, patient_id, patient_tree))
        .collect()
}

/// Records are kept whenever their `DateTime` parses, whatever their
/// status, so every placed appointment reaches the conflict snapshot.
fn flatten_patient(doctor_id: &str, patient_id: &str, tree: &Value) -> Vec<Appointment> {
    children(tree)
        .filter_map(|(appointment_id, record)| {
            let key = AppointmentKey {
                doctor_id: doctor_id.to_string(),
                patient_id: patient_id.to_string(),
                appointment_id: appointment_id.to_string(),
            };
            let record: AppointmentRecord = decode(&key.path(), record.clone())?;
            Some(record.into_appointment(key))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_database::MemoryStore;

    fn repository(data: Value) -> (MemoryStore, AppointmentRepository) {
        let store = MemoryStore::with_data(data);
        (store.clone(), AppointmentRepository::new(Arc::new(store)))
    }

    #[tokio::test]
    async fn test_records_without_a_usable_time_are_skipped() {
        let (_, repo) = repository(json!({
            "appointments": {
                "dr@clinic": {
                    "p1": {
                        "a1": {"DateTime": "2025-03-14T10:00:00Z", "Status": "Pending"},
                        "a2": {"DateTime": "not a date", "Status": "Pending"},
                        "a3": {"Status": "Pending"}
                    }
                }
            }
        }));

        let appointments = repo.doctor_appointments("dr@clinic").await.unwrap();

        assert_eq!(appointments.len(), 1);
        assert_eq!(appointments[0].appointment_id, "a1");
        assert_eq!(appointments[0].doctor_id, "dr@clinic");
        assert_eq!(appointments[0].patient_id, "p1");
    }

    #[tokio::test]
    async fn test_records_with_unreadable_status_are_kept() {
        let (_, repo) = repository(json!({
            "appointments": {
                "dr@clinic": {
                    "p1": {
                        "legacy": {"DateTime": "2025-03-14T10:00:00.000Z"},
                        "odd": {"DateTime": "2025-03-14T14:00:00Z", "Status": "Done"}
                    }
                }
            }
        }));

        let mut appointments = repo.doctor_appointments("dr@clinic").await.unwrap();
        appointments.sort_by_key(|a| a.date_time);

        assert_eq!(appointments.len(), 2);
        assert_eq!(appointments[0].appointment_id, "legacy");
        assert!(appointments.iter().all(|a| a.status == crate::models::AppointmentStatus::Unknown));
    }

    #[tokio::test]
    async fn test_patient_appointments_span_doctors() {
        let (_, repo) = repository(json!({
            "appointments": {
                "a@clinic": {"p1": {"x": {"DateTime": "2025-03-14T10:00:00Z", "Status": "Pending"}}},
                "b@clinic": {
                    "p1": {"y": {"DateTime": "2025-03-15T10:00:00Z", "Status": "Confirmed"}},
                    "p2": {"z": {"DateTime": "2025-03-15T10:00:00Z", "Status": "Confirmed"}}
                }
            }
        }));

        let mut ids: Vec<String> = repo
            .patient_appointments("p1")
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.appointment_id)
            .collect();
        ids.sort();

        assert_eq!(ids, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_insert_writes_store_layout() {
        let (store, repo) = repository(Value::Null);
        let appointment = Appointment {
            appointment_id: "k1".into(),
            doctor_id: "dr@clinic".into(),
            patient_id: "p1".into(),
            date_time: "2025-03-14T10:00:00Z".parse().unwrap(),
            patient_name: "Pat".into(),
            doctor_name: "Dr Who".into(),
            note: "cough".into(),
            status: crate::models::AppointmentStatus::Pending,
            email: "pat@example.com".into(),
        };

        repo.insert(&appointment).await.unwrap();

        let stored = store.read("appointments/dr@clinic/p1/k1").await.unwrap().unwrap();
        assert_eq!(stored["Status"], json!("Pending"));
        assert_eq!(stored["AppointmentID"], json!("k1"));
        assert_eq!(stored["DoctorName"], json!("Dr Who"));
        assert_eq!(repo.find(&appointment.key()).await.unwrap(), appointment);
    }

    #[tokio::test]
    async fn test_prescription_dates_are_collected() {
        let (_, repo) = repository(json!({
            "prescriptions": {
                "dr@clinic": {"p1": {
                    "r1": {"prescription": "rest", "date": "2025-03-14T09:10:00.000Z"},
                    "r2": {"prescription": "no date"}
                }}
            }
        }));

        assert_eq!(repo.prescription_dates().await.unwrap(), vec!["2025-03-14T09:10:00.000Z"]);
    }
}
