use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map};
use tracing::{debug, info, warn};

use notification_cell::{dispatch_in_background, Notification, NotificationDispatcher, NotificationTemplate};
use shared_database::store::children;
use shared_database::{join_path, BlobRef, BlobStore, HierarchicalStore};

use crate::models::{CreatePrescriptionRequest, PatientError, PatientProfile, Prescription, PrescriptionRecord};

const ATTACHMENT_TYPE: &str = "application/octet-stream";

pub struct PrescriptionService {
    store: Arc<dyn HierarchicalStore>,
    blobs: Arc<dyn BlobStore>,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl PrescriptionService {
    pub fn new(
        store: Arc<dyn HierarchicalStore>,
        blobs: Arc<dyn BlobStore>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self { store, blobs, notifier }
    }

    /// Record a prescription written by `doctor_id` for `patient_id`.
    ///
    /// The attachment is uploaded first; a failed upload writes nothing. After
    /// the record is stored the patient's `lastVisit` is bumped and the patient
    /// is e-mailed on a best-effort basis.
    pub async fn create(
        &self,
        doctor_id: &str,
        patient_id: &str,
        request: CreatePrescriptionRequest,
    ) -> Result<Prescription, PatientError> {
        let text = request.prescription.trim().to_string();
        if text.is_empty() {
            return Err(PatientError::ValidationError("Prescription cannot be empty".to_string()));
        }

        let profile_path = join_path(&["users", patient_id]);
        let profile: PatientProfile = match self.store.read(&profile_path).await? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| PatientError::ValidationError(format!("Stored profile is malformed: {}", e)))?,
            None => return Err(PatientError::NotFound),
        };

        let id = self.store.push_key();
        let record_path = join_path(&["prescriptions", doctor_id, patient_id, &id]);
        info!("Recording prescription {} for patient {}", id, patient_id);

        let file_url = match &request.attachment {
            Some(file) => {
                let bytes = file.decode()?;
                let content_type = file.content_type_or(ATTACHMENT_TYPE);
                let reference = self.blobs.upload(&record_path, bytes, content_type).await?;
                Some(reference.to_string())
            }
            None => None,
        };

        let date = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let record = PrescriptionRecord {
            prescription: text,
            file_url,
            date: date.clone(),
        };
        let value = serde_json::to_value(&record)
            .map_err(|e| PatientError::ValidationError(e.to_string()))?;
        self.store.set(&record_path, value).await?;

        let mut visit = Map::new();
        visit.insert("lastVisit".to_string(), json!(date));
        self.store.update(&profile_path, visit).await?;

        dispatch_in_background(
            Arc::clone(&self.notifier),
            Notification::new(NotificationTemplate::Prescription)
                .with("patientEmail", profile.email)
                .with("prescription", record.prescription.clone())
                .with("date", record.date.clone()),
        );

        Ok(Prescription {
            id,
            doctor_id: doctor_id.to_string(),
            patient_id: patient_id.to_string(),
            prescription: record.prescription,
            date: record.date,
            file_url: record.file_url,
            download_url: None,
        })
    }

    /// Every prescription of one patient across all doctors, newest first,
    /// with attachment links resolved where possible.
    pub async fn history(&self, patient_id: &str) -> Result<Vec<Prescription>, PatientError> {
        debug!("Loading prescriptions for patient {}", patient_id);

        let Some(tree) = self.store.read("prescriptions").await? else {
            return Ok(Vec::new());
        };

        let mut prescriptions = Vec::new();
        for (doctor_id, per_doctor) in children(&tree) {
            let Some(per_patient) = per_doctor.get(patient_id) else {
                continue;
            };
            for (id, value) in children(per_patient) {
                match serde_json::from_value::<PrescriptionRecord>(value.clone()) {
                    Ok(record) => prescriptions.push(Prescription {
                        id: id.clone(),
                        doctor_id: doctor_id.clone(),
                        patient_id: patient_id.to_string(),
                        prescription: record.prescription,
                        date: record.date,
                        file_url: record.file_url,
                        download_url: None,
                    }),
                    Err(e) => warn!("Skipping malformed prescription '{}': {}", id, e),
                }
            }
        }

        for prescription in &mut prescriptions {
            if let Some(file_url) = &prescription.file_url {
                prescription.download_url = self.resolve(file_url).await;
            }
        }

        prescriptions.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(prescriptions)
    }

    async fn resolve(&self, file_url: &str) -> Option<String> {
        let resolved = match BlobRef::parse(file_url) {
            Ok(reference) => self.blobs.download_url(&reference).await,
            Err(e) => Err(e),
        };
        resolved
            .map_err(|e| warn!("Cannot resolve attachment '{}': {}", file_url, e))
            .ok()
    }
}
