use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use shared_database::store::children;
use shared_database::{join_path, BlobStore, HierarchicalStore};

use crate::models::{InlineFile, PatientError, PatientProfile, PatientSummary, UpdateProfileRequest};

const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

pub struct PatientService {
    store: Arc<dyn HierarchicalStore>,
    blobs: Arc<dyn BlobStore>,
}

impl PatientService {
    pub fn new(store: Arc<dyn HierarchicalStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    fn profile_path(patient_id: &str) -> String {
        join_path(&["users", patient_id])
    }

    pub async fn get_profile(&self, patient_id: &str) -> Result<PatientProfile, PatientError> {
        debug!("Fetching patient profile: {}", patient_id);

        let value = self
            .store
            .read(&Self::profile_path(patient_id))
            .await?
            .ok_or(PatientError::NotFound)?;

        serde_json::from_value(value)
            .map_err(|e| PatientError::ValidationError(format!("Stored profile is malformed: {}", e)))
    }

    /// Merge the provided fields into the stored profile.
    pub async fn update_profile(
        &self,
        patient_id: &str,
        request: UpdateProfileRequest,
    ) -> Result<PatientProfile, PatientError> {
        debug!("Updating patient profile: {}", patient_id);

        // Existence check so an update never creates a bare profile.
        self.get_profile(patient_id).await?;

        let fields = [
            ("name", request.name),
            ("age", request.age),
            ("gender", request.gender),
            ("bloodGroup", request.blood_group),
            ("height", request.height),
            ("weight", request.weight),
            ("healthNumber", request.health_number),
        ];

        let mut update_data = Map::new();
        for (key, value) in fields {
            if let Some(value) = value {
                let value = value.trim().to_string();
                if value.is_empty() && matches!(key, "name" | "healthNumber") {
                    return Err(PatientError::ValidationError(format!("{} cannot be empty", key)));
                }
                update_data.insert(key.to_string(), json!(value));
            }
        }

        if !update_data.is_empty() {
            self.store
                .update(&Self::profile_path(patient_id), update_data)
                .await?;
        }

        self.get_profile(patient_id).await
    }

    /// Store the picture at `users/{uid}/profile.jpg` and link it from the
    /// profile.
    pub async fn upload_profile_image(&self, patient_id: &str, file: InlineFile) -> Result<String, PatientError> {
        self.get_profile(patient_id).await?;

        let bytes = file.decode()?;
        let content_type = file.content_type_or(DEFAULT_IMAGE_TYPE);
        let object_path = join_path(&["users", patient_id, "profile.jpg"]);

        let reference = self.blobs.upload(&object_path, bytes, content_type).await?;
        let url = self.blobs.download_url(&reference).await?;

        let mut update_data = Map::new();
        update_data.insert("image".to_string(), json!(url));
        self.store
            .update(&Self::profile_path(patient_id), update_data)
            .await?;

        info!("Profile image updated for patient {}", patient_id);
        Ok(url)
    }

    /// Case-insensitive substring search on name or health number. An empty
    /// query lists every patient.
    pub async fn search(&self, query: &str) -> Result<Vec<PatientSummary>, PatientError> {
        let needle = query.trim().to_lowercase();
        debug!("Searching patients for '{}'", needle);

        let Some(users) = self.store.read("users").await? else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<PatientSummary> = children(&users)
            .filter_map(|(patient_id, value)| summarize(patient_id, value))
            .filter(|summary| {
                needle.is_empty()
                    || summary.name.to_lowercase().contains(&needle)
                    || summary
                        .health_number
                        .as_deref()
                        .is_some_and(|hn| hn.to_lowercase().contains(&needle))
            })
            .collect();

        matches.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(matches)
    }
}

fn summarize(patient_id: &str, value: &Value) -> Option<PatientSummary> {
    match serde_json::from_value::<PatientProfile>(value.clone()) {
        Ok(profile) => Some(PatientSummary {
            patient_id: patient_id.to_string(),
            name: profile.name,
            age: profile.age,
            health_number: profile.health_number,
            last_visit: profile.last_visit,
        }),
        Err(e) => {
            warn!("Skipping malformed profile '{}': {}", patient_id, e);
            None
        }
    }
}
