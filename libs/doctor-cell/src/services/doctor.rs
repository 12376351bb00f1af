use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use shared_database::{join_path, BlobStore, HierarchicalStore};

use crate::models::{DoctorError, DoctorProfile, InlineFile, UpdateDoctorRequest};

const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

pub struct DoctorService {
    store: Arc<dyn HierarchicalStore>,
    blobs: Arc<dyn BlobStore>,
}

impl DoctorService {
    pub fn new(store: Arc<dyn HierarchicalStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    fn profile_path(doctor_id: &str) -> String {
        join_path(&["doctors", doctor_id])
    }

    pub async fn get_profile(&self, doctor_id: &str) -> Result<DoctorProfile, DoctorError> {
        debug!("Fetching doctor profile: {}", doctor_id);

        let value = self
            .store
            .read(&Self::profile_path(doctor_id))
            .await?
            .ok_or(DoctorError::NotFound)?;

        serde_json::from_value(value)
            .map_err(|e| DoctorError::ValidationError(format!("Stored profile is malformed: {}", e)))
    }

    /// Merge the provided fields into `doctors/{key}`. The name and specialty
    /// feed the booking directory, so neither may be blanked.
    pub async fn update_profile(
        &self,
        doctor_id: &str,
        request: UpdateDoctorRequest,
    ) -> Result<DoctorProfile, DoctorError> {
        debug!("Updating doctor profile: {}", doctor_id);

        self.get_profile(doctor_id).await?;

        let fields = [
            ("Name", request.name),
            ("Spl", request.specialty),
            ("Phone", request.phone),
        ];

        let mut update_data = Map::new();
        for (key, value) in fields {
            let Some(value) = value else { continue };
            let value = value.trim().to_string();
            match (key, value.is_empty()) {
                ("Phone", true) => {
                    update_data.insert(key.to_string(), Value::Null);
                }
                (_, true) => {
                    return Err(DoctorError::ValidationError(format!("{} cannot be empty", key)));
                }
                _ => {
                    update_data.insert(key.to_string(), json!(value));
                }
            }
        }

        if !update_data.is_empty() {
            self.store
                .update(&Self::profile_path(doctor_id), update_data)
                .await?;
        }

        self.get_profile(doctor_id).await
    }

    /// Store the picture at `doctors/{key}/profile.jpg` and link it from the
    /// profile's `image` field.
    pub async fn upload_profile_image(&self, doctor_id: &str, file: InlineFile) -> Result<String, DoctorError> {
        self.get_profile(doctor_id).await?;

        let bytes = file.decode()?;
        let content_type = file.content_type_or(DEFAULT_IMAGE_TYPE);
        let object_path = join_path(&["doctors", doctor_id, "profile.jpg"]);

        let reference = self.blobs.upload(&object_path, bytes, content_type).await?;
        let url = self.blobs.download_url(&reference).await?;

        let mut update_data = Map::new();
        update_data.insert("image".to_string(), json!(url));
        self.store
            .update(&Self::profile_path(doctor_id), update_data)
            .await?;

        info!("Profile image updated for doctor {}", doctor_id);
        Ok(url)
    }

    /// Unlink the picture. The stored object is left in place.
    pub async fn remove_profile_image(&self, doctor_id: &str) -> Result<DoctorProfile, DoctorError> {
        self.get_profile(doctor_id).await?;

        let mut update_data = Map::new();
        update_data.insert("image".to_string(), Value::Null);
        self.store
            .update(&Self::profile_path(doctor_id), update_data)
            .await?;

        info!("Profile image removed for doctor {}", doctor_id);
        self.get_profile(doctor_id).await
    }
}
