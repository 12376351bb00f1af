use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::{json, Value};

use notification_cell::{NotificationTemplate, RecordingDispatcher};
use patient_cell::models::{CreatePrescriptionRequest, InlineFile, PatientError, UpdateProfileRequest};
use patient_cell::services::{PatientService, PrescriptionService};
use shared_database::{HierarchicalStore, MemoryBlobStore, MemoryStore};
use shared_utils::test_utils::StoreFixtures;

const BUCKET: &str = "clinic-test.appspot.com";
const DOCTOR: &str = "house@clinic";
const PATIENT: &str = "patient-1";

struct Harness {
    store: MemoryStore,
    blobs: MemoryBlobStore,
    notifier: RecordingDispatcher,
    patients: PatientService,
    prescriptions: PrescriptionService,
}

fn harness_with(extra: Value) -> Harness {
    let mut data = json!({
        "users": {
            PATIENT: StoreFixtures::patient_record("Pat Doe", "pat@example.com", "34", "HN-001"),
            "patient-2": StoreFixtures::patient_record("adam smith", "adam@example.com", "60", "HN-777"),
            "patient-3": StoreFixtures::patient_record("Zoe Quinn", "zoe@example.com", "22", "XK-100")
        }
    });
    if let (Some(root), Value::Object(extra)) = (data.as_object_mut(), extra) {
        root.extend(extra);
    }

    let store = MemoryStore::with_data(data);
    let blobs = MemoryBlobStore::new(BUCKET);
    let notifier = RecordingDispatcher::new();
    Harness {
        patients: PatientService::new(Arc::new(store.clone()), Arc::new(blobs.clone())),
        prescriptions: PrescriptionService::new(
            Arc::new(store.clone()),
            Arc::new(blobs.clone()),
            Arc::new(notifier.clone()),
        ),
        store,
        blobs,
        notifier,
    }
}

fn harness() -> Harness {
    harness_with(Value::Null)
}

fn prescription(text: &str, attachment: Option<InlineFile>) -> CreatePrescriptionRequest {
    CreatePrescriptionRequest {
        prescription: text.to_string(),
        attachment,
    }
}

// ==============================================================================
// PROFILES
// ==============================================================================

#[tokio::test]
async fn test_profile_update_merges_fields() {
    let h = harness();

    let updated = h
        .patients
        .update_profile(
            PATIENT,
            UpdateProfileRequest {
                weight: Some("58".into()),
                blood_group: Some("AB-".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.weight.as_deref(), Some("58"));
    assert_eq!(updated.blood_group.as_deref(), Some("AB-"));
    assert_eq!(updated.name, "Pat Doe");
    assert_eq!(updated.health_number.as_deref(), Some("HN-001"));
}

#[tokio::test]
async fn test_profile_update_rejects_blank_name_and_unknown_patient() {
    let h = harness();

    let blank = h
        .patients
        .update_profile(PATIENT, UpdateProfileRequest { name: Some("  ".into()), ..Default::default() })
        .await;
    assert_matches!(blank, Err(PatientError::ValidationError(_)));

    let unknown = h
        .patients
        .update_profile("ghost", UpdateProfileRequest { name: Some("Casper".into()), ..Default::default() })
        .await;
    assert_matches!(unknown, Err(PatientError::NotFound));
    assert!(h.store.read("users/ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn test_profile_tolerates_numeric_fields() {
    let h = harness_with(json!({
        "users": {"legacy": {"email": "old@example.com", "name": "Old Timer", "age": 70, "healthNumber": 12345}}
    }));

    let profile = h.patients.get_profile("legacy").await.unwrap();

    assert_eq!(profile.age.as_deref(), Some("70"));
    assert_eq!(profile.health_number.as_deref(), Some("12345"));
}

#[tokio::test]
async fn test_profile_image_upload_links_download_url() {
    let h = harness();

    let url = h
        .patients
        .upload_profile_image(PATIENT, InlineFile { content_type: None, data: "aGVsbG8=".into() })
        .await
        .unwrap();

    assert_eq!(h.blobs.get("users/patient-1/profile.jpg").await.unwrap(), b"hello");
    let profile = h.patients.get_profile(PATIENT).await.unwrap();
    assert_eq!(profile.image.as_deref(), Some(url.as_str()));
}

#[tokio::test]
async fn test_search_by_name_or_health_number() {
    let h = harness();

    let by_name = h.patients.search("ADAM").await.unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].patient_id, "patient-2");

    let by_number = h.patients.search("hn-").await.unwrap();
    let names: Vec<&str> = by_number.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["adam smith", "Pat Doe"]);

    assert_eq!(h.patients.search("").await.unwrap().len(), 3);
    assert!(h.patients.search("nobody").await.unwrap().is_empty());
}

// ==============================================================================
// PRESCRIPTIONS
// ==============================================================================

#[tokio::test]
async fn test_prescription_is_stored_and_patient_notified() {
    let h = harness();

    let created = h
        .prescriptions
        .create(DOCTOR, PATIENT, prescription("Amoxicillin 500mg, 3x daily", None))
        .await
        .unwrap();

    let path = format!("prescriptions/{}/{}/{}", DOCTOR, PATIENT, created.id);
    let stored = h.store.read(&path).await.unwrap().unwrap();
    assert_eq!(stored["prescription"], json!("Amoxicillin 500mg, 3x daily"));
    assert_eq!(stored["date"], json!(created.date));
    assert!(created.file_url.is_none());

    let profile = h.patients.get_profile(PATIENT).await.unwrap();
    assert_eq!(profile.last_visit.as_deref(), Some(created.date.as_str()));

    let sent = h.notifier.wait_for(1).await;
    assert_eq!(sent[0].template, NotificationTemplate::Prescription);
    assert_eq!(sent[0].variable("patientEmail"), Some("pat@example.com"));
    assert_eq!(sent[0].variable("prescription"), Some("Amoxicillin 500mg, 3x daily"));
}

#[tokio::test]
async fn test_prescription_attachment_is_uploaded_and_resolved() {
    let h = harness();

    let created = h
        .prescriptions
        .create(
            DOCTOR,
            PATIENT,
            prescription(
                "See attached",
                Some(InlineFile { content_type: Some("application/pdf".into()), data: "JVBERi0=".into() }),
            ),
        )
        .await
        .unwrap();

    let object_path = format!("prescriptions/{}/{}/{}", DOCTOR, PATIENT, created.id);
    assert_eq!(
        created.file_url.as_deref(),
        Some(format!("gs://{}/{}", BUCKET, object_path).as_str())
    );
    assert_eq!(h.blobs.get(&object_path).await.unwrap(), b"%PDF-");

    let history = h.prescriptions.history(PATIENT).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(
        history[0].download_url.as_deref(),
        Some(format!("memory://{}/{}", BUCKET, object_path).as_str())
    );
}

#[tokio::test]
async fn test_prescription_rejects_bad_input() {
    let h = harness();

    let empty = h.prescriptions.create(DOCTOR, PATIENT, prescription("   ", None)).await;
    assert_matches!(empty, Err(PatientError::ValidationError(_)));

    let unknown = h.prescriptions.create(DOCTOR, "ghost", prescription("Rest", None)).await;
    assert_matches!(unknown, Err(PatientError::NotFound));

    let garbage = h
        .prescriptions
        .create(
            DOCTOR,
            PATIENT,
            prescription("Rest", Some(InlineFile { content_type: None, data: "***".into() })),
        )
        .await;
    assert_matches!(garbage, Err(PatientError::ValidationError(_)));
    assert!(h.store.read("prescriptions").await.unwrap().is_none());
}

#[tokio::test]
async fn test_history_spans_doctors_newest_first() {
    let h = harness_with(json!({
        "prescriptions": {
            DOCTOR: {
                PATIENT: {
                    "p-old": {"prescription": "Ibuprofen", "date": "2025-01-10T09:00:00.000Z"},
                    "p-lost": {
                        "prescription": "Scan",
                        "fileUrl": format!("gs://{}/prescriptions/missing", BUCKET),
                        "date": "2025-02-01T09:00:00.000Z"
                    }
                },
                "patient-2": {
                    "p-other": {"prescription": "Not mine", "date": "2025-03-01T09:00:00.000Z"}
                }
            },
            "grey@clinic": {
                PATIENT: {
                    "p-new": {"prescription": "Physiotherapy", "date": "2025-03-05T09:00:00.000Z"},
                    "p-broken": {"note": "no prescription field"}
                }
            }
        }
    }));

    let history = h.prescriptions.history(PATIENT).await.unwrap();

    let ids: Vec<&str> = history.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p-new", "p-lost", "p-old"]);
    assert_eq!(history[0].doctor_id, "grey@clinic");
    // Unresolvable attachments are kept without a link.
    assert!(history[1].file_url.is_some());
    assert!(history[1].download_url.is_none());
}

#[tokio::test]
async fn test_history_without_prescriptions_is_empty() {
    let h = harness();

    assert!(h.prescriptions.history(PATIENT).await.unwrap().is_empty());
}
