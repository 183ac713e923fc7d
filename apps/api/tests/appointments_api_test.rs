use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use appointment_cell::services::{AppointmentScheduler, InMemoryStore};
use appointment_cell::AppointmentState;
use clinic_api::router::create_router_with_state;
use shared_models::auth::Role;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

struct TestApp {
    router: Router,
    config: TestConfig,
    admin: TestUser,
    doctor: TestUser,
    other_doctor: TestUser,
    patient: TestUser,
    other_patient: TestUser,
}

impl TestApp {
    async fn new() -> Self {
        let config = TestConfig::default();
        let admin = TestUser::admin("admin@example.com");
        let doctor = TestUser::doctor("doctor@example.com");
        let other_doctor = TestUser::doctor("other.doctor@example.com");
        let patient = TestUser::patient("patient@example.com");
        let other_patient = TestUser::patient("other.patient@example.com");

        let store = Arc::new(InMemoryStore::new());
        store.add_user(admin.uuid(), Role::Admin).await;
        store.add_user(doctor.uuid(), Role::Doctor).await;
        store.add_user(other_doctor.uuid(), Role::Doctor).await;
        store.add_user(patient.uuid(), Role::Patient).await;
        store.add_user(other_patient.uuid(), Role::Patient).await;

        let state = AppointmentState::with_scheduler(
            config.to_arc(),
            AppointmentScheduler::new(store.clone(), store),
        );

        Self {
            router: create_router_with_state(state),
            config,
            admin,
            doctor,
            other_doctor,
            patient,
            other_patient,
        }
    }

    fn token(&self, user: &TestUser) -> String {
        JwtTestUtils::create_test_token(user, &self.config.jwt_secret, Some(1))
    }

    async fn send(&self, method: &str, uri: &str, user: Option<&TestUser>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("Authorization", format!("Bearer {}", self.token(user)));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}

fn booking(doctor: &TestUser, patient: &TestUser, start: &str, end: &str) -> Value {
    json!({
        "doctor_id": doctor.id,
        "patient_id": patient.id,
        "appointment_date": "2024-01-10",
        "start_time": format!("2024-01-10T{}:00Z", start),
        "end_time": format!("2024-01-10T{}:00Z", end),
        "reason": "Checkup"
    })
}

#[tokio::test]
async fn health_route_responds() {
    let app = TestApp::new().await;
    let response = app.router.clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn requests_without_token_are_unauthorized() {
    let app = TestApp::new().await;
    let (status, body) = app.send("GET", "/appointments", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn overlapping_booking_is_rejected_and_touching_slot_accepted() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send("POST", "/appointments", Some(&app.admin), Some(booking(&app.doctor, &app.patient, "10:00", "10:30")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["appointment"]["status"], "scheduled");

    let (status, body) = app
        .send("POST", "/appointments", Some(&app.admin), Some(booking(&app.doctor, &app.other_patient, "10:15", "10:45")))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Time slot is already booked");

    let (status, _) = app
        .send("POST", "/appointments", Some(&app.admin), Some(booking(&app.doctor, &app.other_patient, "10:30", "11:00")))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .send("POST", "/appointments", Some(&app.admin), Some(booking(&app.other_doctor, &app.other_patient, "10:00", "10:30")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn invalid_time_range_is_bad_request() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send("POST", "/appointments", Some(&app.admin), Some(booking(&app.doctor, &app.patient, "11:00", "10:00")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "End time must be after start time");
}

#[tokio::test]
async fn role_rules_for_creation() {
    let app = TestApp::new().await;

    let (status, _) = app
        .send("POST", "/appointments", Some(&app.patient), Some(booking(&app.doctor, &app.other_patient, "09:00", "09:30")))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send("POST", "/appointments", Some(&app.doctor), Some(booking(&app.doctor, &app.patient, "09:00", "09:30")))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send("POST", "/appointments", Some(&app.patient), Some(booking(&app.doctor, &app.patient, "09:00", "09:30")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["appointment"]["patient_id"], app.patient.id.as_str());
}

#[tokio::test]
async fn unknown_doctor_is_not_found() {
    let app = TestApp::new().await;
    let stranger = TestUser::doctor("stranger@example.com");
    let (status, _) = app
        .send("POST", "/appointments", Some(&app.admin), Some(booking(&stranger, &app.patient, "09:00", "09:30")))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn doctor_lists_own_appointments_with_pagination() {
    let app = TestApp::new().await;
    for (start, end) in [("09:00", "09:30"), ("10:00", "10:30"), ("11:00", "11:30")] {
        let (status, _) = app
            .send("POST", "/appointments", Some(&app.admin), Some(booking(&app.doctor, &app.patient, start, end)))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = app
        .send("POST", "/appointments", Some(&app.admin), Some(booking(&app.other_doctor, &app.patient, "12:00", "12:30")))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.send("GET", "/appointments?page=1&limit=2", Some(&app.doctor), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["appointments"].as_array().unwrap().len(), 2);

    let (_, body) = app.send("GET", "/appointments?page=2&limit=2", Some(&app.doctor), None).await;
    assert_eq!(body["appointments"].as_array().unwrap().len(), 1);
    assert_eq!(body["appointments"][0]["start_time"], "2024-01-10T11:00:00Z");

    let (_, body) = app.send("GET", "/appointments", Some(&app.patient), None).await;
    assert_eq!(body["total"], 4);
}

#[tokio::test]
async fn list_rejects_zero_limit() {
    let app = TestApp::new().await;
    let (status, _) = app.send("GET", "/appointments?limit=0", Some(&app.admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn read_update_delete_lifecycle() {
    let app = TestApp::new().await;
    let (_, body) = app
        .send("POST", "/appointments", Some(&app.admin), Some(booking(&app.doctor, &app.patient, "14:00", "14:30")))
        .await;
    let id = body["appointment"]["id"].as_str().unwrap().to_string();
    let uri = format!("/appointments/{}", id);

    let (status, body) = app.send("GET", &uri, Some(&app.patient), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());

    let (status, _) = app.send("GET", &uri, Some(&app.other_patient), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send("PUT", &uri, Some(&app.doctor), Some(json!({ "status": "completed", "notes": "Seen" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["status"], "completed");
    assert_eq!(body["appointment"]["notes"], "Seen");

    let (status, _) = app.send("DELETE", &uri, Some(&app.other_doctor), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send("DELETE", &uri, Some(&app.admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Appointment deleted successfully");

    let (status, _) = app.send("GET", &uri, Some(&app.admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_id_is_not_found() {
    let app = TestApp::new().await;
    let (status, _) = app.send("GET", "/appointments/not-a-uuid", Some(&app.admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn conflict_check_reports_overlapping_slots() {
    let app = TestApp::new().await;
    app.send("POST", "/appointments", Some(&app.admin), Some(booking(&app.doctor, &app.patient, "10:00", "10:30")))
        .await;

    let uri = format!(
        "/appointments/conflicts/check?doctor_id={}&appointment_date=2024-01-10&start_time=2024-01-10T10:15:00Z&end_time=2024-01-10T10:45:00Z",
        app.doctor.id
    );
    let (status, body) = app.send("GET", &uri, Some(&app.patient), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_conflict"], true);
    assert_eq!(body["conflicting_slots"].as_array().unwrap().len(), 1);
    assert!(body["conflicting_slots"][0].get("patient_id").is_none());

    let uri = format!(
        "/appointments/conflicts/check?doctor_id={}&appointment_date=2024-01-10&start_time=2024-01-10T10:30:00Z&end_time=2024-01-10T11:00:00Z",
        app.doctor.id
    );
    let (_, body) = app.send("GET", &uri, Some(&app.patient), None).await;
    assert_eq!(body["has_conflict"], false);
}

#[tokio::test]
async fn role_aliases_reject_other_roles() {
    let app = TestApp::new().await;

    let (status, body) = app.send("GET", "/admin/appointments", Some(&app.patient), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "This endpoint is reserved for admin accounts");

    let (status, _) = app.send("GET", "/doctor/appointments", Some(&app.doctor), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send("GET", "/patient/appointments", Some(&app.doctor), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send("POST", "/doctor/appointments", Some(&app.doctor), Some(booking(&app.doctor, &app.patient, "09:00", "09:30")))
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn patient_alias_books_for_caller() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send("POST", "/patient/appointments", Some(&app.patient), Some(booking(&app.doctor, &app.other_patient, "15:00", "15:30")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["appointment"]["patient_id"], app.patient.id.as_str());
}

#[tokio::test]
async fn admin_role_filter_narrows_listing() {
    let app = TestApp::new().await;
    app.send("POST", "/appointments", Some(&app.admin), Some(booking(&app.doctor, &app.patient, "09:00", "09:30")))
        .await;

    let (status, body) = app.send("GET", "/admin/appointments?role=doctor", Some(&app.admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, _) = app.send("GET", "/admin/appointments?role=admin", Some(&app.admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
