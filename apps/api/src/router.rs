use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::{appointment_routes, scoped_appointment_routes, AppointmentState};
use shared_config::AppConfig;
use shared_models::auth::Role;

pub fn create_router(config: Arc<AppConfig>) -> Router {
    let appointments = AppointmentState::from_config(config);
    create_router_with_state(appointments)
}

/// Mounts the appointment routes and their per-role aliases over one shared scheduler.
pub fn create_router_with_state(appointments: AppointmentState) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic appointment API is running!" }))
        .nest("/appointments", appointment_routes(appointments.clone()))
        .nest("/admin/appointments", scoped_appointment_routes(appointments.clone(), Role::Admin))
        .nest("/doctor/appointments", scoped_appointment_routes(appointments.clone(), Role::Doctor))
        .nest("/patient/appointments", scoped_appointment_routes(appointments, Role::Patient))
}
