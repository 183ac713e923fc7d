// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Path, Query, State, Extension},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::{Caller, Role};
use shared_models::error::AppError;

use crate::models::{
    AppointmentListQuery, ConflictCheckQuery, CreateAppointmentRequest, UpdateAppointmentRequest,
};
use crate::state::AppointmentState;

/// Role a router alias (`/admin/...`, `/doctor/...`, `/patient/...`) is mounted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteScope(pub Role);

fn ensure_scope(caller: &Caller, scope: &Option<Extension<RouteScope>>) -> Result<(), AppError> {
    match scope {
        Some(Extension(RouteScope(role))) if *role != caller.role => Err(AppError::Forbidden(
            format!("This endpoint is reserved for {} accounts", role),
        )),
        _ => Ok(()),
    }
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppointmentState>,
    Extension(caller): Extension<Caller>,
    scope: Option<Extension<RouteScope>>,
    Json(mut request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    ensure_scope(&caller, &scope)?;

    // Patients booking through their own alias always book for themselves.
    if scope.is_some() && caller.role == Role::Patient {
        request.patient_id = caller.id;
    }

    let appointment = state.scheduler.create(&caller, request).await?;

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    }))))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppointmentState>,
    Extension(caller): Extension<Caller>,
    scope: Option<Extension<RouteScope>>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    ensure_scope(&caller, &scope)?;

    let page = state.scheduler.list(&caller, query).await?;
    Ok(Json(json!(page)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppointmentState>,
    Extension(caller): Extension<Caller>,
    scope: Option<Extension<RouteScope>>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    ensure_scope(&caller, &scope)?;

    let appointment = state.scheduler.get_by_id(&caller, &appointment_id).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<AppointmentState>,
    Extension(caller): Extension<Caller>,
    scope: Option<Extension<RouteScope>>,
    Path(appointment_id): Path<String>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_scope(&caller, &scope)?;

    let appointment = state.scheduler.update(&caller, &appointment_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<AppointmentState>,
    Extension(caller): Extension<Caller>,
    scope: Option<Extension<RouteScope>>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    ensure_scope(&caller, &scope)?;

    state.scheduler.delete(&caller, &appointment_id).await?;

    Ok(Json(json!({
        "message": "Appointment deleted successfully"
    })))
}

#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(state): State<AppointmentState>,
    Extension(_caller): Extension<Caller>,
    Query(query): Query<ConflictCheckQuery>,
) -> Result<Json<Value>, AppError> {
    let response = state.scheduler.check_conflicts(query).await?;
    Ok(Json(json!(response)))
}
