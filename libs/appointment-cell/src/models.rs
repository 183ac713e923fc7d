// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use shared_models::auth::Role;
use shared_models::error::AppError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn slot(&self) -> Slot {
        Slot {
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Cancelled appointments no longer occupy their slot.
    pub fn holds_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open booking interval `[start_time, end_time)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Slot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl Slot {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Result<Self, AppointmentError> {
        if start_time >= end_time {
            return Err(AppointmentError::InvalidTime(
                "End time must be after start time".to_string(),
            ));
        }
        Ok(Self { start_time, end_time })
    }

    pub fn overlaps(&self, other: &Slot) -> bool {
        other.start_time < self.end_time && other.end_time > self.start_time
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub appointment_date: Option<NaiveDate>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
    pub reason: Option<String>,
}

impl UpdateAppointmentRequest {
    pub fn touches_schedule(&self) -> bool {
        self.appointment_date.is_some() || self.start_time.is_some() || self.end_time.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentPage {
    pub appointments: Vec<Appointment>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckQuery {
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    pub conflicting_slots: Vec<Slot>,
}

// ==============================================================================
// STORE MODELS
// ==============================================================================

/// User as seen by the scheduler: only identity and role matter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub id: Uuid,
    pub role: Role,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Conjunction of predicates over appointment fields. `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentFilter {
    pub exclude_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub doctor_id_in: Option<Vec<Uuid>>,
    pub patient_id_in: Option<Vec<Uuid>>,
    pub appointment_date: Option<NaiveDate>,
    pub starts_before: Option<DateTime<Utc>>,
    pub ends_after: Option<DateTime<Utc>>,
    pub exclude_status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    /// Active bookings of `doctor_id` on `date` intersecting `slot`.
    pub fn overlapping(doctor_id: Uuid, date: NaiveDate, slot: Slot, exclude_id: Option<Uuid>) -> Self {
        Self {
            exclude_id,
            doctor_id: Some(doctor_id),
            appointment_date: Some(date),
            starts_before: Some(slot.end_time),
            ends_after: Some(slot.start_time),
            exclude_status: Some(AppointmentStatus::Cancelled),
            ..Self::default()
        }
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        if self.exclude_id.is_some_and(|id| id == appointment.id) {
            return false;
        }
        if self.doctor_id.is_some_and(|id| id != appointment.doctor_id) {
            return false;
        }
        if self.patient_id.is_some_and(|id| id != appointment.patient_id) {
            return false;
        }
        if let Some(ids) = &self.doctor_id_in {
            if !ids.contains(&appointment.doctor_id) {
                return false;
            }
        }
        if let Some(ids) = &self.patient_id_in {
            if !ids.contains(&appointment.patient_id) {
                return false;
            }
        }
        if self.appointment_date.is_some_and(|date| date != appointment.appointment_date) {
            return false;
        }
        if self.starts_before.is_some_and(|t| appointment.start_time >= t) {
            return false;
        }
        if self.ends_after.is_some_and(|t| appointment.end_time <= t) {
            return false;
        }
        if self.exclude_status.is_some_and(|s| s == appointment.status) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
}

impl PageWindow {
    /// One-based page number to offset window.
    pub fn for_page(page: u32, limit: u32) -> Self {
        Self {
            offset: u64::from(page.saturating_sub(1)) * u64::from(limit),
            limit: u64::from(limit),
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Invalid appointment ID")]
    InvalidId,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("{0}")]
    InvalidTime(String),

    #[error("Time slot is already booked")]
    ConflictDetected,

    #[error("{0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound
            | AppointmentError::InvalidId
            | AppointmentError::DoctorNotFound
            | AppointmentError::PatientNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::InvalidTime(msg) => AppError::BadRequest(msg),
            AppointmentError::ConflictDetected => AppError::Conflict(err.to_string()),
            AppointmentError::Forbidden(msg) => AppError::Forbidden(msg),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
