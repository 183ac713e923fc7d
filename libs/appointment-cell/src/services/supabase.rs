use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{header::{HeaderMap, HeaderValue}, Method};
use serde_json::{json, Value};
use tracing::debug;
use urlencoding::encode;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::Role;

use crate::models::{Appointment, AppointmentError, AppointmentFilter, PageWindow, UserRecord};
use crate::services::store::{AppointmentStore, UserDirectory};

const APPOINTMENTS_PATH: &str = "/rest/v1/appointments";
const USERS_PATH: &str = "/rest/v1/users";

fn db_error(e: impl std::fmt::Display) -> AppointmentError {
    AppointmentError::DatabaseError(e.to_string())
}

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

fn id_list(ids: &[Uuid]) -> String {
    ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",")
}

/// PostgREST query parameters equivalent to `filter`.
pub fn filter_query(filter: &AppointmentFilter) -> Vec<String> {
    let mut query_parts = Vec::new();

    if let Some(id) = filter.exclude_id {
        query_parts.push(format!("id=neq.{}", id));
    }
    if let Some(doctor_id) = filter.doctor_id {
        query_parts.push(format!("doctor_id=eq.{}", doctor_id));
    }
    if let Some(patient_id) = filter.patient_id {
        query_parts.push(format!("patient_id=eq.{}", patient_id));
    }
    if let Some(ids) = &filter.doctor_id_in {
        query_parts.push(format!("doctor_id=in.({})", id_list(ids)));
    }
    if let Some(ids) = &filter.patient_id_in {
        query_parts.push(format!("patient_id=in.({})", id_list(ids)));
    }
    if let Some(date) = filter.appointment_date {
        query_parts.push(format!("appointment_date=eq.{}", date.format("%Y-%m-%d")));
    }
    if let Some(before) = filter.starts_before {
        query_parts.push(format!("start_time=lt.{}", encode(&before.to_rfc3339())));
    }
    if let Some(after) = filter.ends_after {
        query_parts.push(format!("end_time=gt.{}", encode(&after.to_rfc3339())));
    }
    if let Some(status) = filter.exclude_status {
        query_parts.push(format!("status=neq.{}", status));
    }

    query_parts
}

fn parse_rows<T: serde::de::DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, AppointmentError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| db_error(format!("Failed to parse rows: {}", e)))
}

/// Appointment store over the Supabase `appointments` table.
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
    service_token: String,
}

impl SupabaseAppointmentStore {
    pub fn with_client(supabase: Arc<SupabaseClient>, config: &AppConfig) -> Self {
        Self {
            supabase,
            service_token: config.store_api_key().to_string(),
        }
    }

    async fn fetch(&self, path: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let rows: Vec<Value> = self.supabase
            .request(Method::GET, path, Some(&self.service_token), None)
            .await
            .map_err(db_error)?;
        parse_rows(rows)
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS_PATH, id);
        Ok(self.fetch(&path).await?.into_iter().next())
    }

    async fn find(
        &self,
        filter: &AppointmentFilter,
        window: Option<PageWindow>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut query_parts = filter_query(filter);
        query_parts.push("order=start_time.asc,id.asc".to_string());
        if let Some(window) = window {
            query_parts.push(format!("offset={}", window.offset));
            query_parts.push(format!("limit={}", window.limit));
        }

        let path = format!("{}?{}", APPOINTMENTS_PATH, query_parts.join("&"));
        debug!("Querying appointments: {}", path);
        self.fetch(&path).await
    }

    async fn count(&self, filter: &AppointmentFilter) -> Result<u64, AppointmentError> {
        let mut query_parts = filter_query(filter);
        query_parts.push("select=id".to_string());

        let path = format!("{}?{}", APPOINTMENTS_PATH, query_parts.join("&"));
        self.supabase
            .count(&path, Some(&self.service_token))
            .await
            .map_err(db_error)
    }

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let body = serde_json::to_value(&appointment).map_err(db_error)?;

        let rows: Vec<Value> = self.supabase
            .request_with_headers(
                Method::POST,
                APPOINTMENTS_PATH,
                Some(&self.service_token),
                Some(body),
                Some(representation_headers()),
            )
            .await
            .map_err(db_error)?;

        parse_rows(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| db_error("Insert returned no rows"))
    }

    async fn update(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS_PATH, appointment.id);
        let body = json!({
            "appointment_date": appointment.appointment_date,
            "start_time": appointment.start_time,
            "end_time": appointment.end_time,
            "status": appointment.status,
            "notes": appointment.notes,
            "reason": appointment.reason,
            "updated_at": appointment.updated_at,
        });

        let rows: Vec<Value> = self.supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(&self.service_token),
                Some(body),
                Some(representation_headers()),
            )
            .await
            .map_err(db_error)?;

        parse_rows(rows)?
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppointmentError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS_PATH, id);

        let rows: Vec<Value> = self.supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                Some(&self.service_token),
                None,
                Some(representation_headers()),
            )
            .await
            .map_err(db_error)?;

        Ok(!rows.is_empty())
    }
}

/// User lookups against the Supabase `users` table.
pub struct SupabaseUserDirectory {
    supabase: Arc<SupabaseClient>,
    service_token: String,
}

impl SupabaseUserDirectory {
    pub fn with_client(supabase: Arc<SupabaseClient>, config: &AppConfig) -> Self {
        Self {
            supabase,
            service_token: config.store_api_key().to_string(),
        }
    }
}

#[async_trait]
impl UserDirectory for SupabaseUserDirectory {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, AppointmentError> {
        let path = format!("{}?id=eq.{}&select=id,role,name,email", USERS_PATH, id);

        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, Some(&self.service_token), None)
            .await
            .map_err(db_error)?;

        Ok(parse_rows::<UserRecord>(rows)?.into_iter().next())
    }

    async fn user_ids_with_role(&self, role: Role) -> Result<Vec<Uuid>, AppointmentError> {
        let path = format!("{}?role=eq.{}&select=id", USERS_PATH, role);

        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, Some(&self.service_token), None)
            .await
            .map_err(db_error)?;

        rows.iter()
            .map(|row| {
                row.get("id")
                    .and_then(Value::as_str)
                    .and_then(|id| Uuid::parse_str(id).ok())
                    .ok_or_else(|| db_error(format!("Malformed user row: {}", row)))
            })
            .collect()
    }
}
