use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use shared_models::auth::Role;

use crate::models::{Appointment, AppointmentError, AppointmentFilter, PageWindow, UserRecord};
use crate::services::store::{AppointmentStore, UserDirectory};

/// Process-local store backing both appointments and the user directory.
#[derive(Default)]
pub struct InMemoryStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from `role:uuid` pairs separated by commas, e.g.
    /// `doctor:7f0c...,patient:1a2b...`. Malformed entries are skipped.
    pub fn with_seed_users(entries: &str) -> Self {
        let users = entries
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| {
                let parsed = entry.split_once(':').and_then(|(role, id)| {
                    Some(UserRecord {
                        id: Uuid::parse_str(id.trim()).ok()?,
                        role: role.trim().parse::<Role>().ok()?,
                        name: None,
                        email: None,
                    })
                });
                if parsed.is_none() {
                    warn!("Skipping malformed seed user entry '{}'", entry);
                }
                parsed
            })
            .map(|user| (user.id, user))
            .collect();

        Self {
            appointments: RwLock::default(),
            users: RwLock::new(users),
        }
    }

    pub async fn add_user(&self, id: Uuid, role: Role) {
        self.users.write().await.insert(id, UserRecord {
            id,
            role,
            name: None,
            email: None,
        });
    }

    pub async fn len(&self) -> usize {
        self.appointments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.appointments.read().await.is_empty()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn find(
        &self,
        filter: &AppointmentFilter,
        window: Option<PageWindow>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut matching: Vec<Appointment> = self.appointments
            .read()
            .await
            .values()
            .filter(|appointment| filter.matches(appointment))
            .cloned()
            .collect();

        matching.sort_by_key(|appointment| (appointment.start_time, appointment.id));

        Ok(match window {
            Some(window) => matching
                .into_iter()
                .skip(window.offset as usize)
                .take(window.limit as usize)
                .collect(),
            None => matching,
        })
    }

    async fn count(&self, filter: &AppointmentFilter) -> Result<u64, AppointmentError> {
        Ok(self.appointments
            .read()
            .await
            .values()
            .filter(|appointment| filter.matches(appointment))
            .count() as u64)
    }

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        if appointments.contains_key(&appointment.id) {
            return Err(AppointmentError::DatabaseError(format!(
                "Duplicate appointment id {}",
                appointment.id
            )));
        }
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn update(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        match appointments.get_mut(&appointment.id) {
            Some(stored) => {
                *stored = appointment.clone();
                Ok(appointment)
            }
            None => Err(AppointmentError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppointmentError> {
        Ok(self.appointments.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, AppointmentError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn user_ids_with_role(&self, role: Role) -> Result<Vec<Uuid>, AppointmentError> {
        Ok(self.users
            .read()
            .await
            .values()
            .filter(|user| user.role == role)
            .map(|user| user.id)
            .collect())
    }
}
