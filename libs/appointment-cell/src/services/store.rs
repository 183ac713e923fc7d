use async_trait::async_trait;
use uuid::Uuid;

use shared_models::auth::Role;

use crate::models::{Appointment, AppointmentError, AppointmentFilter, PageWindow, UserRecord};

/// Appointment persistence. Single-document writes are atomic; nothing
/// spans two calls.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError>;

    /// Matching appointments ordered by `(start_time, id)`.
    async fn find(
        &self,
        filter: &AppointmentFilter,
        window: Option<PageWindow>,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    async fn count(&self, filter: &AppointmentFilter) -> Result<u64, AppointmentError>;

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;

    /// Replaces the stored document with the same id.
    async fn update(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;

    /// Returns `false` when nothing was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, AppointmentError>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, AppointmentError>;

    async fn user_ids_with_role(&self, role: Role) -> Result<Vec<Uuid>, AppointmentError>;
}
