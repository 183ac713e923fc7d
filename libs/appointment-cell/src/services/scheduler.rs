// libs/appointment-cell/src/services/scheduler.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_models::auth::{Caller, Role};

use crate::models::{
    Appointment, AppointmentError, AppointmentFilter, AppointmentListQuery, AppointmentPage,
    ConflictCheckQuery, ConflictCheckResponse, CreateAppointmentRequest,
    PageWindow, Slot, UpdateAppointmentRequest,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::store::{AppointmentStore, UserDirectory};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Validates and persists appointment requests against a doctor's existing bookings.
///
/// The overlap check and the write that follows are separate store calls, so two
/// concurrent bookings for the same slot can both succeed.
pub struct AppointmentScheduler {
    appointments: Arc<dyn AppointmentStore>,
    users: Arc<dyn UserDirectory>,
    conflict_service: ConflictDetectionService,
    default_page_limit: u32,
}

impl AppointmentScheduler {
    pub fn new(appointments: Arc<dyn AppointmentStore>, users: Arc<dyn UserDirectory>) -> Self {
        Self {
            conflict_service: ConflictDetectionService::new(Arc::clone(&appointments)),
            appointments,
            users,
            default_page_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    pub fn with_default_page_limit(mut self, limit: u32) -> Self {
        self.default_page_limit = limit.clamp(1, MAX_PAGE_LIMIT);
        self
    }

    pub async fn create(
        &self,
        caller: &Caller,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        debug!("{} {} booking doctor {} for patient {}",
               caller.role, caller.id, request.doctor_id, request.patient_id);

        authorize_create(caller, &request)?;

        let slot = Slot::new(request.start_time, request.end_time)?;

        self.require_user(request.doctor_id, Role::Doctor).await?;
        self.require_user(request.patient_id, Role::Patient).await?;

        self.conflict_service
            .ensure_slot_free(request.doctor_id, request.appointment_date, slot, None)
            .await?;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            doctor_id: request.doctor_id,
            patient_id: request.patient_id,
            appointment_date: request.appointment_date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            status: request.status.unwrap_or_default(),
            notes: request.notes,
            reason: request.reason,
            created_at: now,
            updated_at: now,
        };

        let stored = self.appointments.insert(appointment).await?;

        info!(target: "audit", appointment_id = %stored.id, caller_id = %caller.id,
              role = %caller.role, "Appointment created");
        Ok(stored)
    }

    pub async fn list(
        &self,
        caller: &Caller,
        query: AppointmentListQuery,
    ) -> Result<AppointmentPage, AppointmentError> {
        let page = query.page.unwrap_or(1);
        let limit = query.limit.unwrap_or(self.default_page_limit);

        if page == 0 {
            return Err(AppointmentError::ValidationError("page must be at least 1".to_string()));
        }
        if limit == 0 {
            return Err(AppointmentError::ValidationError("limit must be at least 1".to_string()));
        }
        let limit = limit.min(MAX_PAGE_LIMIT);

        let filter = self.scope_filter(caller, query.role).await?;
        let window = PageWindow::for_page(page, limit);

        let (appointments, total) = futures::try_join!(
            self.appointments.find(&filter, Some(window)),
            self.appointments.count(&filter),
        )?;

        debug!("Listed {} of {} appointments for {} {} (page {}, limit {})",
               appointments.len(), total, caller.role, caller.id, page, limit);

        Ok(AppointmentPage {
            appointments,
            total,
            page,
            limit,
        })
    }

    pub async fn get_by_id(&self, caller: &Caller, id: &str) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(id).await?;
        authorize_access(caller, &appointment, "access")?;
        Ok(appointment)
    }

    pub async fn update(
        &self,
        caller: &Caller,
        id: &str,
        patch: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.load(id).await?;
        authorize_access(caller, &appointment, "update")?;

        // A cancelled booking regains its slot only if nobody took it meanwhile.
        let reactivates = !appointment.status.holds_slot()
            && patch.status.is_some_and(|status| status.holds_slot());

        if patch.touches_schedule() || reactivates {
            let date = patch.appointment_date.unwrap_or(appointment.appointment_date);
            let slot = Slot::new(
                patch.start_time.unwrap_or(appointment.start_time),
                patch.end_time.unwrap_or(appointment.end_time),
            )?;

            let stays_active = patch.status.unwrap_or(appointment.status).holds_slot();
            if stays_active {
                self.conflict_service
                    .ensure_slot_free(appointment.doctor_id, date, slot, Some(appointment.id))
                    .await?;
            }

            appointment.appointment_date = date;
            appointment.start_time = slot.start_time;
            appointment.end_time = slot.end_time;
        }

        if let Some(status) = patch.status {
            appointment.status = status;
        }
        if let Some(notes) = patch.notes {
            appointment.notes = Some(notes);
        }
        if let Some(reason) = patch.reason {
            appointment.reason = Some(reason);
        }
        appointment.updated_at = Utc::now();

        let updated = self.appointments.update(appointment).await?;

        info!(target: "audit", appointment_id = %updated.id, caller_id = %caller.id,
              role = %caller.role, status = %updated.status, "Appointment updated");
        Ok(updated)
    }

    pub async fn delete(&self, caller: &Caller, id: &str) -> Result<(), AppointmentError> {
        let appointment = self.load(id).await?;
        authorize_access(caller, &appointment, "delete")?;

        if !self.appointments.delete(appointment.id).await? {
            return Err(AppointmentError::NotFound);
        }

        info!(target: "audit", appointment_id = %appointment.id, caller_id = %caller.id,
              role = %caller.role, "Appointment deleted");
        Ok(())
    }

    /// Read-only overlap probe. Returns slots only, never the other bookings' parties.
    pub async fn check_conflicts(
        &self,
        query: ConflictCheckQuery,
    ) -> Result<ConflictCheckResponse, AppointmentError> {
        let slot = Slot::new(query.start_time, query.end_time)?;
        self.conflict_service
            .check_conflicts(query.doctor_id, query.appointment_date, slot, query.exclude_appointment_id)
            .await
    }

    async fn load(&self, id: &str) -> Result<Appointment, AppointmentError> {
        let id = Uuid::parse_str(id).map_err(|_| AppointmentError::InvalidId)?;
        self.appointments
            .find_by_id(id)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    async fn require_user(&self, id: Uuid, role: Role) -> Result<(), AppointmentError> {
        let not_found = match role {
            Role::Doctor => AppointmentError::DoctorNotFound,
            _ => AppointmentError::PatientNotFound,
        };

        match self.users.find_user(id).await? {
            Some(user) if user.role == role => Ok(()),
            Some(user) => {
                debug!("User {} has role {}, expected {}", id, user.role, role);
                Err(not_found)
            }
            None => Err(not_found),
        }
    }

    async fn scope_filter(
        &self,
        caller: &Caller,
        role_filter: Option<Role>,
    ) -> Result<AppointmentFilter, AppointmentError> {
        let mut filter = AppointmentFilter::default();

        match caller.role {
            Role::Doctor => {
                filter.doctor_id = Some(caller.id);
                // Doctors may narrow their own bookings to patients holding `role`.
                if let Some(role) = role_filter {
                    filter.patient_id_in = Some(self.users.user_ids_with_role(role).await?);
                }
            }
            Role::Patient => filter.patient_id = Some(caller.id),
            Role::Admin => match role_filter {
                Some(Role::Doctor) => {
                    filter.doctor_id_in = Some(self.users.user_ids_with_role(Role::Doctor).await?);
                }
                Some(Role::Patient) => {
                    filter.patient_id_in = Some(self.users.user_ids_with_role(Role::Patient).await?);
                }
                Some(Role::Admin) => {
                    return Err(AppointmentError::ValidationError(
                        "role filter must be doctor or patient".to_string(),
                    ));
                }
                None => {}
            },
        }

        if caller.role == Role::Patient && role_filter.is_some() {
            debug!("Ignoring role filter for {} caller", caller.role);
        }

        Ok(filter)
    }
}

fn authorize_create(caller: &Caller, request: &CreateAppointmentRequest) -> Result<(), AppointmentError> {
    match caller.role {
        Role::Admin => Ok(()),
        Role::Patient if request.patient_id == caller.id => Ok(()),
        Role::Patient => Err(AppointmentError::Forbidden(
            "Patients can only book their own appointments".to_string(),
        )),
        Role::Doctor => Err(AppointmentError::Forbidden(
            "Doctors cannot create appointments on behalf of patients".to_string(),
        )),
    }
}

fn authorize_access(caller: &Caller, appointment: &Appointment, action: &str) -> Result<(), AppointmentError> {
    match caller.role {
        Role::Doctor if appointment.doctor_id != caller.id => Err(AppointmentError::Forbidden(
            format!("Doctors can only {} their own appointments", action),
        )),
        Role::Patient if appointment.patient_id != caller.id => Err(AppointmentError::Forbidden(
            format!("Patients can only {} their own appointments", action),
        )),
        _ => Ok(()),
    }
}
