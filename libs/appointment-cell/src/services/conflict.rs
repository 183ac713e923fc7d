use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{AppointmentError, AppointmentFilter, ConflictCheckResponse, Slot};
use crate::services::store::AppointmentStore;

pub struct ConflictDetectionService {
    appointments: Arc<dyn AppointmentStore>,
}

impl ConflictDetectionService {
    pub fn new(appointments: Arc<dyn AppointmentStore>) -> Self {
        Self { appointments }
    }

    /// Active bookings of the doctor on `date` that intersect `slot`.
    pub async fn check_conflicts(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        slot: Slot,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<ConflictCheckResponse, AppointmentError> {
        debug!("Checking conflicts for doctor {} on {} from {} to {}",
               doctor_id, date, slot.start_time, slot.end_time);

        let filter = AppointmentFilter::overlapping(doctor_id, date, slot, exclude_appointment_id);
        let existing = self.appointments.find(&filter, None).await?;

        // Half-open overlap, independent of how the store applied its range predicates.
        let conflicting_slots: Vec<Slot> = existing
            .iter()
            .filter(|appointment| appointment.status.holds_slot())
            .map(|appointment| appointment.slot())
            .filter(|booked| booked.overlaps(&slot))
            .collect();

        if !conflicting_slots.is_empty() {
            warn!("Conflict detected for doctor {} - {} conflicting appointments",
                  doctor_id, conflicting_slots.len());
        }

        Ok(ConflictCheckResponse {
            has_conflict: !conflicting_slots.is_empty(),
            conflicting_slots,
        })
    }

    /// Fails with `ConflictDetected` when the slot is taken.
    pub async fn ensure_slot_free(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        slot: Slot,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<(), AppointmentError> {
        let response = self.check_conflicts(doctor_id, date, slot, exclude_appointment_id).await?;
        if response.has_conflict {
            return Err(AppointmentError::ConflictDetected);
        }
        Ok(())
    }
}
