pub mod conflict;
pub mod memory;
pub mod scheduler;
pub mod store;
pub mod supabase;

pub use conflict::ConflictDetectionService;
pub use memory::InMemoryStore;
pub use scheduler::AppointmentScheduler;
pub use store::{AppointmentStore, UserDirectory};
pub use supabase::{SupabaseAppointmentStore, SupabaseUserDirectory};
