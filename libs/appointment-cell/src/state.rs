use std::sync::Arc;

use tracing::info;

use shared_config::{AppConfig, StoreBackend};
use shared_database::supabase::SupabaseClient;

use crate::services::{
    AppointmentScheduler, InMemoryStore, SupabaseAppointmentStore, SupabaseUserDirectory,
};

#[derive(Clone)]
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub scheduler: Arc<AppointmentScheduler>,
}

impl AppointmentState {
    /// Wires the scheduler to the store backend named in the config.
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        let scheduler = match config.appointment_store {
            StoreBackend::Supabase => {
                info!("Using Supabase appointment store at {}", config.supabase_url);
                let client = Arc::new(SupabaseClient::new(&config));
                AppointmentScheduler::new(
                    Arc::new(SupabaseAppointmentStore::with_client(Arc::clone(&client), &config)),
                    Arc::new(SupabaseUserDirectory::with_client(client, &config)),
                )
            }
            StoreBackend::Memory => {
                info!("Using in-memory appointment store");
                let store = Arc::new(match config.seed_users.as_deref() {
                    Some(seed) => InMemoryStore::with_seed_users(seed),
                    None => InMemoryStore::new(),
                });
                AppointmentScheduler::new(store.clone(), store)
            }
        };

        Self::with_scheduler(config.clone(), scheduler.with_default_page_limit(config.default_page_limit))
    }

    pub fn with_scheduler(config: Arc<AppConfig>, scheduler: AppointmentScheduler) -> Self {
        Self {
            config,
            scheduler: Arc::new(scheduler),
        }
    }
}
