use std::env;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: Option<String>,
    pub supabase_jwt_secret: String,
    pub appointment_store: StoreBackend,
    pub server_port: u16,
    pub default_page_limit: u32,
    /// `role:uuid` pairs preloaded into the in-memory user directory.
    pub seed_users: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY").ok()
                .filter(|key| !key.is_empty()),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            appointment_store: StoreBackend::Memory,
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(3000),
            default_page_limit: env::var("DEFAULT_PAGE_LIMIT")
                .ok()
                .and_then(|limit| limit.parse().ok())
                .filter(|limit: &u32| *limit > 0)
                .unwrap_or(10),
            seed_users: env::var("SEED_USERS").ok(),
        };

        config.appointment_store = match env::var("APPOINTMENT_STORE").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("supabase") => StoreBackend::Supabase,
            Ok(other) => {
                warn!("Unknown APPOINTMENT_STORE '{}', falling back to default", other);
                config.default_backend()
            }
            Err(_) => config.default_backend(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    /// Key used for server-side store access. Falls back to the anon key.
    pub fn store_api_key(&self) -> &str {
        self.supabase_service_role_key
            .as_deref()
            .unwrap_or(&self.supabase_anon_key)
    }

    fn default_backend(&self) -> StoreBackend {
        if self.supabase_url.is_empty() {
            StoreBackend::Memory
        } else {
            StoreBackend::Supabase
        }
    }
}
