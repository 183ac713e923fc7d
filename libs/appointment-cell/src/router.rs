// libs/appointment-cell/src/router.rs
use axum::{
    Extension, Router,
    routing::get,
    middleware,
};

use shared_models::auth::Role;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, RouteScope};
use crate::state::AppointmentState;

/// `/appointments`: every role, scoped by the caller's identity.
pub fn appointment_routes(state: AppointmentState) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::list_appointments).post(handlers::create_appointment))
        .route("/conflicts/check", get(handlers::check_appointment_conflicts))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment)
                .put(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}

/// Role aliases (`/admin/appointments` etc.) running the same logic for one role only.
pub fn scoped_appointment_routes(state: AppointmentState, role: Role) -> Router {
    let collection = match role {
        Role::Doctor => get(handlers::list_appointments),
        Role::Admin | Role::Patient => {
            get(handlers::list_appointments).post(handlers::create_appointment)
        }
    };

    let protected_routes = Router::new()
        .route("/", collection)
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment)
                .put(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .layer(Extension(RouteScope(role)))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
