use crate::handlers::profiles;
use crate::service::secret_codec::SecretCodec;
use crate::service::store::ProfileStore;
use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct VaultState {
    pub store: ProfileStore,
    pub codec: Arc<dyn SecretCodec>,
    pub api_key: Arc<str>,
}

impl VaultState {
    pub fn new(store: ProfileStore, codec: Arc<dyn SecretCodec>, api_key: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            codec,
            api_key: api_key.into(),
        }
    }
}

pub fn vault_router(state: VaultState) -> Router {
    Router::new()
        .route(
            "/connections",
            get(profiles::list_profiles).post(profiles::create_profile),
        )
        .route(
            "/connections/{id}",
            get(profiles::get_profile)
                .put(profiles::update_profile)
                .delete(profiles::delete_profile),
        )
        .route("/connections/{id}/secret", post(profiles::reveal_secret))
        .route("/principals/me", delete(profiles::remove_self))
        .with_state(state)
}
