use crate::error::VaultError;
use crate::middleware::auth::AuthenticatedPrincipal;
use crate::middleware::json_body::JsonBody;
use crate::router::VaultState;
use crate::types::ids::ProfileId;
use crate::types::profile::{ConnectionProfile, NewProfile, ProfilePatch};
use crate::types::secret::Plaintext;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;

/// Ports arrive either as JSON numbers or as strings; both are kept as text
/// and validated by the record model.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PortInput {
    Text(String),
    Number(u64),
}

impl From<PortInput> for String {
    fn from(p: PortInput) -> Self {
        match p {
            PortInput::Text(s) => s,
            PortInput::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub name: String,
    pub kind: String,
    pub host: String,
    pub port: PortInput,
    pub database_name: String,
    pub username: String,
    pub password: Plaintext,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub host: Option<String>,
    pub port: Option<PortInput>,
    pub database_name: Option<String>,
    pub username: Option<String>,
    pub password: Option<Plaintext>,
}

/// Outbound shape of a profile; the ciphertext never leaves the service.
#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub id: ProfileId,
    pub name: String,
    pub kind: String,
    pub host: String,
    pub port: String,
    pub database_name: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ConnectionProfile> for ProfileView {
    fn from(p: ConnectionProfile) -> Self {
        Self {
            id: p.id,
            name: p.name,
            kind: p.kind,
            host: p.host,
            port: p.port,
            database_name: p.database_name,
            username: p.username,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

// Malformed ids cannot name anything the caller owns.
fn parse_id(raw: &str) -> Result<ProfileId, VaultError> {
    ProfileId::from_str(raw).map_err(|_| VaultError::NotFound)
}

/// POST /connections
pub async fn create_profile(
    State(state): State<VaultState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    JsonBody(req): JsonBody<CreateProfileRequest>,
) -> Result<impl IntoResponse, VaultError> {
    let encrypted_secret = state.codec.encrypt(&req.password)?;
    let fields = NewProfile {
        name: req.name,
        kind: req.kind,
        host: req.host,
        port: req.port.into(),
        database_name: req.database_name,
        username: req.username,
        encrypted_secret,
    };
    let profile = state.store.create(principal, principal, fields).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "data": ProfileView::from(profile) })),
    ))
}

/// GET /connections
pub async fn list_profiles(
    State(state): State<VaultState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<impl IntoResponse, VaultError> {
    let views: Vec<ProfileView> = state
        .store
        .list(principal)
        .await?
        .into_iter()
        .map(ProfileView::from)
        .collect();
    Ok(Json(json!({ "data": views })))
}

/// GET /connections/{id}
pub async fn get_profile(
    State(state): State<VaultState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, VaultError> {
    let profile = state.store.get(principal, parse_id(&id)?).await?;
    Ok(Json(json!({ "data": ProfileView::from(profile) })))
}

/// PUT /connections/{id}
pub async fn update_profile(
    State(state): State<VaultState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> Result<impl IntoResponse, VaultError> {
    let id = parse_id(&id)?;
    let encrypted_secret = req
        .password
        .as_ref()
        .map(|p| state.codec.encrypt(p))
        .transpose()?;
    let patch = ProfilePatch {
        name: req.name,
        kind: req.kind,
        host: req.host,
        port: req.port.map(Into::into),
        database_name: req.database_name,
        username: req.username,
        encrypted_secret,
    };
    let profile = state.store.update(principal, id, patch).await?;
    Ok(Json(json!({ "data": ProfileView::from(profile) })))
}

/// DELETE /connections/{id}
pub async fn delete_profile(
    State(state): State<VaultState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, VaultError> {
    state.store.delete(principal, parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /connections/{id}/secret -> explicit decrypt of the stored password.
///
/// `uri` is null for kinds without a known URI format.
pub async fn reveal_secret(
    State(state): State<VaultState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, VaultError> {
    let (profile, plaintext) = state
        .store
        .reveal_connection(principal, parse_id(&id)?, state.codec.as_ref())
        .await?;
    let uri = profile.connection_uri(&plaintext).ok();
    Ok(Json(json!({
        "data": { "password": plaintext.into_inner(), "uri": uri }
    })))
}

/// DELETE /principals/me -> drops the caller and every profile it owns.
pub async fn remove_self(
    State(state): State<VaultState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<impl IntoResponse, VaultError> {
    state.store.remove_principal(principal, principal).await?;
    Ok(StatusCode::NO_CONTENT)
}
