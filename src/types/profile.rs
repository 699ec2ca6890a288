use crate::error::VaultError;
use crate::types::ids::{PrincipalId, ProfileId};
use crate::types::secret::{EncryptedSecret, Plaintext};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_KIND_LEN: usize = 50;
pub const MAX_HOST_LEN: usize = 255;
pub const MAX_PORT_LEN: usize = 10;
pub const MAX_DATABASE_NAME_LEN: usize = 255;
pub const MAX_USERNAME_LEN: usize = 255;

/// A stored connection profile. Only the owner ever sees one.
#[derive(Debug, Clone)]
pub struct ConnectionProfile {
    pub id: ProfileId,
    pub owner_id: PrincipalId,
    pub name: String,
    pub kind: String,
    pub host: String,
    pub port: String,
    pub database_name: String,
    pub username: String,
    pub encrypted_secret: EncryptedSecret,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields of a profile; id, owner and timestamps are assigned
/// by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
    pub name: String,
    pub kind: String,
    pub host: String,
    pub port: String,
    pub database_name: String,
    pub username: String,
    pub encrypted_secret: EncryptedSecret,
}

/// Partial update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
    pub database_name: Option<String>,
    pub username: Option<String>,
    pub encrypted_secret: Option<EncryptedSecret>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.kind.is_none()
            && self.host.is_none()
            && self.port.is_none()
            && self.database_name.is_none()
            && self.username.is_none()
            && self.encrypted_secret.is_none()
    }
}

impl NewProfile {
    /// Check every field against the column constraints. Pure.
    pub fn validate(&self) -> Result<(), VaultError> {
        require_text("name", &self.name, MAX_NAME_LEN)?;
        require_text("kind", &self.kind, MAX_KIND_LEN)?;
        require_text("host", &self.host, MAX_HOST_LEN)?;
        parse_port(&self.port)?;
        require_text("database_name", &self.database_name, MAX_DATABASE_NAME_LEN)?;
        require_text("username", &self.username, MAX_USERNAME_LEN)?;
        if self.encrypted_secret.is_empty() {
            return Err(VaultError::validation(
                "encrypted_secret",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

impl ConnectionProfile {
    /// Merge `patch` over the current values. The result still has to be
    /// validated before it is persisted.
    pub fn apply(&self, patch: ProfilePatch) -> NewProfile {
        NewProfile {
            name: patch.name.unwrap_or_else(|| self.name.clone()),
            kind: patch.kind.unwrap_or_else(|| self.kind.clone()),
            host: patch.host.unwrap_or_else(|| self.host.clone()),
            port: patch.port.unwrap_or_else(|| self.port.clone()),
            database_name: patch
                .database_name
                .unwrap_or_else(|| self.database_name.clone()),
            username: patch.username.unwrap_or_else(|| self.username.clone()),
            encrypted_secret: patch
                .encrypted_secret
                .unwrap_or_else(|| self.encrypted_secret.clone()),
        }
    }

    pub fn port_number(&self) -> Result<u16, VaultError> {
        parse_port(&self.port)
    }

    /// Driver URI for the well-known kinds, with credentials percent-encoded.
    pub fn connection_uri(&self, password: &Plaintext) -> Result<String, VaultError> {
        let scheme = match self.kind.to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" => "postgresql",
            "mysql" => "mysql",
            "mongodb" => "mongodb",
            other => {
                return Err(VaultError::validation(
                    "kind",
                    format!("no connection URI format for `{other}`"),
                ));
            }
        };
        let port = self.port_number()?;

        let mut uri = Url::parse(&format!("{scheme}://{}:{port}", self.host))
            .map_err(|e| VaultError::validation("host", e.to_string()))?;
        uri.set_username(&self.username)
            .map_err(|_| VaultError::validation("username", "cannot be set on this URI"))?;
        uri.set_password(Some(password.expose()))
            .map_err(|_| VaultError::validation("encrypted_secret", "cannot be set on this URI"))?;
        uri.path_segments_mut()
            .map_err(|_| VaultError::validation("database_name", "cannot be set on this URI"))?
            .clear()
            .push(&self.database_name);
        Ok(uri.into())
    }
}

fn require_text(field: &'static str, value: &str, max: usize) -> Result<(), VaultError> {
    if value.trim().is_empty() {
        return Err(VaultError::validation(field, "must not be empty"));
    }
    let len = value.chars().count();
    if len > max {
        return Err(VaultError::validation(
            field,
            format!("must be at most {max} characters, got {len}"),
        ));
    }
    Ok(())
}

fn parse_port(port: &str) -> Result<u16, VaultError> {
    if port.is_empty() || port.len() > MAX_PORT_LEN || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VaultError::validation(
            "port",
            format!("`{port}` is not a numeric port"),
        ));
    }
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(VaultError::validation(
            "port",
            format!("`{port}` is outside 1-65535"),
        )),
        Ok(n) => Ok(n),
    }
}
