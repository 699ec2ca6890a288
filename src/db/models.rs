use crate::types::ids::{PrincipalId, ProfileId};
use crate::types::profile::ConnectionProfile;
use crate::types::secret::EncryptedSecret;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::FromRow;
use std::str::FromStr;

/// Raw `user_connections` row; every column is TEXT.
///
/// Timestamps stay as the fixed-width strings from [`encode_timestamp`]
/// rather than `DateTime<Utc>`: sqlx's own chrono encoding varies in width,
/// and both `list_by_owner` ordering and the `updated_at >= created_at`
/// CHECK compare the column text.
#[derive(Debug, Clone, FromRow)]
pub struct DbProfile {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub kind: String,
    pub host: String,
    pub port: String,
    pub database_name: String,
    pub username: String,
    pub encrypted_secret: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Fixed-width encoding so that string comparison orders by time.
pub fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_timestamp(s: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

impl From<&ConnectionProfile> for DbProfile {
    fn from(p: &ConnectionProfile) -> Self {
        Self {
            id: p.id.to_string(),
            owner_id: p.owner_id.to_string(),
            name: p.name.clone(),
            kind: p.kind.clone(),
            host: p.host.clone(),
            port: p.port.clone(),
            database_name: p.database_name.clone(),
            username: p.username.clone(),
            encrypted_secret: p.encrypted_secret.expose_ciphertext().to_string(),
            created_at: encode_timestamp(&p.created_at),
            updated_at: encode_timestamp(&p.updated_at),
        }
    }
}

impl TryFrom<DbProfile> for ConnectionProfile {
    type Error = sqlx::Error;

    fn try_from(d: DbProfile) -> Result<Self, Self::Error> {
        Ok(ConnectionProfile {
            id: ProfileId::from_str(&d.id).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            owner_id: PrincipalId::from_str(&d.owner_id)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            name: d.name,
            kind: d.kind,
            host: d.host,
            port: d.port,
            database_name: d.database_name,
            username: d.username,
            encrypted_secret: EncryptedSecret::new(d.encrypted_secret),
            created_at: decode_timestamp(&d.created_at)?,
            updated_at: decode_timestamp(&d.updated_at)?,
        })
    }
}
