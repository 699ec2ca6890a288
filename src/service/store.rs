use crate::db::sqlite::ProfilesStorage;
use crate::error::VaultError;
use crate::service::access::{AccessGate, Operation};
use crate::service::secret_codec::SecretCodec;
use crate::types::ids::{PrincipalId, ProfileId};
use crate::types::profile::{ConnectionProfile, NewProfile, ProfilePatch};
use crate::types::secret::Plaintext;
use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Source of "now" for timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Owner-scoped CRUD over connection profiles.
///
/// Every operation passes the access gate before touching a row. Update is
/// the only writer of `updated_at` after creation.
#[derive(Clone)]
pub struct ProfileStore {
    storage: ProfilesStorage,
    gate: AccessGate,
    clock: Arc<dyn Clock>,
}

impl ProfileStore {
    pub fn new(storage: ProfilesStorage) -> Self {
        Self::with_parts(storage, AccessGate::default(), Arc::new(SystemClock))
    }

    pub fn with_parts(storage: ProfilesStorage, gate: AccessGate, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            gate,
            clock,
        }
    }

    // Storage keeps microseconds; truncate so returned values match stored ones.
    fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(6)
    }

    pub async fn create(
        &self,
        principal: PrincipalId,
        owner_id: PrincipalId,
        fields: NewProfile,
    ) -> Result<ConnectionProfile, VaultError> {
        self.gate
            .authorize(principal, Operation::Insert, owner_id, None)?;
        fields.validate()?;

        let now = self.now();
        let profile = ConnectionProfile {
            id: ProfileId::new_random(),
            owner_id,
            name: fields.name,
            kind: fields.kind,
            host: fields.host,
            port: fields.port,
            database_name: fields.database_name,
            username: fields.username,
            encrypted_secret: fields.encrypted_secret,
            created_at: now,
            updated_at: now,
        };
        self.storage.insert(&profile).await?;

        info!(principal = %principal, profile = %profile.id, kind = %profile.kind, "profile created");
        Ok(profile)
    }

    pub async fn get(
        &self,
        principal: PrincipalId,
        id: ProfileId,
    ) -> Result<ConnectionProfile, VaultError> {
        let profile = self
            .storage
            .get_by_id(id)
            .await?
            .ok_or(VaultError::NotFound)?;
        self.gate
            .authorize(principal, Operation::Read, profile.owner_id, Some(id))?;
        Ok(profile)
    }

    pub async fn list(&self, principal: PrincipalId) -> Result<Vec<ConnectionProfile>, VaultError> {
        let profiles = self.storage.list_by_owner(principal).await?;
        // The query is already owner-scoped; the gate still has the final word.
        for p in &profiles {
            self.gate
                .authorize(principal, Operation::Read, p.owner_id, Some(p.id))?;
        }
        debug!(principal = %principal, count = profiles.len(), "profiles listed");
        Ok(profiles)
    }

    pub async fn update(
        &self,
        principal: PrincipalId,
        id: ProfileId,
        patch: ProfilePatch,
    ) -> Result<ConnectionProfile, VaultError> {
        let gate = self.gate.clone();
        let now = self.now();
        let updated = self
            .storage
            .update_with(id, move |current| {
                gate.authorize(principal, Operation::Update, current.owner_id, Some(id))?;
                let merged = current.apply(patch);
                merged.validate()?;
                Ok(ConnectionProfile {
                    name: merged.name,
                    kind: merged.kind,
                    host: merged.host,
                    port: merged.port,
                    database_name: merged.database_name,
                    username: merged.username,
                    encrypted_secret: merged.encrypted_secret,
                    updated_at: now.max(current.updated_at),
                    ..current
                })
            })
            .await?;

        info!(principal = %principal, profile = %id, "profile updated");
        Ok(updated)
    }

    /// A second delete of the same id yields `NotFound`: no row is left to
    /// prove the caller ever owned it.
    pub async fn delete(&self, principal: PrincipalId, id: ProfileId) -> Result<(), VaultError> {
        let gate = self.gate.clone();
        self.storage
            .delete_with(id, |current| {
                gate.authorize(principal, Operation::Delete, current.owner_id, Some(id))
            })
            .await?;
        info!(principal = %principal, profile = %id, "profile deleted");
        Ok(())
    }

    /// Explicit, audited decryption of a profile's password.
    /// `get` and `list` never decrypt.
    pub async fn reveal_secret(
        &self,
        principal: PrincipalId,
        id: ProfileId,
        codec: &dyn SecretCodec,
    ) -> Result<Plaintext, VaultError> {
        let (_, plaintext) = self.reveal_connection(principal, id, codec).await?;
        Ok(plaintext)
    }

    /// Like [`reveal_secret`](Self::reveal_secret), but also hands back the
    /// profile so the caller can assemble a connection URI.
    pub async fn reveal_connection(
        &self,
        principal: PrincipalId,
        id: ProfileId,
        codec: &dyn SecretCodec,
    ) -> Result<(ConnectionProfile, Plaintext), VaultError> {
        let profile = self.get(principal, id).await?;
        let plaintext = codec.decrypt(&profile.encrypted_secret)?;
        info!(principal = %principal, profile = %id, "secret revealed");
        Ok((profile, plaintext))
    }

    /// Returns true when the principal was not known before.
    pub async fn register_principal(&self, principal: PrincipalId) -> Result<bool, VaultError> {
        self.storage.insert_principal(principal, self.now()).await
    }

    /// Remove `target` and, by cascade, every profile it owns. Principals may
    /// only remove themselves. Returns the number of profiles removed.
    pub async fn remove_principal(
        &self,
        principal: PrincipalId,
        target: PrincipalId,
    ) -> Result<u64, VaultError> {
        self.gate
            .authorize(principal, Operation::Delete, target, None)?;
        let removed = self
            .storage
            .delete_principal(target)
            .await?
            .ok_or(VaultError::NotFound)?;
        info!(principal = %target, profiles = removed, "principal removed");
        Ok(removed)
    }
}
