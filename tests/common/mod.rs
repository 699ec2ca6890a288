#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use profile_vault::db::ProfilesStorage;
use profile_vault::service::access::AccessGate;
use profile_vault::service::store::{Clock, ProfileStore};
use profile_vault::types::secret::EncryptedSecret;
use profile_vault::NewProfile;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

pub const TEST_KEY: &str = "a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0c1d2e3f4a5b6c7d8e9f0a1b2";

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
        })
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub async fn memory_storage() -> ProfilesStorage {
    ProfilesStorage::connect("sqlite::memory:", 1)
        .await
        .expect("failed to open in-memory sqlite")
}

/// Pooled storage over a temp sqlite file, so writers really contend.
pub async fn file_storage(tag: &str, max_connections: u32) -> (ProfilesStorage, PathBuf) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();

    let mut temp_path = std::env::temp_dir();
    temp_path.push(format!(
        "profile-vault-{tag}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));

    let database_url = format!("sqlite:{}", temp_path.display());
    let storage = ProfilesStorage::connect(&database_url, max_connections)
        .await
        .expect("failed to open sqlite");
    (storage, temp_path)
}

pub async fn store_with_clock() -> (ProfileStore, Arc<ManualClock>) {
    let clock = ManualClock::new();
    let store = ProfileStore::with_parts(
        memory_storage().await,
        AccessGate::default(),
        clock.clone(),
    );
    (store, clock)
}

pub fn prod_fields() -> NewProfile {
    NewProfile {
        name: "prod".to_string(),
        kind: "postgres".to_string(),
        host: "db.local".to_string(),
        port: "5432".to_string(),
        database_name: "app".to_string(),
        username: "svc".to_string(),
        encrypted_secret: EncryptedSecret::new("CIPH1"),
    }
}
