use crate::error::VaultError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "profile-vault.toml";
pub const ENV_PREFIX: &str = "PROFILE_VAULT_";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub database_url: String,
    pub listen_addr: String,
    pub loglevel: String,
    pub max_connections: u32,
    /// Shared key the fronting identity provider presents on every request.
    pub api_key: String,
    /// Hex-encoded 32-byte AES key for stored passwords.
    pub secret_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://profile-vault.db".to_string(),
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            max_connections: 5,
            api_key: String::new(),
            secret_key: String::new(),
        }
    }
}

impl Config {
    /// Defaults, then `profile-vault.toml`, then `PROFILE_VAULT_*` variables.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load() -> Result<Self, VaultError> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self, VaultError> {
        let cfg: Config = figment.extract()?;
        if cfg.api_key.trim().is_empty() {
            return Err(VaultError::validation("api_key", "must be configured"));
        }
        if cfg.secret_key.trim().is_empty() {
            return Err(VaultError::validation("secret_key", "must be configured"));
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_toml(toml: &str) -> Figment {
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(toml))
    }

    #[test]
    fn file_values_override_defaults() {
        let cfg = Config::from_figment(with_toml(
            r#"
            api_key = "k"
            secret_key = "00"
            max_connections = 2
            "#,
        ))
        .unwrap();
        assert_eq!(cfg.api_key, "k");
        assert_eq!(cfg.max_connections, 2);
        assert_eq!(cfg.database_url, "sqlite://profile-vault.db");
        assert_eq!(cfg.loglevel, "info");
    }

    #[test]
    fn missing_keys_are_rejected() {
        let err = Config::from_figment(with_toml(r#"secret_key = "00""#)).unwrap_err();
        assert!(matches!(err, VaultError::Validation { field: "api_key", .. }));

        let err = Config::from_figment(with_toml(r#"api_key = "k""#)).unwrap_err();
        assert!(matches!(err, VaultError::Validation { field: "secret_key", .. }));
    }

    #[test]
    fn wrong_types_surface_as_config_errors() {
        let err = Config::from_figment(with_toml(r#"max_connections = "many""#)).unwrap_err();
        assert!(matches!(err, VaultError::Config(_)));
    }
}
