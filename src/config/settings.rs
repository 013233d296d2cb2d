//! Process settings read from the environment at start-up.
//!
//! Connection credentials are either a full `DATABASE_URL` or the four parts
//! `DB_USER`, `DB_PASS`, `DB_HOST`, `DB_NAME` (plus optional `DB_PORT`).

use crate::error::ConfigError;
use sqlx::postgres::PgConnectOptions;
use std::str::FromStr;
use uuid::Uuid;

/// Organization used for customers created by order migration when none is configured.
pub const DEFAULT_ORGANIZATION_ID: &str = "aa9a52a7-ab83-46ff-ab15-b35bd868407f";

const DEFAULT_PORT: u16 = 5432;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone, Debug)]
pub struct StoreSettings {
    pub user: String,
    pub pass: String,
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl StoreSettings {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .username(&self.user)
            .password(&self.pass)
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
    }
}

#[derive(Clone, Debug)]
pub enum DatabaseSettings {
    Url(String),
    Parts(StoreSettings),
}

#[derive(Clone, Debug)]
pub struct ServiceSettings {
    pub database: DatabaseSettings,
    pub bind_addr: String,
    pub max_connections: u32,
    pub default_organization_id: Uuid,
}

impl ServiceSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database = match get("DATABASE_URL") {
            Some(url) => DatabaseSettings::Url(url),
            None => {
                let port = match get("DB_PORT") {
                    Some(p) => p.parse().map_err(|_| ConfigError::Invalid {
                        name: "DB_PORT",
                        reason: format!("'{}' is not a port number", p),
                    })?,
                    None => DEFAULT_PORT,
                };
                DatabaseSettings::Parts(StoreSettings {
                    user: get("DB_USER").ok_or(ConfigError::Missing("DB_USER"))?,
                    pass: get("DB_PASS").ok_or(ConfigError::Missing("DB_PASS"))?,
                    host: get("DB_HOST").ok_or(ConfigError::Missing("DB_HOST"))?,
                    port,
                    database: get("DB_NAME").ok_or(ConfigError::Missing("DB_NAME"))?,
                })
            }
        };

        let max_connections = match get("MAX_CONNECTIONS") {
            Some(n) => n.parse().map_err(|_| ConfigError::Invalid {
                name: "MAX_CONNECTIONS",
                reason: format!("'{}' is not a number", n),
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let org = get("DEFAULT_ORGANIZATION_ID").unwrap_or_else(|| DEFAULT_ORGANIZATION_ID.to_string());
        let default_organization_id = Uuid::parse_str(&org).map_err(|e| ConfigError::Invalid {
            name: "DEFAULT_ORGANIZATION_ID",
            reason: e.to_string(),
        })?;

        Ok(ServiceSettings {
            database,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            max_connections,
            default_organization_id,
        })
    }

    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        match &self.database {
            DatabaseSettings::Url(url) => PgConnectOptions::from_str(url).map_err(|e| ConfigError::Invalid {
                name: "DATABASE_URL",
                reason: e.to_string(),
            }),
            DatabaseSettings::Parts(parts) => Ok(parts.connect_options()),
        }
    }
}
