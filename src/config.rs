//! Runtime configuration read from the environment
//!
//! | Env Var           | Default                   |
//! |-------------------|---------------------------|
//! | `PORT`            | `3030`                    |
//! | `STORAGE`         | `redb` (or `json`)        |
//! | `DATABASE_URL`    | `data.db`                 |
//! | `DATA_DIR`        | `data`                    |
//! | `JWT_SECRET`      | development secret        |
//! | `TOKEN_TTL_HOURS` | `24`                      |
//! | `CORS_ORIGINS`    | local front-end dev ports |
//! | `ADMIN_USERNAME`  | unset                     |
//! | `ADMIN_PASSWORD`  | unset                     |
//! | `ADMIN_FULLNAME`  | `Admin`                   |
//!
//! When both `ADMIN_USERNAME` and `ADMIN_PASSWORD` are set, the server makes
//! sure that account exists with the admin role before it starts listening.

use std::env;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 3030;
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
const DEV_JWT_SECRET: &str = "toyshop-dev-secret";
const DEFAULT_ADMIN_FULLNAME: &str = "Admin";
const DEFAULT_CORS_ORIGINS: [&str; 4] = [
    "http://localhost:5173",
    "http://127.0.0.1:5173",
    "http://localhost:5174",
    "http://127.0.0.1:5174",
];

/// Which backend the collections live in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// Embedded redb database file
    Redb { path: String },
    /// One JSON array file per collection inside `dir`
    JsonFiles { dir: PathBuf },
}

/// Login token settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
        }
    }
}

/// Admin account bootstrapped at startup
#[derive(Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
    pub fullname: String,
}

impl AdminSeed {
    /// Builds the seed from raw variable values
    ///
    /// Returns `None` unless both username and password are non-empty.
    pub fn from_vars(
        username: Option<String>,
        password: Option<String>,
        fullname: Option<String>,
    ) -> Option<Self> {
        let non_empty = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Some(Self {
            username: non_empty(username)?,
            password: password.filter(|p| !p.is_empty())?,
            fullname: non_empty(fullname).unwrap_or_else(|| DEFAULT_ADMIN_FULLNAME.to_string()),
        })
    }
}

// Keeps the password out of logs
impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("username", &self.username)
            .field("fullname", &self.fullname)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub cors_origins: Vec<String>,
    pub admin: Option<AdminSeed>,
}

impl Config {
    /// Reads the configuration, falling back to defaults for anything unset or unparsable
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let storage = match env::var("STORAGE").as_deref() {
            Ok("json") => StorageConfig::JsonFiles {
                dir: env::var("DATA_DIR")
                    .unwrap_or_else(|_| "data".to_string())
                    .into(),
            },
            _ => StorageConfig::Redb {
                path: env::var("DATABASE_URL").unwrap_or_else(|_| "data.db".to_string()),
            },
        };

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };
        let token_ttl_hours = env::var("TOKEN_TTL_HOURS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_TOKEN_TTL_HOURS);

        let cors_origins = match env::var("CORS_ORIGINS") {
            Ok(raw) if !raw.trim().is_empty() => raw
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            _ => DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        let admin = AdminSeed::from_vars(
            env::var("ADMIN_USERNAME").ok(),
            env::var("ADMIN_PASSWORD").ok(),
            env::var("ADMIN_FULLNAME").ok(),
        );

        Self {
            port,
            storage,
            auth: AuthConfig {
                jwt_secret,
                token_ttl_hours,
            },
            cors_origins,
            admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn admin_seed_needs_username_and_password() {
        assert_eq!(AdminSeed::from_vars(None, some("pw"), None), None);
        assert_eq!(AdminSeed::from_vars(some("root"), None, None), None);
        assert_eq!(AdminSeed::from_vars(some("  "), some("pw"), None), None);
        assert_eq!(AdminSeed::from_vars(some("root"), some(""), None), None);
    }

    #[test]
    fn admin_seed_defaults_fullname() {
        let seed = AdminSeed::from_vars(some(" root "), some("pw"), None).unwrap();
        assert_eq!(seed.username, "root");
        assert_eq!(seed.fullname, "Admin");

        let seed = AdminSeed::from_vars(some("root"), some("pw"), some("Shop Owner")).unwrap();
        assert_eq!(seed.fullname, "Shop Owner");
    }

    #[test]
    fn admin_seed_debug_hides_password() {
        let seed = AdminSeed::from_vars(some("root"), some("hunter22"), None).unwrap();
        assert!(!format!("{seed:?}").contains("hunter22"));
    }
}
