use serde::Deserialize;

/// Longest accepted token lifetime: one year.
pub const MAX_JWT_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Argon2 settings for newly hashed passwords. `cost` is the iteration count.
#[derive(Debug, Clone, Deserialize)]
pub struct HashConfig {
    pub cost: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginConfig {
    /// When false the `lastLoginAt` write is spawned and not awaited before responding.
    pub await_last_login: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub hash: HashConfig,
    pub login: LoginConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "userauth".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "userauth-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };
        anyhow::ensure!(
            (1..=MAX_JWT_TTL_MINUTES).contains(&jwt.ttl_minutes),
            "JWT_TTL_MINUTES must be between 1 and {MAX_JWT_TTL_MINUTES}"
        );
        let hash = HashConfig {
            cost: std::env::var("PASSWORD_HASH_COST")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(2),
        };
        anyhow::ensure!(hash.cost >= 1, "PASSWORD_HASH_COST must be at least 1");
        let login = LoginConfig {
            await_last_login: std::env::var("LOGIN_AWAIT_LAST_LOGIN")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        };
        Ok(Self {
            database_url,
            jwt,
            hash,
            login,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_applies_defaults() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgres://localhost/userauth")),
                ("JWT_SECRET", Some("s3cret")),
                ("JWT_ISSUER", None),
                ("JWT_AUDIENCE", None),
                ("JWT_TTL_MINUTES", None),
                ("PASSWORD_HASH_COST", None),
                ("LOGIN_AWAIT_LAST_LOGIN", None),
            ],
            || {
                let cfg = AppConfig::from_env().expect("config");
                assert_eq!(cfg.database_url, "postgres://localhost/userauth");
                assert_eq!(cfg.jwt.secret, "s3cret");
                assert_eq!(cfg.jwt.issuer, "userauth");
                assert_eq!(cfg.jwt.audience, "userauth-users");
                assert_eq!(cfg.jwt.ttl_minutes, 60);
                assert_eq!(cfg.hash.cost, 2);
                assert!(!cfg.login.await_last_login);
            },
        );
    }

    #[test]
    fn from_env_reads_overrides() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgres://db/app")),
                ("JWT_SECRET", Some("k")),
                ("JWT_TTL_MINUTES", Some("15")),
                ("PASSWORD_HASH_COST", Some("4")),
                ("LOGIN_AWAIT_LAST_LOGIN", Some("true")),
            ],
            || {
                let cfg = AppConfig::from_env().expect("config");
                assert_eq!(cfg.jwt.ttl_minutes, 15);
                assert_eq!(cfg.hash.cost, 4);
                assert!(cfg.login.await_last_login);
            },
        );
    }

    #[test]
    fn from_env_requires_secret() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgres://db/app")),
                ("JWT_SECRET", None::<&str>),
            ],
            || {
                assert!(AppConfig::from_env().is_err());
            },
        );
    }

    #[test]
    fn from_env_rejects_out_of_range_ttl() {
        for ttl in ["-30", "0", "525601", "9223372036854775807"] {
            temp_env::with_vars(
                [
                    ("DATABASE_URL", Some("postgres://db/app")),
                    ("JWT_SECRET", Some("k")),
                    ("JWT_TTL_MINUTES", Some(ttl)),
                ],
                || {
                    let err = AppConfig::from_env().unwrap_err();
                    assert!(err.to_string().contains("JWT_TTL_MINUTES"), "ttl {ttl}: {err}");
                },
            );
        }
    }

    #[test]
    fn from_env_accepts_max_ttl() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgres://db/app")),
                ("JWT_SECRET", Some("k")),
                ("JWT_TTL_MINUTES", Some("525600")),
            ],
            || {
                let cfg = AppConfig::from_env().expect("config");
                assert_eq!(cfg.jwt.ttl_minutes, MAX_JWT_TTL_MINUTES);
            },
        );
    }

    #[test]
    fn from_env_rejects_zero_cost() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgres://db/app")),
                ("JWT_SECRET", Some("k")),
                ("PASSWORD_HASH_COST", Some("0")),
            ],
            || {
                let err = AppConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("PASSWORD_HASH_COST"));
            },
        );
    }
}
