use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::config::HashConfig;

fn hasher(cfg: &HashConfig) -> anyhow::Result<Argon2<'static>> {
    let params = Params::new(Params::DEFAULT_M_COST, cfg.cost, Params::DEFAULT_P_COST, None)
        .map_err(|e| anyhow::anyhow!("argon2 params: {e}"))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

pub fn hash_password(plain: &str, cfg: &HashConfig) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher(cfg)?
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Parameters are read back from the PHC string, so hashes made under an older cost still verify.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Runs [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(plain: String, cfg: HashConfig) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&plain, &cfg)).await?
}

/// Runs [`verify_password`] on the blocking pool.
pub async fn verify_password_blocking(plain: String, hash: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash)).await?
}
