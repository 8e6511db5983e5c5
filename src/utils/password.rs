use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::Rng;
use sha2::Sha256;

use crate::utils::error::AppError;

type HmacSha256 = Hmac<Sha256>;

const ITERATIONS: u32 = 260000;
const KEY_LENGTH: usize = 32;
const SALT_LENGTH: usize = 16;

/// Hash un mot de passe avec PBKDF2-HMAC-SHA256.
/// Format: pbkdf2:sha256:iterations$salt$hash (base64 URL-safe sans padding)
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash_password_with_iterations(password, ITERATIONS)
}

pub(crate) fn hash_password_with_iterations(password: &str, iterations: u32) -> Result<String, AppError> {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill(&mut salt);

    let key = derive(password, &salt, iterations, KEY_LENGTH)?;

    Ok(format!(
        "pbkdf2:sha256:{}${}${}",
        iterations,
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(key)
    ))
}

/// Vérifie un mot de passe contre un hash stocké
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AppError> {
    let invalid = || AppError::Internal("Invalid password hash format".to_string());

    let mut parts = stored_hash.split('$');
    let (header, salt_str, hash_str) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(s), Some(k), None) => (h, s, k),
        _ => return Err(invalid()),
    };

    let iterations = match header.split(':').collect::<Vec<_>>().as_slice() {
        ["pbkdf2", "sha256", iterations] => iterations.parse::<u32>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };

    let salt = URL_SAFE_NO_PAD.decode(salt_str).map_err(|_| invalid())?;
    let expected = URL_SAFE_NO_PAD.decode(hash_str).map_err(|_| invalid())?;

    let computed = derive(password, &salt, iterations, expected.len())?;

    Ok(constant_time_eq(&computed, &expected))
}

fn derive(password: &str, salt: &[u8], iterations: u32, length: usize) -> Result<Vec<u8>, AppError> {
    let mut key = vec![0u8; length];
    pbkdf2::<HmacSha256>(password.as_bytes(), salt, iterations, &mut key)
        .map_err(|e| AppError::Internal(format!("PBKDF2 failed: {}", e)))?;
    Ok(key)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
