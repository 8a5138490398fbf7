//! Salted, slow password hashing.
//!
//! Stored form: `pbkdf2-sha256$<iterations>$<salt b64>$<hash b64>`. The
//! iteration count travels with each hash so the default can be raised
//! without invalidating existing employees.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 200_000;

/// Cost of the derivation run when there is no usable stored hash. Fixed so
/// it does not depend on anything a caller can influence.
pub(crate) const REFERENCE_ITERATIONS: u32 = if cfg!(test) {
    10
} else {
    DEFAULT_PBKDF2_ITERATIONS
};

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

/// Hash `password` with a freshly generated salt.
pub fn hash_password(password: &str, iterations: u32) -> String {
    let iterations = iterations.max(1);
    let salt: [u8; SALT_LEN] = rand::random();
    let key = derive_key(password, &salt, iterations);
    format!(
        "{}${}${}${}",
        SCHEME,
        iterations,
        B64.encode(salt),
        B64.encode(key)
    )
}

/// Check `password` against a stored hash. Malformed hashes never match,
/// but still cost one reference derivation.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((iterations, salt, expected)) = parse_stored(stored) else {
        log::warn!("Stored password hash is malformed");
        dummy_verify(password);
        return false;
    };
    let key = derive_key(password, &salt, iterations);
    constant_time_eq(&key, &expected)
}

/// Burn the work of one verification at [`REFERENCE_ITERATIONS`]. Used when
/// the login id is unknown or the stored hash is unusable.
pub fn dummy_verify(password: &str) {
    let _ = derive_key(password, &[0u8; SALT_LEN], REFERENCE_ITERATIONS);
}

fn parse_stored(stored: &str) -> Option<(u32, Vec<u8>, Vec<u8>)> {
    let mut parts = stored.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let iterations: u32 = parts.next()?.parse().ok().filter(|n| *n > 0)?;
    let salt = B64.decode(parts.next()?).ok()?;
    let hash = B64.decode(parts.next()?).ok()?;
    if parts.next().is_some() || hash.len() != KEY_LEN {
        return None;
    }
    Some((iterations, salt, hash))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
