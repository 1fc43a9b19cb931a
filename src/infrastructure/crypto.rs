//! Device credential derivation.
//!
//! Each device stores an encrypted master secret; the MQTT password handed to
//! a device is derived from the decrypted secret and the serial number with
//! HMAC-SHA256, base64-encoded and truncated to 12 characters. The server
//! only needs the derivation to verify Basic credentials on the WebSocket
//! path and to provision new devices.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of the derived device password.
const DERIVED_PASSWORD_LEN: usize = 12;

/// Derive the per-device password: `base64(HMAC-SHA256(master_secret, serial))[..12]`.
pub fn derive_password(master_secret: &str, serial_number: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(master_secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(serial_number.as_bytes());
    let digest = mac.finalize().into_bytes();

    let mut encoded = BASE64.encode(digest);
    encoded.truncate(DERIVED_PASSWORD_LEN);
    encoded
}

/// Constant-shape comparison of a presented password against the derivation.
pub fn verify_password(master_secret: &str, serial_number: &str, presented: &str) -> bool {
    let expected = derive_password(master_secret, serial_number);
    // Equal length by construction; compare byte-wise without early exit.
    if presented.len() != expected.len() {
        return false;
    }
    expected
        .bytes()
        .zip(presented.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let a = derive_password("master", "861076087029615");
        let b = derive_password("master", "861076087029615");
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
    }

    #[test]
    fn different_serials_get_different_passwords() {
        let a = derive_password("master", "SN-A");
        let b = derive_password("master", "SN-B");
        assert_ne!(a, b);
    }

    #[test]
    fn different_secrets_get_different_passwords() {
        let a = derive_password("master-1", "SN-A");
        let b = derive_password("master-2", "SN-A");
        assert_ne!(a, b);
    }

    #[test]
    fn verify_accepts_derived_password() {
        let pw = derive_password("master", "SN-A");
        assert!(verify_password("master", "SN-A", &pw));
        assert!(!verify_password("master", "SN-A", "wrong-pw-1234"));
        assert!(!verify_password("master", "SN-A", "short"));
    }
}
