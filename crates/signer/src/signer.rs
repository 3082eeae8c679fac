//! Tamper-evident session tokens.
//!
//! A token is `base64(json)` where the JSON object carries the UTC issuance
//! timestamp and the hex HMAC-SHA256 of that timestamp under the server secret:
//!
//! ```text
//! {"value":"2024-05-01T12:00:00Z","digest":"9f73…"}
//! ```
//!
//! Tokens carry no expiry. Any token ever issued under the same secret stays
//! valid unless the caller opts into [`TokenSigner::verify_with_max_age`].

use crate::error::{SignerError, SignerResult};
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

type HmacSha256 = Hmac<Sha256>;

/// Hex length of a SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TokenPayload {
    value: String,
    digest: String,
}

/// Generates and verifies signed session tokens.
#[derive(Clone)]
pub struct TokenSigner {
    mac: HmacSha256,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Create a signer keyed with `secret`.
    pub fn new(secret: impl AsRef<[u8]>) -> SignerResult<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(SignerError::EmptySecret);
        }
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        Ok(Self { mac })
    }

    /// Issue a token for the current time.
    pub fn generate(&self) -> SignerResult<String> {
        self.generate_at(OffsetDateTime::now_utc())
    }

    /// Issue a token stamped with `issued_at`.
    pub fn generate_at(&self, issued_at: OffsetDateTime) -> SignerResult<String> {
        let value = issued_at
            .to_offset(time::UtcOffset::UTC)
            .format(&Rfc3339)
            .map_err(|e| SignerError::Timestamp(e.to_string()))?;
        let payload = TokenPayload {
            digest: self.digest(&value),
            value,
        };
        let json = serde_json::to_vec(&payload)
            .map_err(|e| SignerError::MalformedToken(e.to_string()))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(json))
    }

    /// Check a token's signature. Fails closed on anything malformed.
    pub fn verify(&self, token: &str) -> bool {
        self.check(token).is_ok()
    }

    /// Check a token's signature and that it was issued within `max_age`.
    pub fn verify_with_max_age(&self, token: &str, max_age: time::Duration) -> bool {
        let Ok(payload) = self.check(token) else {
            return false;
        };
        match OffsetDateTime::parse(&payload.value, &Rfc3339) {
            Ok(issued_at) => OffsetDateTime::now_utc() - issued_at <= max_age,
            Err(_) => false,
        }
    }

    fn check(&self, token: &str) -> SignerResult<TokenPayload> {
        let payload = decode(token)?;

        // Only the canonical lowercase form is accepted so that the encoded
        // token has exactly one valid spelling.
        if payload.digest.len() != DIGEST_HEX_LEN
            || !payload
                .digest
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(SignerError::MalformedToken("digest is not hex".to_string()));
        }
        let expected = hex::decode(&payload.digest)
            .map_err(|e| SignerError::MalformedToken(e.to_string()))?;

        let mut mac = self.mac.clone();
        mac.update(payload.value.as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| SignerError::VerificationFailed)?;
        Ok(payload)
    }

    fn digest(&self, value: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(value.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

fn decode(token: &str) -> SignerResult<TokenPayload> {
    if token.is_empty() {
        return Err(SignerError::MalformedToken("empty token".to_string()));
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(token)
        .map_err(|e| SignerError::MalformedToken(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| SignerError::MalformedToken(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret").unwrap()
    }

    fn decode_bytes(token: &str) -> Vec<u8> {
        base64::engine::general_purpose::STANDARD
            .decode(token)
            .unwrap()
    }

    fn encode_bytes(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_generated_token_verifies() {
        let signer = signer();
        let token = signer.generate().unwrap();
        assert!(signer.verify(&token));
    }

    #[test]
    fn test_token_layout() {
        let signer = signer();
        let token = signer.generate().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&decode_bytes(&token)).unwrap();
        let value = json["value"].as_str().unwrap();
        let digest = json["digest"].as_str().unwrap();
        assert!(OffsetDateTime::parse(value, &Rfc3339).is_ok());
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, signer.digest(value));
    }

    #[test]
    fn test_every_single_bit_flip_is_rejected() {
        let signer = signer();
        let token = signer.generate().unwrap();
        let payload = decode_bytes(&token);

        for byte in 0..payload.len() {
            for bit in 0..8 {
                let mut mutated = payload.clone();
                mutated[byte] ^= 1 << bit;
                assert!(
                    !signer.verify(&encode_bytes(&mutated)),
                    "flip of bit {bit} in byte {byte} was accepted"
                );
            }
        }
    }

    #[test]
    fn test_other_secret_rejects() {
        let token = signer().generate().unwrap();
        let other = TokenSigner::new("another-secret").unwrap();
        assert!(!other.verify(&token));
    }

    #[test]
    fn test_malformed_tokens_fail_closed() {
        let signer = signer();
        assert!(!signer.verify(""));
        assert!(!signer.verify("not base64!"));
        assert!(!signer.verify(&encode_bytes(b"not json")));
        assert!(!signer.verify(&encode_bytes(br#"{"value":"x"}"#)));
        assert!(!signer.verify(&encode_bytes(br#"{"value":"x","digest":"zz"}"#)));
    }

    #[test]
    fn test_uppercase_digest_is_rejected() {
        let signer = signer();
        let value = "2024-01-01T00:00:00Z";
        let payload = serde_json::json!({
            "value": value,
            "digest": signer.digest(value).to_uppercase(),
        });
        let token = encode_bytes(payload.to_string().as_bytes());
        assert!(!signer.verify(&token));
    }

    #[test]
    fn test_old_tokens_stay_valid_without_max_age() {
        let signer = signer();
        let issued = OffsetDateTime::now_utc() - time::Duration::days(3650);
        let token = signer.generate_at(issued).unwrap();
        assert!(signer.verify(&token));
    }

    #[test]
    fn test_max_age() {
        let signer = signer();
        let fresh = signer.generate().unwrap();
        assert!(signer.verify_with_max_age(&fresh, time::Duration::minutes(5)));

        let stale = signer
            .generate_at(OffsetDateTime::now_utc() - time::Duration::hours(2))
            .unwrap();
        assert!(!signer.verify_with_max_age(&stale, time::Duration::hours(1)));
        assert!(signer.verify(&stale));
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(TokenSigner::new(""), Err(SignerError::EmptySecret)));
    }
}
