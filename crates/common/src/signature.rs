//! HTTP Signature codec shared by inbox ingest and fan-out delivery.
//!
//! Implements draft-cavage-http-signatures: <https://datatracker.ietf.org/doc/html/draft-cavage-http-signatures>
//!
//! A single copy of this logic is used for both verifying inbound requests
//! and signing outbound deliveries, so the wire format can never drift
//! between the two directions.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use rsa::{
    pkcs1v15::{Signature, SigningKey, VerifyingKey},
    pkcs8::{DecodePrivateKey, DecodePublicKey},
    RsaPrivateKey, RsaPublicKey,
};
use sha2::{Digest as _, Sha256};
use signature::{SignatureEncoding, Signer, Verifier};
use std::collections::HashMap;

/// Signatures older (or newer) than this relative to `Date` are rejected.
pub const MAX_CLOCK_SKEW_SECONDS: i64 = 3600;

/// Errors produced while signing or verifying an HTTP Signature.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("missing Signature header")]
    Missing,
    #[error("malformed Signature header")]
    Malformed,
    #[error("missing header required by signature: {0}")]
    MissingHeader(String),
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),
    #[error("public key unavailable: {0}")]
    KeyUnavailable(String),
    #[error("signing failed: {0}")]
    SigningFailed(String),
    #[error("digest header does not match body")]
    DigestMismatch,
    #[error("date header missing or unparseable")]
    InvalidDate,
    #[error("clock skew too large")]
    ClockSkew,
    #[error("signature does not verify")]
    Invalid,
}

/// A parsed `Signature` (or `Authorization: Signature ...`) header.
#[derive(Debug, Clone)]
pub struct HttpSignature {
    /// Key ID, conventionally the actor's public key IRI (`#main-key`).
    pub key_id: String,
    /// Declared algorithm, informational only — we always verify as rsa-sha256.
    pub algorithm: String,
    /// Header names covered by the signature, in signing order.
    pub headers: Vec<String>,
    /// Base64-encoded signature bytes.
    pub signature: String,
}

impl HttpSignature {
    /// Parses a `keyId="...",algorithm="...",headers="...",signature="..."` header.
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut key_id = None;
        let mut algorithm = None;
        let mut headers = None;
        let mut signature = None;

        for part in header.split(',') {
            let part = part.trim();
            if let Some((key, value)) = part.split_once('=') {
                let value = value.trim_matches('"');
                match key.trim() {
                    "keyId" => key_id = Some(value.to_string()),
                    "algorithm" => algorithm = Some(value.to_string()),
                    "headers" => headers = Some(value.to_string()),
                    "signature" => signature = Some(value.to_string()),
                    _ => {}
                }
            }
        }

        Ok(Self {
            key_id: key_id.ok_or(SignatureError::Malformed)?,
            algorithm: algorithm.unwrap_or_else(|| "rsa-sha256".to_string()),
            headers: headers
                .unwrap_or_else(|| "date".to_string())
                .split(' ')
                .map(str::to_string)
                .collect(),
            signature: signature.ok_or(SignatureError::Malformed)?,
        })
    }
}

/// Builds the newline-joined signing string for a set of headers.
///
/// `(request-target)` is synthesized from `method`/`path`; everything else
/// is looked up (case-insensitively) in `headers`.
pub fn build_signing_string(
    method: &str,
    path: &str,
    headers: &HashMap<String, String>,
    signed_headers: &[String],
) -> Result<String, SignatureError> {
    let mut parts = Vec::with_capacity(signed_headers.len());

    for header_name in signed_headers {
        let value = if header_name == "(request-target)" {
            format!("{} {path}", method.to_lowercase())
        } else {
            headers
                .get(&header_name.to_lowercase())
                .cloned()
                .ok_or_else(|| SignatureError::MissingHeader(header_name.clone()))?
        };

        parts.push(format!("{header_name}: {value}"));
    }

    Ok(parts.join("\n"))
}

/// Signs a request, returning the `Signature` header value.
pub fn sign_request(
    private_key: &RsaPrivateKey,
    key_id: &str,
    method: &str,
    path: &str,
    headers: &HashMap<String, String>,
    signed_header_names: &[&str],
) -> Result<String, SignatureError> {
    let header_names: Vec<String> = signed_header_names.iter().map(|s| (*s).to_string()).collect();
    let signing_string = build_signing_string(method, path, headers, &header_names)?;

    let signing_key = SigningKey::<Sha256>::new(private_key.clone());
    let signature = signing_key.sign(signing_string.as_bytes());
    let signature_b64 = BASE64.encode(signature.to_bytes());

    Ok(format!(
        r#"keyId="{}",algorithm="rsa-sha256",headers="{}",signature="{}""#,
        key_id,
        signed_header_names.join(" "),
        signature_b64
    ))
}

/// Verifies a parsed signature against a public key and request components.
///
/// Unlike a bare cryptographic check, this also enforces the two invariants
/// the ingest pipeline depends on: the `Date` header must be within
/// [`MAX_CLOCK_SKEW_SECONDS`] of now, and if a `Digest` header is present it
/// must have been one of the signed headers (callers verify the digest value
/// itself with [`verify_digest`]).
pub fn verify_signature(
    signature: &HttpSignature,
    public_key_pem: &str,
    method: &str,
    path: &str,
    headers: &HashMap<String, String>,
) -> Result<(), SignatureError> {
    let date_str = headers
        .get("date")
        .ok_or_else(|| SignatureError::MissingHeader("date".to_string()))?;
    check_clock_skew(date_str)?;

    if headers.contains_key("digest") && !signature.headers.iter().any(|h| h == "digest") {
        return Err(SignatureError::MissingHeader("digest".to_string()));
    }

    let signing_string = build_signing_string(method, path, headers, &signature.headers)?;

    let signature_bytes = BASE64
        .decode(&signature.signature)
        .map_err(|_| SignatureError::Malformed)?;

    let public_key = RsaPublicKey::from_public_key_pem(public_key_pem)
        .map_err(|e| SignatureError::KeyUnavailable(e.to_string()))?;

    let verifying_key = VerifyingKey::<Sha256>::new(public_key);
    let signature_obj =
        Signature::try_from(signature_bytes.as_slice()).map_err(|_| SignatureError::Malformed)?;

    verifying_key
        .verify(signing_string.as_bytes(), &signature_obj)
        .map_err(|_| SignatureError::Invalid)
}

fn check_clock_skew(date_str: &str) -> Result<(), SignatureError> {
    let date = DateTime::parse_from_rfc2822(date_str).map_err(|_| SignatureError::InvalidDate)?;
    let skew = (Utc::now() - date.with_timezone(&Utc)).num_seconds().abs();
    if skew > MAX_CLOCK_SKEW_SECONDS {
        return Err(SignatureError::ClockSkew);
    }
    Ok(())
}

/// Calculates the `Digest: SHA-256=...` header value for a body.
#[must_use]
pub fn calculate_digest(body: &[u8]) -> String {
    let hash = Sha256::digest(body);
    format!("SHA-256={}", BASE64.encode(hash))
}

/// Checks a received `Digest` header against the actual body bytes.
pub fn verify_digest(body: &[u8], digest_header: &str) -> Result<(), SignatureError> {
    if calculate_digest(body) == digest_header {
        Ok(())
    } else {
        Err(SignatureError::DigestMismatch)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::generate_rsa_keypair;

    fn rfc2822_now() -> String {
        Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
    }

    #[test]
    fn parses_signature_header() {
        let header = r#"keyId="https://example.com/actor#main-key",algorithm="rsa-sha256",headers="(request-target) host date digest",signature="abc123==""#;
        let sig = HttpSignature::parse(header).unwrap();

        assert_eq!(sig.key_id, "https://example.com/actor#main-key");
        assert_eq!(sig.headers, vec!["(request-target)", "host", "date", "digest"]);
        assert_eq!(sig.signature, "abc123==");
    }

    #[test]
    fn builds_signing_string() {
        let mut headers = HashMap::new();
        headers.insert("host".to_string(), "example.com".to_string());
        headers.insert("date".to_string(), rfc2822_now());

        let signed = vec!["(request-target)".to_string(), "host".to_string(), "date".to_string()];
        let s = build_signing_string("POST", "/inbox", &headers, &signed).unwrap();

        assert!(s.contains("(request-target): post /inbox"));
        assert!(s.contains("host: example.com"));
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let keypair = generate_rsa_keypair().unwrap();
        let private_key = crate::crypto::parse_private_key(&keypair.private_key_pem).unwrap();

        let mut headers = HashMap::new();
        headers.insert("host".to_string(), "relay.example".to_string());
        headers.insert("date".to_string(), rfc2822_now());

        let signed_header_names = &["(request-target)", "host", "date"];
        let sig_header = sign_request(
            &private_key,
            "https://example.com/actor#main-key",
            "POST",
            "/inbox",
            &headers,
            signed_header_names,
        )
        .unwrap();

        let parsed = HttpSignature::parse(&sig_header).unwrap();
        verify_signature(&parsed, &keypair.public_key_pem, "POST", "/inbox", &headers).unwrap();
    }

    #[test]
    fn rejects_stale_date() {
        let keypair = generate_rsa_keypair().unwrap();
        let private_key = crate::crypto::parse_private_key(&keypair.private_key_pem).unwrap();

        let mut headers = HashMap::new();
        headers.insert("host".to_string(), "relay.example".to_string());
        headers.insert(
            "date".to_string(),
            (Utc::now() - chrono::Duration::hours(5))
                .format("%a, %d %b %Y %H:%M:%S GMT")
                .to_string(),
        );

        let sig_header = sign_request(
            &private_key,
            "https://example.com/actor#main-key",
            "POST",
            "/inbox",
            &headers,
            &["(request-target)", "host", "date"],
        )
        .unwrap();

        let parsed = HttpSignature::parse(&sig_header).unwrap();
        let err = verify_signature(&parsed, &keypair.public_key_pem, "POST", "/inbox", &headers)
            .unwrap_err();
        assert!(matches!(err, SignatureError::ClockSkew));
    }

    #[test]
    fn digest_mismatch_is_detected() {
        let digest = calculate_digest(b"hello world");
        assert!(verify_digest(b"hello world", &digest).is_ok());
        assert!(verify_digest(b"goodbye world", &digest).is_err());
    }
}
