//! JWS decode and verification for Apple StoreKit 2 transaction/renewal/
//! notification payloads (L1 Receipt Decoder).
//!
//! Tokens are `header.payload.signature`, each part Base64URL-encoded. The
//! header carries an `x5c` certificate chain (leaf first); the chain is
//! checked for validity-period and issuer-signature correctness, then
//! anchored to a trusted Apple root before the payload signature itself is
//! verified.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;
use x509_parser::public_key::PublicKey;

#[derive(Debug, Error)]
pub enum JwsError {
    #[error("invalid JWS format: {0}")]
    Format(String),
    #[error("certificate error: {0}")]
    Certificate(String),
    #[error("untrusted certificate chain")]
    Untrusted,
    #[error("signature verification failed")]
    BadSignature,
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
}

/// A loaded set of trusted Apple root certificates, by SHA-256 fingerprint
/// and raw DER (for issuer-signature checks against the chain's last cert).
#[derive(Debug, Default, Clone)]
pub struct TrustAnchors {
    roots: Vec<Vec<u8>>,
}

impl TrustAnchors {
    #[must_use]
    pub const fn new(roots: Vec<Vec<u8>>) -> Self {
        Self { roots }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Verifies `jws_token`'s `x5c` certificate chain and signature, returning
/// the decoded payload as JSON.
///
/// When `require_trust` is false and no root is configured, trust anchoring
/// is skipped with a warning (non-production relaxed mode); signature
/// verification is never skipped.
pub fn verify_and_decode(
    jws_token: &str,
    anchors: &TrustAnchors,
    require_trust: bool,
) -> Result<Value, JwsError> {
    let (header, payload, signing_input, signature) = decode_parts(jws_token)?;

    let chain = load_certificate_chain(&header)?;
    if chain.is_empty() {
        return Err(JwsError::Certificate("missing x5c chain".to_string()));
    }

    verify_certificate_chain(&chain, anchors, require_trust)?;

    let alg = header
        .get("alg")
        .and_then(Value::as_str)
        .ok_or_else(|| JwsError::Format("missing alg header".to_string()))?;
    verify_jws_signature(&chain[0], alg, &signing_input, &signature)?;

    Ok(payload)
}

fn decode_parts(jws_token: &str) -> Result<(Value, Value, Vec<u8>, Vec<u8>), JwsError> {
    let parts: Vec<&str> = jws_token.split('.').collect();
    let [header_b64, payload_b64, signature_b64] = parts.as_slice() else {
        return Err(JwsError::Format("expected 3 dot-separated parts".to_string()));
    };

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|e| JwsError::Format(e.to_string()))?;
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|e| JwsError::Format(e.to_string()))?;
    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|e| JwsError::Format(e.to_string()))?;

    let header: Value =
        serde_json::from_slice(&header_bytes).map_err(|e| JwsError::Format(e.to_string()))?;
    let payload: Value =
        serde_json::from_slice(&payload_bytes).map_err(|e| JwsError::Format(e.to_string()))?;

    let signing_input = format!("{header_b64}.{payload_b64}").into_bytes();
    Ok((header, payload, signing_input, signature))
}

fn load_certificate_chain(header: &Value) -> Result<Vec<Vec<u8>>, JwsError> {
    let Some(x5c) = header.get("x5c").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    x5c.iter()
        .map(|entry| {
            let s = entry
                .as_str()
                .ok_or_else(|| JwsError::Format("x5c entry is not a string".to_string()))?;
            base64::engine::general_purpose::STANDARD
                .decode(s)
                .map_err(|e| JwsError::Certificate(e.to_string()))
        })
        .collect()
}

fn parse_cert(der: &[u8]) -> Result<X509Certificate<'_>, JwsError> {
    X509Certificate::from_der(der)
        .map(|(_, cert)| cert)
        .map_err(|e| JwsError::Certificate(e.to_string()))
}

fn verify_certificate_chain(
    chain: &[Vec<u8>],
    anchors: &TrustAnchors,
    require_trust: bool,
) -> Result<(), JwsError> {
    let now = x509_parser::time::ASN1Time::now();
    let parsed: Vec<X509Certificate<'_>> = chain
        .iter()
        .map(|der| parse_cert(der))
        .collect::<Result<_, _>>()?;

    for cert in &parsed {
        let validity = cert.validity();
        if now < validity.not_before || now > validity.not_after {
            return Err(JwsError::Certificate("certificate not valid at current time".to_string()));
        }
    }

    for pair in parsed.windows(2) {
        verify_cert_signed_by(&pair[0], &pair[1])?;
    }

    if anchors.is_empty() {
        if require_trust {
            return Err(JwsError::Certificate("no trusted Apple root configured".to_string()));
        }
        tracing::warn!("Apple root certificate not configured; skipping root trust check");
        return Ok(());
    }

    let last_der = &chain[chain.len() - 1];
    let last_fp = sha256_fingerprint(last_der);
    let directly_trusted = anchors.roots.iter().any(|root| sha256_fingerprint(root) == last_fp);
    if directly_trusted {
        return Ok(());
    }

    let last_cert = &parsed[parsed.len() - 1];
    for root_der in &anchors.roots {
        if let Ok(root_cert) = parse_cert(root_der) {
            if verify_cert_signed_by(last_cert, &root_cert).is_ok() {
                return Ok(());
            }
        }
    }
    Err(JwsError::Untrusted)
}

fn sha256_fingerprint(der: &[u8]) -> [u8; 32] {
    Sha256::digest(der).into()
}

fn verify_cert_signed_by(cert: &X509Certificate<'_>, issuer: &X509Certificate<'_>) -> Result<(), JwsError> {
    if cert.issuer() != issuer.subject() {
        return Err(JwsError::Certificate("issuer/subject mismatch".to_string()));
    }
    let tbs = cert.tbs_certificate.as_ref();
    let signature = cert.signature_value.as_ref();
    verify_with_public_key(&issuer.public_key().parsed().map_err(|e| JwsError::Certificate(e.to_string()))?, tbs, signature, hash_for_signature_alg(&cert.signature_algorithm.algorithm)?)
}

fn hash_for_signature_alg(oid: &x509_parser::oid_registry::Oid<'_>) -> Result<HashKind, JwsError> {
    use x509_parser::oid_registry::*;
    if *oid == OID_PKCS1_SHA256WITHRSA || *oid == OID_SIG_ECDSA_WITH_SHA256 {
        Ok(HashKind::Sha256)
    } else if *oid == OID_PKCS1_SHA384WITHRSA || *oid == OID_SIG_ECDSA_WITH_SHA384 {
        Ok(HashKind::Sha384)
    } else if *oid == OID_PKCS1_SHA512WITHRSA || *oid == OID_SIG_ECDSA_WITH_SHA512 {
        Ok(HashKind::Sha512)
    } else {
        Err(JwsError::Certificate("unsupported certificate signature algorithm".to_string()))
    }
}

#[derive(Clone, Copy)]
enum HashKind {
    Sha256,
    Sha384,
    Sha512,
}

fn verify_with_public_key(
    key: &PublicKey<'_>,
    message: &[u8],
    signature: &[u8],
    hash: HashKind,
) -> Result<(), JwsError> {
    match key {
        PublicKey::RSA(rsa_key) => verify_rsa_pkcs1(rsa_key.modulus, rsa_key.exponent, message, signature, hash),
        PublicKey::EC(ec_point) => verify_ecdsa_raw_der(ec_point.data(), message, signature, hash),
        _ => Err(JwsError::Certificate("unsupported public key type".to_string())),
    }
}

fn verify_rsa_pkcs1(
    modulus: &[u8],
    exponent: &[u8],
    message: &[u8],
    signature: &[u8],
    hash: HashKind,
) -> Result<(), JwsError> {
    use rsa::pkcs1v15::Pkcs1v15Sign;
    use rsa::traits::PublicKeyParts;
    use rsa::{BigUint, RsaPublicKey};

    let n = BigUint::from_bytes_be(modulus);
    let e = BigUint::from_bytes_be(exponent);
    let public_key = RsaPublicKey::new(n, e).map_err(|_| JwsError::Certificate("invalid RSA key".to_string()))?;
    let _ = public_key.size();

    let (scheme, digest) = match hash {
        HashKind::Sha256 => (Pkcs1v15Sign::new::<sha2::Sha256>(), Sha256::digest(message).to_vec()),
        HashKind::Sha384 => (Pkcs1v15Sign::new::<sha2::Sha384>(), sha2::Sha384::digest(message).to_vec()),
        HashKind::Sha512 => (Pkcs1v15Sign::new::<sha2::Sha512>(), sha2::Sha512::digest(message).to_vec()),
    };
    public_key
        .verify(scheme, &digest, signature)
        .map_err(|_| JwsError::BadSignature)
}

fn verify_ecdsa_raw_der(point: &[u8], message: &[u8], der_signature: &[u8], hash: HashKind) -> Result<(), JwsError> {
    use signature::Verifier;

    match hash {
        HashKind::Sha256 => {
            let verifying_key = p256::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map_err(|_| JwsError::Certificate("invalid EC point".to_string()))?;
            let signature = p256::ecdsa::Signature::from_der(der_signature)
                .map_err(|_| JwsError::Format("invalid DER signature".to_string()))?;
            verifying_key.verify(message, &signature).map_err(|_| JwsError::BadSignature)
        }
        HashKind::Sha384 => {
            let verifying_key = p384::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map_err(|_| JwsError::Certificate("invalid EC point".to_string()))?;
            let signature = p384::ecdsa::Signature::from_der(der_signature)
                .map_err(|_| JwsError::Format("invalid DER signature".to_string()))?;
            verifying_key.verify(message, &signature).map_err(|_| JwsError::BadSignature)
        }
        HashKind::Sha512 => {
            let verifying_key = p521::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map_err(|_| JwsError::Certificate("invalid EC point".to_string()))?;
            let signature = p521::ecdsa::Signature::from_der(der_signature)
                .map_err(|_| JwsError::Format("invalid DER signature".to_string()))?;
            verifying_key.verify(message, &signature).map_err(|_| JwsError::BadSignature)
        }
    }
}

/// Verifies the JWS payload signature itself: for `ES*` the raw
/// concatenated `r||s` must be re-encoded as ASN.1 DSS before verification.
fn verify_jws_signature(
    leaf_der: &[u8],
    alg: &str,
    signing_input: &[u8],
    raw_signature: &[u8],
) -> Result<(), JwsError> {
    let leaf = parse_cert(leaf_der)?;
    let public_key = leaf
        .public_key()
        .parsed()
        .map_err(|e| JwsError::Certificate(e.to_string()))?;

    let hash = match alg {
        "ES256" | "RS256" => HashKind::Sha256,
        "ES384" | "RS384" => HashKind::Sha384,
        "ES512" | "RS512" => HashKind::Sha512,
        other => return Err(JwsError::UnsupportedAlg(other.to_string())),
    };

    match (&public_key, alg.starts_with("ES")) {
        (PublicKey::EC(ec_point), true) => {
            let der_sig = raw_ec_signature_to_der(raw_signature)?;
            verify_ecdsa_raw_der(ec_point.data(), signing_input, &der_sig, hash)
        }
        (PublicKey::RSA(rsa_key), false) => {
            verify_rsa_pkcs1(rsa_key.modulus, rsa_key.exponent, signing_input, raw_signature, hash)
        }
        _ => Err(JwsError::Certificate("public key type does not match alg".to_string())),
    }
}

/// Re-encodes a raw `r || s` ECDSA signature (equal-length big-endian
/// integers) as an ASN.1 DSS `SEQUENCE { r INTEGER, s INTEGER }`.
fn raw_ec_signature_to_der(raw: &[u8]) -> Result<Vec<u8>, JwsError> {
    if raw.len() % 2 != 0 {
        return Err(JwsError::Format("odd-length ECDSA signature".to_string()));
    }
    let half = raw.len() / 2;
    let (r, s) = raw.split_at(half);
    Ok(encode_dss_sequence(r, s))
}

fn encode_dss_sequence(r: &[u8], s: &[u8]) -> Vec<u8> {
    fn encode_integer(bytes: &[u8]) -> Vec<u8> {
        let mut trimmed = bytes;
        while trimmed.len() > 1 && trimmed[0] == 0 && trimmed[1] < 0x80 {
            trimmed = &trimmed[1..];
        }
        let mut out = vec![0x02];
        if trimmed.first().is_some_and(|b| *b & 0x80 != 0) {
            out.push((trimmed.len() + 1) as u8);
            out.push(0x00);
        } else {
            out.push(trimmed.len() as u8);
        }
        out.extend_from_slice(trimmed);
        out
    }

    let r_enc = encode_integer(r);
    let s_enc = encode_integer(s);
    let mut body = r_enc;
    body.extend_from_slice(&s_enc);
    let mut out = vec![0x30, body.len() as u8];
    out.extend_from_slice(&body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_token_without_three_parts() {
        let err = decode_parts("not-a-jws").unwrap_err();
        assert!(matches!(err, JwsError::Format(_)));
    }

    #[test]
    fn raw_ec_signature_to_der_produces_sequence() {
        let raw = [1u8; 64];
        let der = raw_ec_signature_to_der(&raw).unwrap();
        assert_eq!(der[0], 0x30);
    }

    #[test]
    fn decodes_header_and_payload_without_verifying_signature() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"ES256"}"#);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"originalTransactionId":"otid-1"}"#);
        let token = format!("{header}.{payload}.sig");
        let (h, p, _signing_input, _sig) = decode_parts(&token).unwrap();
        assert_eq!(h["alg"], "ES256");
        assert_eq!(p["originalTransactionId"], "otid-1");
    }
}
