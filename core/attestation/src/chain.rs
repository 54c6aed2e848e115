//! Certificate chain validation against a pinned platform root.
//!
//! Adapted from the Nitro attestation verifier's `verify_cert_chain`: walks
//! leaf -> ... -> root checking key usage, basic constraints, validity
//! window, issuer/subject chaining, and the per-certificate signature.

use x509_parser::prelude::{FromDer, X509Certificate};
use x509_parser::time::ASN1Time;

use crate::error::AttestationError;

/// Validate `cert_chain` (leaf-first, DER-encoded) against `root_der`.
///
/// `now` is a Unix timestamp in seconds. Every certificate, including the
/// leaf, must be valid at `now`.
pub fn verify_cert_chain(
    cert_chain: &[&[u8]],
    root_der: &[u8],
    now_secs: i64,
) -> Result<(), AttestationError> {
    let root_cert = X509Certificate::from_der(root_der)
        .map_err(|e| AttestationError::ChainUntrusted(format!("invalid root cert: {e}")))?
        .1;

    let now = ASN1Time::from_timestamp(now_secs)
        .map_err(|e| AttestationError::ChainUntrusted(format!("invalid timestamp: {e}")))?;

    for (i, der) in cert_chain.iter().enumerate() {
        let cert = X509Certificate::from_der(der)
            .map_err(|e| AttestationError::ChainUntrusted(format!("invalid certificate: {e}")))?
            .1;

        match cert.key_usage() {
            Ok(Some(ku)) => {
                if i == 0 {
                    if !ku.value.digital_signature() {
                        return Err(AttestationError::ChainUntrusted(
                            "leaf certificate missing digitalSignature key usage".to_string(),
                        ));
                    }
                } else if !ku.value.key_cert_sign() {
                    return Err(AttestationError::ChainUntrusted(
                        "CA certificate missing keyCertSign key usage".to_string(),
                    ));
                }
            }
            _ => {
                return Err(AttestationError::ChainUntrusted(
                    "certificate missing key usage extension".to_string(),
                ))
            }
        }

        if i != 0 {
            match cert.basic_constraints() {
                Ok(Some(bc)) if bc.critical && bc.value.ca => {
                    if let Some(path_len) = bc.value.path_len_constraint {
                        if i - 1 > path_len as usize {
                            return Err(AttestationError::ChainUntrusted(
                                "chain exceeds pathLenConstraint".to_string(),
                            ));
                        }
                    }
                }
                _ => {
                    return Err(AttestationError::ChainUntrusted(
                        "CA certificate missing a valid basic constraints extension".to_string(),
                    ))
                }
            }
        } else if let Ok(Some(bc)) = cert.basic_constraints() {
            if bc.value.ca || bc.value.path_len_constraint.is_some() {
                return Err(AttestationError::ChainUntrusted(
                    "leaf certificate must not be a CA".to_string(),
                ));
            }
        }

        if !cert.validity().is_valid_at(now) {
            return Err(AttestationError::DocumentExpired);
        }

        let issuer_cert = if i + 1 < cert_chain.len() {
            X509Certificate::from_der(cert_chain[i + 1])
                .map_err(|e| AttestationError::ChainUntrusted(format!("invalid certificate: {e}")))?
                .1
        } else {
            root_cert.clone()
        };

        if cert.issuer() != issuer_cert.subject() {
            return Err(AttestationError::ChainUntrusted(
                "issuer/subject chaining mismatch".to_string(),
            ));
        }

        cert.verify_signature(Some(issuer_cert.public_key()))
            .map_err(|_| {
                AttestationError::ChainUntrusted("certificate signature failed to verify".to_string())
            })?;
    }

    Ok(())
}
