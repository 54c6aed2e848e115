//! The Nitro attestation document payload: module id, PCRs, certificate
//! chain, and the three caller-bound fields (`nonce`, `public_key`,
//! `user_data`).

use std::collections::HashMap;

use ciborium::value::Value;

use crate::error::AttestationError;
use crate::measurements::Measurements;

const MAX_CERT_CHAIN_LENGTH: usize = 10;
const MAX_USER_DATA_LENGTH: usize = 512;
const MAX_PK_LENGTH: usize = 1024;
const MAX_CERT_LENGTH: usize = 1024;

/// A parsed and field-validated attestation document payload.
///
/// This is the payload carried inside the [`crate::cose::CoseSign1`]
/// envelope; it has not yet had its signature or certificate chain
/// verified. Use [`crate::verifier::NitroVerifier::verify`] to get a
/// [`crate::VerifiedAttestation`].
#[derive(Debug, Clone)]
pub struct AttestationDocument {
    pub(crate) module_id: String,
    pub(crate) timestamp_ms: u64,
    pub(crate) measurements: Measurements,
    pub(crate) certificate: Vec<u8>,
    pub(crate) cabundle: Vec<Vec<u8>>,
    pub(crate) public_key: Option<Vec<u8>>,
    pub(crate) user_data: Option<Vec<u8>>,
    pub(crate) nonce: Option<Vec<u8>>,
}

impl AttestationDocument {
    /// Parse and structurally validate a CBOR-encoded attestation payload.
    pub fn parse_payload(payload: &[u8]) -> Result<Self, AttestationError> {
        let map = to_map(payload)?;
        Self::validate_document_map(&map)
    }

    fn validate_document_map(map: &HashMap<String, Value>) -> Result<Self, AttestationError> {
        let module_id = text_field(map, "module_id")?;
        if module_id.is_empty() {
            return Err(AttestationError::Malformed("empty module_id"));
        }

        let digest = text_field(map, "digest")?;
        if digest != "SHA384" {
            return Err(AttestationError::Malformed("unexpected digest algorithm"));
        }

        let certificate = bytes_field(map, "certificate")?;
        if certificate.is_empty() || certificate.len() > MAX_CERT_LENGTH {
            return Err(AttestationError::Malformed("invalid certificate length"));
        }

        let timestamp_ms = map
            .get("timestamp")
            .and_then(Value::as_integer)
            .and_then(|i| u64::try_from(i).ok())
            .ok_or(AttestationError::Malformed("invalid timestamp"))?;

        let public_key = optional_bytes_field(map, "public_key");
        if let Some(pk) = &public_key {
            if pk.is_empty() || pk.len() > MAX_PK_LENGTH {
                return Err(AttestationError::Malformed("invalid public_key length"));
            }
        }

        let user_data = optional_bytes_field(map, "user_data");
        if let Some(ud) = &user_data {
            if ud.len() > MAX_USER_DATA_LENGTH {
                return Err(AttestationError::Malformed("invalid user_data length"));
            }
        }

        let nonce = optional_bytes_field(map, "nonce");
        if let Some(n) = &nonce {
            if n.len() > MAX_USER_DATA_LENGTH {
                return Err(AttestationError::Malformed("invalid nonce length"));
            }
        }

        let measurements = parse_measurements(map)?;
        let cabundle = parse_cabundle(map)?;

        Ok(Self {
            module_id,
            timestamp_ms,
            measurements,
            certificate,
            cabundle,
            public_key,
            user_data,
            nonce,
        })
    }
}

fn to_map(payload: &[u8]) -> Result<HashMap<String, Value>, AttestationError> {
    let value: Value = ciborium::de::from_reader(payload)
        .map_err(|_| AttestationError::Malformed("invalid payload CBOR"))?;

    match value {
        Value::Map(entries) => entries
            .into_iter()
            .map(|(k, v)| {
                k.as_text()
                    .map(|s| (s.to_string(), v))
                    .ok_or(AttestationError::Malformed("non-text document key"))
            })
            .collect(),
        _ => Err(AttestationError::Malformed("payload is not a CBOR map")),
    }
}

fn text_field(map: &HashMap<String, Value>, key: &'static str) -> Result<String, AttestationError> {
    map.get(key)
        .and_then(Value::as_text)
        .map(str::to_string)
        .ok_or(AttestationError::Malformed(key))
}

fn bytes_field(map: &HashMap<String, Value>, key: &'static str) -> Result<Vec<u8>, AttestationError> {
    map.get(key)
        .and_then(Value::as_bytes)
        .map(|b| b.to_vec())
        .ok_or(AttestationError::Malformed(key))
}

fn optional_bytes_field(map: &HashMap<String, Value>, key: &str) -> Option<Vec<u8>> {
    map.get(key).and_then(Value::as_bytes).map(|b| b.to_vec())
}

/// Valid PCR indices under the Nitro spec are 0-4 and 8; the protocol only
/// binds PCR0/1/2/4, so we require exactly those four to be present with an
/// AWS-legal digest length and ignore the rest.
fn parse_measurements(map: &HashMap<String, Value>) -> Result<Measurements, AttestationError> {
    let pairs = map
        .get("pcrs")
        .and_then(Value::as_map)
        .ok_or(AttestationError::Malformed("pcrs missing or not a map"))?;

    let mut slots: HashMap<u64, Vec<u8>> = HashMap::new();
    for (k, v) in pairs {
        let index = k
            .as_integer()
            .and_then(|i| u64::try_from(i).ok())
            .ok_or(AttestationError::Malformed("invalid pcr index"))?;
        let digest = v
            .as_bytes()
            .ok_or(AttestationError::Malformed("invalid pcr value"))?;
        if !matches!(digest.len(), 32 | 48 | 64) {
            return Err(AttestationError::Malformed("invalid pcr digest length"));
        }
        slots.insert(index, digest.to_vec());
    }

    let take = |i: u64| -> Result<Vec<u8>, AttestationError> {
        slots
            .remove(&i)
            .ok_or(AttestationError::Malformed("required PCR slot missing"))
    };

    Ok(Measurements {
        pcr0: take(0)?,
        pcr1: take(1)?,
        pcr2: take(2)?,
        pcr4: take(4)?,
    })
}

fn parse_cabundle(map: &HashMap<String, Value>) -> Result<Vec<Vec<u8>>, AttestationError> {
    let arr = map
        .get("cabundle")
        .and_then(Value::as_array)
        .ok_or(AttestationError::Malformed("cabundle missing or not an array"))?;

    if arr.is_empty() || arr.len() > MAX_CERT_CHAIN_LENGTH {
        return Err(AttestationError::Malformed("invalid cabundle length"));
    }

    arr.iter()
        .map(|cert| {
            let bytes = cert
                .as_bytes()
                .ok_or(AttestationError::Malformed("invalid cabundle entry"))?;
            if bytes.is_empty() || bytes.len() > MAX_CERT_LENGTH {
                return Err(AttestationError::Malformed("invalid cabundle cert length"));
            }
            Ok(bytes.to_vec())
        })
        .collect()
}
