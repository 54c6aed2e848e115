//! `COSE_Sign1` parsing, per [RFC 8152](https://tools.ietf.org/html/rfc8152).
//!
//! Adapted from the `CoseSign1` handling in `aws-nitro-enclaves-cose` and
//! from how the Sui validator client parses Nitro attestation envelopes: we
//! only need read access to the four-element array, not a general COSE
//! signing/verification library, so we decode it by hand with `ciborium`.

use ciborium::value::{Integer, Value};

use crate::error::AttestationError;

/// A decoded, structurally-validated `COSE_Sign1` envelope.
///
/// AWS Nitro never sets an unprotected header, so we don't bother modeling
/// one beyond checking it decodes to an empty map.
#[derive(Debug, Clone)]
pub struct CoseSign1 {
    protected: Vec<u8>,
    pub(crate) payload: Vec<u8>,
    pub(crate) signature: Vec<u8>,
}

impl CoseSign1 {
    /// Parse `bytes` as a (possibly tag-18-wrapped) `COSE_Sign1` array and
    /// validate its protected header and field lengths.
    pub fn parse_and_validate(bytes: &[u8]) -> Result<Self, AttestationError> {
        let value: Value = ciborium::de::from_reader(bytes)
            .map_err(|_| AttestationError::Malformed("invalid top-level CBOR"))?;

        let value = match value {
            Value::Tag(18, boxed) => *boxed,
            Value::Tag(_, _) => {
                return Err(AttestationError::Malformed("unexpected CBOR tag"))
            }
            other => other,
        };

        let elements = match value {
            Value::Array(elements) if elements.len() == 4 => elements,
            _ => return Err(AttestationError::Malformed("COSE_Sign1 must be a 4-element array")),
        };

        let mut iter = elements.into_iter();
        let protected = as_bytes(iter.next().unwrap())
            .ok_or(AttestationError::Malformed("protected header must be bytes"))?;
        let unprotected = iter.next().unwrap();
        let payload = as_bytes(iter.next().unwrap())
            .ok_or(AttestationError::Malformed("payload must be bytes"))?;
        let signature = as_bytes(iter.next().unwrap())
            .ok_or(AttestationError::Malformed("signature must be bytes"))?;

        if !matches!(unprotected, Value::Map(ref m) if m.is_empty()) {
            return Err(AttestationError::Malformed("unprotected header must be empty"));
        }

        let cose = Self {
            protected,
            payload,
            signature,
        };
        cose.validate_header()?;
        Ok(cose)
    }

    fn validate_header(&self) -> Result<(), AttestationError> {
        let header_ok = Self::is_valid_protected_header(&self.protected)
            && (1..16384).contains(&self.payload.len())
            && self.signature.len() == 96;
        if !header_ok {
            return Err(AttestationError::Malformed("invalid COSE_Sign1 header or field length"));
        }
        Ok(())
    }

    /// Protected header must be the single-entry map `{1: -35}` (algorithm
    /// id for ECDSA over P-384/SHA-384), per
    /// <https://docs.aws.amazon.com/enclaves/latest/user/verify-root.html#COSE-CBOR>.
    fn is_valid_protected_header(bytes: &[u8]) -> bool {
        let expected_key = Integer::from(1);
        let expected_alg = Integer::from(-35);
        let value: Value = match ciborium::de::from_reader(bytes) {
            Ok(v) => v,
            Err(_) => return false,
        };
        match value {
            Value::Map(entries) => match entries.as_slice() {
                [(Value::Integer(key), Value::Integer(alg))] => {
                    key == &expected_key && alg == &expected_alg
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// The `Sig_structure` content the signature is computed over (RFC 8152
    /// §4.4), used here only for single-signer `COSE_Sign1` with an empty
    /// external AAD.
    pub fn to_signed_message(&self) -> Result<Vec<u8>, AttestationError> {
        let value = Value::Array(vec![
            Value::Text("Signature1".to_string()),
            Value::Bytes(self.protected.clone()),
            Value::Bytes(vec![]),
            Value::Bytes(self.payload.clone()),
        ]);
        let mut bytes = Vec::with_capacity(self.protected.len() + self.payload.len() + 17);
        ciborium::ser::into_writer(&value, &mut bytes)
            .map_err(|_| AttestationError::Malformed("failed to encode Sig_structure"))?;
        Ok(bytes)
    }
}

fn as_bytes(value: Value) -> Option<Vec<u8>> {
    match value {
        Value::Bytes(b) => Some(b),
        _ => None,
    }
}
