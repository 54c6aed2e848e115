//! A self-contained, no-hardware stand-in for the Nitro attestation
//! profile, used in unit tests and the `e2e` crate.
//!
//! This mirrors the "bring your own PKI" pattern used by
//! `nsm-nitro-enclave-utils`'s dev signer: a locally generated P-384 root
//! and leaf certificate sign real `COSE_Sign1`/CBOR documents that
//! [`crate::verifier::NitroVerifier`] can verify exactly as it would a
//! genuine NSM-produced one, once pinned to this mock's root.

use ciborium::value::{Integer, Value};
use p384::ecdsa::{signature::Signer, Signature, SigningKey};
use rcgen::{CertificateParams, KeyPair, PKCS_ECDSA_P384_SHA384};

use crate::error::AttestationError;
use crate::measurements::Measurements;
use crate::provider::AttestationProvider;

/// Generates and signs attestation documents without touching real NSM
/// hardware.
pub struct MockAttestationProvider {
    leaf_signing_key: SigningKey,
    leaf_cert_der: Vec<u8>,
    root_cert_der: Vec<u8>,
    measurements: Measurements,
}

impl MockAttestationProvider {
    /// Build a fresh root CA and leaf certificate, both ECDSA P-384, and
    /// bind `measurements` into every document this provider signs.
    pub fn generate(measurements: Measurements) -> Self {
        let root_key = KeyPair::generate_for(&PKCS_ECDSA_P384_SHA384)
            .expect("P-384 key generation cannot fail");
        let mut root_params = CertificateParams::new(vec!["keysync mock root".to_string()])
            .expect("static subject name is always valid");
        root_params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        root_params.key_usages = vec![
            rcgen::KeyUsagePurpose::KeyCertSign,
            rcgen::KeyUsagePurpose::CrlSign,
        ];
        let root_cert = root_params
            .self_signed(&root_key)
            .expect("self-signed root generation cannot fail");

        let leaf_key = KeyPair::generate_for(&PKCS_ECDSA_P384_SHA384)
            .expect("P-384 key generation cannot fail");
        let mut leaf_params = CertificateParams::new(vec!["keysync mock leaf".to_string()])
            .expect("static subject name is always valid");
        leaf_params.key_usages = vec![rcgen::KeyUsagePurpose::DigitalSignature];
        let leaf_cert = leaf_params
            .signed_by(&leaf_key, &root_cert, &root_key)
            .expect("leaf signing cannot fail");

        let leaf_signing_key = SigningKey::from_pkcs8_der(&leaf_key.serialize_der())
            .expect("rcgen P-384 keys are valid PKCS8");

        Self {
            leaf_signing_key,
            leaf_cert_der: leaf_cert.der().to_vec(),
            root_cert_der: root_cert.der().to_vec(),
            measurements,
        }
    }

    /// The DER-encoded root certificate this provider's documents chain to.
    /// Tests pin a [`crate::verifier::NitroVerifier`] to this.
    pub fn root_cert_der(&self) -> &[u8] {
        &self.root_cert_der
    }
}

impl AttestationProvider for MockAttestationProvider {
    fn attest(
        &self,
        nonce: Option<&[u8]>,
        public_key: Option<&[u8]>,
        user_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, AttestationError> {
        let timestamp_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system clock is after the Unix epoch")
            .as_millis() as u64;

        let mut payload_entries = vec![
            (Value::Text("module_id".into()), Value::Text("mock-0".into())),
            (Value::Text("digest".into()), Value::Text("SHA384".into())),
            (
                Value::Text("timestamp".into()),
                Value::Integer(Integer::from(timestamp_ms)),
            ),
            (
                Value::Text("pcrs".into()),
                Value::Map(vec![
                    (Value::Integer(0.into()), Value::Bytes(self.measurements.pcr0.clone())),
                    (Value::Integer(1.into()), Value::Bytes(self.measurements.pcr1.clone())),
                    (Value::Integer(2.into()), Value::Bytes(self.measurements.pcr2.clone())),
                    (Value::Integer(4.into()), Value::Bytes(self.measurements.pcr4.clone())),
                ]),
            ),
            (
                Value::Text("certificate".into()),
                Value::Bytes(self.leaf_cert_der.clone()),
            ),
            (
                Value::Text("cabundle".into()),
                Value::Array(vec![Value::Bytes(self.root_cert_der.clone())]),
            ),
        ];
        if let Some(pk) = public_key {
            payload_entries.push((Value::Text("public_key".into()), Value::Bytes(pk.to_vec())));
        }
        if let Some(ud) = user_data {
            payload_entries.push((Value::Text("user_data".into()), Value::Bytes(ud.to_vec())));
        }
        if let Some(n) = nonce {
            payload_entries.push((Value::Text("nonce".into()), Value::Bytes(n.to_vec())));
        }

        let mut payload = Vec::new();
        ciborium::ser::into_writer(&Value::Map(payload_entries), &mut payload)
            .expect("payload map encodes to valid CBOR");

        let mut protected = Vec::new();
        ciborium::ser::into_writer(
            &Value::Map(vec![(Value::Integer(1.into()), Value::Integer((-35).into()))]),
            &mut protected,
        )
        .expect("protected header encodes to valid CBOR");

        let sig_structure = Value::Array(vec![
            Value::Text("Signature1".to_string()),
            Value::Bytes(protected.clone()),
            Value::Bytes(vec![]),
            Value::Bytes(payload.clone()),
        ]);
        let mut signed_message = Vec::new();
        ciborium::ser::into_writer(&sig_structure, &mut signed_message)
            .expect("Sig_structure encodes to valid CBOR");

        let signature: Signature = self.leaf_signing_key.sign(&signed_message);

        let cose = Value::Array(vec![
            Value::Bytes(protected),
            Value::Map(vec![]),
            Value::Bytes(payload),
            Value::Bytes(signature.to_bytes().to_vec()),
        ]);

        let mut document = Vec::new();
        ciborium::ser::into_writer(&cose, &mut document)
            .expect("COSE_Sign1 array encodes to valid CBOR");
        Ok(document)
    }
}
