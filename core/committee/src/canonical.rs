//! Canonical measurement strings the committee registry keys its
//! approvals/revocations on.

use attestation::Measurements;

const CODE_PREFIX: &str = "AWS-CODE:";
const INSTANCE_PREFIX: &str = "AWS-INSTANCE:";
const REVOKE_PREFIX: &str = "REVOKE: ";

/// `"AWS-CODE:" || hex(PCR0) || ":" || hex(PCR1) || ":" || hex(PCR2)`
pub fn code_string(measurements: &Measurements) -> String {
    format!("{CODE_PREFIX}{}", measurements.code_string())
}

/// `"AWS-INSTANCE:" || hex(PCR4)`
pub fn instance_string(measurements: &Measurements) -> String {
    format!("{INSTANCE_PREFIX}{}", measurements.instance_string())
}

/// The revocation string for a previously-published authorization string.
pub fn revocation_string(authorization_string: &str) -> String {
    format!("{REVOKE_PREFIX}{authorization_string}")
}
