//! Platform code/instance measurements carried in an attestation document.

/// The four Nitro PCR slots the protocol cares about.
///
/// `PCR0`/`PCR1`/`PCR2` together identify the running code image (the EIF,
/// its kernel/bootstrap, and the application layer); `PCR4` identifies the
/// parent EC2 instance. These are exactly the slots [`crate::committee`'s
/// canonical strings][canonical] hash over.
///
/// [canonical]: https://docs.aws.amazon.com/enclaves/latest/user/set-up-attestation.html#where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurements {
    /// Digest of the enclave image file (EIF).
    pub pcr0: Vec<u8>,
    /// Digest of the Linux kernel and bootstrap process.
    pub pcr1: Vec<u8>,
    /// Digest of the application code and configuration.
    pub pcr2: Vec<u8>,
    /// Digest identifying the parent EC2 instance.
    pub pcr4: Vec<u8>,
}

impl Measurements {
    /// Hex-encode PCR0/1/2, in order, joined by `:`. This is the "CODE" half
    /// of the committee's canonical authorization string.
    pub fn code_string(&self) -> String {
        format!(
            "{}:{}:{}",
            hex::encode(&self.pcr0),
            hex::encode(&self.pcr1),
            hex::encode(&self.pcr2)
        )
    }

    /// Hex-encode PCR4. This is the "INSTANCE" half of the committee's
    /// canonical authorization string.
    pub fn instance_string(&self) -> String {
        hex::encode(&self.pcr4)
    }
}
