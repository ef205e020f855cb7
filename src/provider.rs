use alloc::vec::Vec;

use crate::{AlgorithmIdentifier, ObjectIdentifier, SubjectPublicKeyInfo};

/// Cryptographic primitives needed to verify an EF.SOD.
///
/// The codec never hashes or verifies anything itself. Callers plug in an
/// implementation backed by the library of their choice; with the `validate`
/// feature, `RustCryptoProvider` covers the common eMRTD algorithms.
pub trait CryptoProvider {
    type Error;

    /// Hashes `data` with the digest algorithm identified by `algorithm`.
    fn digest(&self, algorithm: &ObjectIdentifier, data: &[u8]) -> Result<Vec<u8>, Self::Error>;

    /// Verifies `signature` over `signed_attributes`, the DER encoded signed
    /// attributes under the universal SET tag.
    ///
    /// Returns `Ok(false)` for a well-formed signature that does not verify.
    fn verify_signature(
        &self,
        algorithm: &AlgorithmIdentifier<'_>,
        key: &SubjectPublicKeyInfo<'_>,
        signature: &[u8],
        signed_attributes: &[u8],
    ) -> Result<bool, Self::Error>;
}
