use ecdsa::signature::hazmat::PrehashVerifier;
use rsa::{pkcs1::DecodeRsaPublicKey, traits::SignatureScheme, Pkcs1v15Sign, Pss, RsaPublicKey};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use tracing::{error, info, warn};

use crate::{
    oid, AlgorithmIdentifier, AlgorithmParameters, CryptoProvider, DataGroupNumber, DecodeError,
    EncodeError, LdsSecurityObject, LdsSecurityObjectVersion, ObjectIdentifier,
    RsassaPssParameters, SignedData, SignerIdentifier, SignerInfo, Sod, SubjectPublicKeyInfo,
};

pub trait Validate {
    ///  The `Validate` trait exposes a `validate` method that checks whether the implementing type is valid.
    /// `validate` runs the following checks:
    /// - The LDS security object matches its version and its hashes match the hash algorithm
    /// - The SignedData envelope has the shape ICAO 9303-10 requires for EF.SOD
    /// - Every signer carries exactly one contentType and one messageDigest signed attribute
    /// #### Returns
    /// - `Ok(ValidationResult::Success)` if all checks passed successful
    /// - `Ok(ValidationResult::Failure { reason: String })` if a check failed
    /// - `Ok(ValidationResult::NotApplicable { info: &'static str })` if no validation checks were run
    /// - `Err(ValidationError)` if an internal error occured during validation
    fn validate(&self) -> Result<ValidationResult, ValidationError>;
}

#[derive(Debug, PartialEq)]
pub enum ValidationResult {
    Success,
    Failure { reason: String },
    NotApplicable { info: &'static str },
}

#[derive(Debug, PartialEq)]
pub enum ValidationError {
    InvalidInput(String),
    Unsupported(String),
    ReencodingError(String),
}

impl From<EncodeError> for ValidationError {
    fn from(value: EncodeError) -> Self {
        ValidationError::ReencodingError(value.message().into())
    }
}

impl From<DecodeError> for ValidationError {
    fn from(value: DecodeError) -> Self {
        ValidationError::InvalidInput(value.to_string())
    }
}

macro_rules! validate_and_continue {
    ($candidate:expr) => {
        match $candidate.validate()? {
            ValidationResult::Success => (),
            ValidationResult::NotApplicable { .. } => (),
            failure => return Ok(failure),
        }
    };
}

fn fail(reason: String) -> Result<ValidationResult, ValidationError> {
    error!("{reason}");
    Ok(ValidationResult::Failure { reason })
}

/// Output length of the digest algorithms allowed in EF.SOD
fn digest_length(algorithm: &ObjectIdentifier) -> Option<usize> {
    match algorithm.as_str() {
        oid::ID_SHA1 => Some(20),
        oid::ID_SHA224 => Some(28),
        oid::ID_SHA256 => Some(32),
        oid::ID_SHA384 => Some(48),
        oid::ID_SHA512 => Some(64),
        _ => None,
    }
}

impl Validate for LdsSecurityObject<'_> {
    fn validate(&self) -> Result<ValidationResult, ValidationError> {
        match (self.version, &self.lds_version_info) {
            (LdsSecurityObjectVersion::V0, Some(_)) => {
                return fail("LDS security object v0 must not carry ldsVersionInfo!".into())
            }
            (LdsSecurityObjectVersion::V1, None) => {
                return fail("LDS security object v1 must carry ldsVersionInfo!".into())
            }
            _ => (),
        }

        let count = self.data_group_hash_values.len();
        if !(2..=16).contains(&count) {
            return fail(format!(
                "LDS security object must hold 2 to 16 data group hashes. Found {count}"
            ));
        }
        let mut seen = 0u32;
        for hash in &self.data_group_hash_values {
            let bit = 1u32 << hash.data_group_number.number();
            if seen & bit != 0 {
                return fail(format!(
                    "{:?} is hashed more than once!",
                    hash.data_group_number
                ));
            }
            seen |= bit;
        }

        let Some(expected) = digest_length(&self.hash_algorithm.algorithm) else {
            return Ok(ValidationResult::NotApplicable {
                info: "Hash lengths are not checked for an unknown hash algorithm.",
            });
        };
        for hash in &self.data_group_hash_values {
            let found = hash.data_group_hash_value.len();
            if found != expected {
                return fail(format!(
                    "Hash of {:?} must be {expected} bytes long. Found {found}",
                    hash.data_group_number
                ));
            }
        }
        Ok(ValidationResult::Success)
    }
}

impl Validate for SignerInfo<'_> {
    fn validate(&self) -> Result<ValidationResult, ValidationError> {
        let expected_version = match self.sid {
            SignerIdentifier::IssuerAndSerialNumber(_) => 1,
            SignerIdentifier::SubjectKeyIdentifier(_) => 3,
        };
        if self.version != expected_version {
            return fail(format!(
                "SignerInfo version must be {expected_version} for its signer identifier. Found {}",
                self.version
            ));
        }
        let Some(attributes) = &self.signed_attrs else {
            return fail("Signed attributes must be present!".into());
        };
        for (attr_type, name) in [
            (oid::ID_CONTENT_TYPE, "contentType"),
            (oid::ID_MESSAGE_DIGEST, "messageDigest"),
        ] {
            let count = attributes.count(attr_type);
            if count != 1 {
                return fail(format!(
                    "Exactly one {name} attribute must be signed. Found {count}"
                ));
            }
        }
        match attributes.content_type()? {
            Some(content_type) if content_type == oid::ID_LDS_SECURITY_OBJECT => {
                Ok(ValidationResult::Success)
            }
            other => fail(format!(
                "Signed content type must be {}. Found {other:?}",
                oid::ID_LDS_SECURITY_OBJECT
            )),
        }
    }
}

impl Validate for SignedData<'_> {
    fn validate(&self) -> Result<ValidationResult, ValidationError> {
        if self.version != 3 {
            return fail(format!(
                "SignedData version of EF.SOD must be 3. Found {}",
                self.version
            ));
        }
        if self.digest_algorithms.is_empty() {
            return fail("At least one digest algorithm must be listed!".into());
        }
        let encap = &self.encap_content_info;
        if encap.e_content_type != oid::ID_LDS_SECURITY_OBJECT {
            return fail(format!(
                "Encapsulated content type must be {}. Found {}",
                oid::ID_LDS_SECURITY_OBJECT,
                encap.e_content_type
            ));
        }
        if encap.e_content.is_none() {
            return fail("Encapsulated content must be present!".into());
        }
        if self.signer_infos.is_empty() {
            return fail("At least one signer must be present!".into());
        }
        for signer in &self.signer_infos {
            validate_and_continue!(signer);
            let listed = self
                .digest_algorithms
                .iter()
                .any(|digest| digest.algorithm == signer.digest_algorithm.algorithm);
            if !listed {
                return fail(format!(
                    "Digest algorithm {} of a signer is not listed in digestAlgorithms!",
                    signer.digest_algorithm.algorithm
                ));
            }
        }
        Ok(ValidationResult::Success)
    }
}

impl Validate for Sod<'_> {
    fn validate(&self) -> Result<ValidationResult, ValidationError> {
        validate_and_continue!(&self.signed_data);
        validate_and_continue!(&self.lds_security_object);
        Ok(ValidationResult::Success)
    }
}

/// Runs passive authentication of `sod` against the document signer `key`.
///
/// After the structural checks of [`Validate`], the message digest of the
/// encapsulated LDS security object is compared with the messageDigest
/// signed attribute, and the signature of the first signer is verified over
/// the signed attributes. Certificate path validation is left to the caller.
pub fn passive_authentication<P>(
    sod: &Sod<'_>,
    provider: &P,
    key: &SubjectPublicKeyInfo<'_>,
) -> Result<ValidationResult, ValidationError>
where
    P: CryptoProvider,
    ValidationError: From<P::Error>,
{
    validate_and_continue!(sod);

    let signer = sod
        .signer_info()
        .ok_or(ValidationError::InvalidInput("Signer list is empty!".into()))?;
    let content = sod.encapsulated_content().ok_or(ValidationError::InvalidInput(
        "Encapsulated content is missing!".into(),
    ))?;
    let attributes = signer.signed_attrs.as_ref().ok_or(ValidationError::InvalidInput(
        "Signed attributes are missing!".into(),
    ))?;

    let digest = provider.digest(&signer.digest_algorithm.algorithm, content)?;
    let message_digest = attributes
        .message_digest()?
        .ok_or(ValidationError::InvalidInput("Message digest is missing!".into()))?;
    if digest != message_digest {
        return fail("Message digest does not match the LDS security object!".into());
    }
    info!("Message digest matches the LDS security object");

    let signed_attributes = attributes.to_signed_bytes()?;
    if provider.verify_signature(
        &signer.signature_algorithm,
        key,
        signer.signature,
        &signed_attributes,
    )? {
        info!("Signature over the signed attributes is valid");
        Ok(ValidationResult::Success)
    } else {
        fail("Signature verification failed!".into())
    }
}

/// Compares the hash of the data group contents `data` with the hash stored
/// for `number` in `sod`.
pub fn verify_data_group<P>(
    sod: &Sod<'_>,
    provider: &P,
    number: DataGroupNumber,
    data: &[u8],
) -> Result<ValidationResult, ValidationError>
where
    P: CryptoProvider,
    ValidationError: From<P::Error>,
{
    let Some(stored) = sod.data_group_hash(number) else {
        return fail(format!("No hash is stored for {number:?}!"));
    };
    let digest = provider.digest(&sod.lds_security_object.hash_algorithm.algorithm, data)?;
    if digest == stored.data_group_hash_value {
        info!("Hash of {number:?} matches");
        Ok(ValidationResult::Success)
    } else {
        fail(format!("Hash of {number:?} does not match!"))
    }
}

/// [`CryptoProvider`] backed by the RustCrypto crates.
///
/// Supports SHA-224/256/384/512 digests, RSA signatures (PKCS#1 v1.5 and
/// RSASSA-PSS with MGF1) and ECDSA signatures on P-256 and P-384 keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoProvider;

fn hash(algorithm: &str, data: &[u8]) -> Result<Vec<u8>, ValidationError> {
    match algorithm {
        oid::ID_SHA224 => Ok(Sha224::digest(data).to_vec()),
        oid::ID_SHA256 => Ok(Sha256::digest(data).to_vec()),
        oid::ID_SHA384 => Ok(Sha384::digest(data).to_vec()),
        oid::ID_SHA512 => Ok(Sha512::digest(data).to_vec()),
        other => Err(unsupported_digest(other)),
    }
}

fn unsupported_digest(algorithm: &str) -> ValidationError {
    ValidationError::Unsupported(format!("Digest algorithm {algorithm} is unsupported!"))
}

fn verify_prehash<K, S>(key: &K, prehash: &[u8], signature: &S) -> bool
where
    K: PrehashVerifier<S>,
{
    match key.verify_prehash(prehash, signature) {
        Ok(()) => true,
        Err(e) => {
            warn!("{e:?}");
            false
        }
    }
}

fn key_bytes<'k>(key: &'k SubjectPublicKeyInfo<'_>) -> Result<&'k [u8], ValidationError> {
    key.subject_public_key
        .as_bytes()
        .ok_or(ValidationError::InvalidInput(
            "Public key is not a whole number of bytes!".into(),
        ))
}

fn verify_ecdsa(
    digest_algorithm: &str,
    key: &SubjectPublicKeyInfo<'_>,
    signature: &[u8],
    signed_attributes: &[u8],
) -> Result<bool, ValidationError> {
    if key.algorithm.algorithm != oid::ID_EC_PUBLIC_KEY {
        return Err(ValidationError::Unsupported(format!(
            "Public key algorithm {} is unsupported!",
            key.algorithm.algorithm
        )));
    }
    let Some(AlgorithmParameters::NamedCurve(curve)) = &key.algorithm.parameters else {
        return Err(ValidationError::InvalidInput(
            "EC public key must name its curve!".into(),
        ));
    };
    let point = key_bytes(key)?;
    let prehash = hash(digest_algorithm, signed_attributes)?;

    match curve.as_str() {
        oid::SECP256R1 => {
            let verifying_key = p256::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map_err(|e| ValidationError::InvalidInput(format!("{e:?}")))?;
            let signature = p256::ecdsa::Signature::from_der(signature)
                .map_err(|e| ValidationError::InvalidInput(format!("{e:?}")))?;
            Ok(verify_prehash(&verifying_key, &prehash, &signature))
        }
        oid::SECP384R1 => {
            let verifying_key = p384::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map_err(|e| ValidationError::InvalidInput(format!("{e:?}")))?;
            let signature = p384::ecdsa::Signature::from_der(signature)
                .map_err(|e| ValidationError::InvalidInput(format!("{e:?}")))?;
            Ok(verify_prehash(&verifying_key, &prehash, &signature))
        }
        other => Err(ValidationError::Unsupported(format!(
            "Curve {other} is unsupported!"
        ))),
    }
}

fn verify_rsa<S: SignatureScheme>(
    scheme: S,
    digest_algorithm: &str,
    key: &SubjectPublicKeyInfo<'_>,
    signature: &[u8],
    signed_attributes: &[u8],
) -> Result<bool, ValidationError> {
    let key_algorithm = &key.algorithm.algorithm;
    if *key_algorithm != oid::RSA_ENCRYPTION && *key_algorithm != oid::RSASSA_PSS {
        return Err(ValidationError::Unsupported(format!(
            "Public key algorithm {key_algorithm} is unsupported!"
        )));
    }
    let public_key = RsaPublicKey::from_pkcs1_der(key_bytes(key)?)
        .map_err(|e| ValidationError::InvalidInput(format!("{e:?}")))?;
    let hashed = hash(digest_algorithm, signed_attributes)?;
    match public_key.verify(scheme, &hashed, signature) {
        Ok(()) => Ok(true),
        Err(e) => {
            warn!("{e:?}");
            Ok(false)
        }
    }
}

fn pkcs1v15(digest_algorithm: &str) -> Result<Pkcs1v15Sign, ValidationError> {
    match digest_algorithm {
        oid::ID_SHA224 => Ok(Pkcs1v15Sign::new::<Sha224>()),
        oid::ID_SHA256 => Ok(Pkcs1v15Sign::new::<Sha256>()),
        oid::ID_SHA384 => Ok(Pkcs1v15Sign::new::<Sha384>()),
        oid::ID_SHA512 => Ok(Pkcs1v15Sign::new::<Sha512>()),
        other => Err(unsupported_digest(other)),
    }
}

/// Digest used by MGF1, SHA-1 when the mask generation function is absent
fn mgf1_digest(parameters: &RsassaPssParameters<'_>) -> Result<ObjectIdentifier, ValidationError> {
    let Some(mask) = &parameters.mask_gen_algorithm else {
        return Ok(oid::ID_SHA1.parse()?);
    };
    if mask.algorithm != oid::ID_MGF1 {
        return Err(ValidationError::Unsupported(format!(
            "Mask generation function {} is unsupported!",
            mask.algorithm
        )));
    }
    match &mask.parameters {
        Some(AlgorithmParameters::Sequence(digest)) => {
            Ok(digest.decode_as::<AlgorithmIdentifier>()?.algorithm)
        }
        _ => Err(ValidationError::InvalidInput(
            "MGF1 must name its digest algorithm!".into(),
        )),
    }
}

fn verify_pss(
    algorithm: &AlgorithmIdentifier<'_>,
    key: &SubjectPublicKeyInfo<'_>,
    signature: &[u8],
    signed_attributes: &[u8],
) -> Result<bool, ValidationError> {
    let parameters = match &algorithm.parameters {
        Some(AlgorithmParameters::Sequence(parameters)) => {
            parameters.decode_as::<RsassaPssParameters>()?
        }
        None => RsassaPssParameters::default(),
        Some(_) => {
            return Err(ValidationError::InvalidInput(
                "RSASSA-PSS parameters must be a sequence!".into(),
            ))
        }
    };
    let digest_algorithm = parameters.digest_algorithm();
    if mgf1_digest(&parameters)? != digest_algorithm {
        return Err(ValidationError::Unsupported(
            "MGF1 digest differs from the message digest!".into(),
        ));
    }
    if parameters
        .trailer_field
        .is_some_and(|trailer| trailer != RsassaPssParameters::TRAILER_FIELD_BC)
    {
        return Err(ValidationError::InvalidInput(
            "RSASSA-PSS trailer field must be 1!".into(),
        ));
    }
    let salt_len = usize::try_from(parameters.salt_len())
        .map_err(|_| ValidationError::InvalidInput("Salt length is negative!".into()))?;
    let scheme = match digest_algorithm {
        oid::ID_SHA224 => Pss::new_with_salt::<Sha224>(salt_len),
        oid::ID_SHA256 => Pss::new_with_salt::<Sha256>(salt_len),
        oid::ID_SHA384 => Pss::new_with_salt::<Sha384>(salt_len),
        oid::ID_SHA512 => Pss::new_with_salt::<Sha512>(salt_len),
        other => return Err(unsupported_digest(other)),
    };
    verify_rsa(scheme, digest_algorithm, key, signature, signed_attributes)
}

impl CryptoProvider for RustCryptoProvider {
    type Error = ValidationError;

    fn digest(&self, algorithm: &ObjectIdentifier, data: &[u8]) -> Result<Vec<u8>, Self::Error> {
        hash(algorithm.as_str(), data)
    }

    fn verify_signature(
        &self,
        algorithm: &AlgorithmIdentifier<'_>,
        key: &SubjectPublicKeyInfo<'_>,
        signature: &[u8],
        signed_attributes: &[u8],
    ) -> Result<bool, Self::Error> {
        let ecdsa = |digest: &str| verify_ecdsa(digest, key, signature, signed_attributes);
        let rsa = |digest: &str| {
            verify_rsa(pkcs1v15(digest)?, digest, key, signature, signed_attributes)
        };
        match algorithm.algorithm.as_str() {
            oid::ECDSA_WITH_SHA256 => ecdsa(oid::ID_SHA256),
            oid::ECDSA_WITH_SHA384 => ecdsa(oid::ID_SHA384),
            oid::ECDSA_WITH_SHA512 => ecdsa(oid::ID_SHA512),
            oid::SHA224_WITH_RSA_ENCRYPTION => rsa(oid::ID_SHA224),
            oid::SHA256_WITH_RSA_ENCRYPTION => rsa(oid::ID_SHA256),
            oid::SHA384_WITH_RSA_ENCRYPTION => rsa(oid::ID_SHA384),
            oid::SHA512_WITH_RSA_ENCRYPTION => rsa(oid::ID_SHA512),
            oid::RSASSA_PSS => verify_pss(algorithm, key, signature, signed_attributes),
            other => Err(ValidationError::Unsupported(format!(
                "Signature algorithm {other} is unsupported!"
            ))),
        }
    }
}
