#![doc = include_str!("../README.md")]
#![cfg(not(doctest))]
#![cfg_attr(all(not(test), not(feature = "validate")), no_std)]
extern crate alloc;

use alloc::vec::Vec;

use num::BigInt;
#[cfg(feature = "json")]
use serde::Serialize;

mod choice;
mod decode;
mod encode;
pub mod oid;
mod primitive;
mod provider;
mod schema;
pub mod tlv;
pub(crate) mod util;
#[cfg(feature = "validate")]
mod validate;

pub use choice::{Alternative, Choice};
pub use decode::{Decode, DecodeError, Decoded};
pub use encode::{Encode, EncodeError, Encoder};
pub use primitive::{
    BitString, DateTime, Null, ObjectIdentifier, Primitive, PrintableString, Time,
};
pub use provider::CryptoProvider;
pub use schema::{Expect, Field, FieldEncoder, Repeat, Schema, Tagging};
pub use tlv::{Class, Node, Tag};
#[cfg(feature = "validate")]
pub use validate::{
    passive_authentication, verify_data_group, RustCryptoProvider, Validate, ValidationError,
    ValidationResult,
};

use decode::{decode_values, InternalDecode};

/// CMS syntax version number
pub type CmsVersion = i64;

// =====================================================
// LDS security object (ICAO 9303-10)
// =====================================================

/// Number of an eMRTD data group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub enum DataGroupNumber {
    /// machine readable zone
    DataGroup1 = 1,
    /// encoded face
    DataGroup2 = 2,
    /// encoded fingers
    DataGroup3 = 3,
    /// encoded irises
    DataGroup4 = 4,
    DataGroup5 = 5,
    DataGroup6 = 6,
    DataGroup7 = 7,
    DataGroup8 = 8,
    DataGroup9 = 9,
    DataGroup10 = 10,
    DataGroup11 = 11,
    DataGroup12 = 12,
    DataGroup13 = 13,
    /// security options for secondary biometrics and chip authentication
    DataGroup14 = 14,
    DataGroup15 = 15,
    DataGroup16 = 16,
}

impl TryFrom<i128> for DataGroupNumber {
    type Error = i128;

    fn try_from(value: i128) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::DataGroup1,
            2 => Self::DataGroup2,
            3 => Self::DataGroup3,
            4 => Self::DataGroup4,
            5 => Self::DataGroup5,
            6 => Self::DataGroup6,
            7 => Self::DataGroup7,
            8 => Self::DataGroup8,
            9 => Self::DataGroup9,
            10 => Self::DataGroup10,
            11 => Self::DataGroup11,
            12 => Self::DataGroup12,
            13 => Self::DataGroup13,
            14 => Self::DataGroup14,
            15 => Self::DataGroup15,
            16 => Self::DataGroup16,
            other => return Err(other),
        })
    }
}

impl DataGroupNumber {
    #[must_use]
    pub fn number(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub enum LdsSecurityObjectVersion {
    /// no `ldsVersionInfo`
    V0 = 0,
    /// `ldsVersionInfo` present
    V1 = 1,
}

impl TryFrom<i128> for LdsSecurityObjectVersion {
    type Error = i128;

    fn try_from(value: i128) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::V0),
            1 => Ok(Self::V1),
            other => Err(other),
        }
    }
}

/// ```asn
/// DataGroupHash ::= SEQUENCE {
///     dataGroupNumber     DataGroupNumber,
///     dataGroupHashValue  OCTET STRING }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct DataGroupHash<'a> {
    pub data_group_number: DataGroupNumber,
    /// Not checked against the hash algorithm while decoding
    pub data_group_hash_value: &'a [u8],
}

impl Schema for DataGroupHash<'_> {
    const NAME: &'static str = "DataGroupHash";
    const FIELDS: &'static [Field] = &[
        Field::new("dataGroupNumber", Tag::INTEGER),
        Field::new("dataGroupHashValue", Tag::OCTET_STRING),
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct LdsVersionInfo {
    /// e.g. "0108"
    pub lds_version: PrintableString,
    /// e.g. "040000"
    pub unicode_version: PrintableString,
}

impl Schema for LdsVersionInfo {
    const NAME: &'static str = "LDSVersionInfo";
    const FIELDS: &'static [Field] = &[
        Field::new("ldsVersion", Tag::PRINTABLE_STRING),
        Field::new("unicodeVersion", Tag::PRINTABLE_STRING),
    ];
}

/// ```asn
/// LDSSecurityObject ::= SEQUENCE {
///     version                LDSSecurityObjectVersion,
///     hashAlgorithm          DigestAlgorithmIdentifier,
///     dataGroupHashValues    SEQUENCE SIZE (2..ub-DataGroups) OF DataGroupHash,
///     ldsVersionInfo         LDSVersionInfo OPTIONAL }
/// ```
/// The size constraint on `dataGroupHashValues` is left to validation, so
/// objects with fewer hashes still decode. Wire order of the hashes is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct LdsSecurityObject<'a> {
    pub version: LdsSecurityObjectVersion,
    pub hash_algorithm: AlgorithmIdentifier<'a>,
    pub data_group_hash_values: Vec<DataGroupHash<'a>>,
    pub lds_version_info: Option<LdsVersionInfo>,
}

impl Schema for LdsSecurityObject<'_> {
    const NAME: &'static str = "LDSSecurityObject";
    const FIELDS: &'static [Field] = &[
        Field::new("version", Tag::INTEGER),
        Field::new("hashAlgorithm", Tag::SEQUENCE),
        Field::new("dataGroupHashValues", Tag::SEQUENCE).sequence_of(),
        Field::new("ldsVersionInfo", Tag::SEQUENCE).optional(),
    ];
}

impl<'a> LdsSecurityObject<'a> {
    /// Returns the stored hash of the data group `number`, if any.
    #[must_use]
    pub fn data_group_hash(&self, number: DataGroupNumber) -> Option<&DataGroupHash<'a>> {
        self.data_group_hash_values
            .iter()
            .find(|hash| hash.data_group_number == number)
    }
}

// =====================================================
// Algorithm identifiers
// =====================================================

/// ```asn
/// AlgorithmIdentifier ::= SEQUENCE {
///     algorithm   OBJECT IDENTIFIER,
///     parameters  ANY DEFINED BY algorithm OPTIONAL }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct AlgorithmIdentifier<'a> {
    pub algorithm: ObjectIdentifier,
    pub parameters: Option<AlgorithmParameters<'a>>,
}

impl AlgorithmIdentifier<'_> {
    /// Identifier without parameters
    pub fn new(algorithm: &str) -> Result<Self, EncodeError> {
        Ok(Self {
            algorithm: algorithm.parse()?,
            parameters: None,
        })
    }

    /// Identifier with explicit NULL parameters, as used by most digests
    pub fn with_null_parameters(algorithm: &str) -> Result<Self, EncodeError> {
        Ok(Self {
            algorithm: algorithm.parse()?,
            parameters: Some(AlgorithmParameters::Null),
        })
    }
}

impl Schema for AlgorithmIdentifier<'_> {
    const NAME: &'static str = "AlgorithmIdentifier";
    const FIELDS: &'static [Field] = &[
        Field::new("algorithm", Tag::OBJECT_IDENTIFIER),
        Field::choice("parameters", ALGORITHM_PARAMETERS).optional(),
    ];
}

/// Parameters of an [`AlgorithmIdentifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub enum AlgorithmParameters<'a> {
    Null,
    /// curve of an `id-ecPublicKey` key
    NamedCurve(ObjectIdentifier),
    /// algorithm specific structure, e.g. RSASSA-PSS parameters
    Sequence(Any<'a>),
}

const ALGORITHM_PARAMETERS: &[Alternative] = &[
    Alternative::new("null", Tag::NULL),
    Alternative::new("namedCurve", Tag::OBJECT_IDENTIFIER),
    Alternative::new("sequence", Tag::SEQUENCE),
];

impl<'a> Choice<'a> for AlgorithmParameters<'a> {
    const NAME: &'static str = "AlgorithmParameters";
    const ALTERNATIVES: &'static [Alternative] = ALGORITHM_PARAMETERS;

    fn decode_alternative(index: usize, node: Node<'a>) -> Result<Self, DecodeError> {
        match index {
            0 => Null::decode_node(node).map(|_| AlgorithmParameters::Null),
            1 => ObjectIdentifier::decode_node(node).map(AlgorithmParameters::NamedCurve),
            _ => Ok(AlgorithmParameters::Sequence(Any::from_node(node))),
        }
    }
}

/// ```asn
/// RSASSA-PSS-params ::= SEQUENCE {
///     hashAlgorithm      [0] HashAlgorithm      DEFAULT sha1,
///     maskGenAlgorithm   [1] MaskGenAlgorithm   DEFAULT mgf1SHA1,
///     saltLength         [2] INTEGER            DEFAULT 20,
///     trailerField       [3] TrailerField       DEFAULT trailerFieldBC }
/// ```
/// Found in the [`AlgorithmParameters::Sequence`] of an RSASSA-PSS identifier.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct RsassaPssParameters<'a> {
    pub hash_algorithm: Option<AlgorithmIdentifier<'a>>,
    pub mask_gen_algorithm: Option<AlgorithmIdentifier<'a>>,
    pub salt_length: Option<i64>,
    pub trailer_field: Option<i64>,
}

impl Schema for RsassaPssParameters<'_> {
    const NAME: &'static str = "RSASSA-PSS-params";
    const FIELDS: &'static [Field] = &[
        Field::new("hashAlgorithm", Tag::SEQUENCE).explicit(0).optional(),
        Field::new("maskGenAlgorithm", Tag::SEQUENCE)
            .explicit(1)
            .optional(),
        Field::new("saltLength", Tag::INTEGER).explicit(2).optional(),
        Field::new("trailerField", Tag::INTEGER).explicit(3).optional(),
    ];
}

impl RsassaPssParameters<'_> {
    pub const DEFAULT_SALT_LENGTH: i64 = 20;
    pub const TRAILER_FIELD_BC: i64 = 1;

    /// Digest of the message, SHA-1 when absent
    #[must_use]
    pub fn digest_algorithm(&self) -> &str {
        self.hash_algorithm
            .as_ref()
            .map_or(oid::ID_SHA1, |algorithm| algorithm.algorithm.as_str())
    }

    #[must_use]
    pub fn salt_len(&self) -> i64 {
        self.salt_length.unwrap_or(Self::DEFAULT_SALT_LENGTH)
    }
}

// =====================================================
// CMS (RFC 5652)
// =====================================================

/// ```asn
/// ContentInfo ::= SEQUENCE {
///     contentType ContentType,
///     content     [0] EXPLICIT ANY DEFINED BY contentType }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct ContentInfo<'a> {
    pub content_type: ObjectIdentifier,
    pub content: Any<'a>,
}

impl Schema for ContentInfo<'_> {
    const NAME: &'static str = "ContentInfo";
    const FIELDS: &'static [Field] = &[
        Field::new("contentType", Tag::OBJECT_IDENTIFIER),
        Field::any("content").explicit(0),
    ];
}

/// ```asn
/// SignedData ::= SEQUENCE {
///     version             CMSVersion,
///     digestAlgorithms    DigestAlgorithmIdentifiers,
///     encapContentInfo    EncapsulatedContentInfo,
///     certificates        [0] IMPLICIT CertificateSet OPTIONAL,
///     crls                [1] IMPLICIT RevocationInfoChoices OPTIONAL,
///     signerInfos         SignerInfos }
/// ```
/// Certificates and revocation information are carried as opaque TLVs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct SignedData<'a> {
    pub version: CmsVersion,
    pub digest_algorithms: Vec<AlgorithmIdentifier<'a>>,
    pub encap_content_info: EncapsulatedContentInfo<'a>,
    pub certificates: Option<Vec<Any<'a>>>,
    pub crls: Option<Vec<Any<'a>>>,
    pub signer_infos: Vec<SignerInfo<'a>>,
}

impl Schema for SignedData<'_> {
    const NAME: &'static str = "SignedData";
    const FIELDS: &'static [Field] = &[
        Field::new("version", Tag::INTEGER),
        Field::new("digestAlgorithms", Tag::SEQUENCE).set_of(),
        Field::new("encapContentInfo", Tag::SEQUENCE),
        Field::any("certificates").set_of().implicit(0).optional(),
        Field::any("crls").set_of().implicit(1).optional(),
        Field::new("signerInfos", Tag::SEQUENCE).set_of(),
    ];
}

impl<'a> SignedData<'a> {
    /// Decodes the embedded certificates that are X.509 certificates.
    pub fn decoded_certificates(&self) -> Result<Vec<Certificate<'a>>, DecodeError> {
        let certificates = self.certificates.as_deref().unwrap_or_default();
        certificates
            .iter()
            .filter(|certificate| certificate.tag == Tag::SEQUENCE)
            .map(|certificate| Certificate::decode_tagged(certificate.node()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct EncapsulatedContentInfo<'a> {
    pub e_content_type: ObjectIdentifier,
    /// `[0] EXPLICIT OCTET STRING`, the DER encoded LDS security object for EF.SOD
    pub e_content: Option<&'a [u8]>,
}

impl Schema for EncapsulatedContentInfo<'_> {
    const NAME: &'static str = "EncapsulatedContentInfo";
    const FIELDS: &'static [Field] = &[
        Field::new("eContentType", Tag::OBJECT_IDENTIFIER),
        Field::new("eContent", Tag::OCTET_STRING).explicit(0).optional(),
    ];
}

/// ```asn
/// SignerInfo ::= SEQUENCE {
///     version             CMSVersion,
///     sid                 SignerIdentifier,
///     digestAlgorithm     DigestAlgorithmIdentifier,
///     signedAttrs         [0] IMPLICIT SignedAttributes OPTIONAL,
///     signatureAlgorithm  SignatureAlgorithmIdentifier,
///     signature           SignatureValue,
///     unsignedAttrs       [1] IMPLICIT UnsignedAttributes OPTIONAL }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct SignerInfo<'a> {
    pub version: CmsVersion,
    pub sid: SignerIdentifier<'a>,
    pub digest_algorithm: AlgorithmIdentifier<'a>,
    pub signed_attrs: Option<AttributeSet<'a>>,
    pub signature_algorithm: AlgorithmIdentifier<'a>,
    pub signature: &'a [u8],
    pub unsigned_attrs: Option<AttributeSet<'a>>,
}

impl Schema for SignerInfo<'_> {
    const NAME: &'static str = "SignerInfo";
    const FIELDS: &'static [Field] = &[
        Field::new("version", Tag::INTEGER),
        Field::choice("sid", SIGNER_IDENTIFIER),
        Field::new("digestAlgorithm", Tag::SEQUENCE),
        Field::new("signedAttrs", Tag::SET).implicit(0).optional(),
        Field::new("signatureAlgorithm", Tag::SEQUENCE),
        Field::new("signature", Tag::OCTET_STRING),
        Field::new("unsignedAttrs", Tag::SET).implicit(1).optional(),
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub enum SignerIdentifier<'a> {
    IssuerAndSerialNumber(IssuerAndSerialNumber<'a>),
    /// `[0] IMPLICIT SubjectKeyIdentifier`
    SubjectKeyIdentifier(&'a [u8]),
}

const SIGNER_IDENTIFIER: &[Alternative] = &[
    Alternative::new("issuerAndSerialNumber", Tag::SEQUENCE),
    Alternative::new("subjectKeyIdentifier", Tag::OCTET_STRING.implicit(0)),
];

impl<'a> Choice<'a> for SignerIdentifier<'a> {
    const NAME: &'static str = "SignerIdentifier";
    const ALTERNATIVES: &'static [Alternative] = SIGNER_IDENTIFIER;

    fn decode_alternative(index: usize, node: Node<'a>) -> Result<Self, DecodeError> {
        match index {
            0 => IssuerAndSerialNumber::decode_node(node)
                .map(SignerIdentifier::IssuerAndSerialNumber),
            _ => Ok(SignerIdentifier::SubjectKeyIdentifier(node.value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct IssuerAndSerialNumber<'a> {
    /// X.501 `Name` of the certificate issuer
    pub issuer: Any<'a>,
    pub serial_number: BigInt,
}

impl Schema for IssuerAndSerialNumber<'_> {
    const NAME: &'static str = "IssuerAndSerialNumber";
    const FIELDS: &'static [Field] = &[
        Field::new("issuer", Tag::SEQUENCE),
        Field::new("serialNumber", Tag::INTEGER),
    ];
}

/// ```asn
/// Attribute ::= SEQUENCE {
///     attrType    OBJECT IDENTIFIER,
///     attrValues  SET OF AttributeValue }
/// ```
/// Values stay pre-encoded and are decoded on demand by the accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct Attribute<'a> {
    pub attr_type: ObjectIdentifier,
    pub attr_values: Vec<Any<'a>>,
}

impl Schema for Attribute<'_> {
    const NAME: &'static str = "Attribute";
    const FIELDS: &'static [Field] = &[
        Field::new("attrType", Tag::OBJECT_IDENTIFIER),
        Field::any("attrValues").set_of(),
    ];
}

impl<'a> Attribute<'a> {
    pub fn new(attr_type: &str, attr_values: Vec<Any<'a>>) -> Result<Self, EncodeError> {
        Ok(Self {
            attr_type: attr_type.parse()?,
            attr_values,
        })
    }

    fn single<T: InternalDecode<'a>>(&self) -> Result<T, DecodeError> {
        match decode_values(&self.attr_values)?.pop() {
            Some(value) if self.attr_values.len() == 1 => Ok(value),
            _ => Err(DecodeError::InvalidEncoding {
                offset: self.attr_values.first().map_or(0, Any::offset),
                reason: "attribute must hold exactly one value",
            }),
        }
    }

    /// Decodes the value of a contentType attribute.
    pub fn content_type(&self) -> Result<ObjectIdentifier, DecodeError> {
        self.single::<SecurityObjectIdentifier>()
            .map(|SecurityObjectIdentifier::ObjectIdentifier(oid)| oid)
    }

    /// Decodes the value of a messageDigest attribute.
    pub fn message_digest(&self) -> Result<&'a [u8], DecodeError> {
        self.single()
    }

    /// Decodes the value of a signingTime attribute.
    pub fn signing_time(&self) -> Result<Time, DecodeError> {
        self.single()
    }
}

/// ```asn
/// AttributeSet ::= SET OF Attribute
/// ```
/// Decoding keeps the wire order. Encoding always emits DER order, so the
/// encoding of signed attributes is the signature input regardless of the
/// order the attributes were added in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct AttributeSet<'a>(pub Vec<Attribute<'a>>);

impl<'a> AttributeSet<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, attribute: Attribute<'a>) {
        self.0.push(attribute);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn find(&self, attr_type: &str) -> Option<&Attribute<'a>> {
        self.0.iter().find(|attribute| attribute.attr_type == attr_type)
    }

    /// Number of attributes of type `attr_type`
    #[must_use]
    pub fn count(&self, attr_type: &str) -> usize {
        self.0
            .iter()
            .filter(|attribute| attribute.attr_type == attr_type)
            .count()
    }

    pub fn content_type(&self) -> Result<Option<ObjectIdentifier>, DecodeError> {
        self.find(oid::ID_CONTENT_TYPE)
            .map(Attribute::content_type)
            .transpose()
    }

    pub fn message_digest(&self) -> Result<Option<&'a [u8]>, DecodeError> {
        self.find(oid::ID_MESSAGE_DIGEST)
            .map(Attribute::message_digest)
            .transpose()
    }

    pub fn signing_time(&self) -> Result<Option<Time>, DecodeError> {
        self.find(oid::ID_SIGNING_TIME)
            .map(Attribute::signing_time)
            .transpose()
    }

    /// DER encoding of the set under the universal SET tag, which is what
    /// the signature of a `SignerInfo` covers.
    pub fn to_signed_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        self.encode_to_vec()
    }
}

impl<'a> FromIterator<Attribute<'a>> for AttributeSet<'a> {
    fn from_iter<T: IntoIterator<Item = Attribute<'a>>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The content type OID wrapper used as the value of a contentType
/// attribute in EF.SOD
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub enum SecurityObjectIdentifier {
    ObjectIdentifier(ObjectIdentifier),
}

const SECURITY_OBJECT_IDENTIFIER: &[Alternative] =
    &[Alternative::new("value", Tag::OBJECT_IDENTIFIER)];

impl<'a> Choice<'a> for SecurityObjectIdentifier {
    const NAME: &'static str = "SecurityObjectIdentifier";
    const ALTERNATIVES: &'static [Alternative] = SECURITY_OBJECT_IDENTIFIER;

    fn decode_alternative(_: usize, node: Node<'a>) -> Result<Self, DecodeError> {
        ObjectIdentifier::decode_node(node).map(SecurityObjectIdentifier::ObjectIdentifier)
    }
}

// =====================================================
// X.509 (RFC 5280), only as far as needed to find the signer key
// =====================================================

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct Certificate<'a> {
    pub tbs_certificate: TbsCertificate<'a>,
    pub signature_algorithm: AlgorithmIdentifier<'a>,
    pub signature_value: BitString,
}

impl Schema for Certificate<'_> {
    const NAME: &'static str = "Certificate";
    const FIELDS: &'static [Field] = &[
        Field::new("tbsCertificate", Tag::SEQUENCE),
        Field::new("signatureAlgorithm", Tag::SEQUENCE),
        Field::new("signatureValue", Tag::BIT_STRING),
    ];
}

/// ```asn
/// TBSCertificate ::= SEQUENCE {
///     version         [0] EXPLICIT Version DEFAULT v1,
///     serialNumber         CertificateSerialNumber,
///     signature            AlgorithmIdentifier,
///     issuer               Name,
///     validity             Validity,
///     subject              Name,
///     subjectPublicKeyInfo SubjectPublicKeyInfo,
///     issuerUniqueID  [1] IMPLICIT UniqueIdentifier OPTIONAL,
///     subjectUniqueID [2] IMPLICIT UniqueIdentifier OPTIONAL,
///     extensions      [3] EXPLICIT Extensions OPTIONAL }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct TbsCertificate<'a> {
    pub version: Option<i64>,
    pub serial_number: BigInt,
    pub signature: AlgorithmIdentifier<'a>,
    pub issuer: Any<'a>,
    pub validity: Any<'a>,
    pub subject: Any<'a>,
    pub subject_public_key_info: SubjectPublicKeyInfo<'a>,
    pub issuer_unique_id: Option<BitString>,
    pub subject_unique_id: Option<BitString>,
    pub extensions: Option<Vec<Extension<'a>>>,
}

impl Schema for TbsCertificate<'_> {
    const NAME: &'static str = "TBSCertificate";
    const FIELDS: &'static [Field] = &[
        Field::new("version", Tag::INTEGER).explicit(0).optional(),
        Field::new("serialNumber", Tag::INTEGER),
        Field::new("signature", Tag::SEQUENCE),
        Field::new("issuer", Tag::SEQUENCE),
        Field::new("validity", Tag::SEQUENCE),
        Field::new("subject", Tag::SEQUENCE),
        Field::new("subjectPublicKeyInfo", Tag::SEQUENCE),
        Field::new("issuerUniqueID", Tag::BIT_STRING)
            .implicit(1)
            .optional(),
        Field::new("subjectUniqueID", Tag::BIT_STRING)
            .implicit(2)
            .optional(),
        Field::new("extensions", Tag::SEQUENCE)
            .sequence_of()
            .explicit(3)
            .optional(),
    ];
}

impl<'a> TbsCertificate<'a> {
    /// Key identifier from the subject key identifier extension
    pub fn subject_key_identifier(&self) -> Result<Option<&'a [u8]>, DecodeError> {
        let extensions = self.extensions.as_deref().unwrap_or_default();
        extensions
            .iter()
            .find(|extension| extension.extn_id == oid::ID_CE_SUBJECT_KEY_IDENTIFIER)
            .map(|extension| {
                tlv::parse(extension.extn_value).and_then(<&'a [u8]>::decode_tagged)
            })
            .transpose()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct SubjectPublicKeyInfo<'a> {
    pub algorithm: AlgorithmIdentifier<'a>,
    pub subject_public_key: BitString,
}

impl Schema for SubjectPublicKeyInfo<'_> {
    const NAME: &'static str = "SubjectPublicKeyInfo";
    const FIELDS: &'static [Field] = &[
        Field::new("algorithm", Tag::SEQUENCE),
        Field::new("subjectPublicKey", Tag::BIT_STRING),
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct Extension<'a> {
    pub extn_id: ObjectIdentifier,
    /// absent means the DEFAULT of `false`
    pub critical: Option<bool>,
    pub extn_value: &'a [u8],
}

impl Schema for Extension<'_> {
    const NAME: &'static str = "Extension";
    const FIELDS: &'static [Field] = &[
        Field::new("extnID", Tag::OBJECT_IDENTIFIER),
        Field::new("critical", Tag::BOOLEAN).optional(),
        Field::new("extnValue", Tag::OCTET_STRING),
    ];
}

// =====================================================
// Opaque values
// =====================================================

/// A TLV kept as read, for ANY fields and pre-encoded attribute values.
///
/// Build one from DER with [`Decode::from_der`]; the value can later be
/// decoded as a typed value with [`Any::decode_as`].
///
/// Two values are equal when their TLVs are, wherever they were read from.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct Any<'a> {
    pub tag: Tag,
    pub value: &'a [u8],
    #[cfg_attr(feature = "json", serde(skip))]
    raw: &'a [u8],
    #[cfg_attr(feature = "json", serde(skip))]
    offset: usize,
}

impl PartialEq for Any<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Any<'_> {}

impl<'a> Any<'a> {
    pub(crate) fn from_node(node: Node<'a>) -> Self {
        Self {
            tag: node.tag,
            value: node.value,
            raw: node.raw,
            offset: node.offset,
        }
    }

    pub(crate) fn node(&self) -> Node<'a> {
        Node {
            tag: self.tag,
            offset: self.offset,
            header_len: self.raw.len() - self.value.len(),
            value: self.value,
            raw: self.raw,
        }
    }

    /// Byte offset of the TLV in the buffer it was decoded from
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The complete TLV
    #[must_use]
    pub fn as_der(&self) -> &'a [u8] {
        self.raw
    }

    /// Decodes the TLV as `T`. Error offsets are relative to the TLV.
    pub fn decode_as<T: Decode<'a>>(&self) -> Result<T, DecodeError> {
        T::from_der(self.raw)
    }
}

// =====================================================
// EF.SOD
// =====================================================

/// The EF.SOD file: a CMS SignedData whose encapsulated content is an
/// [`LdsSecurityObject`].
///
/// `lds_security_object` is decoded from `signed_data.encap_content_info`.
/// Encoding only uses `signed_data`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct Sod<'a> {
    pub signed_data: SignedData<'a>,
    pub lds_security_object: LdsSecurityObject<'a>,
}

impl<'a> Sod<'a> {
    /// `[APPLICATION 23]`, the tag of the EF.SOD file
    pub const FILE_TAG: Tag = Tag::application(23, true);

    /// The first signer. EF.SOD carries exactly one.
    #[must_use]
    pub fn signer_info(&self) -> Option<&SignerInfo<'a>> {
        self.signed_data.signer_infos.first()
    }

    /// The DER encoded LDS security object that was signed
    #[must_use]
    pub fn encapsulated_content(&self) -> Option<&'a [u8]> {
        self.signed_data.encap_content_info.e_content
    }

    #[must_use]
    pub fn data_group_hash(&self, number: DataGroupNumber) -> Option<&DataGroupHash<'a>> {
        self.lds_security_object.data_group_hash(number)
    }

    /// Finds the embedded certificate that the signer identifier points to.
    pub fn signer_certificate(&self) -> Result<Option<Certificate<'a>>, DecodeError> {
        let Some(signer) = self.signer_info() else {
            return Ok(None);
        };
        for certificate in self.signed_data.decoded_certificates()? {
            let matches = match &signer.sid {
                SignerIdentifier::IssuerAndSerialNumber(id) => {
                    let tbs = &certificate.tbs_certificate;
                    tbs.issuer.tag == id.issuer.tag
                        && tbs.issuer.value == id.issuer.value
                        && tbs.serial_number == id.serial_number
                }
                SignerIdentifier::SubjectKeyIdentifier(key_id) => {
                    certificate.tbs_certificate.subject_key_identifier()? == Some(*key_id)
                }
            };
            if matches {
                return Ok(Some(certificate));
            }
        }
        Ok(None)
    }

    /// Encodes the complete file including the `[APPLICATION 23]` wrapper.
    pub fn encode_ef_sod(&self) -> Result<Vec<u8>, EncodeError> {
        let mut encoder = Encoder::new();
        encoder.constructed(Self::FILE_TAG, |inner| self.encode(inner))?;
        Ok(encoder.into())
    }
}
