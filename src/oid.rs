//! Object identifiers used by EF.SOD, in dotted notation.

// CMS content types
pub const ID_DATA: &str = "1.2.840.113549.1.7.1";
pub const ID_SIGNED_DATA: &str = "1.2.840.113549.1.7.2";
/// ICAO 9303 LDS security object content type
pub const ID_LDS_SECURITY_OBJECT: &str = "2.23.136.1.1.1";

// CMS attributes
pub const ID_CONTENT_TYPE: &str = "1.2.840.113549.1.9.3";
pub const ID_MESSAGE_DIGEST: &str = "1.2.840.113549.1.9.4";
pub const ID_SIGNING_TIME: &str = "1.2.840.113549.1.9.5";

// Digests
pub const ID_SHA1: &str = "1.3.14.3.2.26";
pub const ID_SHA224: &str = "2.16.840.1.101.3.4.2.4";
pub const ID_SHA256: &str = "2.16.840.1.101.3.4.2.1";
pub const ID_SHA384: &str = "2.16.840.1.101.3.4.2.2";
pub const ID_SHA512: &str = "2.16.840.1.101.3.4.2.3";

// Signatures
pub const SHA224_WITH_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.14";
pub const SHA256_WITH_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.11";
pub const SHA384_WITH_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.12";
pub const SHA512_WITH_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.13";
pub const RSASSA_PSS: &str = "1.2.840.113549.1.1.10";
pub const ID_MGF1: &str = "1.2.840.113549.1.1.8";
pub const ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";
pub const ECDSA_WITH_SHA384: &str = "1.2.840.10045.4.3.3";
pub const ECDSA_WITH_SHA512: &str = "1.2.840.10045.4.3.4";

// Keys
pub const RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
pub const ID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
pub const SECP256R1: &str = "1.2.840.10045.3.1.7";
pub const SECP384R1: &str = "1.3.132.0.34";

/// X.509 subject key identifier extension
pub const ID_CE_SUBJECT_KEY_IDENTIFIER: &str = "2.5.29.14";
