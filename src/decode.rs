use alloc::vec::Vec;
use core::fmt::{self, Debug, Display};

use nom::error::{ErrorKind, FromExternalError, ParseError};

use crate::{
    choice::{position, Choice},
    oid,
    primitive::{BitString, Null, ObjectIdentifier, Primitive, PrintableString, Time},
    schema::{decode_elements, decode_fields, Schema},
    tlv::{parse, read_node, Node, Tag},
    util::offset_within,
    AlgorithmIdentifier, AlgorithmParameters, Any, Attribute, AttributeSet, Certificate,
    ContentInfo, DataGroupHash, DataGroupNumber, EncapsulatedContentInfo, Extension,
    IssuerAndSerialNumber, LdsSecurityObject, LdsSecurityObjectVersion, LdsVersionInfo,
    RsassaPssParameters, SecurityObjectIdentifier, SignedData, SignerIdentifier, SignerInfo,
    Sod, SubjectPublicKeyInfo, TbsCertificate,
};

/// Returns the value of a decoding attempt
#[derive(Debug, PartialEq)]
pub struct Decoded<T: Debug + PartialEq> {
    /// indicates the number of bytes that were consumed by the decoder
    pub bytes_consumed: usize,
    /// the decoded return value
    pub decoded: T,
}

pub trait Decode<'s>: Sized + Debug + PartialEq {
    /// Decodes one DER value from the start of `input`.
    ///
    /// Bytes after the value are left untouched; `bytes_consumed` tells
    /// where it ended. Decoded values borrow from `input`.
    /// ### Usage
    /// ```rust
    /// # use icao_sod::*;
    /// let data: &'static [u8] = &[
    ///   0x30, 0x19, 0x02, 0x01, 0x00, 0x30, 0x0b, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7,
    ///   0x0d, 0x01, 0x01, 0x0b, 0x30, 0x07, 0x30, 0x05, 0x02, 0x01, 0x01, 0x04, 0x00,
    /// ];
    /// let result = LdsSecurityObject::decode(data).unwrap();
    /// assert_eq!(result.bytes_consumed, 27);
    /// assert_eq!(result.decoded.version, LdsSecurityObjectVersion::V0);
    /// assert_eq!(result.decoded.hash_algorithm.algorithm, "1.2.840.113549.1.1.11");
    /// ```
    fn decode<'input: 's, I: Into<&'input [u8]>>(
        input: I,
    ) -> Result<Decoded<Self>, DecodeError>;

    /// Decodes a DER value that spans the whole of `input`.
    fn from_der<'input: 's, I: Into<&'input [u8]>>(input: I) -> Result<Self, DecodeError> {
        let input = input.into();
        let Decoded {
            bytes_consumed,
            decoded,
        } = Self::decode(input)?;
        if bytes_consumed == input.len() {
            Ok(decoded)
        } else {
            Err(DecodeError::UnexpectedTrailingData {
                offset: bytes_consumed,
                remaining: input.len() - bytes_consumed,
            })
        }
    }
}

macro_rules! decode {
    ($typ:ident) => {
        impl<'s> Decode<'s> for $typ<'s> {
            fn decode<'input: 's, I: Into<&'input [u8]>>(
                input: I,
            ) -> Result<Decoded<Self>, DecodeError> {
                let (node, next) = read_node(input.into(), 0)?;
                Ok(Decoded {
                    bytes_consumed: next,
                    decoded: <Self as InternalDecode<'s>>::decode_tagged(node)?,
                })
            }
        }
    };
    ($typ:ty, owned) => {
        impl<'s> Decode<'s> for $typ {
            fn decode<'input: 's, I: Into<&'input [u8]>>(
                input: I,
            ) -> Result<Decoded<Self>, DecodeError> {
                let (node, next) = read_node(input.into(), 0)?;
                Ok(Decoded {
                    bytes_consumed: next,
                    decoded: <Self as InternalDecode<'s>>::decode_tagged(node)?,
                })
            }
        }
    };
}

decode!(LdsSecurityObject);
decode!(DataGroupHash);
decode!(AlgorithmIdentifier);
decode!(AlgorithmParameters);
decode!(RsassaPssParameters);
decode!(ContentInfo);
decode!(SignedData);
decode!(EncapsulatedContentInfo);
decode!(SignerInfo);
decode!(SignerIdentifier);
decode!(IssuerAndSerialNumber);
decode!(Attribute);
decode!(AttributeSet);
decode!(Certificate);
decode!(TbsCertificate);
decode!(SubjectPublicKeyInfo);
decode!(Extension);
decode!(Any);
decode!(LdsVersionInfo, owned);
decode!(SecurityObjectIdentifier, owned);
decode!(Time, owned);

#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// input ended before a declared length or inside a header
    TruncatedInput { offset: usize, needed: usize },
    /// malformed or indefinite length octets
    InvalidLength { offset: usize, reason: &'static str },
    InvalidTag {
        offset: usize,
        expected: &'static str,
        found: Option<Tag>,
    },
    /// a primitive value is not in DER canonical form
    InvalidEncoding { offset: usize, reason: &'static str },
    MissingRequiredField {
        offset: usize,
        field: &'static str,
        found: Option<Tag>,
    },
    UnexpectedTrailingData { offset: usize, remaining: usize },
    NoMatchingChoice {
        offset: usize,
        choice: &'static str,
        found: Tag,
    },
    UnexpectedContentType {
        offset: usize,
        expected: &'static str,
        found: ObjectIdentifier,
    },
}

impl DecodeError {
    /// Byte offset of the error in the decoded buffer
    #[must_use]
    pub fn offset(&self) -> usize {
        match self {
            Self::TruncatedInput { offset, .. }
            | Self::InvalidLength { offset, .. }
            | Self::InvalidTag { offset, .. }
            | Self::InvalidEncoding { offset, .. }
            | Self::MissingRequiredField { offset, .. }
            | Self::UnexpectedTrailingData { offset, .. }
            | Self::NoMatchingChoice { offset, .. }
            | Self::UnexpectedContentType { offset, .. } => *offset,
        }
    }

    /// Moves the error offset by `by` bytes, for errors raised on a sub-slice.
    #[must_use]
    pub fn shifted(mut self, by: usize) -> Self {
        match &mut self {
            Self::TruncatedInput { offset, .. }
            | Self::InvalidLength { offset, .. }
            | Self::InvalidTag { offset, .. }
            | Self::InvalidEncoding { offset, .. }
            | Self::MissingRequiredField { offset, .. }
            | Self::UnexpectedTrailingData { offset, .. }
            | Self::NoMatchingChoice { offset, .. }
            | Self::UnexpectedContentType { offset, .. } => *offset += by,
        }
        self
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedInput { offset, needed } => write!(
                f,
                "Unexpected end of input at byte {offset}: needs at least {needed} more bytes"
            ),
            Self::InvalidLength { offset, reason } => {
                write!(f, "Invalid length at byte {offset}: {reason}")
            }
            Self::InvalidTag {
                offset,
                expected,
                found: Some(found),
            } => write!(f, "Invalid tag at byte {offset}: expected {expected}, found {found}"),
            Self::InvalidTag {
                offset, expected, ..
            } => write!(f, "Invalid tag at byte {offset}: expected {expected}"),
            Self::InvalidEncoding { offset, reason } => {
                write!(f, "Invalid encoding at byte {offset}: {reason}")
            }
            Self::MissingRequiredField {
                offset,
                field,
                found: Some(found),
            } => write!(
                f,
                "Missing required field `{field}` at byte {offset}, found {found}"
            ),
            Self::MissingRequiredField { offset, field, .. } => {
                write!(f, "Missing required field `{field}` at byte {offset}")
            }
            Self::UnexpectedTrailingData { offset, remaining } => write!(
                f,
                "Unexpected trailing data at byte {offset}: {remaining} bytes left"
            ),
            Self::NoMatchingChoice {
                offset,
                choice,
                found,
            } => write!(
                f,
                "No alternative of {choice} matches {found} at byte {offset}"
            ),
            Self::UnexpectedContentType {
                offset,
                expected,
                found,
            } => write!(
                f,
                "Unexpected content type at byte {offset}: expected {expected}, found {found}"
            ),
        }
    }
}

impl core::error::Error for DecodeError {}

impl<I> ParseError<I> for DecodeError {
    fn from_error_kind(_: I, _: ErrorKind) -> Self {
        DecodeError::InvalidEncoding {
            offset: 0,
            reason: "malformed identifier or length octets",
        }
    }

    fn append(_: I, _: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<I, E> FromExternalError<I, E> for DecodeError {
    fn from_external_error(input: I, kind: ErrorKind, _: E) -> Self {
        Self::from_error_kind(input, kind)
    }
}

/// Decoding from a node whose header has already been read.
pub(crate) trait InternalDecode<'a>: Sized {
    const NAME: &'static str;

    fn accepts(tag: Tag) -> bool;

    /// Decodes `node`, assuming its tag was accepted.
    fn decode_node(node: Node<'a>) -> Result<Self, DecodeError>;

    fn decode_tagged(node: Node<'a>) -> Result<Self, DecodeError> {
        if Self::accepts(node.tag) {
            Self::decode_node(node)
        } else {
            Err(DecodeError::InvalidTag {
                offset: node.offset,
                expected: Self::NAME,
                found: Some(node.tag),
            })
        }
    }
}

macro_rules! primitive {
    ($($typ:ty => $name:expr),+) => {
        $(
            impl<'a> InternalDecode<'a> for $typ {
                const NAME: &'static str = $name;

                fn accepts(tag: Tag) -> bool {
                    tag == <$typ as Primitive<'a>>::TAG
                }

                fn decode_node(node: Node<'a>) -> Result<Self, DecodeError> {
                    <$typ as Primitive<'a>>::decode_value(node.value)
                        .map_err(|e| e.shifted(node.value_offset()))
                }
            }
        )+
    };
}

primitive!(
    bool => "BOOLEAN",
    Null => "NULL",
    u8 => "INTEGER",
    u32 => "INTEGER",
    i64 => "INTEGER",
    usize => "INTEGER",
    num::BigInt => "INTEGER",
    ObjectIdentifier => "OBJECT IDENTIFIER",
    BitString => "BIT STRING",
    PrintableString => "PrintableString",
    DataGroupNumber => "DataGroupNumber",
    LdsSecurityObjectVersion => "LDSSecurityObjectVersion"
);

impl<'a> InternalDecode<'a> for &'a [u8] {
    const NAME: &'static str = "OCTET STRING";

    fn accepts(tag: Tag) -> bool {
        tag == Tag::OCTET_STRING
    }

    fn decode_node(node: Node<'a>) -> Result<Self, DecodeError> {
        Ok(node.value)
    }
}

macro_rules! choice {
    ($typ:ty) => {
        impl<'a> InternalDecode<'a> for $typ {
            const NAME: &'static str = <$typ as Choice<'a>>::NAME;

            fn accepts(tag: Tag) -> bool {
                position(<$typ as Choice<'a>>::ALTERNATIVES, tag).is_some()
            }

            fn decode_node(node: Node<'a>) -> Result<Self, DecodeError> {
                <$typ as Choice<'a>>::resolve(node)
            }

            fn decode_tagged(node: Node<'a>) -> Result<Self, DecodeError> {
                <$typ as Choice<'a>>::resolve(node)
            }
        }
    };
}

choice!(Time);
choice!(SecurityObjectIdentifier);
choice!(AlgorithmParameters<'a>);
choice!(SignerIdentifier<'a>);

/// Wires a schema type to the descriptor engine.
macro_rules! sequence {
    ($typ:ty, |$fields:ident| $body:expr) => {
        impl<'a> InternalDecode<'a> for $typ {
            const NAME: &'static str = <$typ as Schema>::NAME;

            fn accepts(tag: Tag) -> bool {
                tag == <$typ as Schema>::TAG
            }

            fn decode_node(node: Node<'a>) -> Result<Self, DecodeError> {
                let $fields = decode_fields(&node, <$typ as Schema>::FIELDS)?;
                Ok($body)
            }
        }
    };
}

sequence!(LdsSecurityObject<'a>, |fields| Self {
    version: fields.required(0)?,
    hash_algorithm: fields.required(1)?,
    data_group_hash_values: fields.repeated(2)?,
    lds_version_info: fields.optional(3)?,
});

sequence!(DataGroupHash<'a>, |fields| Self {
    data_group_number: fields.required(0)?,
    data_group_hash_value: fields.required(1)?,
});

sequence!(LdsVersionInfo, |fields| Self {
    lds_version: fields.required(0)?,
    unicode_version: fields.required(1)?,
});

sequence!(AlgorithmIdentifier<'a>, |fields| Self {
    algorithm: fields.required(0)?,
    parameters: fields.optional(1)?,
});

sequence!(RsassaPssParameters<'a>, |fields| Self {
    hash_algorithm: fields.optional(0)?,
    mask_gen_algorithm: fields.optional(1)?,
    salt_length: fields.defaulted(2, &RsassaPssParameters::DEFAULT_SALT_LENGTH)?,
    trailer_field: fields.defaulted(3, &RsassaPssParameters::TRAILER_FIELD_BC)?,
});

sequence!(ContentInfo<'a>, |fields| Self {
    content_type: fields.required(0)?,
    content: fields.required(1)?,
});

sequence!(SignedData<'a>, |fields| Self {
    version: fields.required(0)?,
    digest_algorithms: fields.repeated(1)?,
    encap_content_info: fields.required(2)?,
    certificates: fields.optional_repeated(3)?,
    crls: fields.optional_repeated(4)?,
    signer_infos: fields.repeated(5)?,
});

sequence!(EncapsulatedContentInfo<'a>, |fields| Self {
    e_content_type: fields.required(0)?,
    e_content: fields.optional(1)?,
});

sequence!(SignerInfo<'a>, |fields| Self {
    version: fields.required(0)?,
    sid: fields.required(1)?,
    digest_algorithm: fields.required(2)?,
    signed_attrs: fields.optional(3)?,
    signature_algorithm: fields.required(4)?,
    signature: fields.required(5)?,
    unsigned_attrs: fields.optional(6)?,
});

sequence!(IssuerAndSerialNumber<'a>, |fields| Self {
    issuer: fields.required(0)?,
    serial_number: fields.required(1)?,
});

sequence!(Attribute<'a>, |fields| Self {
    attr_type: fields.required(0)?,
    attr_values: fields.repeated(1)?,
});

sequence!(Certificate<'a>, |fields| Self {
    tbs_certificate: fields.required(0)?,
    signature_algorithm: fields.required(1)?,
    signature_value: fields.required(2)?,
});

sequence!(TbsCertificate<'a>, |fields| Self {
    version: fields.defaulted(0, &0)?,
    serial_number: fields.required(1)?,
    signature: fields.required(2)?,
    issuer: fields.required(3)?,
    validity: fields.required(4)?,
    subject: fields.required(5)?,
    subject_public_key_info: fields.required(6)?,
    issuer_unique_id: fields.optional(7)?,
    subject_unique_id: fields.optional(8)?,
    extensions: fields.optional_repeated(9)?,
});

sequence!(SubjectPublicKeyInfo<'a>, |fields| Self {
    algorithm: fields.required(0)?,
    subject_public_key: fields.required(1)?,
});

sequence!(Extension<'a>, |fields| Self {
    extn_id: fields.required(0)?,
    critical: fields.defaulted(1, &false)?,
    extn_value: fields.required(2)?,
});

impl<'a> InternalDecode<'a> for AttributeSet<'a> {
    const NAME: &'static str = "AttributeSet";

    fn accepts(tag: Tag) -> bool {
        tag == Tag::SET
    }

    fn decode_node(node: Node<'a>) -> Result<Self, DecodeError> {
        decode_elements(node).map(AttributeSet)
    }
}

impl<'a> InternalDecode<'a> for Any<'a> {
    const NAME: &'static str = "ANY";

    fn accepts(_: Tag) -> bool {
        true
    }

    fn decode_node(node: Node<'a>) -> Result<Self, DecodeError> {
        Ok(Any::from_node(node))
    }
}

impl<'s> Decode<'s> for Sod<'s> {
    /// Decodes an EF.SOD file.
    ///
    /// Accepts the bare ContentInfo as well as the `[APPLICATION 23]` file
    /// wrapper. The LDS security object is decoded from the encapsulated
    /// content, with error offsets relative to `input`.
    fn decode<'input: 's, I: Into<&'input [u8]>>(
        input: I,
    ) -> Result<Decoded<Self>, DecodeError> {
        let input = input.into();
        let (node, next) = read_node(input, 0)?;
        let content_info = if node.tag == Sod::FILE_TAG {
            let mut children = node.children();
            let inner = children.next_node()?.ok_or(DecodeError::MissingRequiredField {
                offset: node.value_offset(),
                field: "ContentInfo",
                found: None,
            })?;
            if !children.is_empty() {
                return Err(DecodeError::UnexpectedTrailingData {
                    offset: children.offset(),
                    remaining: children.remaining(),
                });
            }
            inner
        } else {
            node
        };
        if content_info.tag != Tag::SEQUENCE {
            return Err(DecodeError::InvalidTag {
                offset: content_info.offset,
                expected: "ContentInfo",
                found: Some(content_info.tag),
            });
        }

        let fields = decode_fields(&content_info, ContentInfo::FIELDS)?;
        let content_type: ObjectIdentifier = fields.required(0)?;
        if content_type != oid::ID_SIGNED_DATA {
            return Err(DecodeError::UnexpectedContentType {
                offset: content_info.offset,
                expected: oid::ID_SIGNED_DATA,
                found: content_type,
            });
        }
        let signed_data: SignedData<'s> = fields.required(1)?;

        let encap = &signed_data.encap_content_info;
        if encap.e_content_type != oid::ID_LDS_SECURITY_OBJECT {
            return Err(DecodeError::UnexpectedContentType {
                offset: content_info.offset,
                expected: oid::ID_LDS_SECURITY_OBJECT,
                found: encap.e_content_type.clone(),
            });
        }
        let e_content = encap.e_content.ok_or(DecodeError::MissingRequiredField {
            offset: content_info.offset,
            field: "eContent",
            found: None,
        })?;
        let base = offset_within(input, e_content);
        let lds_security_object = parse(e_content)
            .and_then(LdsSecurityObject::decode_tagged)
            .map_err(|e| e.shifted(base))?;

        Ok(Decoded {
            bytes_consumed: next,
            decoded: Sod {
                signed_data,
                lds_security_object,
            },
        })
    }
}

/// Decodes every value of `values` as `T`, e.g. the values of an attribute.
pub(crate) fn decode_values<'a, T: InternalDecode<'a>>(
    values: &[Any<'a>],
) -> Result<Vec<T>, DecodeError> {
    values
        .iter()
        .map(|value| T::decode_tagged(value.node()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn decodes_lds_security_object() {
        let data = hex!("3019020100300b06092a864886f70d01010b300730050201010400");
        let decoded = LdsSecurityObject::from_der(&data[..]).unwrap();
        assert_eq!(decoded.version, LdsSecurityObjectVersion::V0);
        assert_eq!(decoded.hash_algorithm.algorithm, "1.2.840.113549.1.1.11");
        assert_eq!(decoded.hash_algorithm.parameters, None);
        assert_eq!(
            decoded.data_group_hash_values,
            alloc::vec![DataGroupHash {
                data_group_number: DataGroupNumber::DataGroup1,
                data_group_hash_value: &[],
            }]
        );
        assert_eq!(decoded.lds_version_info, None);
    }

    #[test]
    fn reports_consumed_bytes() {
        let data = hex!("3003020100ffff");
        let err = LdsSecurityObject::decode(&data[..]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MissingRequiredField {
                offset: 5,
                field: "hashAlgorithm",
                found: None
            }
        );

        let data = hex!("300d06092a864886f70d01010105000000");
        let decoded = AlgorithmIdentifier::decode(&data[..]).unwrap();
        assert_eq!(decoded.bytes_consumed, 15);
        assert_eq!(decoded.decoded.parameters, Some(AlgorithmParameters::Null));
        assert_eq!(
            AlgorithmIdentifier::from_der(&data[..]),
            Err(DecodeError::UnexpectedTrailingData {
                offset: 15,
                remaining: 2
            })
        );
    }

    #[test]
    fn rejects_unexpected_outer_tag() {
        let data = hex!("3103020100");
        assert_eq!(
            LdsSecurityObject::from_der(&data[..]),
            Err(DecodeError::InvalidTag {
                offset: 0,
                expected: "LDSSecurityObject",
                found: Some(Tag::SET)
            })
        );
    }

    #[test]
    fn rejects_unknown_data_group_number() {
        let data = hex!("3005020111 0400");
        assert_eq!(
            DataGroupHash::from_der(&data[..]),
            Err(DecodeError::InvalidEncoding {
                offset: 4,
                reason: "unknown data group number value"
            })
        );
    }

    #[test]
    fn decodes_algorithm_parameters() {
        let data = hex!("301306072a8648ce3d020106082a8648ce3d030107");
        let decoded = AlgorithmIdentifier::from_der(&data[..]).unwrap();
        assert_eq!(decoded.algorithm, oid::ID_EC_PUBLIC_KEY);
        assert_eq!(
            decoded.parameters,
            Some(AlgorithmParameters::NamedCurve(
                oid::SECP256R1.parse().unwrap()
            ))
        );

        let data = hex!("300e06092a864886f70d0101010101ff");
        assert_eq!(
            AlgorithmIdentifier::from_der(&data[..]),
            Err(DecodeError::NoMatchingChoice {
                offset: 13,
                choice: "parameters",
                found: Tag::BOOLEAN
            })
        );
        let data = hex!("300e 0609608648016503040201 020105");
        assert_eq!(
            AlgorithmIdentifier::from_der(&data[..]),
            Err(DecodeError::NoMatchingChoice {
                offset: 13,
                choice: "parameters",
                found: Tag::INTEGER
            })
        );
    }

    #[test]
    fn rejects_unmatched_signer_identifier() {
        // SignerInfo with an INTEGER where the sid CHOICE belongs
        let data = hex!("3006020101020101");
        assert_eq!(
            SignerInfo::from_der(&data[..]),
            Err(DecodeError::NoMatchingChoice {
                offset: 5,
                choice: "sid",
                found: Tag::INTEGER
            })
        );
    }

    #[test]
    fn displays_errors() {
        let err = DecodeError::TruncatedInput {
            offset: 3,
            needed: 2,
        };
        assert_eq!(
            alloc::format!("{err}"),
            "Unexpected end of input at byte 3: needs at least 2 more bytes"
        );
        assert_eq!(err.shifted(4).offset(), 7);
    }
}
