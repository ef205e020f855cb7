use alloc::{string::String, vec::Vec};
use core::fmt::{self, Display};

use num::BigInt;
#[cfg(feature = "json")]
use serde::Serialize;
use tracing::trace;

use crate::{
    oid,
    primitive::{BitString, Null, ObjectIdentifier, Primitive, PrintableString, Time},
    schema::{canonical_order, FieldEncoder, Schema},
    tlv::{parse, write_identifier, write_length, Tag},
    AlgorithmIdentifier, AlgorithmParameters, Any, Attribute, AttributeSet, Certificate,
    ContentInfo, DataGroupHash, DataGroupNumber, EncapsulatedContentInfo, Extension,
    IssuerAndSerialNumber, LdsSecurityObject, LdsSecurityObjectVersion, LdsVersionInfo,
    RsassaPssParameters, SecurityObjectIdentifier, SignedData, SignerIdentifier, SignerInfo,
    Sod, SubjectPublicKeyInfo, TbsCertificate,
};

#[derive(Debug, Clone, PartialEq)]
pub enum EncodeError {
    Unsupported(String),
    Common(String),
    /// a value cannot be represented in DER
    InvalidValue(String),
    /// a non-optional field had no value
    MissingRequiredField(String),
    #[cfg(feature = "json")]
    Json(String),
}

impl EncodeError {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Unsupported(message)
            | Self::Common(message)
            | Self::InvalidValue(message)
            | Self::MissingRequiredField(message) => message,
            #[cfg(feature = "json")]
            Self::Json(message) => message,
        }
    }
}

impl Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRequiredField(field) => write!(f, "Missing required field `{field}`"),
            other => f.write_str(other.message()),
        }
    }
}

impl core::error::Error for EncodeError {}

/// DER output buffer.
///
/// Constructed values are assembled bottom-up: their content is encoded
/// into a nested encoder first, so the length is known when the header is
/// written.
#[derive(Debug, Default)]
pub struct Encoder {
    bytes: Vec<u8>,
}

impl Encoder {
    #[must_use]
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }

    pub(crate) fn write_raw(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Writes one complete primitive TLV.
    pub fn write_primitive(&mut self, tag: Tag, value: &[u8]) {
        write_identifier(tag, self);
        write_length(value.len(), self);
        self.write_raw(value);
    }

    /// Writes a constructed TLV whose content is produced by `content`.
    pub fn constructed(
        &mut self,
        tag: Tag,
        content: impl FnOnce(&mut Encoder) -> Result<(), EncodeError>,
    ) -> Result<(), EncodeError> {
        let mut inner = Encoder::new();
        content(&mut inner)?;
        write_identifier(tag, self);
        write_length(inner.len(), self);
        self.write_raw(&inner.bytes);
        Ok(())
    }

    /// Re-emits the single TLV in `encoded` under `[number] IMPLICIT`.
    pub(crate) fn retag(&mut self, encoded: &[u8], number: u32) -> Result<(), EncodeError> {
        let node = parse(encoded).map_err(|e| {
            EncodeError::Common(alloc::format!("Cannot apply implicit tag [{number}]: {e}"))
        })?;
        write_identifier(node.tag.implicit(number), self);
        write_length(node.value.len(), self);
        self.write_raw(node.value);
        Ok(())
    }

    /// Writes a SEQUENCE OF in the given order.
    pub fn sequence_of<T: Encode>(&mut self, values: &[T]) -> Result<(), EncodeError> {
        self.constructed(Tag::SEQUENCE, |inner| {
            values.iter().try_for_each(|value| value.encode(inner))
        })
    }

    /// Writes a SET OF with the element encodings in DER order.
    pub fn set_of<T: Encode>(&mut self, tag: Tag, values: &[T]) -> Result<(), EncodeError> {
        let mut elements = values
            .iter()
            .map(Encode::encode_to_vec)
            .collect::<Result<Vec<_>, _>>()?;
        if canonical_order(&mut elements) {
            trace!(elements = elements.len(), "reordered SET OF elements");
        }
        self.constructed(tag, |inner| {
            elements.iter().for_each(|element| inner.write_raw(element));
            Ok(())
        })
    }

    /// Writes a structured value field by field following `S::FIELDS`.
    pub fn sequence<S: Schema + ?Sized>(
        &mut self,
        fields: impl FnOnce(&mut FieldEncoder<'_>) -> Result<(), EncodeError>,
    ) -> Result<(), EncodeError> {
        self.constructed(S::TAG, |inner| {
            let mut encoder = FieldEncoder::new::<S>(inner);
            fields(&mut encoder)?;
            encoder.finish()
        })
    }
}

impl From<Encoder> for Vec<u8> {
    fn from(val: Encoder) -> Self {
        val.bytes
    }
}

impl From<Encoder> for bytes::Bytes {
    fn from(val: Encoder) -> Self {
        val.bytes.into()
    }
}

pub trait Encode {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError>;

    fn encode_to_vec(&self) -> Result<Vec<u8>, EncodeError> {
        let mut encoder = Encoder::new();
        self.encode(&mut encoder)?;
        Ok(encoder.into())
    }

    #[cfg(feature = "json")]
    fn encode_to_json(&self) -> Result<String, EncodeError>
    where
        Self: Sized + Serialize,
    {
        serde_json::to_string(self)
            .map_err(|e| EncodeError::Json(alloc::format!("Error encoding JSON: {e:?}")))
    }
}

macro_rules! primitive {
    ($($typ:ty),+) => {
        $(
            impl Encode for $typ {
                fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
                    let mut value = Vec::new();
                    Primitive::encode_value(self, &mut value)?;
                    output.write_primitive(<$typ as Primitive<'_>>::TAG, &value);
                    Ok(())
                }
            }
        )+
    };
}

primitive!(
    bool,
    Null,
    u8,
    u32,
    i64,
    usize,
    BigInt,
    ObjectIdentifier,
    BitString,
    PrintableString,
    DataGroupNumber,
    LdsSecurityObjectVersion
);

impl Encode for &[u8] {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.write_primitive(Tag::OCTET_STRING, self);
        Ok(())
    }
}

impl Encode for Time {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        let mut value = Vec::new();
        let tag = self.encode_value(&mut value)?;
        output.write_primitive(tag, &value);
        Ok(())
    }
}

impl Encode for Any<'_> {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        write_identifier(self.tag, output);
        write_length(self.value.len(), output);
        output.write_raw(self.value);
        Ok(())
    }
}

impl Encode for SecurityObjectIdentifier {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        match self {
            SecurityObjectIdentifier::ObjectIdentifier(oid) => oid.encode(output),
        }
    }
}

impl Encode for AlgorithmParameters<'_> {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        match self {
            AlgorithmParameters::Null => Null.encode(output),
            AlgorithmParameters::NamedCurve(curve) => curve.encode(output),
            AlgorithmParameters::Sequence(params) => params.encode(output),
        }
    }
}

impl Encode for SignerIdentifier<'_> {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        match self {
            SignerIdentifier::IssuerAndSerialNumber(issuer_and_serial) => {
                issuer_and_serial.encode(output)
            }
            SignerIdentifier::SubjectKeyIdentifier(key_id) => {
                output.write_primitive(Tag::OCTET_STRING.implicit(0), key_id);
                Ok(())
            }
        }
    }
}

impl Encode for LdsSecurityObject<'_> {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.sequence::<Self>(|fields| {
            fields.field(&self.version)?;
            fields.field(&self.hash_algorithm)?;
            fields.repeated(&self.data_group_hash_values)?;
            fields.optional(self.lds_version_info.as_ref())
        })
    }
}

impl Encode for DataGroupHash<'_> {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.sequence::<Self>(|fields| {
            fields.field(&self.data_group_number)?;
            fields.field(&self.data_group_hash_value)
        })
    }
}

impl Encode for LdsVersionInfo {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.sequence::<Self>(|fields| {
            fields.field(&self.lds_version)?;
            fields.field(&self.unicode_version)
        })
    }
}

impl Encode for AlgorithmIdentifier<'_> {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.sequence::<Self>(|fields| {
            fields.field(&self.algorithm)?;
            fields.optional(self.parameters.as_ref())
        })
    }
}

impl Encode for RsassaPssParameters<'_> {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        let salt_length = self
            .salt_length
            .filter(|length| *length != Self::DEFAULT_SALT_LENGTH);
        let trailer_field = self
            .trailer_field
            .filter(|trailer| *trailer != Self::TRAILER_FIELD_BC);
        output.sequence::<Self>(|fields| {
            fields.optional(self.hash_algorithm.as_ref())?;
            fields.optional(self.mask_gen_algorithm.as_ref())?;
            fields.optional(salt_length.as_ref())?;
            fields.optional(trailer_field.as_ref())
        })
    }
}

impl Encode for ContentInfo<'_> {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.sequence::<Self>(|fields| {
            fields.field(&self.content_type)?;
            fields.field(&self.content)
        })
    }
}

impl Encode for SignedData<'_> {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.sequence::<Self>(|fields| {
            fields.field(&self.version)?;
            fields.repeated(&self.digest_algorithms)?;
            fields.field(&self.encap_content_info)?;
            fields.optional_repeated(self.certificates.as_deref())?;
            fields.optional_repeated(self.crls.as_deref())?;
            fields.repeated(&self.signer_infos)
        })
    }
}

impl Encode for EncapsulatedContentInfo<'_> {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.sequence::<Self>(|fields| {
            fields.field(&self.e_content_type)?;
            fields.optional(self.e_content.as_ref())
        })
    }
}

impl Encode for SignerInfo<'_> {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.sequence::<Self>(|fields| {
            fields.field(&self.version)?;
            fields.field(&self.sid)?;
            fields.field(&self.digest_algorithm)?;
            fields.optional(self.signed_attrs.as_ref())?;
            fields.field(&self.signature_algorithm)?;
            fields.field(&self.signature)?;
            fields.optional(self.unsigned_attrs.as_ref())
        })
    }
}

impl Encode for IssuerAndSerialNumber<'_> {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.sequence::<Self>(|fields| {
            fields.field(&self.issuer)?;
            fields.field(&self.serial_number)
        })
    }
}

impl Encode for Attribute<'_> {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.sequence::<Self>(|fields| {
            fields.field(&self.attr_type)?;
            fields.repeated(&self.attr_values)
        })
    }
}

impl Encode for AttributeSet<'_> {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.set_of(Tag::SET, &self.0)
    }
}

impl Encode for Certificate<'_> {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.sequence::<Self>(|fields| {
            fields.field(&self.tbs_certificate)?;
            fields.field(&self.signature_algorithm)?;
            fields.field(&self.signature_value)
        })
    }
}

impl Encode for TbsCertificate<'_> {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.sequence::<Self>(|fields| {
            fields.optional(self.version.as_ref().filter(|version| **version != 0))?;
            fields.field(&self.serial_number)?;
            fields.field(&self.signature)?;
            fields.field(&self.issuer)?;
            fields.field(&self.validity)?;
            fields.field(&self.subject)?;
            fields.field(&self.subject_public_key_info)?;
            fields.optional(self.issuer_unique_id.as_ref())?;
            fields.optional(self.subject_unique_id.as_ref())?;
            fields.optional_repeated(self.extensions.as_deref())
        })
    }
}

impl Encode for SubjectPublicKeyInfo<'_> {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.sequence::<Self>(|fields| {
            fields.field(&self.algorithm)?;
            fields.field(&self.subject_public_key)
        })
    }
}

impl Encode for Extension<'_> {
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        output.sequence::<Self>(|fields| {
            fields.field(&self.extn_id)?;
            fields.optional(self.critical.as_ref().filter(|critical| **critical))?;
            fields.field(&self.extn_value)
        })
    }
}

impl Encode for Sod<'_> {
    /// Encodes the ContentInfo around the signed data, without the file
    /// wrapper. See [`Sod::encode_ef_sod`].
    fn encode(&self, output: &mut Encoder) -> Result<(), EncodeError> {
        let content_type = ObjectIdentifier::new(oid::ID_SIGNED_DATA)?;
        output.sequence::<ContentInfo<'_>>(|fields| {
            fields.field(&content_type)?;
            fields.field(&self.signed_data)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn encodes_lds_security_object() {
        let lds = LdsSecurityObject {
            version: LdsSecurityObjectVersion::V0,
            hash_algorithm: AlgorithmIdentifier {
                algorithm: oid::SHA256_WITH_RSA_ENCRYPTION.parse().unwrap(),
                parameters: None,
            },
            data_group_hash_values: alloc::vec![DataGroupHash {
                data_group_number: DataGroupNumber::DataGroup1,
                data_group_hash_value: &[],
            }],
            lds_version_info: None,
        };
        assert_eq!(
            lds.encode_to_vec().unwrap(),
            hex!("3019020100300b06092a864886f70d01010b300730050201010400")
        );
    }

    #[test]
    fn applies_implicit_tags() {
        let sid = SignerIdentifier::SubjectKeyIdentifier(&[0x01, 0x02]);
        assert_eq!(sid.encode_to_vec().unwrap(), hex!("80020102"));

        let mut encoder = Encoder::new();
        encoder.retag(&hex!("3103020101"), 0).unwrap();
        assert_eq!(encoder.into_vec(), hex!("a003020101"));
    }

    #[test]
    fn sorts_set_elements() {
        let values = [2i64, 1, 300];
        let mut encoder = Encoder::new();
        encoder.set_of(Tag::SET, &values).unwrap();
        assert_eq!(encoder.into_vec(), hex!("310a0201010201020202012c"));
    }

    #[test]
    fn keeps_sequence_order() {
        let values = [2i64, 1];
        let mut encoder = Encoder::new();
        encoder.sequence_of(&values).unwrap();
        assert_eq!(encoder.into_vec(), hex!("3006020102020101"));
    }

    #[test]
    fn converts_to_bytes() {
        let mut encoder = Encoder::new();
        encoder.write_primitive(Tag::NULL, &[]);
        let bytes: bytes::Bytes = encoder.into();
        assert_eq!(&bytes[..], &[0x05, 0x00]);
    }

    #[test]
    fn rejects_unrepresentable_time() {
        let time = Time::UtcTime(crate::DateTime::new(2077, 1, 1, 0, 0, 0).unwrap());
        assert!(matches!(
            time.encode_to_vec(),
            Err(EncodeError::InvalidValue(_))
        ));
    }
}
