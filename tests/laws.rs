use hex_literal::hex;
use icao_sod::{
    oid, tlv, AlgorithmIdentifier, Any, Attribute, AttributeSet, DataGroupHash, DataGroupNumber,
    DateTime, Decode, DecodeError, Encode, Encoder, LdsSecurityObject, LdsSecurityObjectVersion,
    LdsVersionInfo, ObjectIdentifier, PrintableString, Tag, Time,
};
use proptest::prelude::*;

const SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";

#[test]
fn encodes_minimal_lds_security_object() {
    let object = LdsSecurityObject {
        version: LdsSecurityObjectVersion::V0,
        hash_algorithm: AlgorithmIdentifier::new(SHA256_WITH_RSA).unwrap(),
        data_group_hash_values: vec![DataGroupHash {
            data_group_number: DataGroupNumber::DataGroup1,
            data_group_hash_value: &[],
        }],
        lds_version_info: None,
    };
    let encoded = object.encode_to_vec().unwrap();
    assert_eq!(
        encoded,
        hex!("3019020100300b06092a864886f70d01010b300730050201010400")
    );
    assert_eq!(LdsSecurityObject::from_der(&encoded[..]).unwrap(), object);
}

#[test]
fn decodes_boundary_hash_lists() {
    // no hashes at all
    let empty = hex!("3012020100300b06092a864886f70d01010b3000");
    let object = LdsSecurityObject::from_der(&empty[..]).unwrap();
    assert!(object.data_group_hash_values.is_empty());

    // zero-length hash value
    let zero = hex!("3019020100300b06092a864886f70d01010b300730050201020400");
    let object = LdsSecurityObject::from_der(&zero[..]).unwrap();
    assert_eq!(
        object.data_group_hash_values[0].data_group_number,
        DataGroupNumber::DataGroup2
    );
    assert!(object.data_group_hash_values[0]
        .data_group_hash_value
        .is_empty());
}

fn signed_attribute_values() -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let content_type = ObjectIdentifier::new(oid::ID_LDS_SECURITY_OBJECT)
        .unwrap()
        .encode_to_vec()
        .unwrap();
    let signing_time = Time::new(DateTime::new(2024, 5, 31, 22, 0, 0).unwrap())
        .encode_to_vec()
        .unwrap();
    let message_digest = (&[0x5a; 32][..]).encode_to_vec().unwrap();
    (content_type, signing_time, message_digest)
}

#[test]
fn sorts_signed_attributes() {
    let (content_type, signing_time, message_digest) = signed_attribute_values();
    assert_eq!(signing_time, hex!("170d3234303533313232303030305a"));

    let content_type = Attribute::new(
        oid::ID_CONTENT_TYPE,
        vec![Any::from_der(&content_type[..]).unwrap()],
    )
    .unwrap();
    let signing_time = Attribute::new(
        oid::ID_SIGNING_TIME,
        vec![Any::from_der(&signing_time[..]).unwrap()],
    )
    .unwrap();
    let message_digest = Attribute::new(
        oid::ID_MESSAGE_DIGEST,
        vec![Any::from_der(&message_digest[..]).unwrap()],
    )
    .unwrap();

    let inserted = AttributeSet(vec![
        content_type.clone(),
        message_digest.clone(),
        signing_time.clone(),
    ]);
    let shuffled = AttributeSet(vec![message_digest, signing_time, content_type]);
    let encoded = inserted.encode_to_vec().unwrap();
    assert_eq!(encoded, shuffled.to_signed_bytes().unwrap());
    assert_eq!(
        encoded[..61],
        hex!(
            "3166 3015 06092a864886f70d010903 3108 0606678108010101"
            "301c 06092a864886f70d010905 310f 170d3234303533313232303030305a"
            "302f 06092a86"
        )
    );

    let decoded = AttributeSet::from_der(&encoded[..]).unwrap();
    assert_eq!(decoded.message_digest().unwrap(), Some(&[0x5a; 32][..]));
    assert_eq!(
        decoded.signing_time().unwrap().map(|time| time.date_time().year()),
        Some(2024)
    );
}

#[test]
fn sorts_pre_encoded_set_elements() {
    // a contentType attribute that lost its attrType, a signingTime and a
    // messageDigest attribute, pushed in that order
    let (_, _, message_digest) = signed_attribute_values();
    let broken = hex!("300a31080606678108010101");
    let signing_time = hex!("301c06092a864886f70d010905310f170d3234303533313232303030305a");
    let mut digest = hex!("302f06092a864886f70d0109043122").to_vec();
    digest.extend_from_slice(&message_digest);

    let elements = [
        Any::from_der(&digest[..]).unwrap(),
        Any::from_der(&broken[..]).unwrap(),
        Any::from_der(&signing_time[..]).unwrap(),
    ];
    let mut encoder = Encoder::new();
    encoder.set_of(Tag::SET, &elements).unwrap();
    let encoded = encoder.into_vec();
    assert_eq!(
        encoded[..50],
        hex!(
            "315b300a31080606678108010101301c06092a864886f70d010905310f170d323430"
            "3533313232303030305a302f06092a86"
        )
    );
}

#[test]
fn fails_on_truncated_length() {
    // long form announcing two length octets, only one present
    let data = hex!("308201");
    assert!(matches!(
        LdsSecurityObject::decode(&data[..]),
        Err(DecodeError::TruncatedInput { .. })
    ));
    // declared length beyond the end of the buffer
    let data = hex!("3019020100300b06092a86");
    assert!(matches!(
        LdsSecurityObject::decode(&data[..]),
        Err(DecodeError::TruncatedInput { .. })
    ));
}

#[test]
fn rejects_non_minimal_encodings() {
    let integer = hex!("300602020001 0400");
    assert!(matches!(
        DataGroupHash::from_der(&integer[..]),
        Err(DecodeError::InvalidEncoding { offset: 4, .. })
    ));
    let object_identifier = hex!("3005 0603 2a8001");
    assert!(matches!(
        AlgorithmIdentifier::from_der(&object_identifier[..]),
        Err(DecodeError::InvalidEncoding { .. })
    ));
    let length = hex!("3081050201000400");
    assert!(matches!(
        tlv::parse(&length[..]),
        Err(DecodeError::InvalidLength { .. })
    ));
}

fn digest_algorithm() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        oid::ID_SHA1,
        oid::ID_SHA224,
        oid::ID_SHA256,
        oid::ID_SHA384,
        oid::ID_SHA512,
    ])
}

proptest! {
    #[test]
    fn lds_security_object_round_trips(
        v1 in any::<bool>(),
        algorithm in digest_algorithm(),
        null_parameters in any::<bool>(),
        hashes in prop::collection::vec(
            (1i128..=16, prop::collection::vec(any::<u8>(), 0..65)),
            0..20,
        ),
    ) {
        let hash_algorithm = if null_parameters {
            AlgorithmIdentifier::with_null_parameters(algorithm)
        } else {
            AlgorithmIdentifier::new(algorithm)
        }
        .unwrap();
        let object = LdsSecurityObject {
            version: if v1 { LdsSecurityObjectVersion::V1 } else { LdsSecurityObjectVersion::V0 },
            hash_algorithm,
            data_group_hash_values: hashes
                .iter()
                .map(|(number, value)| DataGroupHash {
                    data_group_number: DataGroupNumber::try_from(*number).unwrap(),
                    data_group_hash_value: value,
                })
                .collect(),
            lds_version_info: v1.then(|| LdsVersionInfo {
                lds_version: PrintableString::new("0108").unwrap(),
                unicode_version: PrintableString::new("040000").unwrap(),
            }),
        };
        let encoded = object.encode_to_vec().unwrap();
        prop_assert_eq!(LdsSecurityObject::from_der(&encoded[..]).unwrap(), object);
    }

    #[test]
    fn attribute_sets_encode_in_canonical_order(
        digests in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..40), 2..8),
    ) {
        let values: Vec<Vec<u8>> = digests
            .iter()
            .map(|digest| digest.as_slice().encode_to_vec().unwrap())
            .collect();
        let attributes: Vec<Attribute> = values
            .iter()
            .map(|value| {
                Attribute::new(oid::ID_MESSAGE_DIGEST, vec![Any::from_der(&value[..]).unwrap()])
                    .unwrap()
            })
            .collect();

        let encoded = AttributeSet(attributes.clone()).encode_to_vec().unwrap();
        let reversed: AttributeSet = attributes.into_iter().rev().collect();
        prop_assert_eq!(&encoded, &reversed.encode_to_vec().unwrap());

        let set = tlv::parse(&encoded).unwrap();
        let mut children = set.children();
        let mut previous: Option<&[u8]> = None;
        while let Some(child) = children.next_node().unwrap() {
            if let Some(previous) = previous {
                prop_assert!(previous <= child.raw);
            }
            previous = Some(child.raw);
        }
    }
}
