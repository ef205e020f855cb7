//! DER primitive codecs.
//!
//! Every primitive type decodes from the content octets of its node and
//! encodes back into content octets. Identifier and length octets are
//! handled by the TLV layer.

use alloc::{format, string::String, vec::Vec};
use core::{
    fmt::{self, Display},
    str::FromStr,
};

use bitvec::prelude::*;
use num::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};
#[cfg(feature = "json")]
use serde::Serialize;

use crate::{
    choice::{Alternative, Choice},
    decode::DecodeError,
    encode::EncodeError,
    tlv::{Node, Tag},
    util::{minimal_integer, write_base128, write_into_vec_right_padded},
};

pub trait Primitive<'a>: Sized {
    /// Universal tag of the type
    const TAG: Tag;

    /// Decodes the content octets. Error offsets are relative to `value`.
    fn decode_value(value: &'a [u8]) -> Result<Self, DecodeError>;

    /// Appends the DER content octets of `self` to `output`.
    fn encode_value(&self, output: &mut Vec<u8>) -> Result<(), EncodeError>;
}

fn invalid(offset: usize, reason: &'static str) -> DecodeError {
    DecodeError::InvalidEncoding { offset, reason }
}

// =====================================================
// BOOLEAN, NULL
// =====================================================

impl Primitive<'_> for bool {
    const TAG: Tag = Tag::BOOLEAN;

    fn decode_value(value: &[u8]) -> Result<Self, DecodeError> {
        match value {
            [0x00] => Ok(false),
            [0xFF] => Ok(true),
            [_] => Err(invalid(0, "boolean must be encoded as 0x00 or 0xFF")),
            _ => Err(invalid(0, "boolean must be exactly one octet")),
        }
    }

    fn encode_value(&self, output: &mut Vec<u8>) -> Result<(), EncodeError> {
        output.push(if *self { 0xFF } else { 0x00 });
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct Null;

impl Primitive<'_> for Null {
    const TAG: Tag = Tag::NULL;

    fn decode_value(value: &[u8]) -> Result<Self, DecodeError> {
        if value.is_empty() {
            Ok(Null)
        } else {
            Err(invalid(0, "null must not have content octets"))
        }
    }

    fn encode_value(&self, _: &mut Vec<u8>) -> Result<(), EncodeError> {
        Ok(())
    }
}

// =====================================================
// INTEGER
// =====================================================

/// Checks DER minimality and returns the two's complement octets.
fn integer_octets(value: &[u8]) -> Result<&[u8], DecodeError> {
    match value {
        [] => Err(invalid(0, "integer must have at least one content octet")),
        [0x00, next, ..] if next & 0x80 == 0 => Err(invalid(0, "integer has redundant leading 0x00")),
        [0xFF, next, ..] if next & 0x80 != 0 => Err(invalid(0, "integer has redundant leading 0xFF")),
        _ => Ok(value),
    }
}

pub(crate) fn decode_i128(value: &[u8]) -> Result<i128, DecodeError> {
    let octets = integer_octets(value)?;
    if octets.len() > 16 {
        return Err(invalid(0, "integer exceeds supported range"));
    }
    let init = if octets[0] & 0x80 == 0 { 0i128 } else { -1i128 };
    Ok(octets
        .iter()
        .fold(init, |acc, octet| (acc << 8) | i128::from(*octet)))
}

pub(crate) fn encode_i128(value: i128, output: &mut Vec<u8>) {
    output.extend_from_slice(minimal_integer(&value.to_be_bytes()));
}

macro_rules! integer {
    ($typ:ty, $from:path) => {
        impl Primitive<'_> for $typ {
            const TAG: Tag = Tag::INTEGER;

            fn decode_value(value: &[u8]) -> Result<Self, DecodeError> {
                $from(decode_i128(value)?)
                    .ok_or_else(|| invalid(0, "integer value does not fit the target type"))
            }

            fn encode_value(&self, output: &mut Vec<u8>) -> Result<(), EncodeError> {
                let value = self.to_i128().ok_or_else(|| {
                    EncodeError::InvalidValue(format!("Integer {self} exceeds supported range"))
                })?;
                encode_i128(value, output);
                Ok(())
            }
        }
    };
}

integer!(u8, u8::from_i128);
integer!(u32, u32::from_i128);
integer!(i64, i64::from_i128);
integer!(usize, usize::from_i128);

impl Primitive<'_> for BigInt {
    const TAG: Tag = Tag::INTEGER;

    fn decode_value(value: &[u8]) -> Result<Self, DecodeError> {
        Ok(BigInt::from_signed_bytes_be(integer_octets(value)?))
    }

    fn encode_value(&self, output: &mut Vec<u8>) -> Result<(), EncodeError> {
        output.extend_from_slice(minimal_integer(&self.to_signed_bytes_be()));
        Ok(())
    }
}

/// Implements `Primitive` for an INTEGER with a closed set of named values.
macro_rules! named_integer {
    ($typ:ty, $name:expr) => {
        impl Primitive<'_> for $typ {
            const TAG: Tag = Tag::INTEGER;

            fn decode_value(value: &[u8]) -> Result<Self, DecodeError> {
                <$typ>::try_from(decode_i128(value)?)
                    .map_err(|_| invalid(0, concat!("unknown ", $name, " value")))
            }

            fn encode_value(&self, output: &mut Vec<u8>) -> Result<(), EncodeError> {
                encode_i128(*self as i128, output);
                Ok(())
            }
        }
    };
}

named_integer!(crate::DataGroupNumber, "data group number");
named_integer!(crate::LdsSecurityObjectVersion, "LDS security object version");

// =====================================================
// OCTET STRING
// =====================================================

impl<'a> Primitive<'a> for &'a [u8] {
    const TAG: Tag = Tag::OCTET_STRING;

    fn decode_value(value: &'a [u8]) -> Result<Self, DecodeError> {
        Ok(value)
    }

    fn encode_value(&self, output: &mut Vec<u8>) -> Result<(), EncodeError> {
        output.extend_from_slice(self);
        Ok(())
    }
}

// =====================================================
// OBJECT IDENTIFIER
// =====================================================

/// Object identifier in dotted decimal notation, e.g. `2.23.136.1.1.1`.
///
/// The dotted form is validated on construction, so every value can be
/// encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct ObjectIdentifier(String);

impl ObjectIdentifier {
    pub fn new(dotted: &str) -> Result<Self, EncodeError> {
        parse_arcs(dotted)?;
        Ok(Self(dotted.into()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn arcs(&self) -> Result<Vec<u64>, EncodeError> {
        parse_arcs(&self.0)
    }
}

fn parse_arcs(dotted: &str) -> Result<Vec<u64>, EncodeError> {
    let malformed = || EncodeError::InvalidValue(format!("Malformed object identifier {dotted:?}"));
    let arcs = dotted
        .split('.')
        .map(|arc| {
            let canonical = !arc.is_empty()
                && arc.bytes().all(|c| c.is_ascii_digit())
                && !(arc.len() > 1 && arc.starts_with('0'));
            if canonical {
                arc.parse::<u64>().map_err(|_| malformed())
            } else {
                Err(malformed())
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    match arcs.as_slice() {
        [first, second, ..] if *first < 2 && *second < 40 => Ok(arcs),
        [2, second, ..] if second.checked_add(80).is_some() => Ok(arcs),
        _ => Err(malformed()),
    }
}

impl FromStr for ObjectIdentifier {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for ObjectIdentifier {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ObjectIdentifier {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Primitive<'_> for ObjectIdentifier {
    const TAG: Tag = Tag::OBJECT_IDENTIFIER;

    fn decode_value(value: &[u8]) -> Result<Self, DecodeError> {
        if value.is_empty() {
            return Err(invalid(0, "object identifier must not be empty"));
        }
        let mut arcs: Vec<u64> = alloc::vec![];
        let mut current: u64 = 0;
        let mut in_arc = false;
        for (i, octet) in value.iter().enumerate() {
            if !in_arc && *octet == 0x80 {
                return Err(invalid(i, "object identifier arc has redundant leading 0x80"));
            }
            if current > (u64::MAX >> 7) {
                return Err(invalid(i, "object identifier arc exceeds 64 bits"));
            }
            current = (current << 7) | u64::from(octet & 0b0111_1111);
            in_arc = octet & 0b1000_0000 != 0;
            if !in_arc {
                arcs.push(current);
                current = 0;
            }
        }
        if in_arc {
            return Err(invalid(
                value.len() - 1,
                "object identifier ends inside an arc",
            ));
        }

        let (first, second) = match arcs[0] {
            packed @ 0..=39 => (0, packed),
            packed @ 40..=79 => (1, packed - 40),
            packed => (2, packed - 80),
        };
        let mut dotted = format!("{first}.{second}");
        for arc in &arcs[1..] {
            dotted.push_str(&format!(".{arc}"));
        }
        Ok(Self(dotted))
    }

    fn encode_value(&self, output: &mut Vec<u8>) -> Result<(), EncodeError> {
        let arcs = self.arcs()?;
        let packed = arcs[0] * 40 + arcs[1];
        write_base128(packed, output);
        for arc in &arcs[2..] {
            write_base128(*arc, output);
        }
        Ok(())
    }
}

// =====================================================
// BIT STRING
// =====================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct BitString(pub BitVec<u8, Msb0>);

impl BitString {
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(BitVec::from_slice(bytes))
    }

    /// Returns the octets if the bit count is a multiple of eight.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        (self.0.len() % 8 == 0).then(|| self.0.as_raw_slice())
    }
}

impl From<Vec<bool>> for BitString {
    fn from(value: Vec<bool>) -> Self {
        Self(value.iter().collect())
    }
}

impl Primitive<'_> for BitString {
    const TAG: Tag = Tag::BIT_STRING;

    fn decode_value(value: &[u8]) -> Result<Self, DecodeError> {
        let (unused, octets) = value
            .split_first()
            .ok_or_else(|| invalid(0, "bit string must contain the unused bits octet"))?;
        if *unused > 7 {
            return Err(invalid(0, "bit string declares more than 7 unused bits"));
        }
        match octets.last() {
            None if *unused != 0 => {
                return Err(invalid(0, "empty bit string must declare zero unused bits"))
            }
            Some(last) if last & ((1u8 << unused) - 1) != 0 => {
                return Err(invalid(value.len() - 1, "bit string unused bits must be zero"))
            }
            _ => (),
        }
        let mut bits = BitVec::<u8, Msb0>::from_slice(octets);
        bits.truncate(bits.len() - usize::from(*unused));
        Ok(Self(bits))
    }

    fn encode_value(&self, output: &mut Vec<u8>) -> Result<(), EncodeError> {
        #[allow(clippy::cast_possible_truncation)]
        let unused = ((8 - self.0.len() % 8) % 8) as u8;
        output.push(unused);
        write_into_vec_right_padded(self.0.as_bitslice(), output);
        Ok(())
    }
}

// =====================================================
// PrintableString
// =====================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct PrintableString(String);

fn is_printable(c: u8) -> bool {
    c.is_ascii_alphanumeric() || b" '()+,-./:=?".contains(&c)
}

impl PrintableString {
    pub fn new(value: &str) -> Result<Self, EncodeError> {
        if value.bytes().all(is_printable) {
            Ok(Self(value.into()))
        } else {
            Err(EncodeError::InvalidValue(format!(
                "{value:?} contains characters outside the PrintableString set"
            )))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Primitive<'_> for PrintableString {
    const TAG: Tag = Tag::PRINTABLE_STRING;

    fn decode_value(value: &[u8]) -> Result<Self, DecodeError> {
        if let Some(i) = value.iter().position(|c| !is_printable(*c)) {
            return Err(invalid(i, "character outside the PrintableString set"));
        }
        let text = core::str::from_utf8(value)
            .map_err(|_| invalid(0, "character outside the PrintableString set"))?;
        Ok(Self(text.into()))
    }

    fn encode_value(&self, output: &mut Vec<u8>) -> Result<(), EncodeError> {
        output.extend_from_slice(self.0.as_bytes());
        Ok(())
    }
}

// =====================================================
// UTCTime, GeneralizedTime
// =====================================================

/// Calendar timestamp in UTC with second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct DateTime {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
        2 => 28,
        _ => 0,
    }
}

impl DateTime {
    /// Returns `None` for dates that do not exist or times outside `00:00:00..=23:59:59`.
    #[must_use]
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Option<Self> {
        let valid = year <= 9999
            && (1..=12).contains(&month)
            && day >= 1
            && day <= days_in_month(year, month)
            && hour < 24
            && minute < 60
            && second < 60;
        valid.then_some(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    #[must_use]
    pub fn year(&self) -> u16 {
        self.year
    }

    #[must_use]
    pub fn month(&self) -> u8 {
        self.month
    }

    #[must_use]
    pub fn day(&self) -> u8 {
        self.day
    }

    #[must_use]
    pub fn hour(&self) -> u8 {
        self.hour
    }

    #[must_use]
    pub fn minute(&self) -> u8 {
        self.minute
    }

    #[must_use]
    pub fn second(&self) -> u8 {
        self.second
    }
}

fn two_digits(value: &[u8], at: usize) -> Result<u8, DecodeError> {
    match (value[at], value[at + 1]) {
        (tens @ b'0'..=b'9', ones @ b'0'..=b'9') => Ok((tens - b'0') * 10 + (ones - b'0')),
        _ => Err(invalid(at, "time contains non-digit characters")),
    }
}

/// Parses `YYMMDDHHMMSSZ` (`year_digits == 2`) or `YYYYMMDDHHMMSSZ` (`year_digits == 4`).
fn decode_time(value: &[u8], year_digits: usize) -> Result<DateTime, DecodeError> {
    let expected = year_digits + 11;
    if let Some(i) = value.iter().position(|c| matches!(c, b'.' | b',')) {
        return Err(invalid(i, "fractional seconds are not permitted"));
    }
    if let Some(i) = value.iter().position(|c| matches!(c, b'+' | b'-')) {
        return Err(invalid(i, "local time offsets are not permitted in DER"));
    }
    if value.len() != expected {
        return Err(invalid(0, "time must specify seconds and nothing beyond"));
    }
    if value[expected - 1] != b'Z' {
        return Err(invalid(expected - 1, "time must end with 'Z'"));
    }

    let year = if year_digits == 2 {
        match two_digits(value, 0)? {
            yy @ 50..=99 => 1900 + u16::from(yy),
            yy => 2000 + u16::from(yy),
        }
    } else {
        u16::from(two_digits(value, 0)?) * 100 + u16::from(two_digits(value, 2)?)
    };
    let at = year_digits;
    DateTime::new(
        year,
        two_digits(value, at)?,
        two_digits(value, at + 2)?,
        two_digits(value, at + 4)?,
        two_digits(value, at + 6)?,
        two_digits(value, at + 8)?,
    )
    .ok_or_else(|| invalid(0, "time is not a valid calendar date"))
}

fn encode_time(time: &DateTime, year_digits: usize, output: &mut Vec<u8>) {
    let year = if year_digits == 2 {
        format!("{:02}", time.year % 100)
    } else {
        format!("{:04}", time.year)
    };
    output.extend_from_slice(year.as_bytes());
    output.extend_from_slice(
        format!(
            "{:02}{:02}{:02}{:02}{:02}Z",
            time.month, time.day, time.hour, time.minute, time.second
        )
        .as_bytes(),
    );
}

/// ```asn
/// Time ::= CHOICE {
///     utcTime        UTCTime,
///     generalTime    GeneralizedTime }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub enum Time {
    UtcTime(DateTime),
    GeneralTime(DateTime),
}

impl Time {
    /// Picks UTCTime for the years 1950 through 2049 and GeneralizedTime
    /// otherwise.
    #[must_use]
    pub fn new(date_time: DateTime) -> Self {
        if (1950..2050).contains(&date_time.year) {
            Time::UtcTime(date_time)
        } else {
            Time::GeneralTime(date_time)
        }
    }

    #[must_use]
    pub fn date_time(&self) -> DateTime {
        match self {
            Time::UtcTime(t) | Time::GeneralTime(t) => *t,
        }
    }

    pub(crate) fn encode_value(&self, output: &mut Vec<u8>) -> Result<Tag, EncodeError> {
        match self {
            Time::UtcTime(t) if (1950..2050).contains(&t.year) => {
                encode_time(t, 2, output);
                Ok(Tag::UTC_TIME)
            }
            Time::UtcTime(t) => Err(EncodeError::InvalidValue(format!(
                "UTCTime cannot represent the year {}",
                t.year
            ))),
            Time::GeneralTime(t) => {
                encode_time(t, 4, output);
                Ok(Tag::GENERALIZED_TIME)
            }
        }
    }
}

impl<'a> Choice<'a> for Time {
    const NAME: &'static str = "Time";
    const ALTERNATIVES: &'static [Alternative] = &[
        Alternative::new("utcTime", Tag::UTC_TIME),
        Alternative::new("generalTime", Tag::GENERALIZED_TIME),
    ];

    fn decode_alternative(index: usize, node: Node<'a>) -> Result<Self, DecodeError> {
        let shift = |e: DecodeError| e.shifted(node.value_offset());
        match index {
            0 => decode_time(node.value, 2).map(Time::UtcTime).map_err(shift),
            _ => decode_time(node.value, 4).map(Time::GeneralTime).map_err(shift),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn encoded<'a, T: Primitive<'a>>(value: &T) -> Vec<u8> {
        let mut output = alloc::vec![];
        value.encode_value(&mut output).unwrap();
        output
    }

    #[test]
    fn decodes_integers() {
        assert_eq!(0, i64::decode_value(&[0x00]).unwrap());
        assert_eq!(127, i64::decode_value(&[0x7f]).unwrap());
        assert_eq!(128, i64::decode_value(&[0x00, 0x80]).unwrap());
        assert_eq!(-128, i64::decode_value(&[0x80]).unwrap());
        assert_eq!(-129, i64::decode_value(&[0xff, 0x7f]).unwrap());
        assert_eq!(256, u32::decode_value(&[0x01, 0x00]).unwrap());
        assert!(u8::decode_value(&[0x01, 0x00]).is_err());
        assert!(u8::decode_value(&[0xff]).is_err());
    }

    #[test]
    fn rejects_non_minimal_integers() {
        assert_eq!(
            i64::decode_value(&[0x00, 0x7f]),
            Err(DecodeError::InvalidEncoding {
                offset: 0,
                reason: "integer has redundant leading 0x00"
            })
        );
        assert!(i64::decode_value(&[0xff, 0x80]).is_err());
        assert!(i64::decode_value(&[]).is_err());
        assert!(BigInt::decode_value(&[0x00, 0x00, 0x01]).is_err());
    }

    #[test]
    fn encodes_minimal_integers() {
        assert_eq!(encoded(&0i64), &[0x00]);
        assert_eq!(encoded(&128i64), &[0x00, 0x80]);
        assert_eq!(encoded(&-128i64), &[0x80]);
        assert_eq!(encoded(&-129i64), &[0xff, 0x7f]);
        assert_eq!(encoded(&65535u32), &[0x00, 0xff, 0xff]);
        assert_eq!(encoded(&BigInt::from(0x0142_fd5c_f927_i64)), &hex!("0142fd5cf927"));
        assert_eq!(encoded(&BigInt::from(-129)), &[0xff, 0x7f]);
    }

    #[test]
    fn decodes_big_integers() {
        let value = hex!("00c0ffee00c0ffee00c0ffee00c0ffee00c0ffee");
        let decoded = BigInt::decode_value(&value).unwrap();
        assert_eq!(encoded(&decoded), value);
    }

    #[test]
    fn decodes_booleans_and_null() {
        assert_eq!(Ok(true), bool::decode_value(&[0xff]));
        assert_eq!(Ok(false), bool::decode_value(&[0x00]));
        assert!(bool::decode_value(&[0x01]).is_err());
        assert!(bool::decode_value(&[0x00, 0x00]).is_err());
        assert_eq!(Ok(Null), Null::decode_value(&[]));
        assert!(Null::decode_value(&[0x00]).is_err());
    }

    #[test]
    fn decodes_object_identifiers() {
        let oid = ObjectIdentifier::decode_value(&hex!("608648016503040201")).unwrap();
        assert_eq!(oid, "2.16.840.1.101.3.4.2.1");
        let oid = ObjectIdentifier::decode_value(&hex!("678108010101")).unwrap();
        assert_eq!(oid, "2.23.136.1.1.1");
        let oid = ObjectIdentifier::decode_value(&hex!("2a864886f70d01010b")).unwrap();
        assert_eq!(oid.as_str(), "1.2.840.113549.1.1.11");
        let oid = ObjectIdentifier::decode_value(&hex!("883703")).unwrap();
        assert_eq!(oid, "2.999.3");
    }

    #[test]
    fn rejects_malformed_object_identifiers() {
        assert!(ObjectIdentifier::decode_value(&[]).is_err());
        assert_eq!(
            ObjectIdentifier::decode_value(&hex!("2a80863a")),
            Err(DecodeError::InvalidEncoding {
                offset: 1,
                reason: "object identifier arc has redundant leading 0x80"
            })
        );
        assert!(ObjectIdentifier::decode_value(&hex!("2a86")).is_err());
        assert!(ObjectIdentifier::decode_value(&hex!("2affffffffffffffffff7f")).is_err());
    }

    #[test]
    fn encodes_object_identifiers() {
        let oid: ObjectIdentifier = "1.2.840.113549.1.9.4".parse().unwrap();
        assert_eq!(encoded(&oid), hex!("2a864886f70d010904"));
        let oid: ObjectIdentifier = "2.999.3".parse().unwrap();
        assert_eq!(encoded(&oid), hex!("883703"));
    }

    #[test]
    fn validates_dotted_object_identifiers() {
        assert!(ObjectIdentifier::new("1").is_err());
        assert!(ObjectIdentifier::new("3.1").is_err());
        assert!(ObjectIdentifier::new("1.40").is_err());
        assert!(ObjectIdentifier::new("1.2..3").is_err());
        assert!(ObjectIdentifier::new("1.02").is_err());
        assert!(ObjectIdentifier::new("1.+2").is_err());
        assert!(ObjectIdentifier::new("2.100.3").is_ok());
    }

    #[test]
    fn decodes_bit_strings() {
        let bits = BitString::decode_value(&[0x06, 0x80]).unwrap();
        assert_eq!(bits, BitString::from(alloc::vec![true, false]));
        assert_eq!(bits.as_bytes(), None);

        let bits = BitString::decode_value(&[0x00, 0x04, 0x01]).unwrap();
        assert_eq!(bits.as_bytes(), Some(&[0x04, 0x01][..]));
        assert_eq!(BitString::decode_value(&[0x00]).unwrap(), BitString::default());
    }

    #[test]
    fn rejects_non_canonical_bit_strings() {
        assert!(BitString::decode_value(&[]).is_err());
        assert!(BitString::decode_value(&[0x08, 0x00]).is_err());
        assert!(BitString::decode_value(&[0x01]).is_err());
        assert_eq!(
            BitString::decode_value(&[0x06, 0x81]),
            Err(DecodeError::InvalidEncoding {
                offset: 1,
                reason: "bit string unused bits must be zero"
            })
        );
    }

    #[test]
    fn encodes_bit_strings() {
        assert_eq!(
            encoded(&BitString::from(alloc::vec![true, false, true])),
            &[0x05, 0xa0]
        );
        assert_eq!(encoded(&BitString::from_bytes(&[0xde, 0xad])), &[0x00, 0xde, 0xad]);
        assert_eq!(encoded(&BitString::default()), &[0x00]);
    }

    #[test]
    fn decodes_printable_strings() {
        assert_eq!(PrintableString::decode_value(b"0108").unwrap().as_str(), "0108");
        assert!(PrintableString::decode_value(b"a@b").is_err());
        assert!(PrintableString::new("8.0.0").is_ok());
        assert!(PrintableString::new("ä").is_err());
    }

    #[test]
    fn decodes_times() {
        let time = decode_time(b"240531220000Z", 2).unwrap();
        assert_eq!(time, DateTime::new(2024, 5, 31, 22, 0, 0).unwrap());
        let time = decode_time(b"131216214318Z", 2).unwrap();
        assert_eq!(time.year(), 2013);
        let time = decode_time(b"991231235959Z", 2).unwrap();
        assert_eq!(time.year(), 1999);
        let time = decode_time(b"20500101000000Z", 4).unwrap();
        assert_eq!(time, DateTime::new(2050, 1, 1, 0, 0, 0).unwrap());
        let time = decode_time(b"20240229120000Z", 4).unwrap();
        assert_eq!(time.day(), 29);
    }

    #[test]
    fn rejects_non_der_times() {
        assert!(decode_time(b"2405312200Z", 2).is_err());
        assert!(decode_time(b"240531220000", 2).is_err());
        assert!(decode_time(b"240531220000+0200", 2).is_err());
        assert!(decode_time(b"20240531220000.5Z", 4).is_err());
        assert!(decode_time(b"20230229120000Z", 4).is_err());
        assert!(decode_time(b"241331220000Z", 2).is_err());
        assert!(decode_time(b"24053122000aZ", 2).is_err());
        assert!(decode_time(b"240531240000Z", 2).is_err());
    }

    #[test]
    fn encodes_times() {
        let mut output = alloc::vec![];
        let tag = Time::new(DateTime::new(2024, 5, 31, 22, 0, 0).unwrap())
            .encode_value(&mut output)
            .unwrap();
        assert_eq!(tag, Tag::UTC_TIME);
        assert_eq!(output, b"240531220000Z");

        let mut output = alloc::vec![];
        let tag = Time::new(DateTime::new(2050, 1, 2, 3, 4, 5).unwrap())
            .encode_value(&mut output)
            .unwrap();
        assert_eq!(tag, Tag::GENERALIZED_TIME);
        assert_eq!(output, b"20500102030405Z");

        let too_late = Time::UtcTime(DateTime::new(2050, 1, 1, 0, 0, 0).unwrap());
        assert!(too_late.encode_value(&mut alloc::vec![]).is_err());
    }
}
