use core::fmt::{self, Display};

use nom::{
    bytes::streaming::take, number::streaming::be_u8, sequence::pair, Needed,
};
#[cfg(feature = "json")]
use serde::Serialize;

use crate::{decode::DecodeError, encode::Encoder};

type HeaderResult<'input, T> = nom::IResult<&'input [u8], T, DecodeError>;

/// Tag class encoded in bits 8 and 7 of the identifier octet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub enum Class {
    Universal = 0,
    Application = 1,
    ContextSpecific = 2,
    Private = 3,
}

impl Class {
    fn from_identifier(octet: u8) -> Self {
        match octet >> 6 {
            0 => Class::Universal,
            1 => Class::Application,
            2 => Class::ContextSpecific,
            _ => Class::Private,
        }
    }

    fn identifier_bits(self) -> u8 {
        (self as u8) << 6
    }
}

/// Identifier of a DER node: class, primitive/constructed flag and tag number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct Tag {
    pub class: Class,
    pub constructed: bool,
    pub number: u32,
}

impl Tag {
    pub const BOOLEAN: Tag = Tag::universal(1, false);
    pub const INTEGER: Tag = Tag::universal(2, false);
    pub const BIT_STRING: Tag = Tag::universal(3, false);
    pub const OCTET_STRING: Tag = Tag::universal(4, false);
    pub const NULL: Tag = Tag::universal(5, false);
    pub const OBJECT_IDENTIFIER: Tag = Tag::universal(6, false);
    pub const SEQUENCE: Tag = Tag::universal(16, true);
    pub const SET: Tag = Tag::universal(17, true);
    pub const PRINTABLE_STRING: Tag = Tag::universal(19, false);
    pub const UTC_TIME: Tag = Tag::universal(23, false);
    pub const GENERALIZED_TIME: Tag = Tag::universal(24, false);

    #[must_use]
    pub const fn universal(number: u32, constructed: bool) -> Self {
        Self {
            class: Class::Universal,
            constructed,
            number,
        }
    }

    #[must_use]
    pub const fn application(number: u32, constructed: bool) -> Self {
        Self {
            class: Class::Application,
            constructed,
            number,
        }
    }

    #[must_use]
    pub const fn context(number: u32, constructed: bool) -> Self {
        Self {
            class: Class::ContextSpecific,
            constructed,
            number,
        }
    }

    /// The context-specific tag that replaces `self` under `[number] IMPLICIT`.
    #[must_use]
    pub const fn implicit(self, number: u32) -> Self {
        Self::context(number, self.constructed)
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match self.class {
            Class::Universal => "UNIVERSAL",
            Class::Application => "APPLICATION",
            Class::ContextSpecific => "CONTEXT",
            Class::Private => "PRIVATE",
        };
        let form = if self.constructed {
            "constructed"
        } else {
            "primitive"
        };
        write!(f, "[{class} {}] {form}", self.number)
    }
}

/// A single decoded TLV.
///
/// `value` borrows from the buffer the node was read from, so every node
/// (and everything decoded from it) lives as long as that buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node<'a> {
    pub tag: Tag,
    /// offset of the identifier octet
    pub offset: usize,
    /// number of identifier and length octets
    pub header_len: usize,
    pub value: &'a [u8],
    /// the complete TLV as read from the wire
    pub raw: &'a [u8],
}

impl<'a> Node<'a> {
    #[must_use]
    pub fn value_offset(&self) -> usize {
        self.offset + self.header_len
    }

    /// Offset of the first byte after this node.
    #[must_use]
    pub fn end(&self) -> usize {
        self.value_offset() + self.value.len()
    }

    #[must_use]
    pub fn children(&self) -> Children<'a> {
        Children {
            buffer: self.value,
            position: 0,
            base: self.value_offset(),
        }
    }

    /// Replaces the tag, e.g. to strip an implicit context tag. `raw` keeps
    /// the wire bytes.
    pub(crate) fn retagged(self, tag: Tag) -> Self {
        Self { tag, ..self }
    }
}

/// Cursor over the child nodes inside a constructed value.
#[derive(Debug, Clone)]
pub struct Children<'a> {
    buffer: &'a [u8],
    position: usize,
    base: usize,
}

impl<'a> Children<'a> {
    /// Reads the next node without advancing.
    pub fn peek(&self) -> Result<Option<Node<'a>>, DecodeError> {
        if self.is_empty() {
            return Ok(None);
        }
        let (node, _) = read_node(self.buffer, self.position).map_err(|e| e.shifted(self.base))?;
        Ok(Some(Node {
            offset: node.offset + self.base,
            ..node
        }))
    }

    pub fn next_node(&mut self) -> Result<Option<Node<'a>>, DecodeError> {
        let node = self.peek()?;
        if let Some(node) = &node {
            self.position = node.end() - self.base;
        }
        Ok(node)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.position >= self.buffer.len()
    }

    /// Absolute offset of the next unread byte.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.base + self.position
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }
}

impl<'a> Iterator for Children<'a> {
    type Item = Result<Node<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_node() {
            Ok(node) => node.map(Ok),
            Err(e) => {
                self.position = self.buffer.len();
                Some(Err(e))
            }
        }
    }
}

fn identifier(input: &[u8]) -> HeaderResult<'_, Tag> {
    let (mut input, first) = be_u8(input)?;
    let class = Class::from_identifier(first);
    let constructed = first & 0b0010_0000 != 0;
    let low = first & 0b0001_1111;
    if low != 0b0001_1111 {
        return Ok((
            input,
            Tag {
                class,
                constructed,
                number: low.into(),
            },
        ));
    }

    let mut number: u32 = 0;
    let mut first_subsequent = true;
    loop {
        let (rest, byte) = be_u8(input)?;
        input = rest;
        if first_subsequent && byte == 0x80 {
            return Err(nom::Err::Failure(DecodeError::InvalidTag {
                offset: 0,
                expected: "minimally encoded tag number",
                found: None,
            }));
        }
        first_subsequent = false;
        if number > (u32::MAX >> 7) {
            return Err(nom::Err::Failure(DecodeError::InvalidTag {
                offset: 0,
                expected: "tag number within 32 bits",
                found: None,
            }));
        }
        number = (number << 7) | u32::from(byte & 0b0111_1111);
        if byte & 0b1000_0000 == 0 {
            break;
        }
    }
    if number < 31 {
        return Err(nom::Err::Failure(DecodeError::InvalidTag {
            offset: 0,
            expected: "low tag number form for tag numbers below 31",
            found: None,
        }));
    }
    Ok((
        input,
        Tag {
            class,
            constructed,
            number,
        },
    ))
}

fn invalid_length(reason: &'static str) -> nom::Err<DecodeError> {
    nom::Err::Failure(DecodeError::InvalidLength { offset: 0, reason })
}

fn length(input: &[u8]) -> HeaderResult<'_, usize> {
    let (input, first) = be_u8(input)?;
    match first {
        len if len < 0x80 => Ok((input, len.into())),
        0x80 => Err(invalid_length("indefinite length form is not permitted in DER")),
        0xFF => Err(invalid_length("reserved length octet 0xFF")),
        len => {
            let count = usize::from(len & 0b0111_1111);
            if count > core::mem::size_of::<usize>() {
                return Err(invalid_length("length exceeds supported range"));
            }
            let (input, octets) = take(count)(input)?;
            if octets[0] == 0 {
                return Err(invalid_length("length has leading zero octets"));
            }
            let length = octets
                .iter()
                .fold(0usize, |acc, octet| (acc << 8) | usize::from(*octet));
            if length < 0x80 {
                return Err(invalid_length("long length form used for a short length"));
            }
            Ok((input, length))
        }
    }
}

fn header_error(error: nom::Err<DecodeError>, offset: usize) -> DecodeError {
    match error {
        nom::Err::Incomplete(Needed::Size(needed)) => DecodeError::TruncatedInput {
            offset,
            needed: needed.get(),
        },
        nom::Err::Incomplete(Needed::Unknown) => DecodeError::TruncatedInput { offset, needed: 1 },
        nom::Err::Error(e) | nom::Err::Failure(e) => e.shifted(offset),
    }
}

/// Reads the node starting at `offset`.
///
/// Returns the node together with the offset right after it. Offsets in the
/// node and in errors are relative to `buffer`.
pub fn read_node(buffer: &[u8], offset: usize) -> Result<(Node<'_>, usize), DecodeError> {
    let input = buffer.get(offset..).unwrap_or_default();
    let (rest, (tag, length)) =
        pair(identifier, length)(input).map_err(|e| header_error(e, offset))?;
    let header_len = input.len() - rest.len();
    let (_, value) = take::<usize, &[u8], DecodeError>(length)(rest)
        .map_err(|e| header_error(e, offset))?;
    let node = Node {
        tag,
        offset,
        header_len,
        value,
        raw: &input[..header_len + length],
    };
    let next = node.end();
    Ok((node, next))
}

/// Reads exactly one node spanning the whole buffer.
pub fn parse(buffer: &[u8]) -> Result<Node<'_>, DecodeError> {
    let (node, next) = read_node(buffer, 0)?;
    if next != buffer.len() {
        return Err(DecodeError::UnexpectedTrailingData {
            offset: next,
            remaining: buffer.len() - next,
        });
    }
    Ok(node)
}

pub(crate) fn write_identifier(tag: Tag, output: &mut Encoder) {
    let leading = tag.class.identifier_bits() | if tag.constructed { 0b0010_0000 } else { 0 };
    if tag.number < 31 {
        #[allow(clippy::cast_possible_truncation)]
        output.write_raw(&[leading | tag.number as u8]);
        return;
    }
    output.write_raw(&[leading | 0b0001_1111]);
    let mut groups = alloc::vec![];
    let mut number = tag.number;
    loop {
        #[allow(clippy::cast_possible_truncation)]
        groups.push((number & 0b0111_1111) as u8);
        number >>= 7;
        if number == 0 {
            break;
        }
    }
    let last = groups.len() - 1;
    for (i, group) in groups.iter().rev().enumerate() {
        output.write_raw(&[if i == last { *group } else { group | 0b1000_0000 }]);
    }
}

pub(crate) fn write_length(length: usize, output: &mut Encoder) {
    match length {
        len if len < 128 => {
            #[allow(clippy::cast_possible_truncation)]
            output.write_raw(&[len as u8]);
        }
        len => {
            let raw = len.to_be_bytes();
            let mut length_bytes = raw.as_ref();
            while length_bytes.len() > 1 && length_bytes[0] == 0 {
                length_bytes = &length_bytes[1..];
            }
            #[allow(clippy::cast_possible_truncation)]
            output.write_raw(&[(length_bytes.len() + 128) as u8]);
            output.write_raw(length_bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn reads_primitive_node() {
        let (node, next) = read_node(&[0x02, 0x01, 0x05, 0xff], 0).unwrap();
        assert_eq!(node.tag, Tag::INTEGER);
        assert_eq!(node.value, &[0x05]);
        assert_eq!(node.raw, &[0x02, 0x01, 0x05]);
        assert_eq!(node.header_len, 2);
        assert_eq!(next, 3);
    }

    #[test]
    fn reads_node_at_offset() {
        let (node, next) = read_node(&[0x05, 0x00, 0x04, 0x02, 0xaa, 0xbb], 2).unwrap();
        assert_eq!(node.tag, Tag::OCTET_STRING);
        assert_eq!(node.offset, 2);
        assert_eq!(node.value, &[0xaa, 0xbb]);
        assert_eq!(next, 6);
    }

    #[test]
    fn reads_long_form_length() {
        let mut data = alloc::vec![0x04, 0x81, 0x80];
        data.extend_from_slice(&[0x11; 0x80]);
        let node = parse(&data).unwrap();
        assert_eq!(node.value.len(), 0x80);
        assert_eq!(node.header_len, 3);
    }

    #[test]
    fn reads_high_tag_number() {
        let (node, _) = read_node(&[0xbf, 0x81, 0x00, 0x00], 0).unwrap();
        assert_eq!(node.tag, Tag::context(128, true));

        assert!(matches!(
            read_node(&[0x9f, 0x80, 0x01, 0x00], 0),
            Err(DecodeError::InvalidTag { offset: 0, .. })
        ));
        assert!(matches!(
            read_node(&[0x9f, 0x1e, 0x00], 0),
            Err(DecodeError::InvalidTag { .. })
        ));
        assert!(matches!(
            read_node(&[0x9f, 0x90, 0x80, 0x80, 0x80, 0x00, 0x00], 0),
            Err(DecodeError::InvalidTag { .. })
        ));
    }

    #[test]
    fn rejects_indefinite_length() {
        assert_eq!(
            read_node(&[0x30, 0x80, 0x00, 0x00], 0),
            Err(DecodeError::InvalidLength {
                offset: 0,
                reason: "indefinite length form is not permitted in DER"
            })
        );
    }

    #[test]
    fn rejects_non_minimal_length() {
        assert!(matches!(
            read_node(&[0x04, 0x81, 0x05, 0, 0, 0, 0, 0], 0),
            Err(DecodeError::InvalidLength { .. })
        ));
        assert!(matches!(
            read_node(&[0x04, 0x82, 0x00, 0x80], 0),
            Err(DecodeError::InvalidLength { .. })
        ));
        assert!(matches!(
            read_node(&[0x04, 0x89, 1, 1, 1, 1, 1, 1, 1, 1, 1], 0),
            Err(DecodeError::InvalidLength { .. })
        ));
    }

    #[test]
    fn reports_truncation() {
        // cut inside the length octets
        assert_eq!(
            read_node(&[0x30, 0x82, 0x01], 0),
            Err(DecodeError::TruncatedInput {
                offset: 0,
                needed: 1
            })
        );
        // declared length larger than the input
        assert_eq!(
            read_node(&[0x00, 0x04, 0x03, 0x01], 1),
            Err(DecodeError::TruncatedInput {
                offset: 1,
                needed: 2
            })
        );
        assert!(matches!(
            read_node(&[], 0),
            Err(DecodeError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn iterates_children_with_absolute_offsets() {
        let data = [0x30, 0x05, 0x02, 0x01, 0x01, 0x05, 0x00, 0x01];
        let (node, _) = read_node(&data, 0).unwrap();
        let children: Vec<_> = node.children().collect::<Result<_, _>>().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].offset, 2);
        assert_eq!(children[1].offset, 5);
        assert_eq!(children[1].tag, Tag::NULL);

        let broken = [0x30, 0x03, 0x02, 0x05, 0x01];
        let (node, _) = read_node(&broken, 0).unwrap();
        let mut children = node.children();
        assert_eq!(
            children.next(),
            Some(Err(DecodeError::TruncatedInput {
                offset: 2,
                needed: 4
            }))
        );
        assert_eq!(children.next(), None);
    }

    #[test]
    fn rejects_trailing_data() {
        assert_eq!(
            parse(&[0x05, 0x00, 0x00]),
            Err(DecodeError::UnexpectedTrailingData {
                offset: 2,
                remaining: 1
            })
        );
    }

    #[test]
    fn writes_headers() {
        let mut encoder = Encoder::new();
        write_identifier(Tag::context(0, true), &mut encoder);
        write_length(0x80, &mut encoder);
        write_identifier(Tag::application(200, false), &mut encoder);
        write_length(0x0102, &mut encoder);
        let output: Vec<u8> = encoder.into();
        assert_eq!(&[0xa0, 0x81, 0x80, 0x5f, 0x81, 0x48, 0x82, 0x01, 0x02], output.as_slice());
    }
}
