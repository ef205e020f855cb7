//! Data-driven structure descriptors.
//!
//! Every SEQUENCE type lists its fields in a static [`Field`] table. A single
//! engine walks that table for decoding ([`decode_fields`]) and encoding
//! ([`FieldEncoder`]), so tagging and optionality rules live in one place per
//! type instead of in hand-written parsers.

use alloc::vec::Vec;

use tracing::trace;

use crate::{
    choice::{position, Alternative},
    decode::{DecodeError, InternalDecode},
    encode::{Encode, EncodeError, Encoder},
    tlv::{Class, Node, Tag},
};

/// What a field looks like on the wire before any tag override is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Tag(Tag),
    /// untagged CHOICE, matched against the tags of its alternatives
    Choice(&'static [Alternative]),
    /// ANY, matches every tag
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tagging {
    Default,
    /// `[n] IMPLICIT`: the context tag replaces the natural tag
    Implicit(u32),
    /// `[n] EXPLICIT`: a constructed context tag wraps the natural encoding
    Explicit(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    One,
    /// order preserving
    SequenceOf,
    /// canonically sorted on encode
    SetOf,
}

/// Descriptor of a single field of a structured type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub expect: Expect,
    pub tagging: Tagging,
    pub repeat: Repeat,
    pub optional: bool,
}

impl Field {
    #[must_use]
    pub const fn new(name: &'static str, tag: Tag) -> Self {
        Self::with(name, Expect::Tag(tag))
    }

    #[must_use]
    pub const fn choice(name: &'static str, alternatives: &'static [Alternative]) -> Self {
        Self::with(name, Expect::Choice(alternatives))
    }

    #[must_use]
    pub const fn any(name: &'static str) -> Self {
        Self::with(name, Expect::Any)
    }

    const fn with(name: &'static str, expect: Expect) -> Self {
        Self {
            name,
            expect,
            tagging: Tagging::Default,
            repeat: Repeat::One,
            optional: false,
        }
    }

    #[must_use]
    pub const fn implicit(self, number: u32) -> Self {
        Self {
            tagging: Tagging::Implicit(number),
            ..self
        }
    }

    #[must_use]
    pub const fn explicit(self, number: u32) -> Self {
        Self {
            tagging: Tagging::Explicit(number),
            ..self
        }
    }

    /// `SEQUENCE OF` the element type this field was declared with.
    #[must_use]
    pub const fn sequence_of(self) -> Self {
        Self {
            repeat: Repeat::SequenceOf,
            ..self
        }
    }

    /// `SET OF` the element type this field was declared with.
    #[must_use]
    pub const fn set_of(self) -> Self {
        Self {
            repeat: Repeat::SetOf,
            ..self
        }
    }

    #[must_use]
    pub const fn optional(self) -> Self {
        Self {
            optional: true,
            ..self
        }
    }

    /// The tag the field carries without any tag override, if fixed.
    #[must_use]
    pub fn natural(&self) -> Option<Tag> {
        match (self.repeat, self.expect) {
            (Repeat::SequenceOf, _) => Some(Tag::SEQUENCE),
            (Repeat::SetOf, _) => Some(Tag::SET),
            (Repeat::One, Expect::Tag(tag)) => Some(tag),
            (Repeat::One, _) => None,
        }
    }

    fn is_untagged_choice(&self) -> bool {
        matches!(
            (self.tagging, self.repeat, self.expect),
            (Tagging::Default, Repeat::One, Expect::Choice(_))
        )
    }

    /// Whether a node with `tag` at this position belongs to this field.
    #[must_use]
    pub fn wire_matches(&self, tag: Tag) -> bool {
        match self.tagging {
            Tagging::Explicit(number) => tag == Tag::context(number, true),
            Tagging::Implicit(number) => match self.natural() {
                Some(natural) => tag == natural.implicit(number),
                None => tag.class == Class::ContextSpecific && tag.number == number,
            },
            Tagging::Default => match (self.natural(), self.expect) {
                (Some(natural), _) => tag == natural,
                (None, Expect::Choice(alternatives)) => position(alternatives, tag).is_some(),
                (None, _) => true,
            },
        }
    }
}

/// A structured type described by a field table.
pub trait Schema {
    const NAME: &'static str;
    const TAG: Tag = Tag::SEQUENCE;
    const FIELDS: &'static [Field];
}

/// Field nodes of one structured value, matched against its descriptor.
pub(crate) struct Fields<'a> {
    fields: &'static [Field],
    slots: Vec<Option<Node<'a>>>,
    end: usize,
}

/// Matches the children of `node` against `fields` in declared order.
///
/// Optional fields are skipped when the next child does not carry their tag.
/// Explicit wrappers are removed and implicit tags are replaced by the
/// natural tag, so every slot holds a node its field type can decode.
pub(crate) fn decode_fields<'a>(
    node: &Node<'a>,
    fields: &'static [Field],
) -> Result<Fields<'a>, DecodeError> {
    let mut children = node.children();
    let mut slots = Vec::with_capacity(fields.len());
    for (index, field) in fields.iter().enumerate() {
        let next = children.peek()?;
        match next {
            Some(child) if field.wire_matches(child.tag) => {
                children.next_node()?;
                slots.push(Some(unwrap_tagging(field, child)?));
            }
            // an untagged CHOICE is the only owner of a node no later field claims
            Some(child)
                if field.is_untagged_choice()
                    && !fields[index + 1..]
                        .iter()
                        .any(|later| later.wire_matches(child.tag)) =>
            {
                return Err(DecodeError::NoMatchingChoice {
                    offset: child.offset,
                    choice: field.name,
                    found: child.tag,
                })
            }
            _ if field.optional => {
                trace!(
                    field = field.name,
                    offset = children.offset(),
                    "optional field absent"
                );
                slots.push(None);
            }
            Some(child) => {
                return Err(if field.is_untagged_choice() {
                    DecodeError::NoMatchingChoice {
                        offset: child.offset,
                        choice: field.name,
                        found: child.tag,
                    }
                } else {
                    DecodeError::MissingRequiredField {
                        offset: child.offset,
                        field: field.name,
                        found: Some(child.tag),
                    }
                })
            }
            None => {
                return Err(DecodeError::MissingRequiredField {
                    offset: children.offset(),
                    field: field.name,
                    found: None,
                })
            }
        }
    }
    if !children.is_empty() {
        return Err(DecodeError::UnexpectedTrailingData {
            offset: children.offset(),
            remaining: children.remaining(),
        });
    }
    Ok(Fields {
        fields,
        slots,
        end: node.end(),
    })
}

fn unwrap_tagging<'a>(field: &Field, node: Node<'a>) -> Result<Node<'a>, DecodeError> {
    match field.tagging {
        Tagging::Default => Ok(node),
        Tagging::Implicit(_) => Ok(match field.natural() {
            Some(natural) => node.retagged(natural),
            None => node,
        }),
        Tagging::Explicit(_) => {
            let mut inner = node.children();
            let wrapped = inner
                .next_node()?
                .ok_or(DecodeError::MissingRequiredField {
                    offset: node.value_offset(),
                    field: field.name,
                    found: None,
                })?;
            if !inner.is_empty() {
                return Err(DecodeError::UnexpectedTrailingData {
                    offset: inner.offset(),
                    remaining: inner.remaining(),
                });
            }
            match field.natural() {
                Some(natural) if wrapped.tag != natural => Err(DecodeError::InvalidTag {
                    offset: wrapped.offset,
                    expected: field.name,
                    found: Some(wrapped.tag),
                }),
                _ => Ok(wrapped),
            }
        }
    }
}

impl<'a> Fields<'a> {
    fn slot(&self, index: usize) -> Option<Node<'a>> {
        self.slots.get(index).copied().flatten()
    }

    fn missing(&self, index: usize) -> DecodeError {
        DecodeError::MissingRequiredField {
            offset: self.end,
            field: self.fields.get(index).map_or("?", |f| f.name),
            found: None,
        }
    }

    pub(crate) fn required<T: InternalDecode<'a>>(&self, index: usize) -> Result<T, DecodeError> {
        let node = self.slot(index).ok_or_else(|| self.missing(index))?;
        T::decode_tagged(node)
    }

    pub(crate) fn optional<T: InternalDecode<'a>>(
        &self,
        index: usize,
    ) -> Result<Option<T>, DecodeError> {
        self.slot(index).map(T::decode_tagged).transpose()
    }

    /// Decodes a field declared with a DEFAULT, which DER leaves out when
    /// the value equals `default`.
    pub(crate) fn defaulted<T: InternalDecode<'a> + PartialEq>(
        &self,
        index: usize,
        default: &T,
    ) -> Result<Option<T>, DecodeError> {
        match self.slot(index) {
            Some(node) => {
                let value = T::decode_tagged(node)?;
                if value == *default {
                    return Err(DecodeError::InvalidEncoding {
                        offset: node.offset,
                        reason: "DEFAULT value must be omitted",
                    });
                }
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Decodes the elements of a SEQUENCE OF or SET OF field in wire order.
    pub(crate) fn repeated<T: InternalDecode<'a>>(
        &self,
        index: usize,
    ) -> Result<Vec<T>, DecodeError> {
        let node = self.slot(index).ok_or_else(|| self.missing(index))?;
        decode_elements(node)
    }

    pub(crate) fn optional_repeated<T: InternalDecode<'a>>(
        &self,
        index: usize,
    ) -> Result<Option<Vec<T>>, DecodeError> {
        self.slot(index).map(decode_elements).transpose()
    }
}

pub(crate) fn decode_elements<'a, T: InternalDecode<'a>>(
    node: Node<'a>,
) -> Result<Vec<T>, DecodeError> {
    node.children()
        .map(|child| child.and_then(T::decode_tagged))
        .collect()
}

/// Emits the fields of one structured value in declared order.
///
/// Each call consumes the next descriptor of the table and applies its
/// tagging rule. Encoding fails if descriptors are left over afterwards.
pub struct FieldEncoder<'e> {
    schema: &'static str,
    fields: &'static [Field],
    index: usize,
    output: &'e mut Encoder,
}

impl<'e> FieldEncoder<'e> {
    pub(crate) fn new<S: Schema + ?Sized>(output: &'e mut Encoder) -> Self {
        Self {
            schema: S::NAME,
            fields: S::FIELDS,
            index: 0,
            output,
        }
    }

    fn next_field(&mut self) -> Result<Field, EncodeError> {
        let field = self.fields.get(self.index).copied().ok_or_else(|| {
            EncodeError::Common(alloc::format!(
                "{} declares only {} fields",
                self.schema,
                self.fields.len()
            ))
        })?;
        self.index += 1;
        Ok(field)
    }

    fn emit(
        &mut self,
        field: Field,
        natural: impl FnOnce(&mut Encoder) -> Result<(), EncodeError>,
    ) -> Result<(), EncodeError> {
        match field.tagging {
            Tagging::Default => natural(&mut *self.output),
            Tagging::Explicit(number) => self
                .output
                .constructed(Tag::context(number, true), natural),
            Tagging::Implicit(number) => {
                let mut inner = Encoder::new();
                natural(&mut inner)?;
                self.output.retag(&inner.into_vec(), number)
            }
        }
    }

    fn absent(&self, field: Field) -> Result<(), EncodeError> {
        if field.optional {
            Ok(())
        } else {
            Err(EncodeError::MissingRequiredField(alloc::format!(
                "{}.{}",
                self.schema,
                field.name
            )))
        }
    }

    pub fn field<T: Encode + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        let field = self.next_field()?;
        self.emit(field, |output| value.encode(output))
    }

    pub fn optional<T: Encode>(&mut self, value: Option<&T>) -> Result<(), EncodeError> {
        let field = self.next_field()?;
        match value {
            Some(value) => self.emit(field, |output| value.encode(output)),
            None => self.absent(field),
        }
    }

    pub fn repeated<T: Encode>(&mut self, values: &[T]) -> Result<(), EncodeError> {
        let field = self.next_field()?;
        self.emit(field, |output| match field.repeat {
            Repeat::SetOf => output.set_of(Tag::SET, values),
            _ => output.sequence_of(values),
        })
    }

    pub fn optional_repeated<T: Encode>(&mut self, values: Option<&[T]>) -> Result<(), EncodeError> {
        match values {
            Some(values) => self.repeated(values),
            None => {
                let field = self.next_field()?;
                self.absent(field)
            }
        }
    }

    pub(crate) fn finish(self) -> Result<(), EncodeError> {
        if self.index == self.fields.len() {
            Ok(())
        } else {
            Err(EncodeError::Common(alloc::format!(
                "{} encoded {} of {} fields",
                self.schema,
                self.index,
                self.fields.len()
            )))
        }
    }
}

/// Sorts encoded SET OF elements into DER order.
///
/// Returns `true` if the order changed. A strict prefix sorts before the
/// longer encoding, otherwise octets compare lexicographically.
pub(crate) fn canonical_order(elements: &mut [Vec<u8>]) -> bool {
    let sorted = elements.windows(2).all(|pair| pair[0] <= pair[1]);
    if !sorted {
        elements.sort();
    }
    !sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tlv::parse;
    use alloc::vec;

    struct Pair;

    impl Schema for Pair {
        const NAME: &'static str = "Pair";
        const FIELDS: &'static [Field] = &[
            Field::new("flag", Tag::BOOLEAN).optional(),
            Field::new("number", Tag::INTEGER),
            Field::new("label", Tag::OCTET_STRING).implicit(0).optional(),
            Field::new("extra", Tag::INTEGER).explicit(1).optional(),
        ];
    }

    fn slots(data: &[u8]) -> Result<Vec<Option<Tag>>, DecodeError> {
        let node = parse(data)?;
        let fields = decode_fields(&node, Pair::FIELDS)?;
        Ok(fields.slots.iter().map(|s| s.map(|n| n.tag)).collect())
    }

    #[test]
    fn skips_absent_optionals() {
        assert_eq!(
            slots(&[0x30, 0x03, 0x02, 0x01, 0x07]).unwrap(),
            vec![None, Some(Tag::INTEGER), None, None]
        );
        assert_eq!(
            slots(&[
                0x30, 0x0d, 0x01, 0x01, 0xff, 0x02, 0x01, 0x07, 0xa1, 0x03, 0x02, 0x01, 0x01,
                0x05, 0x00
            ])
            .unwrap_err(),
            DecodeError::UnexpectedTrailingData {
                offset: 13,
                remaining: 2
            }
        );
    }

    #[test]
    fn unwraps_tagging() {
        let data = [
            0x30, 0x0c, 0x02, 0x01, 0x07, 0x80, 0x02, 0xaa, 0xbb, 0xa1, 0x03, 0x02, 0x01, 0x01,
        ];
        let node = parse(&data).unwrap();
        let fields = decode_fields(&node, Pair::FIELDS).unwrap();
        let label: &[u8] = fields.required(2).unwrap();
        assert_eq!(label, &[0xaa, 0xbb]);
        let extra: i64 = fields.required(3).unwrap();
        assert_eq!(extra, 1);
        assert_eq!(fields.slot(3).unwrap().offset, 11);
        let flag: Option<bool> = fields.optional(0).unwrap();
        assert_eq!(flag, None);
    }

    #[test]
    fn reports_missing_required_field() {
        assert_eq!(
            slots(&[0x30, 0x03, 0x01, 0x01, 0xff]),
            Err(DecodeError::MissingRequiredField {
                offset: 5,
                field: "number",
                found: None
            })
        );
        assert_eq!(
            slots(&[0x30, 0x02, 0x05, 0x00]),
            Err(DecodeError::MissingRequiredField {
                offset: 2,
                field: "number",
                found: Some(Tag::NULL)
            })
        );
    }

    #[test]
    fn rejects_extra_elements_in_explicit_wrapper() {
        let data = [
            0x30, 0x0b, 0x02, 0x01, 0x07, 0xa1, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02,
        ];
        assert_eq!(
            slots(&data),
            Err(DecodeError::UnexpectedTrailingData {
                offset: 10,
                remaining: 3
            })
        );
    }

    #[test]
    fn rejects_wrong_tag_inside_explicit_wrapper() {
        // [1] EXPLICIT INTEGER holding a BOOLEAN
        let data = [
            0x30, 0x08, 0x02, 0x01, 0x07, 0xa1, 0x03, 0x01, 0x01, 0xff,
        ];
        assert_eq!(
            slots(&data),
            Err(DecodeError::InvalidTag {
                offset: 7,
                expected: "extra",
                found: Some(Tag::BOOLEAN)
            })
        );
    }

    #[test]
    fn encodes_in_declared_order() {
        let mut encoder = Encoder::new();
        encoder
            .sequence::<Pair>(|fields| {
                fields.optional::<bool>(None)?;
                fields.field(&7i64)?;
                fields.optional(Some(&&[0xaa_u8, 0xbb][..]))?;
                fields.optional(Some(&1i64))
            })
            .unwrap();
        assert_eq!(
            encoder.into_vec(),
            [0x30, 0x0c, 0x02, 0x01, 0x07, 0x80, 0x02, 0xaa, 0xbb, 0xa1, 0x03, 0x02, 0x01, 0x01]
        );
    }

    #[test]
    fn rejects_missing_required_field_on_encode() {
        let mut encoder = Encoder::new();
        let result = encoder.sequence::<Pair>(|fields| {
            fields.optional::<bool>(None)?;
            fields.optional::<i64>(None)
        });
        assert!(matches!(result, Err(EncodeError::MissingRequiredField(_))));

        let mut encoder = Encoder::new();
        let result = encoder.sequence::<Pair>(|fields| {
            fields.optional::<bool>(None)?;
            fields.field(&7i64)
        });
        assert!(matches!(result, Err(EncodeError::Common(_))));
    }

    #[test]
    fn sorts_prefix_first() {
        let mut elements = vec![vec![0x02, 0x01], vec![0x02], vec![0x01, 0xff]];
        assert!(canonical_order(&mut elements));
        assert_eq!(elements, vec![vec![0x01, 0xff], vec![0x02], vec![0x02, 0x01]]);
        assert!(!canonical_order(&mut elements));
    }
}
