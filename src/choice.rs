use tracing::trace;

use crate::{decode::DecodeError, tlv::Node, tlv::Tag};

/// One arm of a CHOICE, identified by the tag it appears with on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alternative {
    pub name: &'static str,
    pub tag: Tag,
}

impl Alternative {
    #[must_use]
    pub const fn new(name: &'static str, tag: Tag) -> Self {
        Self { name, tag }
    }
}

/// A CHOICE type: a closed set of alternatives with pairwise distinct tags.
pub trait Choice<'a>: Sized {
    const NAME: &'static str;
    const ALTERNATIVES: &'static [Alternative];

    /// Decodes `node` as the alternative at `index` in `ALTERNATIVES`.
    fn decode_alternative(index: usize, node: Node<'a>) -> Result<Self, DecodeError>;

    /// Selects the alternative whose tag equals the tag of `node`.
    fn resolve(node: Node<'a>) -> Result<Self, DecodeError> {
        let index = position(Self::ALTERNATIVES, node.tag).ok_or(DecodeError::NoMatchingChoice {
            offset: node.offset,
            choice: Self::NAME,
            found: node.tag,
        })?;
        trace!(
            choice = Self::NAME,
            alternative = Self::ALTERNATIVES[index].name,
            offset = node.offset,
            "resolved choice"
        );
        Self::decode_alternative(index, node)
    }
}

pub(crate) fn position(alternatives: &[Alternative], tag: Tag) -> Option<usize> {
    alternatives.iter().position(|alternative| alternative.tag == tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        primitive::{DateTime, Time},
        tlv::read_node,
    };

    #[test]
    fn resolves_by_tag() {
        let data = b"\x17\x0d240531220000Z";
        let (node, _) = read_node(data, 0).unwrap();
        assert_eq!(
            Time::resolve(node).unwrap(),
            Time::UtcTime(DateTime::new(2024, 5, 31, 22, 0, 0).unwrap())
        );

        let data = b"\x18\x0f20500101000000Z";
        let (node, _) = read_node(data, 0).unwrap();
        assert!(matches!(Time::resolve(node), Ok(Time::GeneralTime(_))));
    }

    #[test]
    fn reports_unmatched_tag() {
        let (node, _) = read_node(&[0x05, 0x00, 0x17, 0x00], 2).unwrap();
        let node = Node {
            tag: Tag::NULL,
            ..node
        };
        assert_eq!(
            Time::resolve(node),
            Err(DecodeError::NoMatchingChoice {
                offset: 2,
                choice: "Time",
                found: Tag::NULL
            })
        );
    }

    #[test]
    fn shifts_alternative_errors_to_absolute_offsets() {
        let data = b"\x05\x00\x17\x0d2405312200a0Z";
        let (node, _) = read_node(data, 2).unwrap();
        assert_eq!(
            Time::resolve(node),
            Err(DecodeError::InvalidEncoding {
                offset: 14,
                reason: "time contains non-digit characters"
            })
        );
    }
}
