use alloc::vec::Vec;

use bitvec::prelude::*;

/// Writes `bits` into `vec` byte by byte, padding the last byte with
/// trailing zero bits.
pub(crate) fn write_into_vec_right_padded(bits: &BitSlice<u8, Msb0>, vec: &mut Vec<u8>) {
    for chunk in bits.chunks(8) {
        let byte: u8 = chunk.load_be();
        vec.push(byte << (8 - chunk.len()));
    }
}

/// Strips redundant sign octets from a big-endian two's complement integer.
pub(crate) fn minimal_integer(bytes: &[u8]) -> &[u8] {
    let mut bytes = bytes;
    while let [first, second, ..] = bytes {
        let redundant = (*first == 0x00 && second & 0x80 == 0) || (*first == 0xFF && second & 0x80 != 0);
        if !redundant {
            break;
        }
        bytes = &bytes[1..];
    }
    bytes
}

/// Appends `value` in base 128, most significant group first, with the
/// continuation bit set on all but the last group.
pub(crate) fn write_base128(value: u64, vec: &mut Vec<u8>) {
    let mut groups = [0u8; 10];
    let mut count = 0;
    let mut remaining = value;
    loop {
        #[allow(clippy::cast_possible_truncation)]
        let group = (remaining & 0x7f) as u8;
        groups[count] = group;
        count += 1;
        remaining >>= 7;
        if remaining == 0 {
            break;
        }
    }
    for i in (0..count).rev() {
        vec.push(if i == 0 { groups[i] } else { groups[i] | 0x80 });
    }
}

/// Position of `inner` inside `outer`. `inner` must be a sub-slice of `outer`.
pub(crate) fn offset_within(outer: &[u8], inner: &[u8]) -> usize {
    (inner.as_ptr() as usize).saturating_sub(outer.as_ptr() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_bits_on_the_right() {
        let mut vec = alloc::vec![];
        write_into_vec_right_padded(bits![u8, Msb0; 1, 0, 1, 1, 0, 0, 0, 0, 1], &mut vec);
        assert_eq!(vec, [0b1011_0000, 0b1000_0000]);
    }

    #[test]
    fn trims_integers() {
        assert_eq!(minimal_integer(&[0, 0, 0, 1]), &[1]);
        assert_eq!(minimal_integer(&[0, 0x80]), &[0, 0x80]);
        assert_eq!(minimal_integer(&[0xff, 0xff, 0x80]), &[0x80]);
        assert_eq!(minimal_integer(&[0xff, 0x7f]), &[0xff, 0x7f]);
        assert_eq!(minimal_integer(&[0]), &[0]);
    }

    #[test]
    fn writes_base128() {
        let mut vec = alloc::vec![];
        write_base128(840, &mut vec);
        write_base128(0, &mut vec);
        write_base128(113_549, &mut vec);
        assert_eq!(vec, [0x86, 0x48, 0x00, 0x86, 0xf7, 0x0d]);
    }

    #[test]
    fn locates_sub_slices() {
        let buffer = [0u8; 8];
        assert_eq!(offset_within(&buffer, &buffer[3..5]), 3);
    }
}
