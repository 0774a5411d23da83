// Wed Feb 04 2026 - Alex

//! Little-endian integer helpers for spans up to 16 bytes.

pub(crate) fn read_uint(bytes: &[u8]) -> u128 {
    bytes.iter().take(16).rev().fold(0u128, |acc, b| (acc << 8) | u128::from(*b))
}

pub(crate) fn write_uint(value: u128, width: usize) -> Vec<u8> {
    value.to_le_bytes().iter().copied().chain(std::iter::repeat(0)).take(width).collect()
}

pub(crate) fn mask(bits: u32) -> u128 {
    if bits >= 128 {
        u128::MAX
    } else {
        (1u128 << bits) - 1
    }
}

pub(crate) fn sign_extend(value: u128, bits: u32) -> i128 {
    if bits == 0 {
        return 0;
    }
    if bits >= 128 {
        return value as i128;
    }
    let shift = 128 - bits;
    ((value << shift) as i128) >> shift
}

/// Two's complement of `value` in `bits` bits, if it is representable.
pub(crate) fn fit_signed(value: i128, bits: u32) -> Option<u128> {
    if bits == 0 {
        return (value == 0).then_some(0);
    }
    if bits >= 128 {
        return Some(value as u128);
    }
    let min = -(1i128 << (bits - 1));
    let max = (1i128 << (bits - 1)) - 1;
    (min..=max).contains(&value).then(|| (value as u128) & mask(bits))
}

pub(crate) fn fit_unsigned(value: u128, bits: u32) -> Option<u128> {
    (value <= mask(bits)).then_some(value)
}
