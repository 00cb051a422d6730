/// Round `value` up to a multiple of `align`.
/// `align` must be power of two.
pub(crate) fn aligned(value: u64, align: u64) -> u64 {
    debug_assert!(align.is_power_of_two());
    if value == 0 {
        0
    } else {
        1u64 + ((value - 1u64) | (align - 1u64))
    }
}

#[cfg(target_pointer_width = "64")]
pub(crate) fn fits_usize(_value: u64) -> bool {
    true
}

#[cfg(not(target_pointer_width = "64"))]
pub(crate) fn fits_usize(value: u64) -> bool {
    value <= usize::max_value() as u64
}

/// Check that `sub` lies within `0..size`.
pub(crate) fn fits_in(size: u64, sub: &std::ops::Range<u64>) -> bool {
    sub.start <= sub.end && sub.end <= size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_rounds_up_to_power_of_two() {
        assert_eq!(aligned(0, 256), 0);
        assert_eq!(aligned(1, 256), 256);
        assert_eq!(aligned(256, 256), 256);
        assert_eq!(aligned(257, 256), 512);
        assert_eq!(aligned(384, 128), 384);
        assert_eq!(aligned(7, 1), 7);
    }

    #[test]
    fn fits_in_checks_bounds() {
        assert!(fits_in(128, &(0..128)));
        assert!(fits_in(128, &(64..64)));
        assert!(!fits_in(128, &(64..129)));
    }
}
