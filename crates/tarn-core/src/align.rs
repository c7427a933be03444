//! Power-of-two alignment arithmetic.
//!
//! All helpers take `align` as a power of two; passing anything else is a
//! caller bug and is caught by `debug_assert!`.

/// Whether `n` is a non-zero power of two.
#[inline]
pub fn is_power_of_two(n: usize) -> bool {
    n.is_power_of_two()
}

/// Round `n` down to a multiple of `align`.
#[inline]
pub fn align_down(n: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two(), "alignment {align} is not a power of two");
    n & !(align - 1)
}

/// Round `n` up to a multiple of `align`.
///
/// Returns `None` if the result does not fit in `usize`.
#[inline]
pub fn align_up(n: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two(), "alignment {align} is not a power of two");
    Some(align_down(n.checked_add(align - 1)?, align))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_next_multiple() {
        assert_eq!(align_up(0, 8), Some(0));
        assert_eq!(align_up(1, 8), Some(8));
        assert_eq!(align_up(8, 8), Some(8));
        assert_eq!(align_up(4097, 4096), Some(8192));
    }

    #[test]
    fn align_up_overflow_is_none() {
        assert_eq!(align_up(usize::MAX, 16), None);
    }

    #[test]
    fn align_down_truncates() {
        assert_eq!(align_down(15, 8), 8);
        assert_eq!(align_down(16, 8), 16);
        assert_eq!(align_down(3, 1), 3);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn align_up_is_smallest_aligned_ceiling(
                n in 0usize..1 << 40,
                shift in 0u32..16,
            ) {
                let align = 1usize << shift;
                let up = align_up(n, align).unwrap();
                prop_assert_eq!(up % align, 0);
                prop_assert!(up >= n);
                prop_assert!(up - n < align);
            }
        }
    }
}
