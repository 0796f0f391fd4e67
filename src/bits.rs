//! Bit-parallel primitives for the block scanner.
//!
//! Every mask in the scanner is a `u64` with bit *i* describing byte *i*
//! of a 64 byte block, least significant bit first. The helpers here are
//! the small vocabulary the scanner is written in.

/// Isolates the lowest set bit of `bits`.
#[inline(always)]
pub fn lowest_bit(bits: u64) -> u64 {
    bits & bits.wrapping_neg()
}

/// Clears the lowest set bit of `bits`.
#[inline(always)]
pub fn clear_lowest_bit(bits: u64) -> u64 {
    bits & bits.wrapping_sub(1)
}

/// Adds `lhs` and `rhs`, returning the sum and whether it overflowed.
#[inline(always)]
pub fn add_overflow(lhs: u64, rhs: u64) -> (u64, bool) {
    lhs.overflowing_add(rhs)
}

/// Computes the running XOR over all bits up to and including each bit.
///
/// Turns a mask of region toggles into a mask of region interiors: bit
/// *i* of the result is set iff an odd number of toggles occur at or
/// below position *i*. This is a carry-less multiplication by all-ones;
/// targets with CLMUL get the single instruction, everything else gets
/// the shift-xor ladder.
#[inline]
pub fn prefix_xor(bits: u64) -> u64 {
    #[cfg(all(
        target_arch = "x86_64",
        target_feature = "pclmulqdq",
        target_feature = "sse2"
    ))]
    {
        // SAFETY: the pclmulqdq and sse2 features are statically enabled.
        unsafe {
            use core::arch::x86_64::{
                _mm_clmulepi64_si128, _mm_cvtsi128_si64, _mm_set_epi64x,
            };
            let product = _mm_clmulepi64_si128::<0>(
                _mm_set_epi64x(0, bits as i64),
                _mm_set_epi64x(0, -1i64),
            );
            _mm_cvtsi128_si64(product) as u64
        }
    }
    #[cfg(not(all(
        target_arch = "x86_64",
        target_feature = "pclmulqdq",
        target_feature = "sse2"
    )))]
    {
        let mut bits = bits;
        bits ^= bits << 1;
        bits ^= bits << 2;
        bits ^= bits << 4;
        bits ^= bits << 8;
        bits ^= bits << 16;
        bits ^= bits << 32;
        bits
    }
}

/// Shifts `matches` one position up, carrying across block boundaries.
///
/// Bit *i* of the result is set iff bit *i − 1* of `matches` is set, with
/// bit 0 taken from the previous block's `overflow`. The new overflow is
/// stored back for the next block.
#[inline(always)]
pub fn follows(matches: u64, overflow: &mut u64) -> u64 {
    let result = matches << 1 | *overflow;
    *overflow = matches >> 63;
    result
}

/// Finds the bytes that are escaped by a backslash.
///
/// Returns a mask of the *escaped* characters, not of the backslashes
/// that escape them. A backslash that is itself escaped does not escape
/// its successor, so runs of backslashes alternate; `is_escaped` carries
/// the state of the first byte of the next block.
///
/// After simdjson.
#[inline]
pub fn find_escaped(backslash: u64, is_escaped: &mut u64) -> u64 {
    let backslash = backslash & !*is_escaped;

    let follows_escape = backslash << 1 | *is_escaped;

    // Get sequences starting on even bits by clearing out the odd ones.
    const EVEN_BITS: u64 = 0x5555_5555_5555_5555;
    let odd_sequence_starts = backslash & !EVEN_BITS & !follows_escape;
    let (sequences_starting_on_even_bits, overflow) =
        add_overflow(odd_sequence_starts, backslash);
    *is_escaped = overflow as u64;

    // The mask to return covers the escaped characters, not the escapes.
    let invert_mask = sequences_starting_on_even_bits << 1;

    // Mask every other backslashed character as an escaped character and
    // flip the mask for sequences that start on even bits.
    (EVEN_BITS ^ invert_mask) & follows_escape
}

//============ Testing =======================================================
