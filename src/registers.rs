//! ## Register store
//! Packed array of `M` fixed-width registers of `W` bits each, backed by
//! `ceil(M * W / 8)` bytes.
//!
//! Register `i` occupies bits `[i * W, (i + 1) * W)` of a logical bitstream
//! laid out most-significant-bit first within each byte, independent of byte
//! alignment. Since `W <= 8`, a register either fits in a single byte or
//! straddles exactly two adjacent bytes:
//!
//! ```text
//!  byte 0            byte 1            byte 2
//! [r0 r0 r0 r0 r0 r0 r1 r1][r1 r1 r1 r1 r2 r2 r2 r2][r2 r2 r3 r3 r3 r3 r3 r3]
//! ```
//!
//! A straddling register is split into a head fragment (the high-order bits of
//! the value, stored in the low bits of the first byte) and a tail fragment
//! (the low-order bits of the value, stored in the high bits of the second byte).
//!
//! `set` only ORs bits in; callers must `clear` a register before `set` to
//! overwrite rather than accumulate (or use `replace`).

use std::fmt::{Debug, Formatter};
use std::mem::size_of;

const BITS_PER_BYTE: usize = 8;

#[derive(Clone, PartialEq, Eq)]
pub struct RegisterStore<const W: usize = 6> {
    /// Number of registers
    len: usize,
    /// Packed register bits
    bytes: Vec<u8>,
}

/// Byte position of a single register within the packed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    /// Index of the byte holding the register's high-order bits
    byte: usize,
    /// Number of register bits stored in `byte`
    head_bits: usize,
    /// Number of register bits stored in `byte + 1` (zero when not straddling)
    tail_bits: usize,
    /// Right shift aligning the head fragment to bit 0 of `byte`
    head_shift: usize,
}

impl<const W: usize> RegisterStore<W> {
    /// Ensure that `W` is in `[1..8]` range at compile time
    const VALID_WIDTH: () = assert!(W >= 1 && W <= 8);
    /// Largest value a register can hold
    pub const MAX_VALUE: u8 = u8::MAX >> (BITS_PER_BYTE - W);

    /// Create new store of `len` zeroed registers
    pub fn new(len: usize) -> Self {
        // compile time check of params
        _ = Self::VALID_WIDTH;

        Self {
            len,
            bytes: vec![0u8; Self::bytes_for(len)],
        }
    }

    /// Number of bytes needed to pack `len` registers
    #[inline]
    pub const fn bytes_for(len: usize) -> usize {
        (len * W).div_ceil(BITS_PER_BYTE)
    }

    /// Return number of registers
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Return whether the store holds no registers at all
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Return packed register bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Return memory size of the store
    pub fn size_of(&self) -> usize {
        size_of::<Self>() + self.bytes.len()
    }

    #[inline]
    fn span(&self, idx: usize) -> Span {
        debug_assert!(idx < self.len, "register {idx} out of range 0..{}", self.len);
        let start_bit = idx * W;
        let offset = start_bit % BITS_PER_BYTE;
        let head_bits = W.min(BITS_PER_BYTE - offset);
        Span {
            byte: start_bit / BITS_PER_BYTE,
            head_bits,
            tail_bits: W - head_bits,
            head_shift: BITS_PER_BYTE - offset - head_bits,
        }
    }

    /// Get `idx` register
    #[inline]
    pub fn get(&self, idx: usize) -> u8 {
        let s = self.span(idx);
        let head = (self.bytes[s.byte] >> s.head_shift) & mask(s.head_bits);
        if s.tail_bits == 0 {
            return head;
        }
        let tail = self.bytes[s.byte + 1] >> (BITS_PER_BYTE - s.tail_bits);
        (head << s.tail_bits) | tail
    }

    /// Zero out `idx` register, leaving its neighbours untouched
    #[inline]
    pub fn clear(&mut self, idx: usize) {
        let s = self.span(idx);
        self.bytes[s.byte] &= !(mask(s.head_bits) << s.head_shift);
        if s.tail_bits != 0 {
            self.bytes[s.byte + 1] &= !(mask(s.tail_bits) << (BITS_PER_BYTE - s.tail_bits));
        }
    }

    /// OR `value` into `idx` register; bits above `W` are ignored
    #[inline]
    pub fn set(&mut self, idx: usize, value: u8) {
        debug_assert!(value <= Self::MAX_VALUE, "value {value} wider than {W} bits");
        let s = self.span(idx);
        let value = value & Self::MAX_VALUE;
        self.bytes[s.byte] |= ((value >> s.tail_bits) & mask(s.head_bits)) << s.head_shift;
        if s.tail_bits != 0 {
            self.bytes[s.byte + 1] |=
                (value & mask(s.tail_bits)) << (BITS_PER_BYTE - s.tail_bits);
        }
    }

    /// Overwrite `idx` register with `value`
    #[inline]
    pub fn replace(&mut self, idx: usize, value: u8) {
        self.clear(idx);
        self.set(idx, value);
    }

    /// Iterate over all register values in index order
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.len).map(|idx| self.get(idx))
    }
}

impl<const W: usize> Debug for RegisterStore<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ width: {}, registers: {}, bytes: {} }}",
            W,
            self.len,
            self.bytes.len()
        )
    }
}

/// Mask of `bits` low-order ones, `bits` in `[1..8]`
#[inline]
fn mask(bits: usize) -> u8 {
    u8::MAX >> (BITS_PER_BYTE - bits)
}
