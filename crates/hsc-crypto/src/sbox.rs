//! Serpent S-boxes S0..S7 and their inverses, applied in bitslice layout
//!
//! After [`crate::bitslice::transpose`], bit `i` of word `k` is input bit `k`
//! of the `i`-th of 32 parallel 4-bit S-box instances. One call substitutes
//! all 32 nibbles of a block.

use crate::Block;

/// Number of distinct S-boxes
pub const SBOX_COUNT: usize = 8;

pub const SBOX: [[u8; 16]; SBOX_COUNT] = [
    [3, 8, 15, 1, 10, 6, 5, 11, 14, 13, 4, 2, 7, 0, 9, 12],
    [15, 12, 2, 7, 9, 0, 5, 10, 1, 11, 14, 8, 13, 4, 6, 3],
    [8, 6, 7, 9, 3, 12, 10, 15, 13, 1, 14, 4, 0, 11, 5, 2],
    [0, 15, 11, 8, 12, 9, 6, 3, 13, 1, 2, 4, 10, 7, 5, 14],
    [1, 15, 8, 3, 12, 0, 11, 6, 2, 5, 4, 10, 9, 14, 7, 13],
    [15, 5, 2, 11, 4, 10, 9, 12, 0, 3, 14, 8, 13, 6, 7, 1],
    [7, 2, 12, 5, 8, 4, 6, 11, 14, 9, 1, 15, 13, 3, 10, 0],
    [1, 13, 15, 0, 14, 8, 2, 11, 7, 4, 12, 10, 9, 3, 5, 6],
];

pub const INV_SBOX: [[u8; 16]; SBOX_COUNT] = [
    [13, 3, 11, 0, 10, 6, 5, 12, 1, 14, 4, 7, 15, 9, 8, 2],
    [5, 8, 2, 15, 13, 6, 14, 3, 11, 4, 7, 9, 1, 12, 10, 0],
    [12, 9, 15, 4, 11, 14, 1, 2, 0, 3, 6, 13, 5, 8, 10, 7],
    [0, 9, 10, 7, 11, 14, 6, 13, 3, 5, 12, 2, 4, 8, 15, 1],
    [5, 0, 8, 3, 10, 9, 7, 14, 2, 12, 11, 6, 4, 15, 13, 1],
    [8, 15, 2, 9, 4, 1, 13, 14, 11, 6, 5, 3, 7, 12, 10, 0],
    [15, 10, 1, 13, 5, 3, 6, 0, 4, 9, 14, 7, 2, 12, 8, 11],
    [3, 0, 6, 13, 9, 14, 15, 8, 5, 12, 11, 7, 10, 1, 4, 2],
];

/// Substitute every nibble of a bitsliced block through `S[index mod 8]`.
pub fn apply_sbox(index: usize, x: &mut Block) {
    substitute(&SBOX[index % SBOX_COUNT], x);
}

/// Substitute every nibble of a bitsliced block through `S⁻¹[index mod 8]`.
pub fn apply_inverse_sbox(index: usize, x: &mut Block) {
    substitute(&INV_SBOX[index % SBOX_COUNT], x);
}

fn substitute(table: &[u8; 16], x: &mut Block) {
    let mut y = [0u32; 4];
    for bit in 0..32 {
        let input = (x[0] >> bit & 1)
            | (x[1] >> bit & 1) << 1
            | (x[2] >> bit & 1) << 2
            | (x[3] >> bit & 1) << 3;
        let output = u32::from(table[input as usize]);
        for (k, word) in y.iter_mut().enumerate() {
            *word |= (output >> k & 1) << bit;
        }
    }
    *x = y;
}
