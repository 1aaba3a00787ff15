//! Bitslice layout and the linear diffusion layer
//!
//! The transpose treats the 128 input bits as a 32×4 matrix (bit `i` lives
//! in word `i / 32`, position `i % 32`) and moves bit `i` to word `i % 4`,
//! position `i / 4`. Afterwards four consecutive input bits sit at the same
//! position across the four words, which is the layout `sbox` expects.

use crate::Block;

/// Rearrange a block into bitslice layout.
pub fn transpose(data: &mut Block) {
    let mut out = [0u32; 4];
    for i in 0..128 {
        if data[i / 32] >> (i % 32) & 1 == 1 {
            out[i % 4] |= 1 << (i / 4);
        }
    }
    *data = out;
}

/// Undo [`transpose`].
pub fn inverse_transpose(data: &mut Block) {
    let mut out = [0u32; 4];
    for i in 0..128 {
        if data[i % 4] >> (i / 4) & 1 == 1 {
            out[i / 32] |= 1 << (i % 32);
        }
    }
    *data = out;
}

/// Serpent linear transformation, applied after the S-box in rounds 0..=30.
pub fn linear_transform(x: &mut Block) {
    let [mut x0, mut x1, mut x2, mut x3] = *x;

    x0 = x0.rotate_left(13);
    x2 = x2.rotate_left(3);
    x1 ^= x0 ^ x2;
    x3 ^= x2 ^ (x0 << 3);
    x1 = x1.rotate_left(1);
    x3 = x3.rotate_left(7);
    x0 ^= x1 ^ x3;
    x2 ^= x3 ^ (x1 << 7);
    x0 = x0.rotate_left(5);
    x2 = x2.rotate_left(22);

    *x = [x0, x1, x2, x3];
}

/// Undo [`linear_transform`]: the same steps in reverse order, rotating right.
pub fn inverse_linear_transform(x: &mut Block) {
    let [mut x0, mut x1, mut x2, mut x3] = *x;

    x2 = x2.rotate_right(22);
    x0 = x0.rotate_right(5);
    x2 ^= x3 ^ (x1 << 7);
    x0 ^= x1 ^ x3;
    x3 = x3.rotate_right(7);
    x1 = x1.rotate_right(1);
    x3 ^= x2 ^ (x0 << 3);
    x1 ^= x0 ^ x2;
    x2 = x2.rotate_right(3);
    x0 = x0.rotate_right(13);

    *x = [x0, x1, x2, x3];
}
