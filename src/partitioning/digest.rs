//! Ring-point derivation from MD5 digests.
//!
//! Placement points and key hashes must come from the same extraction so
//! that a key lands between the points its owner contributed. One digest
//! yields four points: the four non-overlapping little-endian u32 words
//! of the 16-byte output.

use md5::{Digest, Md5};

/// Digest invocations per shard when building the ring.
pub(crate) const RUNS_PER_SHARD: usize = 40;

/// Points extracted from one digest.
pub(crate) const POINTS_PER_RUN: usize = 4;

/// The four little-endian u32 words of `input`'s MD5 digest.
pub(crate) fn digest_points(input: &[u8]) -> [u32; POINTS_PER_RUN] {
    let d = Md5::digest(input);
    let mut points = [0u32; POINTS_PER_RUN];
    for (i, point) in points.iter_mut().enumerate() {
        let w = &d[i * 4..i * 4 + 4];
        *point = u32::from_le_bytes([w[0], w[1], w[2], w[3]]);
    }
    points
}

/// Hash position of a key on the ring: the first word of its digest.
pub(crate) fn key_point(key: &[u8]) -> u32 {
    digest_points(key)[0]
}
