// src/data_gen.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Payload generation for benchmark objects.

use once_cell::sync::Lazy;
use rand::Rng;

const BLOCK_SIZE: usize = 512;

/// A base random block of 512 bytes, generated once.
static BASE_BLOCK: Lazy<Vec<u8>> = Lazy::new(|| {
    let mut block = vec![0u8; BLOCK_SIZE];
    rand::rngs::ThreadRng::default().fill(&mut block[..]);
    block
});

/// Generates exactly `size` bytes of incompressible, non-deduplicable data.
///
/// Each 512-byte block starts as a copy of a static base block; its first 32
/// bytes (and last 32, for blocks over 128 bytes) are then re-randomized, so
/// every block is unique without paying for a full random fill.
pub fn generate_random_data(size: usize) -> Vec<u8> {
    let mut data = vec![0u8; size];
    let mut rng = rand::rngs::ThreadRng::default();

    for chunk in data.chunks_mut(BLOCK_SIZE) {
        let len = chunk.len();
        chunk.copy_from_slice(&BASE_BLOCK[..len]);

        let head = len.min(32);
        rng.fill(&mut chunk[..head]);
        if len > 128 {
            rng.fill(&mut chunk[len - 32..]);
        }
    }
    data
}
