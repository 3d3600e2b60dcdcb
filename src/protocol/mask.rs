//! Payload masking (RFC 6455 Section 5.3).
//!
//! Byte `i` of a masked payload is XORed with `key[i % 4]`. Masking is an
//! involution: applying the same key twice restores the input.

/// XOR `data` with `mask`, treating `data[0]` as payload byte 0.
#[inline]
pub fn apply_mask(data: &mut [u8], mask: [u8; 4]) {
    apply_mask_offset(data, mask, 0);
}

/// XOR `data` with `mask`, treating `data[0]` as payload byte `offset`.
///
/// Used by the streaming payload reader, which unmasks whatever chunk the
/// transport returned while carrying the running index across reads.
#[inline]
pub fn apply_mask_offset(data: &mut [u8], mask: [u8; 4], offset: u64) {
    // Rotate so that the key lines up with data[0], then walk in 4-byte words.
    let shift = (offset % 4) as usize;
    let key = [
        mask[shift],
        mask[(shift + 1) % 4],
        mask[(shift + 2) % 4],
        mask[(shift + 3) % 4],
    ];
    let key_u32 = u32::from_ne_bytes(key);

    let mut chunks = data.chunks_exact_mut(4);
    for chunk in &mut chunks {
        let val = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        chunk.copy_from_slice(&(val ^ key_u32).to_ne_bytes());
    }
    for (i, byte) in chunks.into_remainder().iter_mut().enumerate() {
        *byte ^= key[i];
    }
}
