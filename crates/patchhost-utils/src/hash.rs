//! Stable content hashes.
//!
//! Both functions are FNV-1a (Fowler-Noll-Vo): start from the offset basis,
//! then for each byte XOR it into the hash and multiply by the FNV prime.
//! The results are identical across platforms and compiler versions, which
//! matters because unique identifiers derived from them end up persisted in
//! host session files.

/// Compute the FNV-1a 32-bit hash of a string.
///
/// Used to derive a plugin's numeric unique identifier from its textual
/// patch identifier.
///
/// ```
/// use patchhost_utils::fnv1a_32;
///
/// const ID: u32 = fnv1a_32("Patch:{}");
/// assert_eq!(ID, fnv1a_32("Patch:{}"));
/// ```
#[inline]
pub const fn fnv1a_32(s: &str) -> u32 {
    const FNV_OFFSET: u32 = 2166136261;
    const FNV_PRIME: u32 = 16777619;

    let bytes = s.as_bytes();
    let mut hash = FNV_OFFSET;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Compute the FNV-1a 64-bit hash of a byte slice.
///
/// Used on every incoming state blob so that a host redelivering the exact
/// same bytes can be detected without decoding them.
#[inline]
pub const fn fnv1a_64(bytes: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}
