//! Short profile identifiers.
//!
//! 64 random bits, base-32 encoded (RFC 4648 alphabet, no padding) to 13
//! characters, then cut to the first [`ID_LEN`]. Eight characters plus the
//! three-character key prefix (`pf_`) stays under the 15-byte NVS key limit.

use crate::app::ports::EntropyPort;

/// Length of a generated profile id.
pub const ID_LEN: usize = 8;

/// Characters needed to cover 64 bits at 5 bits per character.
const FULL_LEN: usize = 13;

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Encode `v` most-significant group first. The leading group only has 4 bits.
pub fn base32_u64(v: u64) -> heapless::String<FULL_LEN> {
    let mut out = heapless::String::new();
    for i in (0..FULL_LEN).rev() {
        let shift = i * 5;
        let idx = if shift >= 64 { 0 } else { ((v >> shift) & 0x1F) as usize };
        let _ = out.push(ALPHABET[idx] as char);
    }
    out
}

/// Draw a fresh id. No uniqueness check; see
/// [`ProfileCatalog`](crate::catalog::ProfileCatalog) for the collision guard.
pub fn generate_id(rng: &mut impl EntropyPort) -> String {
    base32_u64(rng.next_u64())[..ID_LEN].to_owned()
}
