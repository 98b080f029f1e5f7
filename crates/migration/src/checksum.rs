use sha2::{Digest, Sha256};

const SHORT_LEN: usize = 12;

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Leading characters of a checksum, enough to tell two files apart on a
/// console line.
pub fn short(checksum: &str) -> &str {
    match checksum.char_indices().nth(SHORT_LEN) {
        Some((idx, _)) => &checksum[..idx],
        None => checksum,
    }
}
