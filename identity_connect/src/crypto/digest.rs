/// Calculate the SHA2-256 of a piece of arbitrary data
pub fn sha256(content: &[u8]) -> [u8; 32] {
    use sha2::Digest;
    sha2::Sha256::digest(content).into()
}

/// SHA2-256 folded onto itself with XOR, giving a 128 bit checksum
pub fn reduced_sha256(content: &[u8]) -> [u8; 16] {
    let hash = sha256(content);
    let mut reduced = [0u8; 16];
    for (i, byte) in reduced.iter_mut().enumerate() {
        *byte = hash[i] ^ hash[i + 16];
    }

    reduced
}

/// CRC32 used to tag public keys
pub fn key_crc(public_key_der: &[u8]) -> u32 {
    crc32fast::hash(public_key_der)
}
