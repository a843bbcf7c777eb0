use crc32fast::Hasher;
use std::collections::HashSet;

const OID_LENGTH: usize = 7;
const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Seed derived from a file path using CRC32
pub fn get_document_seed(path: &str) -> u32 {
    let mut hasher = Hasher::new();
    if path.starts_with("file://") {
        hasher.update(path.as_bytes());
    } else {
        hasher.update(format!("file://{}", path).as_bytes());
    }
    hasher.finalize()
}

/// Mints short base-36 oids for elements created by the editor
/// (group wrappers, inserted elements). Deterministic per path.
#[derive(Clone)]
pub struct OidGenerator {
    seed: u32,
    count: u32,
}

impl OidGenerator {
    pub fn new(path: &str) -> Self {
        Self {
            seed: get_document_seed(path),
            count: 0,
        }
    }

    pub fn from_seed(seed: u32) -> Self {
        Self { seed, count: 0 }
    }

    pub fn next_oid(&mut self) -> String {
        self.count += 1;
        let mut hasher = Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(&self.count.to_le_bytes());
        encode(hasher.finalize() as u64 | ((self.count as u64) << 32))
    }

    /// Next oid not already in `taken`
    pub fn next_free(&mut self, taken: &HashSet<String>) -> String {
        loop {
            let oid = self.next_oid();
            if !taken.contains(&oid) {
                return oid;
            }
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }
}

fn encode(mut value: u64) -> String {
    let mut digits = [b'0'; OID_LENGTH];
    for slot in digits.iter_mut().rev() {
        *slot = ALPHABET[(value % 36) as usize];
        value /= 36;
    }
    digits.iter().map(|&b| b as char).collect()
}
