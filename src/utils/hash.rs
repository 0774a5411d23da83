// Tue Jan 15 2026 - Alex

const FNV_PRIME: u64 = 0x00000100000001B3;
const FNV_OFFSET: u64 = 0xcbf29ce484222325;

/// Content digests used to fingerprint binaries.
pub struct HashComputer;

impl HashComputer {
    /// Compute FNV-1a hash (64-bit)
    pub fn fnv1a_64(data: &[u8]) -> u64 {
        let mut hasher = Fnv1a64::new();
        hasher.update(data);
        hasher.finish()
    }
}

/// Streaming FNV-1a, for inputs fed in chunks.
#[derive(Debug, Clone, Copy)]
pub struct Fnv1a64 {
    hash: u64,
}

impl Fnv1a64 {
    pub fn new() -> Self {
        Self { hash: FNV_OFFSET }
    }

    pub fn update(&mut self, data: &[u8]) {
        for byte in data {
            self.hash ^= *byte as u64;
            self.hash = self.hash.wrapping_mul(FNV_PRIME);
        }
    }

    pub fn finish(&self) -> u64 {
        self.hash
    }
}

impl Default for Fnv1a64 {
    fn default() -> Self {
        Self::new()
    }
}
