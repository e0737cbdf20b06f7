//! Short code generation.

use blake3::Hasher;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Number of characters in every generated code
pub const CODE_LENGTH: usize = 8;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Exclusive upper bound of the random offset mixed in after each character
const MAX_PERTURBATION: u64 = 1000;

/// How much of the owner id goes into a seed
const OWNER_PREFIX_CHARS: usize = 8;

static SEED_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Trait for turning a seed into a short code.
///
/// Implementations don't touch the registry; uniqueness is enforced by the
/// caller, which asks again with a fresh seed on collision.
pub trait CodeGenerator: Send + Sync + 'static {
    /// Derives a code of [`CODE_LENGTH`] printable characters from `seed`.
    fn generate(&self, seed: &str) -> String;
}

/// Default generator: hashes the seed, then emits base62 digits while
/// perturbing the remaining hash with a small random offset.
///
/// The random offset means the same seed does not reproduce the same code.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashCodeGenerator;

impl CodeGenerator for HashCodeGenerator {
    fn generate(&self, seed: &str) -> String {
        let mut word = [0u8; 8];
        Hasher::new()
            .update(seed.as_bytes())
            .finalize_xof()
            .fill(&mut word);
        let mut hash = u64::from_le_bytes(word);

        let mut rng = rand::thread_rng();
        let radix = ALPHABET.len() as u64;
        let mut out = String::with_capacity(CODE_LENGTH);
        for _ in 0..CODE_LENGTH {
            out.push(ALPHABET[(hash % radix) as usize] as char);
            hash = hash / radix + rng.gen_range(0..MAX_PERTURBATION);
        }
        out
    }
}

/// Builds a fresh seed for `owner_id`.
///
/// Combines the owner's id prefix, the current time in nanoseconds and a
/// process-wide sequence number, so two seeds are never equal even when taken
/// within the same clock tick.
pub fn seed_for(owner_id: &str) -> String {
    let prefix: String = owner_id.chars().take(OWNER_PREFIX_CHARS).collect();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let sequence = SEED_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}{nanos}:{sequence}")
}
