//! SipHash-1-3 partitioner.

use crate::partitioner::traits::Partitioner;
use crate::token::Token;
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// SipHash-1-3 with fixed zero keys, so tokens are stable across processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sip13Partitioner;

impl Partitioner for Sip13Partitioner {
    fn partition(&self, key: &[u8]) -> Token {
        let mut hasher = SipHasher13::new_with_keys(0, 0);
        hasher.write(key);
        Token(hasher.finish())
    }

    fn name(&self) -> &'static str {
        "Sip13Partitioner"
    }
}
