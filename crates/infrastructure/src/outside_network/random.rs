use ring::rand::{SecureRandom as _, SystemRandom};
use std::fmt;

/// Number of distinct DNS transaction IDs.
pub const ID_SPACE: u32 = 0x1_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("entropy source failure")]
pub struct RandomError;

/// Source of the transaction IDs and source-socket choices that make blind
/// reply spoofing expensive.
pub trait RandomSource {
    /// Uniformly distributed integer in `[0, bound)`. `bound` is non-zero.
    fn uniform(&mut self, bound: u32) -> Result<u32, RandomError>;

    fn transaction_id(&mut self) -> Result<u16, RandomError> {
        self.uniform(ID_SPACE).map(|id| id as u16)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn uniform(&mut self, bound: u32) -> Result<u32, RandomError> {
        (**self).uniform(bound)
    }
}

/// Operating-system CSPRNG.
pub struct SecureRandom {
    rng: SystemRandom,
}

impl SecureRandom {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    fn next_u32(&self) -> Result<u32, RandomError> {
        let mut bytes = [0u8; 4];
        self.rng.fill(&mut bytes).map_err(|_| RandomError)?;
        Ok(u32::from_ne_bytes(bytes))
    }
}

impl RandomSource for SecureRandom {
    fn uniform(&mut self, bound: u32) -> Result<u32, RandomError> {
        debug_assert!(bound > 0);
        if bound <= 1 {
            return Ok(0);
        }
        // Reject the top partial bucket so every residue is equally likely.
        let zone = u32::MAX - (u32::MAX % bound);
        loop {
            let value = self.next_u32()?;
            if value < zone {
                return Ok(value % bound);
            }
        }
    }
}

impl Default for SecureRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SecureRandom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureRandom").finish_non_exhaustive()
    }
}
