//! The randomness port: every random decision of a round goes through a
//! [`RandomSource`], which records its draws so the round can be re-executed
//! bit-for-bit from the trace.
//!
//! Uses the SplitMix64 algorithm for live play: fast, 8 bytes of state,
//! excellent statistical properties, and trivially serializable.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by a randomness port. Any of these aborts the round.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RngError {
    #[error("random range must be positive")]
    EmptyRange,
    #[error("replay trace exhausted after {0} draws")]
    TraceExhausted(usize),
    #[error("replay draw {ordinal} expected range {expected}, got {actual}")]
    RangeMismatch {
        ordinal: usize,
        expected: u64,
        actual: u64,
    },
    #[error("replay draw {ordinal} recorded value {value} outside range {range}")]
    ValueOutOfRange { ordinal: usize, value: u64, range: u64 },
    #[error("random source failure: {0}")]
    Upstream(String),
}

// ---------------------------------------------------------------------------
// Draw record
// ---------------------------------------------------------------------------

/// One recorded draw: the requested range and the value returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    pub range: u64,
    pub value: u64,
}

// ---------------------------------------------------------------------------
// RandomSource trait
// ---------------------------------------------------------------------------

/// Injected source of random integers.
///
/// `next(n)` returns a value in `[0, n)` and appends it to the trace returned
/// by [`RandomSource::draws`].
pub trait RandomSource: std::fmt::Debug + Send {
    /// Draw an integer in `[0, n)`.
    fn next(&mut self, n: u64) -> Result<u64, RngError>;

    /// Every draw made so far, in order.
    fn draws(&self) -> &[Draw];
}

// ---------------------------------------------------------------------------
// SimRng
// ---------------------------------------------------------------------------

/// SplitMix64 pseudo-random number generator.
///
/// Deterministic across platforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    /// Create a new RNG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform integer in `[0, n)` without modulo bias.
    ///
    /// Rejects raw values below `2^64 mod n` so the accepted span is an exact
    /// multiple of `n`.
    pub fn below(&mut self, n: u64) -> u64 {
        debug_assert!(n > 0);
        let threshold = n.wrapping_neg() % n;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return r % n;
            }
        }
    }

    /// Get the internal state (for hashing/serialization).
    pub fn state(&self) -> u64 {
        self.state
    }
}

// ---------------------------------------------------------------------------
// LiveRandom
// ---------------------------------------------------------------------------

/// Live randomness: draws from a [`SimRng`] and records every draw.
#[derive(Debug, Clone)]
pub struct LiveRandom {
    rng: SimRng,
    draws: Vec<Draw>,
}

impl LiveRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SimRng::new(seed),
            draws: Vec::new(),
        }
    }

    /// Consume the source, returning its trace.
    pub fn into_draws(self) -> Vec<Draw> {
        self.draws
    }
}

impl RandomSource for LiveRandom {
    fn next(&mut self, n: u64) -> Result<u64, RngError> {
        if n == 0 {
            return Err(RngError::EmptyRange);
        }
        let value = self.rng.below(n);
        self.draws.push(Draw { range: n, value });
        Ok(value)
    }

    fn draws(&self) -> &[Draw] {
        &self.draws
    }
}

// ---------------------------------------------------------------------------
// ReplayRandom
// ---------------------------------------------------------------------------

/// Replays a recorded trace. The n-th call returns the n-th recorded value,
/// provided the requested range matches the recorded one.
#[derive(Debug, Clone)]
pub struct ReplayRandom {
    trace: Vec<Draw>,
    cursor: usize,
}

impl ReplayRandom {
    pub fn new(trace: Vec<Draw>) -> Self {
        Self { trace, cursor: 0 }
    }

    /// Number of recorded draws not yet consumed.
    pub fn remaining(&self) -> usize {
        self.trace.len() - self.cursor
    }
}

impl RandomSource for ReplayRandom {
    fn next(&mut self, n: u64) -> Result<u64, RngError> {
        if n == 0 {
            return Err(RngError::EmptyRange);
        }
        let ordinal = self.cursor;
        let draw = self
            .trace
            .get(ordinal)
            .copied()
            .ok_or(RngError::TraceExhausted(ordinal))?;
        if draw.range != n {
            return Err(RngError::RangeMismatch {
                ordinal,
                expected: draw.range,
                actual: n,
            });
        }
        if draw.value >= n {
            return Err(RngError::ValueOutOfRange {
                ordinal,
                value: draw.value,
                range: n,
            });
        }
        self.cursor += 1;
        Ok(draw.value)
    }

    fn draws(&self) -> &[Draw] {
        &self.trace[..self.cursor]
    }
}
