/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

const N: usize = 624;
const M: usize = 397;
const MATRIX_A: u32 = 0x9908_b0df;
const UPPER_MASK: u32 = 0x8000_0000;
const LOWER_MASK: u32 = 0x7fff_ffff;

/// Seed used when the generator is drawn from without being seeded first.
pub const DEFAULT_SEED: u32 = 5489;

/// MT19937, the 32-bit Mersenne Twister.
///
/// Every scope owns one of these to decide whether a sampled metric is
/// delivered. The output sequence is fully determined by the seed, so
/// sampling decisions can be reproduced across runs.
#[derive(Clone)]
pub struct MersenneTwister {
    mt: Box<[u32; N]>,
    // N + 1 means "never seeded"
    mti: usize,
}

impl Default for MersenneTwister {
    fn default() -> Self {
        MersenneTwister {
            mt: Box::new([0; N]),
            mti: N + 1,
        }
    }
}

impl MersenneTwister {
    pub fn new(seed: u32) -> Self {
        let mut g = MersenneTwister::default();
        g.seed(seed);
        g
    }

    pub fn seed(&mut self, seed: u32) {
        self.mt[0] = seed;
        for i in 1..N {
            let prev = self.mt[i - 1];
            self.mt[i] = 1812433253u32
                .wrapping_mul(prev ^ (prev >> 30))
                .wrapping_add(i as u32);
        }
        self.mti = N;
    }

    pub fn next_u32(&mut self) -> u32 {
        if self.mti >= N {
            if self.mti == N + 1 {
                self.seed(DEFAULT_SEED);
            }
            self.twist();
        }

        let mut y = self.mt[self.mti];
        self.mti += 1;

        y ^= y >> 11;
        y ^= (y << 7) & 0x9d2c_5680;
        y ^= (y << 15) & 0xefc6_0000;
        y ^= y >> 18;
        y
    }

    /// Uniform double in [0, 1), with 32 bits of resolution.
    pub fn next_uniform(&mut self) -> f64 {
        self.next_u32() as f64 * (1.0 / 4294967296.0)
    }

    fn twist(&mut self) {
        #[inline]
        fn mag01(y: u32) -> u32 {
            if y & 0x1 == 0 { 0 } else { MATRIX_A }
        }

        let mut kk = 0;
        while kk < N - M {
            let y = (self.mt[kk] & UPPER_MASK) | (self.mt[kk + 1] & LOWER_MASK);
            self.mt[kk] = self.mt[kk + M] ^ (y >> 1) ^ mag01(y);
            kk += 1;
        }
        while kk < N - 1 {
            let y = (self.mt[kk] & UPPER_MASK) | (self.mt[kk + 1] & LOWER_MASK);
            self.mt[kk] = self.mt[kk + M - N] ^ (y >> 1) ^ mag01(y);
            kk += 1;
        }
        let y = (self.mt[N - 1] & UPPER_MASK) | (self.mt[0] & LOWER_MASK);
        self.mt[N - 1] = self.mt[M - 1] ^ (y >> 1) ^ mag01(y);

        self.mti = 0;
    }
}
