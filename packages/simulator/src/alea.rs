//! Alea, a small seedable PRNG by Johannes Baagøe.
//!
//! Sequences are bit-compatible with the widely used JavaScript version, so a
//! change tree generated from a seed here is the same one any other port
//! generates from that seed.

use serde::{Deserialize, Serialize};

const TWO_32: f64 = 4_294_967_296.0;
const TWO_NEG_32: f64 = 2.328_306_436_538_696_3e-10;
const TWO_NEG_53: f64 = 1.110_223_024_625_156_5e-16;
const TWO_21: f64 = 2_097_152.0;

/// ECMAScript `ToUint32`, kept as a float
fn to_uint32(x: f64) -> f64 {
    x.trunc().rem_euclid(TWO_32)
}

/// Hash state used only while seeding
struct Mash {
    n: f64,
}

impl Mash {
    fn new() -> Self {
        Self {
            n: f64::from(0xefc8_249d_u32),
        }
    }

    /// Mixes UTF-16 code units, as `String.prototype.charCodeAt` sees them
    fn mash(&mut self, data: &str) -> f64 {
        for unit in data.encode_utf16() {
            self.n += f64::from(unit);
            let mut h = 0.025_196_032_824_169_38 * self.n;
            self.n = to_uint32(h);
            h -= self.n;
            h *= self.n;
            self.n = to_uint32(h);
            h -= self.n;
            self.n += h * TWO_32;
        }
        to_uint32(self.n) * TWO_NEG_32
    }
}

/// Complete generator state, for resuming a sequence elsewhere
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AleaState {
    pub s0: f64,
    pub s1: f64,
    pub s2: f64,
    pub c: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alea {
    state: AleaState,
}

impl Alea {
    pub fn new(seed: &str) -> Self {
        Self::with_seeds(&[seed])
    }

    /// Seed from several values; numbers should be passed in their decimal
    /// string form
    pub fn with_seeds(seeds: &[&str]) -> Self {
        let mut mash = Mash::new();
        let mut s0 = mash.mash(" ");
        let mut s1 = mash.mash(" ");
        let mut s2 = mash.mash(" ");

        for seed in seeds {
            s0 -= mash.mash(seed);
            if s0 < 0.0 {
                s0 += 1.0;
            }
            s1 -= mash.mash(seed);
            if s1 < 0.0 {
                s1 += 1.0;
            }
            s2 -= mash.mash(seed);
            if s2 < 0.0 {
                s2 += 1.0;
            }
        }

        Self {
            state: AleaState { s0, s1, s2, c: 1.0 },
        }
    }

    pub fn from_state(state: AleaState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> AleaState {
        self.state
    }

    /// Uniform in `[0, 1)` with 32 bits of randomness
    pub fn random(&mut self) -> f64 {
        let s = &mut self.state;
        let t = 2_091_639.0 * s.s0 + s.c * TWO_NEG_32;
        s.s0 = s.s1;
        s.s1 = s.s2;
        s.c = t.trunc();
        s.s2 = t - s.c;
        s.s2
    }

    pub fn uint32(&mut self) -> u32 {
        (self.random() * TWO_32) as u32
    }

    /// Uniform in `[0, 1)` with 53 bits of randomness
    pub fn fract53(&mut self) -> f64 {
        let high = self.random();
        let low = (self.random() * TWO_21).trunc();
        high + low * TWO_NEG_53
    }

    /// Random lowercase base-36 token
    pub fn token(&mut self) -> String {
        to_base36(self.uint32())
    }
}

pub fn to_base36(mut value: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let draws = |seed: &str| {
            let mut alea = Alea::new(seed);
            (0..8).map(|_| alea.random()).collect::<Vec<_>>()
        };
        assert_eq!(draws("1"), draws("1"));
        assert_ne!(draws("1"), draws("3"));

        let mut a = Alea::new("1");
        let mut c = Alea::new("1");
        for _ in 0..4 {
            assert_eq!(a.uint32(), c.uint32());
            assert_eq!(a.token(), c.token());
        }
    }

    #[test]
    fn test_known_values() {
        let mut alea = Alea::new("12345");
        assert_eq!(alea.random(), 0.27138191112317145);
        assert_eq!(alea.random(), 0.19615925149992108);
        assert_eq!(alea.random(), 0.6810678059700876);

        let mut alea = Alea::with_seeds(&["my", "3", "seeds"]);
        assert_eq!(alea.random(), 0.30802189325913787);
        assert_eq!(alea.random(), 0.5190450621303171);
        assert_eq!(alea.random(), 0.43635262292809784);

        let mut alea = Alea::new("1277182878230");
        assert_eq!(alea.random(), 0.6198398587293923);
        assert_eq!(alea.random(), 0.8385338634252548);
        assert_eq!(alea.random(), 0.3644848605617881);
    }

    #[test]
    fn test_uint32() {
        let mut alea = Alea::new("12345");
        assert_eq!(alea.uint32(), 1165576433);
        assert_eq!(alea.uint32(), 842497570);
        assert_eq!(alea.uint32(), 2925163953);

        let mut alea = Alea::new("");
        assert_eq!(alea.uint32(), 715789690);
        assert_eq!(alea.uint32(), 2091287642);
        assert_eq!(alea.uint32(), 486307);
    }

    #[test]
    fn test_fract53() {
        let mut alea = Alea::new("12345");
        assert_eq!(alea.fract53(), 0.27138191116884325);
        assert_eq!(alea.fract53(), 0.6810678062004586);
        assert_eq!(alea.fract53(), 0.3407802057882554);

        let mut alea = Alea::new("");
        assert_eq!(alea.fract53(), 0.16665777435687268);
        assert_eq!(alea.fract53(), 0.00011322738143160205);
        assert_eq!(alea.fract53(), 0.17695781631176488);
    }

    #[test]
    fn test_state_resumes_sequence() {
        let mut alea = Alea::new("200");
        alea.random();
        alea.random();
        let mut resumed = Alea::from_state(alea.state());
        assert_eq!(alea.random(), resumed.random());
        assert_eq!(alea.uint32(), resumed.uint32());
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(u32::MAX), "1z141z3");
    }
}
