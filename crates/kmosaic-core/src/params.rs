//! Frozen parameter sets and the validator that enforces their invariants.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Security level selector; each level names one frozen [`MosaicParams`] tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Mos128,
    Mos256,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Mos128 => "mos-128",
            Level::Mos256 => "mos-256",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlssParams {
    pub n: usize,
    pub m: usize,
    pub q: u32,
    pub w: usize,
    pub sigma: u32, // fixed-point, sigma * 1000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TddParams {
    pub n: usize,
    pub r: usize,
    pub q: u32,
    pub sigma: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EgrwParams {
    pub p: u32,
    pub k: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MosaicParams {
    pub level: Level,
    pub slss: SlssParams,
    pub tdd: TddParams,
    pub egrw: EgrwParams,
}

impl SlssParams {
    pub fn sigma_f64(&self) -> f64 {
        self.sigma as f64 / 1000.0
    }
}

impl TddParams {
    pub fn sigma_f64(&self) -> f64 {
        self.sigma as f64 / 1000.0
    }
}

const MOS_128: MosaicParams = MosaicParams {
    level: Level::Mos128,
    slss: SlssParams {
        n: 256,
        m: 256,
        q: 7681,
        w: 64,
        sigma: 3200,
    },
    tdd: TddParams {
        n: 32,
        r: 8,
        q: 7681,
        sigma: 3200,
    },
    egrw: EgrwParams { p: 65537, k: 128 },
};

const MOS_256: MosaicParams = MosaicParams {
    level: Level::Mos256,
    slss: SlssParams {
        n: 512,
        m: 512,
        q: 7681,
        w: 96,
        sigma: 3500,
    },
    tdd: TddParams {
        n: 48,
        r: 12,
        q: 7681,
        sigma: 3500,
    },
    egrw: EgrwParams { p: 1_048_583, k: 192 },
};

/// Returns the frozen parameter tuple for `level`.
pub fn get_params(level: Level) -> MosaicParams {
    match level {
        Level::Mos128 => MOS_128,
        Level::Mos256 => MOS_256,
    }
}

fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut i = 3u64;
    while i * i <= n {
        if n % i == 0 {
            return false;
        }
        i += 2;
    }
    true
}

/// Validates every invariant named for [`MosaicParams`]: dimensional
/// constraints, primality of the moduli, and the minimum noise/security
/// margins.
pub fn validate_params(params: &MosaicParams) -> Result<()> {
    let s = &params.slss;
    if s.n == 0 || s.m == 0 {
        return Err(Error::InvalidParameter {
            reason: "slss: n and m must be positive".into(),
        });
    }
    if s.w > s.n {
        return Err(Error::InvalidParameter {
            reason: "slss: w must not exceed n".into(),
        });
    }
    if !is_prime(s.q as u64) {
        return Err(Error::InvalidParameter {
            reason: format!("slss: q={} is not prime", s.q),
        });
    }
    if (s.m as f64) < (s.n as f64) / 2.0 {
        return Err(Error::InvalidParameter {
            reason: "slss: m must be at least n/2".into(),
        });
    }
    if s.sigma_f64() < 3.0 {
        return Err(Error::InvalidParameter {
            reason: "slss: sigma must be at least 3.0".into(),
        });
    }

    let t = &params.tdd;
    if t.n == 0 || t.r == 0 {
        return Err(Error::InvalidParameter {
            reason: "tdd: n and r must be positive".into(),
        });
    }
    if t.r > t.n {
        return Err(Error::InvalidParameter {
            reason: "tdd: r must not exceed n".into(),
        });
    }
    if !is_prime(t.q as u64) {
        return Err(Error::InvalidParameter {
            reason: format!("tdd: q={} is not prime", t.q),
        });
    }
    if t.n > 48 {
        tracing::warn!(n = t.n, "tdd: tensor dimension n exceeds the recommended maximum of 48");
    }

    let e = &params.egrw;
    if !is_prime(e.p as u64) {
        return Err(Error::InvalidParameter {
            reason: format!("egrw: p={} is not prime", e.p),
        });
    }
    if e.p < 1000 {
        return Err(Error::InvalidParameter {
            reason: "egrw: p must be at least 1000".into(),
        });
    }
    if e.k < 64 {
        return Err(Error::InvalidParameter {
            reason: "egrw: k must be at least 64".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_params_are_valid() {
        validate_params(&get_params(Level::Mos128)).unwrap();
        validate_params(&get_params(Level::Mos256)).unwrap();
    }

    #[test]
    fn validator_rejects_composite_modulus() {
        let mut p = get_params(Level::Mos128);
        p.slss.q = 7680;
        assert!(validate_params(&p).is_err());
    }

    #[test]
    fn validator_rejects_oversized_weight() {
        let mut p = get_params(Level::Mos128);
        p.slss.w = p.slss.n + 1;
        assert!(validate_params(&p).is_err());
    }
}
