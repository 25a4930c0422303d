//! Digital signatures: a multi-witness Fiat-Shamir scheme spanning all
//! three primitives, and a simpler fixed-format ("Go-compatible") sibling.

use crate::error::{Error, Result};
use crate::kem::{PublicKey, SecretKey};
use crate::params::Level;
use crate::serialize::{Reader, Writer};
use crate::xof::{center_mod, ct_eq, h256, h_d, hash_concat, secure_random, shake256};
use std::time::{Duration, Instant};

const MAX_ATTEMPTS: u32 = 256;

struct RejectionParams {
    gamma1: i64,
    gamma2: i64,
    beta: i64,
    min_duration: Duration,
}

fn rejection_params(level: Level) -> RejectionParams {
    match level {
        Level::Mos128 => RejectionParams {
            gamma1: 1 << 17,
            gamma2: 1 << 15,
            beta: 1 << 13,
            min_duration: Duration::from_millis(25),
        },
        Level::Mos256 => RejectionParams {
            gamma1: 1 << 19,
            gamma2: 1 << 17,
            beta: 1 << 14,
            min_duration: Duration::from_millis(50),
        },
    }
}

fn bytes_of_i64(v: &[i64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(v.len() * 8);
    for &x in v {
        out.extend_from_slice(&x.to_le_bytes());
    }
    out
}

/// Samples `count` integers uniformly in `[-bound, bound]` from a
/// domain-separated seed.
fn sample_centered(seed: &[u8], bound: i64, count: usize) -> Vec<i64> {
    let span = (2 * bound + 1) as u32;
    crate::xof::sample_uniform_mod_q(seed, span, count)
        .into_iter()
        .map(|v| v as i64 - bound)
        .collect()
}

/// Samples `count` values in `{0,1,2,3}` from a domain-separated seed.
fn sample_quaternary(seed: &[u8], count: usize) -> Vec<u8> {
    let bytes = shake256(seed, count.div_ceil(4).max(1));
    let mut out = Vec::with_capacity(count);
    'outer: for byte in bytes {
        for shift in [0u8, 2, 4, 6] {
            if out.len() == count {
                break 'outer;
            }
            out.push((byte >> shift) & 0b11);
        }
    }
    out
}

fn egrw_vertex_bytes(v: crate::egrw::Matrix) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[0..4].copy_from_slice(&(v.a as i32).to_le_bytes());
    out[4..8].copy_from_slice(&(v.b as i32).to_le_bytes());
    out[8..12].copy_from_slice(&(v.c as i32).to_le_bytes());
    out[12..16].copy_from_slice(&(v.d as i32).to_le_bytes());
    out
}

/// Multi-witness Fiat-Shamir signature, carrying per-primitive commitments
/// and rejection-sampled responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub challenge: [u8; 32],
    pub z1: Vec<i32>,
    pub commitment1: Vec<u8>,
    pub z2: Vec<i32>,
    pub commitment2: Vec<u8>,
    pub z3: Vec<u8>,
    pub hints: [u8; 32],
}

fn compute_mu(pk_hash: &[u8; 32], message: &[u8]) -> [u8; 32] {
    hash_concat(&[pk_hash, message])
}

pub fn sign(message: &[u8], sk: &SecretKey, pk: &PublicKey) -> Result<Signature> {
    let start = Instant::now();
    let rp = rejection_params(pk.params.level);
    let mu = compute_mu(&sk.pk_hash, message);

    let tdd_bytes = crate::tdd::serialize_pk(&pk.tdd);
    let v_start_bytes = egrw_vertex_bytes(pk.egrw.v_start);

    for attempt in 0..MAX_ATTEMPTS {
        let attempt_seed = h_d(
            "kmosaic-sign-attempt-v1",
            &hash_concat(&[&mu, &sk.seed, &attempt.to_le_bytes()]),
        );

        let y1 = sample_centered(&h_d("mask-slss-v1", &attempt_seed), rp.gamma1, sk.slss.n);
        let y2 = sample_centered(&h_d("mask-tdd-v1", &attempt_seed), rp.gamma2, sk.tdd.r);
        let y3 = sample_quaternary(&h_d("mask-egrw-v1", &attempt_seed), sk.egrw.walk.len());

        // w1 = A . y1 mod q_slss
        let q_slss = pk.params.slss.q as i64;
        let mut w1 = vec![0i64; pk.slss.m];
        for row in 0..pk.slss.m {
            let mut acc = 0i64;
            for col in 0..pk.slss.n {
                acc += pk.slss.a[row * pk.slss.n + col] as i64 * y1[col];
            }
            w1[row] = acc.rem_euclid(q_slss);
        }
        let w1_bytes = bytes_of_i64(&w1);

        // w2: uniform mod q_tdd matrix of size n^2, n = tdd.n
        let q_tdd = pk.params.tdd.q as i64;
        let n_tdd = pk.tdd.n;
        let w2_seed = hash_concat(&[&bytes_of_i64(&y2), tdd_bytes.as_slice()]);
        let w2_raw = shake256(&w2_seed, 4 * n_tdd * n_tdd);
        let w2: Vec<i64> = w2_raw
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]) as i64 % q_tdd)
            .collect();
        let w2_bytes = bytes_of_i64(&w2);

        let h_chal = h256(&hash_concat(&[&w1_bytes, &w2_bytes, &v_start_bytes, &mu]));
        let c_scalar = (u64::from_le_bytes(h_chal[0..8].try_into().unwrap()) % (1 << 16)) as i64;

        let z1: Vec<i64> = y1
            .iter()
            .zip(sk.slss.s.iter())
            .map(|(&yi, &si)| (yi + c_scalar * si as i64).rem_euclid(q_slss))
            .collect();

        let z2: Vec<i64> = (0..sk.tdd.r)
            .map(|i| {
                let a0 = sk.tdd.a[i * sk.tdd.n] as i64;
                let b0 = sk.tdd.b[i * sk.tdd.n] as i64;
                let c0 = sk.tdd.c[i * sk.tdd.n] as i64;
                (y2[i] + c_scalar * (a0 + b0 + c0)).rem_euclid(q_tdd)
            })
            .collect();

        let z1_ok = z1
            .iter()
            .all(|&v| center_mod(v, q_slss).abs() <= rp.gamma1 - rp.beta);
        let z2_ok = z2
            .iter()
            .all(|&v| center_mod(v, q_tdd).abs() <= rp.gamma2 - rp.beta);

        if !z1_ok || !z2_ok {
            tracing::debug!(attempt, "signature rejection sampling retry");
            continue;
        }

        let z3: Vec<u8> = y3
            .iter()
            .zip(sk.egrw.walk.iter())
            .map(|(&yi, &wi)| ((yi as i64 + c_scalar * wi as i64).rem_euclid(4)) as u8)
            .collect();

        let hints_v = shake256(&attempt_seed, 32);
        let mut hints = [0u8; 32];
        hints.copy_from_slice(&hints_v);

        pad_to_floor(start, rp.min_duration);

        return Ok(Signature {
            challenge: h_chal,
            z1: z1.into_iter().map(|x| x as i32).collect(),
            commitment1: w1_bytes,
            z2: z2.into_iter().map(|x| x as i32).collect(),
            commitment2: w2_bytes,
            z3,
            hints,
        });
    }

    Err(Error::SigningFailure {
        attempts: MAX_ATTEMPTS,
    })
}

fn pad_to_floor(start: Instant, floor: Duration) {
    let elapsed = start.elapsed();
    if elapsed < floor {
        std::thread::sleep(floor - elapsed);
    }
}

/// Verifies a multi-witness signature. The stored commitments `w1`/`w2` are
/// trusted as given (they include lattice noise the verifier cannot
/// recompute from the response alone); only the re-derived challenge hash is
/// checked against what is stored, and the `z1`/`z2` bounds are checked
/// first.
pub fn verify(message: &[u8], signature: &Signature, pk: &PublicKey) -> bool {
    let rp = rejection_params(pk.params.level);
    let q_slss = pk.params.slss.q as i64;
    let q_tdd = pk.params.tdd.q as i64;

    let z1_ok = signature
        .z1
        .iter()
        .all(|&v| center_mod(v as i64, q_slss).abs() <= rp.gamma1 - rp.beta);
    let z2_ok = signature
        .z2
        .iter()
        .all(|&v| center_mod(v as i64, q_tdd).abs() <= rp.gamma2 - rp.beta);
    if !z1_ok || !z2_ok {
        return false;
    }

    let pk_hash = h256(&crate::kem::serialize_pk(pk));
    let mu = compute_mu(&pk_hash, message);
    let v_start_bytes = egrw_vertex_bytes(pk.egrw.v_start);

    let expected = h256(&hash_concat(&[
        &signature.commitment1,
        &signature.commitment2,
        &v_start_bytes,
        &mu,
    ]));

    ct_eq(&expected, &signature.challenge)
}

pub fn serialize(sig: &Signature) -> Vec<u8> {
    let mut w = Writer::new();
    w.put_part(&sig.challenge);
    w.put_i32_vec(&sig.z1);
    w.put_part(&sig.commitment1);
    w.put_i32_vec(&sig.z2);
    w.put_part(&sig.commitment2);
    w.put_part(&sig.z3);
    w.put_part(&sig.hints);
    w.into_vec()
}

pub fn deserialize(bytes: &[u8]) -> Result<Signature> {
    let mut r = Reader::new(bytes);
    let challenge_slice = r.get_part("sign.challenge")?;
    if challenge_slice.len() != 32 {
        return Err(crate::error::EncodingError::BadFixedSize {
            field: "sign.challenge",
            expected: 32,
            got: challenge_slice.len(),
        }
        .into());
    }
    let mut challenge = [0u8; 32];
    challenge.copy_from_slice(challenge_slice);
    let z1 = r.get_i32_vec("sign.z1")?;
    let commitment1 = r.get_part("sign.commitment1")?.to_vec();
    let z2 = r.get_i32_vec("sign.z2")?;
    let commitment2 = r.get_part("sign.commitment2")?.to_vec();
    let z3 = r.get_part("sign.z3")?.to_vec();
    let hints_slice = r.get_part("sign.hints")?;
    if hints_slice.len() != 32 {
        return Err(crate::error::EncodingError::BadFixedSize {
            field: "sign.hints",
            expected: 32,
            got: hints_slice.len(),
        }
        .into());
    }
    let mut hints = [0u8; 32];
    hints.copy_from_slice(hints_slice);
    r.finish()?;
    Ok(Signature {
        challenge,
        z1,
        commitment1,
        z2,
        commitment2,
        z3,
        hints,
    })
}

/// The simpler, fixed 128-byte signature format: `commitment(32) ||
/// challenge(32) || response(64)`.
pub mod go_compat {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Signature {
        pub commitment: [u8; 32],
        pub challenge: [u8; 32],
        pub response: [u8; 64],
    }

    fn sk_bytes(sk: &SecretKey) -> Vec<u8> {
        let mut out = Vec::new();
        for &s in &sk.slss.s {
            out.extend_from_slice(&(s as i32).to_le_bytes());
        }
        for &a in &sk.tdd.a {
            out.extend_from_slice(&a.to_le_bytes());
        }
        out.extend_from_slice(&sk.egrw.walk);
        out
    }

    /// Signs `message`. The response commits to the secret key bytes but is
    /// not itself verified; verification checks only that the challenge is
    /// consistent with the commitment and binding (see the verify doc
    /// comment for why this is weaker than the multi-witness scheme).
    pub fn sign(message: &[u8], sk: &SecretKey, pk: &PublicKey) -> Result<Signature> {
        let msg_hash = h256(&hash_concat(&[message, &pk.binding]));
        let mut witness = [0u8; 32];
        secure_random(&mut witness)?;
        let commitment = h256(&hash_concat(&[&witness, &msg_hash, &pk.binding]));
        let challenge = h_d(
            "kmosaic-sign-chal-v1",
            &hash_concat(&[&commitment, &msg_hash, &sk.pk_hash]),
        );
        let response_v = shake256(
            &h_d(
                "kmosaic-sign-resp-v1",
                &hash_concat(&[&sk_bytes(sk), &challenge, &witness]),
            ),
            64,
        );
        let mut response = [0u8; 64];
        response.copy_from_slice(&response_v);
        Ok(Signature {
            commitment,
            challenge,
            response,
        })
    }

    /// Verifies only that the challenge is consistent with the commitment,
    /// the message, and the claimed signer's public key hash. `response` is
    /// not checked: this variant proves the prover rebuilt a consistent
    /// challenge, not possession of any witness beyond what is folded into
    /// `response` at signing time.
    pub fn verify(message: &[u8], signature: &Signature, pk: &PublicKey) -> bool {
        let msg_hash = h256(&hash_concat(&[message, &pk.binding]));
        let pk_hash = h256(&crate::kem::serialize_pk(pk));
        let expected_challenge = h_d(
            "kmosaic-sign-chal-v1",
            &hash_concat(&[&signature.commitment, &msg_hash, &pk_hash]),
        );
        ct_eq(&expected_challenge, &signature.challenge)
    }

    pub fn serialize(sig: &Signature) -> [u8; 128] {
        let mut out = [0u8; 128];
        out[0..32].copy_from_slice(&sig.commitment);
        out[32..64].copy_from_slice(&sig.challenge);
        out[64..128].copy_from_slice(&sig.response);
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Signature> {
        if bytes.len() != 128 {
            return Err(crate::error::EncodingError::BadFixedSize {
                field: "sign.go_compat",
                expected: 128,
                got: bytes.len(),
            }
            .into());
        }
        let mut commitment = [0u8; 32];
        let mut challenge = [0u8; 32];
        let mut response = [0u8; 64];
        commitment.copy_from_slice(&bytes[0..32]);
        challenge.copy_from_slice(&bytes[32..64]);
        response.copy_from_slice(&bytes[64..128]);
        Ok(Signature {
            commitment,
            challenge,
            response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kem::key_gen_from_seed;
    use crate::params::get_params;

    #[test]
    fn multiwitness_roundtrip() {
        let params = get_params(Level::Mos128);
        let (pk, sk) = key_gen_from_seed(params, &[0x03u8; 32]).unwrap();
        let sig = sign(b"hello", &sk, &pk).unwrap();
        assert!(verify(b"hello", &sig, &pk));
        assert!(!verify(b"hellp", &sig, &pk));
    }

    #[test]
    fn multiwitness_serialize_roundtrip() {
        let params = get_params(Level::Mos128);
        let (pk, sk) = key_gen_from_seed(params, &[0x04u8; 32]).unwrap();
        let sig = sign(b"test message", &sk, &pk).unwrap();
        let bytes = serialize(&sig);
        let sig2 = deserialize(&bytes).unwrap();
        assert_eq!(sig, sig2);
        assert!(verify(b"test message", &sig2, &pk));
    }

    #[test]
    fn go_compat_roundtrip() {
        let params = get_params(Level::Mos128);
        let (pk, sk) = key_gen_from_seed(params, &[0x05u8; 32]).unwrap();
        let sig = go_compat::sign(b"hello", &sk, &pk).unwrap();
        assert!(go_compat::verify(b"hello", &sig, &pk));
        assert!(!go_compat::verify(b"hellp", &sig, &pk));
        let bytes = go_compat::serialize(&sig);
        assert_eq!(bytes.len(), 128);
        let sig2 = go_compat::deserialize(&bytes).unwrap();
        assert_eq!(sig, sig2);
    }

    #[test]
    fn different_keys_fail_verification() {
        let params = get_params(Level::Mos128);
        let (pk1, sk1) = key_gen_from_seed(params, &[0x06u8; 32]).unwrap();
        let (pk2, _) = key_gen_from_seed(params, &[0x07u8; 32]).unwrap();
        let sig = sign(b"hello", &sk1, &pk1).unwrap();
        assert!(!verify(b"hello", &sig, &pk2));
    }
}
