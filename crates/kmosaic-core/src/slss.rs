//! SLSS: a sparse-secret, LWE-style lattice primitive.
//!
//! Public key is `(A, t = A*s + e)`; secret key is the sparse ternary vector
//! `s`. Encryption follows a dual-Regev shape: an ephemeral sparse vector
//! masks the message bits under the public matrix, and decryption removes
//! the mask using the secret.

use crate::error::{Error, Result};
use crate::params::SlssParams;
use crate::serialize::{Reader, Writer};
use crate::xof::{center_mod, h_d, sample_gaussian, sample_sparse_ternary, sample_uniform_mod_q};
use zeroize::ZeroizeOnDrop;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub a: Vec<u32>, // m * n, row-major
    pub t: Vec<u32>, // m
    pub n: usize,
    pub m: usize,
    pub q: u32,
}

#[derive(Debug, Clone, ZeroizeOnDrop)]
pub struct SecretKey {
    #[zeroize(skip)]
    pub n: usize,
    pub s: Vec<i8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    pub u: Vec<u32>, // length n
    pub v: Vec<u32>, // length 8 * fragment_len
}

/// Derives the three independent seeds used by key generation, each
/// domain-separated from the master seed so a compromise of one does not
/// reveal the others.
fn derive_keygen_seeds(seed: &[u8]) -> ([u8; 32], [u8; 32], [u8; 32]) {
    (
        h_d("kmosaic-slss-matrix-v1", seed),
        h_d("kmosaic-slss-secret-v1", seed),
        h_d("kmosaic-slss-error-v1", seed),
    )
}

pub fn key_gen(params: &SlssParams, seed: &[u8]) -> (PublicKey, SecretKey) {
    let (matrix_seed, secret_seed, error_seed) = derive_keygen_seeds(seed);
    let a = sample_uniform_mod_q(&matrix_seed, params.q, params.m * params.n);
    let s = sample_sparse_ternary(&secret_seed, params.n, params.w);
    let e = sample_gaussian(&error_seed, params.m, params.sigma_f64());

    let mut t = vec![0u32; params.m];
    for row in 0..params.m {
        let mut acc: i64 = 0;
        for col in 0..params.n {
            acc += a[row * params.n + col] as i64 * s[col] as i64;
        }
        acc += e[row];
        t[row] = acc.rem_euclid(params.q as i64) as u32;
    }

    (
        PublicKey {
            a,
            t,
            n: params.n,
            m: params.m,
            q: params.q,
        },
        SecretKey { n: params.n, s },
    )
}

const FRAGMENT_LEN: usize = 32;

pub fn encrypt(
    pk: &PublicKey,
    fragment: &[u8; FRAGMENT_LEN],
    params: &SlssParams,
    randomness: &[u8],
) -> Result<Ciphertext> {
    if randomness.len() < 32 {
        return Err(Error::InvalidRandomness {
            reason: "slss encrypt requires at least 32 bytes of randomness".into(),
        });
    }
    let r_seed = h_d("kmosaic-slss-r-v1", randomness);
    let e1_seed = h_d("kmosaic-slss-e1-v1", randomness);
    let e2_seed = h_d("kmosaic-slss-e2-v1", randomness);

    let r_weight = params.w.min(pk.m);
    let r = sample_sparse_ternary(&r_seed, pk.m, r_weight);
    let e1 = sample_gaussian(&e1_seed, pk.n, params.sigma_f64());
    let bit_count = FRAGMENT_LEN * 8;
    let e2 = sample_gaussian(&e2_seed, bit_count, params.sigma_f64());

    // u = A^T . r + e1 mod q
    let mut u = vec![0u32; pk.n];
    for col in 0..pk.n {
        let mut acc: i64 = 0;
        for row in 0..pk.m {
            acc += pk.a[row * pk.n + col] as i64 * r[row] as i64;
        }
        acc += e1[col];
        u[col] = acc.rem_euclid(pk.q as i64) as u32;
    }

    // t . r mod q
    let mut t_dot_r: i64 = 0;
    for row in 0..pk.m {
        t_dot_r += pk.t[row] as i64 * r[row] as i64;
    }
    t_dot_r = t_dot_r.rem_euclid(pk.q as i64);

    let half_q = (pk.q / 2) as i64;
    let mut v = vec![0u32; bit_count];
    for (i, slot) in v.iter_mut().enumerate() {
        let byte = fragment[i / 8];
        let bit = (byte >> (i % 8)) & 1;
        let m_i = bit as i64 * half_q;
        let e2_i = e2[i % e2.len()];
        let val = t_dot_r + e2_i + m_i;
        *slot = val.rem_euclid(pk.q as i64) as u32;
    }

    Ok(Ciphertext { u, v })
}

pub fn decrypt(ct: &Ciphertext, sk: &SecretKey, params: &SlssParams) -> [u8; FRAGMENT_LEN] {
    let mut s_dot_u: i64 = 0;
    for i in 0..sk.n.min(ct.u.len()) {
        s_dot_u += ct.u[i] as i64 * sk.s[i] as i64;
    }
    s_dot_u = s_dot_u.rem_euclid(params.q as i64);

    let quarter_q = params.q as i64 / 4;
    let mut out = [0u8; FRAGMENT_LEN];
    for (i, &v_i) in ct.v.iter().enumerate() {
        let diff = v_i as i64 - s_dot_u;
        let centered = center_mod(diff, params.q as i64);
        let bit = if centered.abs() > quarter_q { 1u8 } else { 0u8 };
        if i / 8 < out.len() {
            out[i / 8] |= bit << (i % 8);
        }
    }
    out
}

pub fn serialize_pk(pk: &PublicKey) -> Vec<u8> {
    let mut w = Writer::new();
    w.put_u32(pk.n as u32);
    w.put_u32(pk.m as u32);
    w.put_u32(pk.q);
    let a_i32: Vec<i32> = pk.a.iter().map(|&x| x as i32).collect();
    w.put_i32_vec(&a_i32);
    let t_i32: Vec<i32> = pk.t.iter().map(|&x| x as i32).collect();
    w.put_i32_vec(&t_i32);
    w.into_vec()
}

pub fn deserialize_pk(bytes: &[u8]) -> Result<PublicKey> {
    let mut r = Reader::new(bytes);
    let n = r.get_u32("slss.n")? as usize;
    let m = r.get_u32("slss.m")? as usize;
    let q = r.get_u32("slss.q")?;
    let a = r
        .get_i32_vec("slss.a")?
        .into_iter()
        .map(|x| x as u32)
        .collect();
    let t = r
        .get_i32_vec("slss.t")?
        .into_iter()
        .map(|x| x as u32)
        .collect();
    r.finish()?;
    Ok(PublicKey { a, t, n, m, q })
}

pub fn serialize_ct(ct: &Ciphertext) -> Vec<u8> {
    let mut w = Writer::new();
    let u_i32: Vec<i32> = ct.u.iter().map(|&x| x as i32).collect();
    w.put_i32_vec(&u_i32);
    let v_i32: Vec<i32> = ct.v.iter().map(|&x| x as i32).collect();
    w.put_i32_vec(&v_i32);
    w.into_vec()
}

pub fn deserialize_ct(bytes: &[u8]) -> Result<Ciphertext> {
    let mut r = Reader::new(bytes);
    let u = r
        .get_i32_vec("slss.ct.u")?
        .into_iter()
        .map(|x| x as u32)
        .collect();
    let v = r
        .get_i32_vec("slss.ct.v")?
        .into_iter()
        .map(|x| x as u32)
        .collect();
    r.finish()?;
    Ok(Ciphertext { u, v })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{get_params, Level};

    #[test]
    fn roundtrip_with_fixed_seed() {
        let params = get_params(Level::Mos128).slss;
        let seed = [0xA5u8; 32];
        let rand = [0xB7u8; 32];
        let (pk, sk) = key_gen(&params, &seed);
        let msg = [0x11u8; FRAGMENT_LEN];
        let ct = encrypt(&pk, &msg, &params, &rand).unwrap();
        let out = decrypt(&ct, &sk, &params);
        assert_eq!(out, msg);
    }

    #[test]
    fn key_has_exact_weight() {
        let params = get_params(Level::Mos128).slss;
        let (_, sk) = key_gen(&params, &[0x42u8; 32]);
        let nonzero = sk.s.iter().filter(|&&x| x != 0).count();
        assert_eq!(nonzero, params.w);
    }

    #[test]
    fn pk_values_in_range() {
        let params = get_params(Level::Mos128).slss;
        let (pk, _) = key_gen(&params, &[0x77u8; 32]);
        assert!(pk.a.iter().all(|&v| v < params.q));
        assert!(pk.t.iter().all(|&v| v < params.q));
    }

    #[test]
    fn pk_serialize_roundtrip() {
        let params = get_params(Level::Mos128).slss;
        let (pk, _) = key_gen(&params, &[0x91u8; 32]);
        let bytes = serialize_pk(&pk);
        let pk2 = deserialize_pk(&bytes).unwrap();
        assert_eq!(pk, pk2);
    }

    #[test]
    fn ct_serialize_rejects_trailing_bytes() {
        let params = get_params(Level::Mos128).slss;
        let (pk, _) = key_gen(&params, &[0x91u8; 32]);
        let ct = encrypt(&pk, &[1u8; FRAGMENT_LEN], &params, &[0x33u8; 32]).unwrap();
        let mut bytes = serialize_ct(&ct);
        bytes.push(0);
        assert!(deserialize_ct(&bytes).is_err());
    }
}
