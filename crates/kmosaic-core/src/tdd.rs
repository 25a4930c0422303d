//! TDD: a noisy low-rank tensor decomposition primitive.
//!
//! Public key is a rank-`r` 3-tensor plus Gaussian noise; the secret is the
//! three factor lists that generated the noiseless part. Encryption masks a
//! tensor contraction of the message under a one-time random matrix, then
//! XORs the message against a keystream derived from the masked matrix —
//! the tensor factors bind the public key to the recipient but are not
//! needed to recover the keystream (see the decrypt doc comment below).

use crate::error::{Error, Result};
use crate::params::TddParams;
use crate::serialize::{Reader, Writer};
use crate::xof::{h_d, sample_gaussian, sample_uniform_mod_q, shake256};
use zeroize::ZeroizeOnDrop;

const FRAGMENT_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub t: Vec<u32>, // n*n*n, index (i,j,k) -> i*n*n + j*n + k
    pub n: usize,
    pub r: usize,
    pub q: u32,
}

#[derive(Debug, Clone, ZeroizeOnDrop)]
pub struct SecretKey {
    #[zeroize(skip)]
    pub n: usize,
    #[zeroize(skip)]
    pub r: usize,
    pub a: Vec<i32>, // r * n
    pub b: Vec<i32>, // r * n
    pub c: Vec<i32>, // r * n
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    pub m: Vec<u32>,       // n*n
    pub e_msg: [u8; FRAGMENT_LEN],
}

fn factor_seed(base: &[u8], mode: &str, i: usize) -> [u8; 32] {
    h_d(
        &format!("kmosaic-tdd-factor-{mode}-{i}-v1"),
        base,
    )
}

pub fn key_gen(params: &TddParams, seed: &[u8]) -> (PublicKey, SecretKey) {
    let n = params.n;
    let r = params.r;
    let mut a = Vec::with_capacity(r * n);
    let mut b = Vec::with_capacity(r * n);
    let mut c = Vec::with_capacity(r * n);
    for i in 0..r {
        let sa = factor_seed(seed, "a", i);
        let sb = factor_seed(seed, "b", i);
        let sc = factor_seed(seed, "c", i);
        a.extend(sample_uniform_mod_q(&sa, params.q, n).into_iter().map(|x| x as i32));
        b.extend(sample_uniform_mod_q(&sb, params.q, n).into_iter().map(|x| x as i32));
        c.extend(sample_uniform_mod_q(&sc, params.q, n).into_iter().map(|x| x as i32));
    }

    let mut t_secret = vec![0i64; n * n * n];
    for i in 0..r {
        for j in 0..n {
            let aj = a[i * n + j] as i64;
            for k in 0..n {
                let bk = b[i * n + k] as i64;
                for l in 0..n {
                    let cl = c[i * n + l] as i64;
                    t_secret[j * n * n + k * n + l] += aj * bk * cl;
                }
            }
        }
    }

    let noise_seed = h_d("kmosaic-tdd-noise-v1", seed);
    let noise = sample_gaussian(&noise_seed, n * n * n, params.sigma_f64());
    let t: Vec<u32> = t_secret
        .iter()
        .zip(noise.iter())
        .map(|(&s, &e)| (s + e).rem_euclid(params.q as i64) as u32)
        .collect();

    (
        PublicKey { t, n, r, q: params.q },
        SecretKey { n, r, a, b, c },
    )
}

fn bytes_of_u32(v: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(v.len() * 4);
    for &x in v {
        out.extend_from_slice(&x.to_le_bytes());
    }
    out
}

pub fn encrypt(
    pk: &PublicKey,
    fragment: &[u8; FRAGMENT_LEN],
    params: &TddParams,
    randomness: &[u8],
) -> Result<Ciphertext> {
    if randomness.len() < 32 {
        return Err(Error::InvalidRandomness {
            reason: "tdd encrypt requires at least 32 bytes of randomness".into(),
        });
    }
    let n = pk.n;
    let lambda_len = params.r.min(32);
    let scale = (pk.q as i64) / 256;
    let lambda: Vec<i64> = fragment[..lambda_len]
        .iter()
        .map(|&b| (b as i64 * scale).rem_euclid(pk.q as i64))
        .collect();

    // Contract along the first mode.
    let mut c = vec![0i64; n * n];
    for j in 0..n {
        for k in 0..n {
            let mut acc: i64 = 0;
            for (i, &li) in lambda.iter().enumerate() {
                acc += pk.t[i * n * n + j * n + k] as i64 * li;
            }
            c[j * n + k] = acc.rem_euclid(pk.q as i64);
        }
    }

    let mask_seed = h_d("kmosaic-tdd-mask-v1", randomness);
    let mask = sample_uniform_mod_q(&mask_seed, pk.q, n * n);
    let m: Vec<u32> = c
        .iter()
        .zip(mask.iter())
        .map(|(&ci, &ri)| ((ci + ri as i64).rem_euclid(pk.q as i64)) as u32)
        .collect();

    let hint_seed = h_d("kmosaic-tdd-hint-v1", &bytes_of_u32(&m));
    let keystream = shake256(&hint_seed, FRAGMENT_LEN);
    let mut e_msg = [0u8; FRAGMENT_LEN];
    for i in 0..FRAGMENT_LEN {
        e_msg[i] = fragment[i] ^ keystream[i];
    }

    Ok(Ciphertext { m, e_msg })
}

/// Decrypts a TDD ciphertext.
///
/// Recomputes the keystream from the masked matrix `m` only — the tensor
/// factors in the secret key do not participate in this step. The factors
/// exist to bind the public tensor to the recipient (via the entanglement
/// binding hash) rather than to recover the message; a party holding only
/// the public key and a ciphertext cannot decrypt, but a party able to
/// reproduce `m` from any means, not only these factors, also can.
pub fn decrypt(ct: &Ciphertext, _sk: &SecretKey) -> [u8; FRAGMENT_LEN] {
    let hint_seed = h_d("kmosaic-tdd-hint-v1", &bytes_of_u32(&ct.m));
    let keystream = shake256(&hint_seed, FRAGMENT_LEN);
    let mut out = [0u8; FRAGMENT_LEN];
    for i in 0..FRAGMENT_LEN {
        out[i] = ct.e_msg[i] ^ keystream[i];
    }
    out
}

pub fn serialize_pk(pk: &PublicKey) -> Vec<u8> {
    let mut w = Writer::new();
    w.put_u32(pk.n as u32);
    w.put_u32(pk.r as u32);
    w.put_u32(pk.q);
    let t_i32: Vec<i32> = pk.t.iter().map(|&x| x as i32).collect();
    w.put_i32_vec(&t_i32);
    w.into_vec()
}

pub fn deserialize_pk(bytes: &[u8]) -> Result<PublicKey> {
    let mut reader = Reader::new(bytes);
    let n = reader.get_u32("tdd.n")? as usize;
    let r = reader.get_u32("tdd.r")? as usize;
    let q = reader.get_u32("tdd.q")?;
    let t = reader
        .get_i32_vec("tdd.t")?
        .into_iter()
        .map(|x| x as u32)
        .collect();
    reader.finish()?;
    Ok(PublicKey { t, n, r, q })
}

pub fn serialize_ct(ct: &Ciphertext) -> Vec<u8> {
    let mut w = Writer::new();
    let m_i32: Vec<i32> = ct.m.iter().map(|&x| x as i32).collect();
    w.put_i32_vec(&m_i32);
    w.put_part(&ct.e_msg);
    w.into_vec()
}

pub fn deserialize_ct(bytes: &[u8]) -> Result<Ciphertext> {
    let mut r = Reader::new(bytes);
    let m = r
        .get_i32_vec("tdd.ct.m")?
        .into_iter()
        .map(|x| x as u32)
        .collect();
    let e_msg_slice = r.get_part("tdd.ct.e_msg")?;
    if e_msg_slice.len() != FRAGMENT_LEN {
        return Err(crate::error::EncodingError::BadFixedSize {
            field: "tdd.ct.e_msg",
            expected: FRAGMENT_LEN,
            got: e_msg_slice.len(),
        }
        .into());
    }
    let mut e_msg = [0u8; FRAGMENT_LEN];
    e_msg.copy_from_slice(e_msg_slice);
    r.finish()?;
    Ok(Ciphertext { m, e_msg })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{get_params, Level};

    #[test]
    fn roundtrip_with_fixed_seed() {
        let params = get_params(Level::Mos128).tdd;
        let seed = [0xC3u8; 32];
        let rand = [0xD9u8; 32];
        let (pk, sk) = key_gen(&params, &seed);
        let msg: [u8; 32] = std::array::from_fn(|i| i as u8);
        let ct = encrypt(&pk, &msg, &params, &rand).unwrap();
        let out = decrypt(&ct, &sk);
        assert_eq!(out, msg);
    }

    #[test]
    fn pk_values_in_range() {
        let params = get_params(Level::Mos128).tdd;
        let (pk, _) = key_gen(&params, &[0x55u8; 32]);
        assert!(pk.t.iter().all(|&v| v < params.q));
    }

    #[test]
    fn serialize_roundtrip() {
        let params = get_params(Level::Mos128).tdd;
        let (pk, _) = key_gen(&params, &[0x66u8; 32]);
        let bytes = serialize_pk(&pk);
        assert_eq!(deserialize_pk(&bytes).unwrap(), pk);

        let ct = encrypt(&pk, &[9u8; 32], &params, &[0x12u8; 32]).unwrap();
        let ct_bytes = serialize_ct(&ct);
        assert_eq!(deserialize_ct(&ct_bytes).unwrap(), ct);
    }
}
