//! EGRW: a random walk in the Cayley graph of SL(2, Z_p).
//!
//! Vertices are 2x2 integer matrices over Z_p with determinant 1; edges are
//! right-multiplication by one of four fixed generators. The public key is
//! the walk's start and end vertex; the secret is the walk itself.

use crate::error::{Error, Result};
use crate::params::EgrwParams;
use crate::serialize::{Reader, Writer};
use crate::xof::{h_d, shake256};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use zeroize::ZeroizeOnDrop;

const FRAGMENT_LEN: usize = 32;
const CACHE_CAP: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Matrix {
    pub a: i64,
    pub b: i64,
    pub c: i64,
    pub d: i64,
}

impl Matrix {
    pub fn identity() -> Self {
        Matrix { a: 1, b: 0, c: 0, d: 1 }
    }

    pub fn mul(&self, other: &Matrix, p: i64) -> Matrix {
        Matrix {
            a: (self.a * other.a + self.b * other.c).rem_euclid(p),
            b: (self.a * other.b + self.b * other.d).rem_euclid(p),
            c: (self.c * other.a + self.d * other.c).rem_euclid(p),
            d: (self.c * other.b + self.d * other.d).rem_euclid(p),
        }
    }

    pub fn inverse(&self, p: i64) -> Matrix {
        Matrix {
            a: self.d.rem_euclid(p),
            b: (-self.b).rem_euclid(p),
            c: (-self.c).rem_euclid(p),
            d: self.a.rem_euclid(p),
        }
    }

    pub fn is_valid(&self, p: i64) -> bool {
        let det = (self.a * self.d - self.b * self.c).rem_euclid(p);
        det == 1
    }

    fn to_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[0..8].copy_from_slice(&self.a.to_le_bytes());
        out[8..16].copy_from_slice(&self.b.to_le_bytes());
        out[16..24].copy_from_slice(&self.c.to_le_bytes());
        out[24..32].copy_from_slice(&self.d.to_le_bytes());
        out
    }

    fn from_bytes_i32(bytes: &[i32; 4]) -> Matrix {
        Matrix {
            a: bytes[0] as i64,
            b: bytes[1] as i64,
            c: bytes[2] as i64,
            d: bytes[3] as i64,
        }
    }
}

fn mod_inverse(a: i64, p: i64) -> i64 {
    // p is prime, use Fermat's little theorem via binary exponentiation.
    let mut base = a.rem_euclid(p);
    let mut exp = p - 2;
    let mut result: i64 = 1;
    while exp > 0 {
        if exp & 1 == 1 {
            result = (result * base).rem_euclid(p);
        }
        base = (base * base).rem_euclid(p);
        exp >>= 1;
    }
    result
}

/// Generator set cache keyed by modulus `p`, bounded to [`CACHE_CAP`] entries
/// with LRU eviction. Each entry stores the four fixed generators
/// `(S, S^-1, T, T^-1)` built once per modulus.
struct GeneratorCache {
    entries: Mutex<HashMap<u32, (u64, [Matrix; 4])>>,
    clock: Mutex<u64>,
}

static GENERATOR_CACHE: OnceLock<GeneratorCache> = OnceLock::new();

fn generators_for(p: u32) -> [Matrix; 4] {
    let cache = GENERATOR_CACHE.get_or_init(|| GeneratorCache {
        entries: Mutex::new(HashMap::new()),
        clock: Mutex::new(0),
    });

    let mut tick = cache.clock.lock().unwrap();
    *tick += 1;
    let now = *tick;
    drop(tick);

    {
        let mut entries = cache.entries.lock().unwrap();
        if let Some((seen, gens)) = entries.get_mut(&p) {
            *seen = now;
            return *gens;
        }
    }

    let pi = p as i64;
    let s = Matrix { a: 0, b: (-1i64).rem_euclid(pi), c: 1, d: 0 };
    let s_inv = s.inverse(pi);
    let t = Matrix { a: 1, b: 1, c: 0, d: 1 };
    let t_inv = t.inverse(pi);
    let gens = [s, s_inv, t, t_inv];

    let mut entries = cache.entries.lock().unwrap();
    if entries.len() >= CACHE_CAP && !entries.contains_key(&p) {
        if let Some((&lru_key, _)) = entries.iter().min_by_key(|(_, (seen, _))| *seen) {
            entries.remove(&lru_key);
        }
    }
    entries.insert(p, (now, gens));
    gens
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub v_start: Matrix,
    pub v_end: Matrix,
    pub p: u32,
    pub k: usize,
}

#[derive(Debug, Clone, ZeroizeOnDrop)]
pub struct SecretKey {
    pub walk: Vec<u8>, // values in 0..4
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    pub v_eph: Matrix,
    pub commitment: [u8; FRAGMENT_LEN],
}

fn walk_from_seed(seed: &[u8], k: usize) -> Vec<u8> {
    let stream = shake256(seed, k.div_ceil(4).max(1));
    let mut out = Vec::with_capacity(k);
    for byte in stream {
        for shift in [0u8, 2, 4, 6] {
            if out.len() == k {
                break;
            }
            out.push((byte >> shift) & 0b11);
        }
    }
    out
}

fn walk_endpoint(start: Matrix, walk: &[u8], gens: &[Matrix; 4], p: i64) -> Matrix {
    let mut cur = start;
    for &step in walk {
        cur = cur.mul(&gens[step as usize], p);
    }
    cur
}

pub fn key_gen(params: &EgrwParams, seed: &[u8]) -> (PublicKey, SecretKey) {
    let p = params.p as i64;
    let gens = generators_for(params.p);

    let start_seed = h_d("kmosaic-egrw-start-v1", seed);
    let a_candidates = shake256(&start_seed, 64);
    let mut a: i64 = 1;
    for chunk in a_candidates.chunks_exact(8) {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(chunk);
        let candidate = (i64::from_le_bytes(bytes).rem_euclid(p - 1)) + 1;
        if candidate != 0 {
            a = candidate;
            break;
        }
    }
    let b = (i64::from_le_bytes(a_candidates[8..16].try_into().unwrap())).rem_euclid(p);
    let c = (i64::from_le_bytes(a_candidates[16..24].try_into().unwrap())).rem_euclid(p);
    let a_inv = mod_inverse(a, p);
    let d = ((1 + b * c).rem_euclid(p) * a_inv).rem_euclid(p);
    let v_start = Matrix { a, b, c, d };
    debug_assert!(v_start.is_valid(p));

    let walk_seed = h_d("kmosaic-egrw-walk-v1", seed);
    let walk = walk_from_seed(&walk_seed, params.k);
    let v_end = walk_endpoint(v_start, &walk, &gens, p);

    (
        PublicKey { v_start, v_end, p: params.p, k: params.k },
        SecretKey { walk },
    )
}

pub fn encrypt(
    pk: &PublicKey,
    fragment: &[u8; FRAGMENT_LEN],
    _params: &EgrwParams,
    randomness: &[u8],
) -> Result<Ciphertext> {
    if randomness.len() < 32 {
        return Err(Error::InvalidRandomness {
            reason: "egrw encrypt requires at least 32 bytes of randomness".into(),
        });
    }
    let gens = generators_for(pk.p);
    let p = pk.p as i64;
    let eph_seed = h_d("kmosaic-egrw-eph-v1", randomness);
    let walk = walk_from_seed(&eph_seed, pk.k);
    let v_eph = walk_endpoint(pk.v_start, &walk, &gens, p);

    let keystream = shake256(
        &[
            h_d("mask", &v_eph.to_bytes()).as_slice(),
            h_d("mask", &pk.v_start.to_bytes()).as_slice(),
            h_d("mask", &pk.v_end.to_bytes()).as_slice(),
        ]
        .concat(),
        FRAGMENT_LEN,
    );

    let mut commitment = [0u8; FRAGMENT_LEN];
    for i in 0..FRAGMENT_LEN {
        commitment[i] = fragment[i] ^ keystream[i];
    }
    Ok(Ciphertext { v_eph, commitment })
}

/// Decrypts an EGRW ciphertext.
///
/// The secret walk is not consulted: the keystream is rederived entirely
/// from public values (the ephemeral endpoint and the two key endpoints),
/// matching what the prover used to encrypt. The secret key's role is
/// limited to having produced `v_end` at key-generation time.
pub fn decrypt(ct: &Ciphertext, pk: &PublicKey, _sk: &SecretKey) -> [u8; FRAGMENT_LEN] {
    let keystream = shake256(
        &[
            h_d("mask", &ct.v_eph.to_bytes()).as_slice(),
            h_d("mask", &pk.v_start.to_bytes()).as_slice(),
            h_d("mask", &pk.v_end.to_bytes()).as_slice(),
        ]
        .concat(),
        FRAGMENT_LEN,
    );
    let mut out = [0u8; FRAGMENT_LEN];
    for i in 0..FRAGMENT_LEN {
        out[i] = ct.commitment[i] ^ keystream[i];
    }
    out
}

pub fn serialize_pk(pk: &PublicKey) -> Vec<u8> {
    let mut w = Writer::new();
    w.put_u32(pk.p);
    w.put_u32(pk.k as u32);
    w.put_i32_vec(&[
        pk.v_start.a as i32,
        pk.v_start.b as i32,
        pk.v_start.c as i32,
        pk.v_start.d as i32,
    ]);
    w.put_i32_vec(&[
        pk.v_end.a as i32,
        pk.v_end.b as i32,
        pk.v_end.c as i32,
        pk.v_end.d as i32,
    ]);
    w.into_vec()
}

pub fn deserialize_pk(bytes: &[u8]) -> Result<PublicKey> {
    let mut r = Reader::new(bytes);
    let p = r.get_u32("egrw.p")?;
    let k = r.get_u32("egrw.k")? as usize;
    let start_vec = r.get_i32_vec("egrw.v_start")?;
    let end_vec = r.get_i32_vec("egrw.v_end")?;
    r.finish()?;
    if start_vec.len() != 4 || end_vec.len() != 4 {
        return Err(crate::error::EncodingError::BadPartCount {
            expected: 4,
            got: start_vec.len().max(end_vec.len()),
        }
        .into());
    }
    let v_start = Matrix::from_bytes_i32(&start_vec.try_into().unwrap());
    let v_end = Matrix::from_bytes_i32(&end_vec.try_into().unwrap());
    Ok(PublicKey { v_start, v_end, p, k })
}

pub fn serialize_ct(ct: &Ciphertext) -> Vec<u8> {
    let mut w = Writer::new();
    w.put_i32_vec(&[
        ct.v_eph.a as i32,
        ct.v_eph.b as i32,
        ct.v_eph.c as i32,
        ct.v_eph.d as i32,
    ]);
    w.put_part(&ct.commitment);
    w.into_vec()
}

pub fn deserialize_ct(bytes: &[u8]) -> Result<Ciphertext> {
    let mut r = Reader::new(bytes);
    let eph_vec = r.get_i32_vec("egrw.ct.v_eph")?;
    let commitment_slice = r.get_part("egrw.ct.commitment")?;
    r.finish()?;
    if eph_vec.len() != 4 {
        return Err(crate::error::EncodingError::BadPartCount {
            expected: 4,
            got: eph_vec.len(),
        }
        .into());
    }
    if commitment_slice.len() != FRAGMENT_LEN {
        return Err(crate::error::EncodingError::BadFixedSize {
            field: "egrw.ct.commitment",
            expected: FRAGMENT_LEN,
            got: commitment_slice.len(),
        }
        .into());
    }
    let v_eph = Matrix::from_bytes_i32(&eph_vec.try_into().unwrap());
    let mut commitment = [0u8; FRAGMENT_LEN];
    commitment.copy_from_slice(commitment_slice);
    Ok(Ciphertext { v_eph, commitment })
}
