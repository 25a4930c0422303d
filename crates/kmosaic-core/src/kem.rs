//! The composite key encapsulation mechanism: SLSS + TDD + EGRW entangled
//! under a Fujisaki-Okamoto transform with implicit rejection.

use crate::entangle::{
    compute_binding, nizk_prove, nizk_verify, secret_share_deterministic, secret_reconstruct,
    serialize_nizk, NizkProof,
};
use crate::error::{Error, Result};
use crate::params::{Level, MosaicParams};
use crate::serialize::{Reader, Writer};
use crate::xof::{ct_eq, ct_select, h_d, h256, hash_concat, secure_random, shake256, validate_seed_entropy};
use crate::{egrw, slss, tdd};
use zeroize::Zeroize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub slss: slss::PublicKey,
    pub tdd: tdd::PublicKey,
    pub egrw: egrw::PublicKey,
    pub binding: [u8; 32],
    pub params: MosaicParams,
}

#[derive(Debug, Clone)]
pub struct SecretKey {
    pub slss: slss::SecretKey,
    pub tdd: tdd::SecretKey,
    pub egrw: egrw::SecretKey,
    pub seed: [u8; 32],
    pub pk_hash: [u8; 32],
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.seed.zeroize();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    pub c1: slss::Ciphertext,
    pub c2: tdd::Ciphertext,
    pub c3: egrw::Ciphertext,
    pub proof: NizkProof,
}

pub fn serialize_pk(pk: &PublicKey) -> Vec<u8> {
    let mut w = Writer::new();
    w.put_part(&slss::serialize_pk(&pk.slss));
    w.put_part(&tdd::serialize_pk(&pk.tdd));
    w.put_part(&egrw::serialize_pk(&pk.egrw));
    w.put_part(&pk.binding);
    w.into_vec()
}

pub fn deserialize_pk(bytes: &[u8], params: MosaicParams) -> Result<PublicKey> {
    let mut r = Reader::new(bytes);
    let slss_pk = slss::deserialize_pk(r.get_part("kem.pk.slss")?)?;
    let tdd_pk = tdd::deserialize_pk(r.get_part("kem.pk.tdd")?)?;
    let egrw_pk = egrw::deserialize_pk(r.get_part("kem.pk.egrw")?)?;
    let binding_slice = r.get_part("kem.pk.binding")?;
    r.finish()?;
    if binding_slice.len() != 32 {
        return Err(crate::error::EncodingError::BadFixedSize {
            field: "kem.pk.binding",
            expected: 32,
            got: binding_slice.len(),
        }
        .into());
    }
    let mut binding = [0u8; 32];
    binding.copy_from_slice(binding_slice);
    Ok(PublicKey {
        slss: slss_pk,
        tdd: tdd_pk,
        egrw: egrw_pk,
        binding,
        params,
    })
}

pub fn serialize_ct(ct: &Ciphertext) -> Vec<u8> {
    let mut w = Writer::new();
    w.put_part(&slss::serialize_ct(&ct.c1));
    w.put_part(&tdd::serialize_ct(&ct.c2));
    w.put_part(&egrw::serialize_ct(&ct.c3));
    w.put_part(&serialize_nizk(&ct.proof));
    w.into_vec()
}

pub fn deserialize_ct(bytes: &[u8]) -> Result<Ciphertext> {
    let mut r = Reader::new(bytes);
    let c1 = slss::deserialize_ct(r.get_part("kem.ct.c1")?)?;
    let c2 = tdd::deserialize_ct(r.get_part("kem.ct.c2")?)?;
    let c3 = egrw::deserialize_ct(r.get_part("kem.ct.c3")?)?;
    let proof = crate::entangle::deserialize_nizk(r.get_part("kem.ct.proof")?)?;
    r.finish()?;
    Ok(Ciphertext { c1, c2, c3, proof })
}

pub fn key_gen(level: Level) -> Result<(PublicKey, SecretKey)> {
    let mut seed = [0u8; 32];
    secure_random(&mut seed)?;
    let result = key_gen_from_seed(crate::params::get_params(level), &seed);
    seed.zeroize();
    result
}

pub fn key_gen_from_seed(params: MosaicParams, seed: &[u8]) -> Result<(PublicKey, SecretKey)> {
    validate_seed_entropy(seed)?;
    crate::params::validate_params(&params)?;
    let mut master = [0u8; 32];
    master.copy_from_slice(&seed[..32]);

    let slss_seed = h_d("kmosaic-kem-slss-v1", &master);
    let tdd_seed = h_d("kmosaic-kem-tdd-v1", &master);
    let egrw_seed = h_d("kmosaic-kem-egrw-v1", &master);

    let (slss_pk, slss_sk) = slss::key_gen(&params.slss, &slss_seed);
    let (tdd_pk, tdd_sk) = tdd::key_gen(&params.tdd, &tdd_seed);
    let (egrw_pk, egrw_sk) = egrw::key_gen(&params.egrw, &egrw_seed);

    let binding = compute_binding(
        &slss::serialize_pk(&slss_pk),
        &tdd::serialize_pk(&tdd_pk),
        &egrw::serialize_pk(&egrw_pk),
    );

    let pk = PublicKey {
        slss: slss_pk,
        tdd: tdd_pk,
        egrw: egrw_pk,
        binding,
        params,
    };
    let pk_hash = h256(&serialize_pk(&pk));

    let sk = SecretKey {
        slss: slss_sk,
        tdd: tdd_sk,
        egrw: egrw_sk,
        seed: master,
        pk_hash,
    };

    Ok((pk, sk))
}

struct Encapsulation {
    ciphertext: Ciphertext,
    shared_secret: [u8; 32],
}

fn encapsulate_det_inner(pk: &PublicKey, m: &[u8; 32]) -> Result<Encapsulation> {
    let rand = hash_concat(&[m, &pk.binding]);
    let share_vecs = secret_share_deterministic(m, 3, &rand)?;
    let shares: [[u8; 32]; 3] = [
        share_vecs[0].clone().try_into().unwrap(),
        share_vecs[1].clone().try_into().unwrap(),
        share_vecs[2].clone().try_into().unwrap(),
    ];

    let c1 = slss::encrypt(
        &pk.slss,
        &shares[0],
        &pk.params.slss,
        &h_d("kmosaic-kem-slss-v1-rand", &rand),
    )?;
    let c2 = tdd::encrypt(
        &pk.tdd,
        &shares[1],
        &pk.params.tdd,
        &h_d("kmosaic-kem-tdd-v1-rand", &rand),
    )?;
    let c3 = egrw::encrypt(
        &pk.egrw,
        &shares[2],
        &pk.params.egrw,
        &h_d("kmosaic-kem-egrw-v1-rand", &rand),
    )?;

    let ct_hashes = [
        h256(&slss::serialize_ct(&c1)),
        h256(&tdd::serialize_ct(&c2)),
        h256(&egrw::serialize_ct(&c3)),
    ];

    let proof = nizk_prove(m, &shares, &ct_hashes, &h_d("kmosaic-kem-slss-v1-nizk", &rand))?;

    let ciphertext = Ciphertext { c1, c2, c3, proof };
    let ct_hash = h256(&serialize_ct(&ciphertext));
    let shared_secret_v = shake256(&h_d("kmosaic-kem-ss-v1", &hash_concat(&[m, &ct_hash])), 32);
    let mut shared_secret = [0u8; 32];
    shared_secret.copy_from_slice(&shared_secret_v);

    Ok(Encapsulation {
        ciphertext,
        shared_secret,
    })
}

/// Encapsulates against `pk` using a fresh random 32-byte ephemeral secret.
pub fn encapsulate(pk: &PublicKey) -> Result<([u8; 32], Ciphertext)> {
    let mut m = [0u8; 32];
    secure_random(&mut m)?;
    let result = encapsulate_det(pk, &m);
    m.zeroize();
    result
}

/// Deterministic encapsulation given an explicit 32-byte ephemeral secret.
pub fn encapsulate_det(pk: &PublicKey, m: &[u8; 32]) -> Result<([u8; 32], Ciphertext)> {
    let enc = encapsulate_det_inner(pk, m)?;
    Ok((enc.shared_secret, enc.ciphertext))
}

/// Decapsulates `ct` under `sk`/`pk`, always returning a 32-byte shared
/// secret. On any verification failure the result is a pseudorandom value
/// derived from the secret key's seed and the ciphertext rather than a
/// signal distinguishable from a real success, per the Fujisaki-Okamoto
/// implicit-rejection discipline.
pub fn decapsulate(ct: &Ciphertext, sk: &SecretKey, pk: &PublicKey) -> Result<[u8; 32]> {
    let ct_bytes = serialize_ct(ct);
    let reject = shake256(
        &h_d(
            "kmosaic-kem-reject-v1",
            &hash_concat(&[&sk.seed, &ct_bytes]),
        ),
        32,
    );

    let s1 = slss::decrypt(&ct.c1, &sk.slss, &pk.params.slss);
    let s2 = tdd::decrypt(&ct.c2, &sk.tdd);
    let s3 = egrw::decrypt(&ct.c3, &pk.egrw, &sk.egrw);
    let mut m_prime = [0u8; 32];
    for i in 0..32 {
        m_prime[i] = s1[i] ^ s2[i] ^ s3[i];
    }

    let re_enc = encapsulate_det_inner(pk, &m_prime)?;
    let ct_prime_bytes = serialize_ct(&re_enc.ciphertext);

    let ok1 = ct_eq(&ct_bytes, &ct_prime_bytes);

    let ct_hashes = [
        h256(&slss::serialize_ct(&ct.c1)),
        h256(&tdd::serialize_ct(&ct.c2)),
        h256(&egrw::serialize_ct(&ct.c3)),
    ];
    let ok2 = nizk_verify(&ct.proof, &ct_hashes, &m_prime);

    let ok = ok1 && ok2;

    let ct_hash = h256(&ct_bytes);
    let ss_real_v = shake256(
        &h_d("kmosaic-kem-ss-v1", &hash_concat(&[&m_prime, &ct_hash])),
        32,
    );
    let mut ss_real = [0u8; 32];
    ss_real.copy_from_slice(&ss_real_v);

    let selected = ct_select(ok, &reject, &ss_real);
    let mut out = [0u8; 32];
    out.copy_from_slice(&selected);

    m_prime.zeroize();
    ss_real.zeroize();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::get_params;

    #[test]
    fn kem_roundtrip() {
        let params = get_params(Level::Mos128);
        let seed = [0x01u8; 32];
        let (pk, sk) = key_gen_from_seed(params, &seed).unwrap();
        let m = [0x02u8; 32];
        let (ss, ct) = encapsulate_det(&pk, &m).unwrap();
        let ss2 = decapsulate(&ct, &sk, &pk).unwrap();
        assert_eq!(ss, ss2);
    }

    #[test]
    fn kem_deterministic() {
        let params = get_params(Level::Mos128);
        let seed = [0x01u8; 32];
        let (pk1, _) = key_gen_from_seed(params, &seed).unwrap();
        let (pk2, _) = key_gen_from_seed(params, &seed).unwrap();
        assert_eq!(serialize_pk(&pk1), serialize_pk(&pk2));

        let m = [0x02u8; 32];
        let (ss1, ct1) = encapsulate_det(&pk1, &m).unwrap();
        let (ss2, ct2) = encapsulate_det(&pk1, &m).unwrap();
        assert_eq!(ss1, ss2);
        assert_eq!(serialize_ct(&ct1), serialize_ct(&ct2));
    }

    #[test]
    fn kem_tamper_changes_shared_secret() {
        let params = get_params(Level::Mos128);
        let seed = [0x01u8; 32];
        let (pk, sk) = key_gen_from_seed(params, &seed).unwrap();
        let m = [0x02u8; 32];
        let (ss, mut ct) = encapsulate_det(&pk, &m).unwrap();
        ct.c1.u[0] = 0;
        let ss2 = decapsulate(&ct, &sk, &pk).unwrap();
        assert_ne!(ss, ss2);
    }

    #[test]
    fn kem_freshness_across_calls() {
        let params = get_params(Level::Mos128);
        let (pk, _) = key_gen(Level::Mos128).unwrap();
        let _ = params;
        let (ss1, ct1) = encapsulate(&pk).unwrap();
        let (ss2, ct2) = encapsulate(&pk).unwrap();
        assert_ne!(ss1, ss2);
        assert_ne!(serialize_ct(&ct1), serialize_ct(&ct2));
    }

    #[test]
    fn pk_ct_serialize_roundtrip() {
        let params = get_params(Level::Mos128);
        let seed = [0x01u8; 32];
        let (pk, _) = key_gen_from_seed(params, &seed).unwrap();
        let bytes = serialize_pk(&pk);
        let pk2 = deserialize_pk(&bytes, params).unwrap();
        assert_eq!(pk, pk2);

        let m = [0x02u8; 32];
        let (_, ct) = encapsulate_det(&pk, &m).unwrap();
        let ct_bytes = serialize_ct(&ct);
        let ct2 = deserialize_ct(&ct_bytes).unwrap();
        assert_eq!(ct, ct2);
    }
}
