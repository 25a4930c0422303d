//! The entanglement layer: XOR secret sharing across the three primitives,
//! the binding hash that ties their public keys together, and a
//! Fiat-Shamir NIZK proving that a KEM ciphertext's three fragments all
//! decode to shares of the same secret.

use crate::error::{Error, Result};
use crate::serialize::{Reader, Writer};
use crate::xof::{ct_eq, h_d, hash_concat, secure_random, shake256};

/// Splits `secret` into `n` shares that XOR back to `secret`. The first
/// `n-1` shares are uniformly random; the last is the running XOR.
pub fn secret_share(secret: &[u8], n: usize) -> Result<Vec<Vec<u8>>> {
    validate_share_count(n)?;
    let mut shares: Vec<Vec<u8>> = Vec::with_capacity(n);
    let mut acc = secret.to_vec();
    for _ in 0..n - 1 {
        let mut share = vec![0u8; secret.len()];
        secure_random(&mut share)?;
        for (a, s) in acc.iter_mut().zip(share.iter()) {
            *a ^= s;
        }
        shares.push(share);
    }
    shares.push(acc);
    Ok(shares)
}

/// Deterministic variant: shares `0..n-1` are derived from `SHAKE(seed, i)`;
/// the last share is still the running XOR so reconstruction is identical
/// to the randomized variant.
pub fn secret_share_deterministic(secret: &[u8], n: usize, seed: &[u8]) -> Result<Vec<Vec<u8>>> {
    validate_share_count(n)?;
    if seed.len() < 16 {
        return Err(Error::InvalidRandomness {
            reason: "deterministic sharing requires a seed of at least 16 bytes".into(),
        });
    }
    let mut shares: Vec<Vec<u8>> = Vec::with_capacity(n);
    let mut acc = secret.to_vec();
    for i in 0..n - 1 {
        let tag = format!("kmosaic-share-v1-{i}");
        let share_seed = h_d(&tag, seed);
        let share = shake256(&share_seed, secret.len());
        for (a, s) in acc.iter_mut().zip(share.iter()) {
            *a ^= s;
        }
        shares.push(share);
    }
    shares.push(acc);
    Ok(shares)
}

fn validate_share_count(n: usize) -> Result<()> {
    if !(2..=255).contains(&n) {
        return Err(Error::InvalidParameter {
            reason: format!("share count must be in 2..=255, got {n}"),
        });
    }
    Ok(())
}

/// Reconstructs the original secret by XORing all shares together.
pub fn secret_reconstruct(shares: &[Vec<u8>]) -> Vec<u8> {
    let len = shares.first().map(|s| s.len()).unwrap_or(0);
    let mut out = vec![0u8; len];
    for share in shares {
        for (o, s) in out.iter_mut().zip(share.iter()) {
            *o ^= s;
        }
    }
    out
}

/// Binding hash tying together the three primitive public keys so that
/// substituting any one of them is detectable.
pub fn compute_binding(slss_pk_bytes: &[u8], tdd_pk_bytes: &[u8], egrw_pk_bytes: &[u8]) -> [u8; 32] {
    let h_slss = h_d("bind-slss", slss_pk_bytes);
    let h_tdd = h_d("bind-tdd", tdd_pk_bytes);
    let h_egrw = h_d("bind-egrw", egrw_pk_bytes);
    h_d("bind-final", &[h_slss, h_tdd, h_egrw].concat())
}

pub struct Commitment {
    pub digest: [u8; 32],
    pub randomness: [u8; 32],
}

/// Commits to `x` with fresh 256-bit randomness.
pub fn create_commitment(x: &[u8]) -> Result<Commitment> {
    let mut randomness = [0u8; 32];
    secure_random(&mut randomness)?;
    let digest = h_d("commit", &hash_concat(&[x, &randomness]));
    Ok(Commitment { digest, randomness })
}

/// Verifies that `digest` is a commitment to `x` opened by `randomness`, in
/// constant time.
pub fn verify_commitment(digest: &[u8; 32], x: &[u8], randomness: &[u8; 32]) -> bool {
    let expected = h_d("commit", &hash_concat(&[x, randomness]));
    ct_eq(&expected, digest)
}

/// A non-interactive zero-knowledge proof that three ciphertext fragments
/// decode to XOR-shares of the same 32-byte secret, without revealing the
/// secret or the shares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NizkProof {
    pub challenge: [u8; 32],
    pub commitments: [[u8; 32]; 3],
    pub responses: [Vec<u8>; 3], // each: masked_share (32B) || commit_randomness (32B)
}

pub fn nizk_prove(
    secret: &[u8; 32],
    shares: &[[u8; 32]; 3],
    ct_hashes: &[[u8; 32]; 3],
    randomness: &[u8],
) -> Result<NizkProof> {
    if randomness.len() < 32 {
        return Err(Error::InvalidRandomness {
            reason: "nizk_prove requires at least 32 bytes of randomness".into(),
        });
    }
    let mut commit_randomness = [[0u8; 32]; 3];
    let mut commitments = [[0u8; 32]; 3];
    for i in 0..3 {
        let r_i = h_d(&format!("nizk-commit-{i}"), randomness);
        commit_randomness[i] = r_i;
        commitments[i] = h_d(
            "nizk-com",
            &hash_concat(&[&shares[i], &r_i, &ct_hashes[i]]),
        );
    }

    let msg_hash = h_d("nizk-msg", secret);
    let challenge = crate::xof::h256(&hash_concat(&[
        &msg_hash,
        &commitments[0],
        &commitments[1],
        &commitments[2],
        &ct_hashes[0],
        &ct_hashes[1],
        &ct_hashes[2],
    ]));

    let mut responses: [Vec<u8>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for i in 0..3 {
        let mask = shake256(&h_d(&format!("nizk-mask-{i}"), &challenge), shares[i].len());
        let masked: Vec<u8> = shares[i].iter().zip(mask.iter()).map(|(a, b)| a ^ b).collect();
        let mut resp = masked;
        resp.extend_from_slice(&commit_randomness[i]);
        responses[i] = resp;
    }

    Ok(NizkProof {
        challenge,
        commitments,
        responses,
    })
}

/// Verifies a [`NizkProof`] against the three ciphertext hashes and the
/// claimed message. All three sub-checks are evaluated unconditionally
/// (no short-circuiting) so the result does not leak which one failed.
pub fn nizk_verify(proof: &NizkProof, ct_hashes: &[[u8; 32]; 3], message: &[u8; 32]) -> bool {
    let msg_hash = h_d("nizk-msg", message);
    let expected_challenge = crate::xof::h256(&hash_concat(&[
        &msg_hash,
        &proof.commitments[0],
        &proof.commitments[1],
        &proof.commitments[2],
        &ct_hashes[0],
        &ct_hashes[1],
        &ct_hashes[2],
    ]));
    let mut ok = ct_eq(&expected_challenge, &proof.challenge);

    for i in 0..3 {
        let resp = &proof.responses[i];
        if resp.len() != 64 {
            ok = false;
            continue;
        }
        let masked = &resp[0..32];
        let r_i: [u8; 32] = resp[32..64].try_into().unwrap();
        let mask = shake256(&h_d(&format!("nizk-mask-{i}"), &proof.challenge), 32);
        let share: Vec<u8> = masked.iter().zip(mask.iter()).map(|(a, b)| a ^ b).collect();
        let recomputed = h_d("nizk-com", &hash_concat(&[&share, &r_i, &ct_hashes[i]]));
        ok &= ct_eq(&recomputed, &proof.commitments[i]);
    }
    ok
}

pub fn serialize_nizk(proof: &NizkProof) -> Vec<u8> {
    let mut w = Writer::new();
    w.put_u32(7);
    w.put_part(&proof.challenge);
    for c in &proof.commitments {
        w.put_part(c);
    }
    for r in &proof.responses {
        w.put_part(r);
    }
    w.into_vec()
}

pub fn deserialize_nizk(bytes: &[u8]) -> Result<NizkProof> {
    let mut r = Reader::new(bytes);
    let count = r.get_u32("nizk.count")?;
    if count != 7 {
        return Err(crate::error::EncodingError::BadPartCount {
            expected: 7,
            got: count as usize,
        }
        .into());
    }
    let challenge_slice = r.get_part("nizk.challenge")?;
    if challenge_slice.len() != 32 {
        return Err(crate::error::EncodingError::BadFixedSize {
            field: "nizk.challenge",
            expected: 32,
            got: challenge_slice.len(),
        }
        .into());
    }
    let mut challenge = [0u8; 32];
    challenge.copy_from_slice(challenge_slice);

    let mut commitments = [[0u8; 32]; 3];
    for c in commitments.iter_mut() {
        let part = r.get_part("nizk.commitment")?;
        if part.len() != 32 {
            return Err(crate::error::EncodingError::BadFixedSize {
                field: "nizk.commitment",
                expected: 32,
                got: part.len(),
            }
            .into());
        }
        c.copy_from_slice(part);
    }

    let mut responses: [Vec<u8>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for resp in responses.iter_mut() {
        *resp = r.get_part("nizk.response")?.to_vec();
    }
    r.finish()?;

    Ok(NizkProof {
        challenge,
        commitments,
        responses,
    })
}
