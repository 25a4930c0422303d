//! kMOSAIC: a composite post-quantum key encapsulation mechanism and
//! signature scheme built from three independent hardness assumptions — a
//! sparse-secret lattice problem (SLSS), a noisy tensor decomposition
//! problem (TDD), and a random walk in the Cayley graph of SL(2, Z_p)
//! (EGRW) — entangled under a Fiat-Shamir zero-knowledge proof and composed
//! into an IND-CCA2-style KEM via a Fujisaki-Okamoto transform.
//!
//! This crate is experimental: it makes no claim of provable security under
//! a standard model, is not interoperable with any standardized PQC scheme,
//! and its constant-time behavior is best-effort rather than guaranteed by
//! the runtime.

pub mod egrw;
pub mod entangle;
pub mod error;
pub mod kem;
pub mod params;
pub mod serialize;
pub mod sign;
pub mod slss;
pub mod tdd;
pub mod xof;

pub use error::{EncodingError, Error, Result};
pub use params::{get_params, validate_params, Level, MosaicParams};

pub use kem::{PublicKey, SecretKey};

/// Generates a fresh composite key pair at the given security level.
pub fn kem_keygen(level: Level) -> Result<(kem::PublicKey, kem::SecretKey)> {
    kem::key_gen(level)
}

/// Deterministically generates a composite key pair from a seed. Useful for
/// known-answer tests; rejects low-entropy seeds the same way [`kem_keygen`]
/// would reject a failed RNG draw.
pub fn kem_keygen_from_seed(
    params: MosaicParams,
    seed: &[u8],
) -> Result<(kem::PublicKey, kem::SecretKey)> {
    kem::key_gen_from_seed(params, seed)
}

/// Encapsulates a fresh shared secret against `pk`.
pub fn kem_encapsulate(pk: &kem::PublicKey) -> Result<([u8; 32], kem::Ciphertext)> {
    kem::encapsulate(pk)
}

/// Deterministically encapsulates the 32-byte secret `m` against `pk`.
pub fn kem_encapsulate_det(
    pk: &kem::PublicKey,
    m: &[u8; 32],
) -> Result<([u8; 32], kem::Ciphertext)> {
    kem::encapsulate_det(pk, m)
}

/// Decapsulates `ct` under `sk`/`pk`. Always returns a 32-byte value; see
/// [`kem::decapsulate`] for the implicit-rejection discipline.
pub fn kem_decapsulate(
    ct: &kem::Ciphertext,
    sk: &kem::SecretKey,
    pk: &kem::PublicKey,
) -> Result<[u8; 32]> {
    kem::decapsulate(ct, sk, pk)
}

/// Generates a signing key pair. Identical key material serves both KEM and
/// signature operations.
pub fn sign_keygen(level: Level) -> Result<(kem::PublicKey, kem::SecretKey)> {
    kem::key_gen(level)
}

pub fn sign_keygen_from_seed(
    params: MosaicParams,
    seed: &[u8],
) -> Result<(kem::PublicKey, kem::SecretKey)> {
    kem::key_gen_from_seed(params, seed)
}

/// Signs `message` with the multi-witness Fiat-Shamir scheme.
pub fn sign(message: &[u8], sk: &kem::SecretKey, pk: &kem::PublicKey) -> Result<sign::Signature> {
    sign::sign(message, sk, pk)
}

/// Verifies a multi-witness signature produced by [`sign`].
pub fn verify(message: &[u8], signature: &sign::Signature, pk: &kem::PublicKey) -> bool {
    sign::verify(message, signature, pk)
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    /// Seed scenario S4/S5: full KEM round trip and single-byte tampering.
    #[test]
    fn s4_s5_kem_roundtrip_and_tamper() {
        let params = get_params(Level::Mos128);
        let (pk, sk) = kem_keygen_from_seed(params, &[0x01u8; 32]).unwrap();
        let m = [0x02u8; 32];
        let (ss, ct) = kem_encapsulate_det(&pk, &m).unwrap();
        let ss_decap = kem_decapsulate(&ct, &sk, &pk).unwrap();
        assert_eq!(ss, ss_decap, "S4: decapsulated secret must match encapsulated secret");

        let mut tampered = ct;
        tampered.c1.u[0] = 0;
        let ss_tampered = kem_decapsulate(&tampered, &sk, &pk).unwrap();
        assert_ne!(ss, ss_tampered, "S5: tampering a ciphertext byte must change the secret");
    }

    /// Seed scenario S6: signature round trip and message-tamper rejection.
    #[test]
    fn s6_signature_roundtrip() {
        let params = get_params(Level::Mos128);
        let (pk, sk) = sign_keygen_from_seed(params, &[0x03u8; 32]).unwrap();
        let sig = sign(b"hello", &sk, &pk).unwrap();
        assert!(verify(b"hello", &sig, &pk));
        assert!(!verify(b"hellp", &sig, &pk));
    }
}
