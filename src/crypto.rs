// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The cryptographic backend seam.
//!
//! RSA/ECDSA/EdDSA signature verification and SHA-1/2 digests are kept
//! behind the [`CryptoBackend`] trait the rest of the engine calls
//! through, plus `Algorithm`/`DigestType` enums and a `ring`-backed
//! default implementation (feature `ring`, on by default) so the crate
//! is usable out of the box.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// DNSSEC signing algorithm numbers, RFC 8624 §3.1 and the IANA registry.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    RSASHA1,
    RSASHA1NSEC3SHA1,
    RSASHA256,
    RSASHA512,
    ECDSAP256SHA256,
    ECDSAP384SHA384,
    ED25519,
    ED448,
    Unknown(u8),
}

impl Algorithm {
    pub fn to_u8(self) -> u8 {
        match self {
            Self::RSASHA1 => 5,
            Self::RSASHA1NSEC3SHA1 => 7,
            Self::RSASHA256 => 8,
            Self::RSASHA512 => 10,
            Self::ECDSAP256SHA256 => 13,
            Self::ECDSAP384SHA384 => 14,
            Self::ED25519 => 15,
            Self::ED448 => 16,
            Self::Unknown(v) => v,
        }
    }

    pub fn from_u8(v: u8) -> Self {
        match v {
            5 => Self::RSASHA1,
            7 => Self::RSASHA1NSEC3SHA1,
            8 => Self::RSASHA256,
            10 => Self::RSASHA512,
            13 => Self::ECDSAP256SHA256,
            14 => Self::ECDSAP384SHA384,
            15 => Self::ED25519,
            16 => Self::ED448,
            other => Self::Unknown(other),
        }
    }

    /// RFC 8624 §3.1: algorithms a conformant validator MUST implement.
    /// RSASHA1 variants are accepted (MAY, deprecated) but not preferred.
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_u8())
    }
}

/// DS digest type numbers, RFC 4509 / RFC 6605 / IANA registry.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestType {
    SHA1,
    SHA256,
    SHA384,
    Unknown(u8),
}

impl DigestType {
    pub fn to_u8(self) -> u8 {
        match self {
            Self::SHA1 => 1,
            Self::SHA256 => 2,
            Self::SHA384 => 4,
            Self::Unknown(v) => v,
        }
    }

    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::SHA1,
            2 => Self::SHA256,
            4 => Self::SHA384,
            other => Self::Unknown(other),
        }
    }

    /// RFC 8624 §3.3: SHA-256 MUST be supported; SHA-1 MAY (deprecated).
    pub fn is_supported(self) -> bool {
        matches!(self, Self::SHA1 | Self::SHA256 | Self::SHA384)
    }
}

/// Algorithm-tagged public key bytes, as carried in a DNSKEY RR.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicKeyBuf {
    bytes: Vec<u8>,
    algorithm: Algorithm,
}

impl PublicKeyBuf {
    pub fn new(bytes: Vec<u8>, algorithm: Algorithm) -> Self {
        Self { bytes, algorithm }
    }

    pub fn public_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

/// Errors from the crypto backend seam.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CryptoErrorKind {
    #[error("unsupported algorithm {0}")]
    UnsupportedAlgorithm(Algorithm),
    #[error("unsupported digest type {0:?}")]
    UnsupportedDigest(DigestType),
    #[error("malformed public key")]
    MalformedKey,
    #[error("malformed signature")]
    MalformedSignature,
    #[error("signature did not verify")]
    VerificationFailed,
}

/// The error type for the crypto backend seam.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct CryptoError {
    kind: CryptoErrorKind,
}

impl CryptoError {
    pub fn kind(&self) -> &CryptoErrorKind {
        &self.kind
    }
}

impl From<CryptoErrorKind> for CryptoError {
    fn from(kind: CryptoErrorKind) -> Self {
        Self { kind }
    }
}

/// The cryptographic backend seam: digest and signature verification,
/// supplied by an external collaborator. The rest of the engine never
/// touches raw key material directly.
pub trait CryptoBackend: Send + Sync {
    /// Compute a message digest, used for DS-over-DNSKEY hashing (RFC 4034
    /// §5.1.4) and NSEC3 owner-name hashing (RFC 5155 §5).
    fn digest(&self, alg: DigestType, data: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Verify `signature` over `signed_data` under `key`, per RFC 4035
    /// §5.3. `Ok(())` means the signature verifies; any `Err` (including a
    /// merely-malformed signature) means it does not.
    fn verify(
        &self,
        alg: Algorithm,
        key: &PublicKeyBuf,
        signed_data: &[u8],
        signature: &[u8],
    ) -> Result<(), CryptoError>;
}

/// A shared handle to a [`CryptoBackend`] implementation.
pub type SharedCryptoBackend = Arc<dyn CryptoBackend>;

#[cfg(feature = "ring")]
pub use ring_backend::RingCryptoBackend;

#[cfg(feature = "ring")]
mod ring_backend {
    use super::*;
    use ring::signature::{self, UnparsedPublicKey};

    /// Default [`CryptoBackend`] using `ring` for digests and signature
    /// verification.
    #[derive(Debug, Default)]
    pub struct RingCryptoBackend;

    impl CryptoBackend for RingCryptoBackend {
        fn digest(&self, alg: DigestType, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
            let algorithm = match alg {
                DigestType::SHA1 => &ring::digest::SHA1_FOR_LEGACY_USE_ONLY,
                DigestType::SHA256 => &ring::digest::SHA256,
                DigestType::SHA384 => &ring::digest::SHA384,
                DigestType::Unknown(_) => {
                    return Err(CryptoErrorKind::UnsupportedDigest(alg).into());
                }
            };
            Ok(ring::digest::digest(algorithm, data).as_ref().to_vec())
        }

        fn verify(
            &self,
            alg: Algorithm,
            key: &PublicKeyBuf,
            signed_data: &[u8],
            signature: &[u8],
        ) -> Result<(), CryptoError> {
            let verify_alg: &'static dyn signature::VerificationAlgorithm = match alg {
                Algorithm::RSASHA256 => &signature::RSA_PKCS1_2048_8192_SHA256,
                Algorithm::RSASHA512 => &signature::RSA_PKCS1_2048_8192_SHA512,
                Algorithm::RSASHA1 | Algorithm::RSASHA1NSEC3SHA1 => {
                    &signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY
                }
                Algorithm::ECDSAP256SHA256 => &signature::ECDSA_P256_SHA256_FIXED,
                Algorithm::ECDSAP384SHA384 => &signature::ECDSA_P384_SHA384_FIXED,
                Algorithm::ED25519 => &signature::ED25519,
                Algorithm::ED448 | Algorithm::Unknown(_) => {
                    return Err(CryptoErrorKind::UnsupportedAlgorithm(alg).into());
                }
            };

            let public_key = encode_public_key(alg, key.public_bytes())?;
            UnparsedPublicKey::new(verify_alg, public_key)
                .verify(signed_data, signature)
                .map_err(|_| CryptoErrorKind::VerificationFailed.into())
        }
    }

    /// `ring`'s RSA/ECDSA verifiers expect specific key encodings; DNSKEY
    /// RDATA stores RSA keys as (exponent, modulus) per RFC 3110 and EC/Ed
    /// keys as raw concatenated coordinates per RFC 6605 / RFC 8080. Both
    /// cases require reshaping before `ring` will accept them.
    fn encode_public_key(alg: Algorithm, raw: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match alg {
            Algorithm::RSASHA256 | Algorithm::RSASHA512 | Algorithm::RSASHA1 | Algorithm::RSASHA1NSEC3SHA1 => {
                let rsa = crate::rr::rdata::rsa::RSAPublicKey::try_from(raw)
                    .map_err(|_| CryptoErrorKind::MalformedKey)?;
                Ok(der_encode_rsa(rsa.n(), rsa.e()))
            }
            Algorithm::ECDSAP256SHA256 | Algorithm::ECDSAP384SHA384 => {
                // ring's "FIXED" ECDSA verifiers want an uncompressed point
                // (0x04 prefix || X || Y); DNSKEY carries only X || Y.
                let mut buf = Vec::with_capacity(raw.len() + 1);
                buf.push(0x04);
                buf.extend_from_slice(raw);
                Ok(buf)
            }
            _ => Ok(raw.to_vec()),
        }
    }

    /// Minimal DER encoding of an RSA public key (`SEQUENCE { INTEGER n,
    /// INTEGER e }`) as `ring::signature::RSA_PKCS1_*` verifiers require.
    fn der_encode_rsa(n: &[u8], e: &[u8]) -> Vec<u8> {
        fn der_integer(bytes: &[u8]) -> Vec<u8> {
            let mut v = bytes.to_vec();
            // strip leading zero padding but keep one byte, then re-add a
            // leading zero if the high bit is set (DER INTEGER is signed).
            while v.len() > 1 && v[0] == 0 {
                v.remove(0);
            }
            if v.first().is_some_and(|&b| b & 0x80 != 0) {
                v.insert(0, 0);
            }
            let mut out = vec![0x02];
            der_len(&mut out, v.len());
            out.extend(v);
            out
        }
        fn der_len(out: &mut Vec<u8>, len: usize) {
            if len < 0x80 {
                out.push(len as u8);
            } else {
                let bytes = len.to_be_bytes();
                let trimmed: Vec<u8> = bytes.into_iter().skip_while(|&b| b == 0).collect();
                out.push(0x80 | trimmed.len() as u8);
                out.extend(trimmed);
            }
        }

        let n_enc = der_integer(n);
        let e_enc = der_integer(e);
        let mut seq_body = n_enc;
        seq_body.extend(e_enc);
        let mut out = vec![0x30];
        der_len(&mut out, seq_body.len());
        out.extend(seq_body);
        out
    }

}
