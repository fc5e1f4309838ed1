// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Error types for the validation engine, and the mapping from a failure
//! reason to the [`SecurityStatus`](crate::status::SecurityStatus) it
//! produces.

use std::fmt;

use thiserror::Error;

use crate::rr::Name;
use crate::status::SecurityStatus;

/// An alias for results returned by functions in this crate.
pub type Result<T> = core::result::Result<T, ValidationError>;

/// The reason a validation step failed, and the data needed to log it
/// usefully.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ValidationErrorKind {
    /// No RRSIG over the RRset verified under any candidate DNSKEY.
    #[error("no RRSIG verified for {owner} {rtype} under zone {signer}")]
    BogusSignature {
        owner: Name,
        rtype: &'static str,
        signer: Name,
    },

    /// An NSEC/NSEC3 denial-of-existence proof did not hold.
    #[error("denial of existence proof failed for {qname}: {reason}")]
    BogusDenial { qname: Name, reason: &'static str },

    /// No DS record matched any DNSKEY in the child zone's key set.
    #[error("no DS record in {zone} matched any DNSKEY")]
    DsDnskeyMismatch { zone: Name },

    /// A required RRSIG was absent from the response.
    #[error("missing RRSIG over {owner} {rtype}")]
    MissingRrsig { owner: Name, rtype: &'static str },

    /// A record failed to parse or violated a structural invariant.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// The event-chain depth bound (default 32) was exceeded.
    #[error("max chain depth exceeded resolving {zone}")]
    MaxChainDepth { zone: Name },

    /// The upstream resolver could not be reached before a dependent
    /// event's deadline.
    #[error("upstream unreachable while resolving {zone}: {source}")]
    Unreachable {
        zone: Name,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// No trust anchor covers the query name.
    #[error("no trust anchor covers {zone}")]
    NoTrustAnchor { zone: Name },

    /// The response classifier could not assign a known response type.
    #[error("response for {qname} did not classify as a known response type")]
    Unclassifiable { qname: Name },

    /// A cached `KeyEntry` for the zone was previously marked bad.
    #[error("zone {zone} is cached as bad")]
    CachedBad { zone: Name },

    /// Lower layer: cryptographic backend failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] crate::crypto::CryptoError),

    /// Lower layer: a name embedded in a record or query did not parse.
    #[error("name error: {0}")]
    Name(#[from] crate::name::NameParseError),
}

impl ValidationErrorKind {
    /// The [`SecurityStatus`] this failure maps to. Every kind except
    /// [`NoTrustAnchor`](Self::NoTrustAnchor) is BOGUS: an unreachable
    /// upstream or a failed proof is a validation failure for the
    /// *dependent* event, not proof of insecurity.
    pub fn status(&self) -> SecurityStatus {
        match self {
            Self::NoTrustAnchor { .. } => SecurityStatus::Indeterminate,
            _ => SecurityStatus::Bogus,
        }
    }
}

/// The error type returned by fallible operations in this crate.
///
/// Kept as a thin wrapper around [`ValidationErrorKind`] (rather than a
/// bare enum) so that cross-cutting context -- a backtrace, a request id --
/// can be added later without changing every call site.
#[derive(Debug)]
pub struct ValidationError {
    kind: ValidationErrorKind,
}

impl ValidationError {
    /// The underlying [`ValidationErrorKind`].
    pub fn kind(&self) -> &ValidationErrorKind {
        &self.kind
    }

    /// The [`SecurityStatus`] this error maps to.
    pub fn status(&self) -> SecurityStatus {
        self.kind.status()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

impl From<ValidationErrorKind> for ValidationError {
    fn from(kind: ValidationErrorKind) -> Self {
        Self { kind }
    }
}

impl From<crate::crypto::CryptoError> for ValidationError {
    fn from(err: crate::crypto::CryptoError) -> Self {
        ValidationErrorKind::from(err).into()
    }
}
