// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A DNSSEC validating stub resolver core.
//!
//! This crate verifies the signer chain from a configured trust anchor down
//! to a query name, checks RRSIGs over RRsets, and proves NSEC/NSEC3 denial
//! of existence, per [RFC 4033](https://www.rfc-editor.org/rfc/rfc4033),
//! [RFC 4034](https://www.rfc-editor.org/rfc/rfc4034),
//! [RFC 4035](https://www.rfc-editor.org/rfc/rfc4035),
//! [RFC 5155](https://www.rfc-editor.org/rfc/rfc5155) and
//! [RFC 6840](https://www.rfc-editor.org/rfc/rfc6840).
//!
//! The engine is deliberately narrow: wire parsing, the outer request
//! dispatch loop, caching of plain (non-DNSSEC) answers and the network
//! transport are all external collaborators. What lives here is the
//! [`validate::validate`] entry point plus the data model
//! ([`message::SMessage`], [`rr`]), the security-status lattice
//! ([`status::SecurityStatus`]), and the four building blocks it is
//! assembled from: the Response Classifier ([`classify`]), the Signer
//! Resolver ([`signer`]), the Trust-Chain Walker and Key Cache
//! ([`validate::chain`], [`cache`]), and the RRset Verifier
//! ([`verifier`]).
//!
//! Callers plug in a [`upstream::Upstream`] to fetch DS/DNSKEY records off
//! the chain, and optionally a [`crypto::CryptoBackend`] (a `ring`-backed
//! one is provided by default under the `ring` feature).

pub mod cache;
pub mod classify;
pub mod config;
pub mod crypto;
pub mod error;
pub mod keyentry;
pub mod message;
pub mod name;
pub mod rr;
pub mod signer;
pub mod status;
pub mod trust_anchor;
pub mod upstream;
pub mod validate;
pub mod verifier;

pub use config::ValidatorConfig;
pub use error::{Result, ValidationError, ValidationErrorKind};
pub use message::SMessage;
pub use status::SecurityStatus;
pub use trust_anchor::{TrustAnchor, TrustAnchorSet};
pub use upstream::{Upstream, UpstreamError};
pub use validate::{Event, ValidationContext, validate};
