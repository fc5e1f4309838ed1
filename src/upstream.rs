// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The upstream-resolver capability: `{send(query) -> response}`. The
//! stub's outer request-dispatch loop and wire transport are external
//! collaborators -- this trait is the only seam the validation engine
//! needs from them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::message::{Question, SMessage};

/// Errors surfaced from an [`Upstream`] implementation. A timeout or
/// connection failure here becomes `ValidationErrorKind::Unreachable` for
/// the dependent event only; it never poisons the key cache.
#[derive(Debug, thiserror::Error)]
#[error("upstream query failed: {0}")]
pub struct UpstreamError(pub Box<dyn std::error::Error + Send + Sync + 'static>);

/// The capability the orchestrator uses for all outbound DNS: DS and
/// DNSKEY follow-up queries, and the original user query itself.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn send(&self, query: &Question) -> Result<SMessage, UpstreamError>;
}

/// An [`Upstream`] shared across concurrently validating events, held
/// behind a trait object so a single fetch can be coalesced into a
/// `'static` future for the key cache's singleflight join.
pub type SharedUpstream = Arc<dyn Upstream>;
