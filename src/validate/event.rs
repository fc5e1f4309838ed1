// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The validation event: one query plus the bounded chain of follow-up
//! queries it spawns while the Trust-Chain Walker climbs from a trust
//! anchor down to the signer zone.
//!
//! Rather than a dynamic map of per-module state threaded through a
//! cyclic event-to-parent graph, each event carries a small closed record
//! (`ValidatorState`) and a flat depth counter bounding how many follow-up
//! events it may still spawn.

use crate::classify::ResponseKind;
use crate::error::{Result, ValidationErrorKind};
use crate::message::{Question, SMessage};
use crate::name::Name;

/// Default bound on how many follow-up queries (DS/DNSKEY fetches) a
/// single top-level query may spawn before the chain is abandoned as
/// unbounded recursion, rather than legitimate delegation depth.
pub const DEFAULT_MAX_DEPTH: u32 = 32;

/// Fixed-shape scratch space a single event accumulates while it is being
/// validated: the response's classification, the zone whose keys are
/// expected to sign it, and any zones still awaiting a key fetch.
#[derive(Debug, Clone, Default)]
pub struct ValidatorState {
    pub classification: Option<ResponseKind>,
    pub target_signer: Option<Name>,
    pub pending_key_fetch: Vec<Name>,
}

/// Coarse progress marker for a single event, useful for tracing spans
/// and for the orchestrator's dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventState {
    #[default]
    Init,
    NeedKeys,
    Verifying,
    Done,
}

/// One query being validated, plus the bookkeeping needed to bound and
/// trace the chain of follow-up queries it spawns.
#[derive(Debug, Clone)]
pub struct Event {
    original_query: Question,
    current_query: Question,
    depth: u32,
    max_depth: u32,
    state: EventState,
    validator_state: ValidatorState,
    response: Option<SMessage>,
}

impl Event {
    /// A fresh top-level event for `query`, with the default depth bound.
    pub fn new(query: Question) -> Self {
        Self::with_max_depth(query, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(query: Question, max_depth: u32) -> Self {
        Self {
            original_query: query.clone(),
            current_query: query,
            depth: 0,
            max_depth,
            state: EventState::Init,
            validator_state: ValidatorState::default(),
            response: None,
        }
    }

    /// A follow-up event for `query`, one depth level deeper than `self`.
    /// Errors if doing so would exceed the configured max depth: the
    /// event-chain depth bound guards against unbounded delegation
    /// recursion, accidental or adversarial.
    pub fn child(&self, query: Question) -> Result<Self> {
        let depth = self.depth + 1;
        if depth > self.max_depth {
            return Err(ValidationErrorKind::MaxChainDepth {
                zone: query.qname.clone(),
            }
            .into());
        }
        Ok(Self {
            original_query: self.original_query.clone(),
            current_query: query,
            depth,
            max_depth: self.max_depth,
            state: EventState::Init,
            validator_state: ValidatorState::default(),
            response: None,
        })
    }

    pub fn original_query(&self) -> &Question {
        &self.original_query
    }

    pub fn current_query(&self) -> &Question {
        &self.current_query
    }

    pub fn set_current_query(&mut self, query: Question) {
        self.current_query = query;
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn state(&self) -> EventState {
        self.state
    }

    pub fn set_state(&mut self, state: EventState) {
        self.state = state;
    }

    pub fn validator_state(&self) -> &ValidatorState {
        &self.validator_state
    }

    pub fn validator_state_mut(&mut self) -> &mut ValidatorState {
        &mut self.validator_state
    }

    pub fn response(&self) -> Option<&SMessage> {
        self.response.as_ref()
    }

    pub fn set_response(&mut self, response: SMessage) {
        self.response = Some(response);
    }

    pub fn take_response(&mut self) -> Option<SMessage> {
        self.response.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rr::{Class, RecordType};

    fn question(qname: &str) -> Question {
        Question {
            qname: Name::parse(qname).unwrap(),
            qclass: Class::IN,
            qtype: RecordType::A,
        }
    }

    #[test]
    fn child_events_increment_depth() {
        let root = Event::new(question("www.example.com."));
        let child = root.child(question("example.com.")).unwrap();
        assert_eq!(child.depth(), 1);
        let grandchild = child.child(question("com.")).unwrap();
        assert_eq!(grandchild.depth(), 2);
    }

    #[test]
    fn exceeding_max_depth_is_rejected() {
        let root = Event::with_max_depth(question("www.example.com."), 1);
        let child = root.child(question("example.com.")).unwrap();
        assert_eq!(child.depth(), 1);
        let err = child.child(question("com.")).unwrap_err();
        assert!(matches!(err.kind(), ValidationErrorKind::MaxChainDepth { .. }));
    }

    #[test]
    fn child_inherits_original_query_unchanged() {
        let root = Event::new(question("www.example.com."));
        let child = root.child(question("example.com.")).unwrap();
        assert_eq!(child.original_query(), root.original_query());
        assert_eq!(child.current_query().qname, Name::parse("example.com.").unwrap());
    }
}
