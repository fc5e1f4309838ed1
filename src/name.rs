// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Domain names, canonical ordering, and the NSEC3-specific comparisons.
//!
//! [RFC 4034 §6.1](https://www.rfc-editor.org/rfc/rfc4034#section-6.1) defines
//! canonical DNS name comparison: names are compared label by label from the
//! *most significant* (rightmost) label down, each label compared
//! byte-for-byte with US-ASCII uppercase letters mapped to lowercase.

use std::cmp::Ordering;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A DNS name: an ordered sequence of labels, most-significant (root) last,
/// matching RFC 1035 wire order (`www.example.com.` is stored as
/// `["www", "example", "com"]`, root-to-query order being the *reverse* of
/// iteration order used for comparisons).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Eq)]
pub struct Name {
    /// Labels in left-to-right presentation order, e.g. `["www", "example", "com"]`.
    /// The root name has zero labels.
    labels: Vec<Vec<u8>>,
}

impl Name {
    /// The DNS root, `.`.
    pub fn root() -> Self {
        Self { labels: Vec::new() }
    }

    /// Parse a presentation-format name such as `www.example.com.`. A
    /// trailing dot is optional; escaping of `\.` inside a label is
    /// supported, dot-decimal `\DDD` escapes are not (the wire decoder is an
    /// external collaborator; this parser exists only to build names in
    /// tests and from configuration).
    pub fn parse(input: &str) -> Result<Self, NameParseError> {
        let trimmed = input.strip_suffix('.').unwrap_or(input);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let mut labels = Vec::new();
        let mut current = Vec::new();
        let mut chars = trimmed.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => current.push(escaped as u8),
                    None => return Err(NameParseError::TrailingEscape),
                },
                '.' => {
                    if current.is_empty() {
                        return Err(NameParseError::EmptyLabel);
                    }
                    labels.push(std::mem::take(&mut current));
                }
                _ if c.is_ascii() => current.push(c as u8),
                _ => return Err(NameParseError::NonAscii),
            }
        }
        if current.is_empty() {
            return Err(NameParseError::EmptyLabel);
        }
        labels.push(current);

        for label in &labels {
            if label.len() > 63 {
                return Err(NameParseError::LabelTooLong);
            }
        }
        if labels.len() > 127 {
            return Err(NameParseError::NameTooLong);
        }

        Ok(Self { labels })
    }

    /// Construct a name from already-split labels (used by decoders and
    /// tests that already hold label bytes).
    pub fn from_labels(labels: Vec<Vec<u8>>) -> Self {
        Self { labels }
    }

    /// The number of labels, excluding the root. `example.com.` has 2.
    pub fn label_count(&self) -> u8 {
        self.labels.len() as u8
    }

    /// Labels in left-to-right (presentation) order.
    pub fn labels(&self) -> &[Vec<u8>] {
        &self.labels
    }

    /// `true` if `self` is a (non-strict) subdomain of `other`, i.e. `other`
    /// is `self` or an ancestor of `self`.
    pub fn is_subdomain_of(&self, other: &Self) -> bool {
        if other.labels.len() > self.labels.len() {
            return false;
        }
        let offset = self.labels.len() - other.labels.len();
        self.labels[offset..]
            .iter()
            .zip(other.labels.iter())
            .all(|(a, b)| ascii_label_eq(a, b))
    }

    /// `true` if `self` is a *strict* subdomain of `other` (more labels, and
    /// an ancestor relationship holds).
    pub fn is_strict_subdomain_of(&self, other: &Self) -> bool {
        self.labels.len() > other.labels.len() && self.is_subdomain_of(other)
    }

    /// The ancestor of `self` with exactly `depth` labels (`0` is the root).
    /// Returns `None` if `depth` exceeds `self`'s own label count.
    pub fn ancestor_at_depth(&self, depth: u8) -> Option<Self> {
        let depth = depth as usize;
        if depth > self.labels.len() {
            return None;
        }
        let start = self.labels.len() - depth;
        Some(Self {
            labels: self.labels[start..].to_vec(),
        })
    }

    /// The immediate parent, or `None` if `self` is the root.
    pub fn parent(&self) -> Option<Self> {
        if self.labels.is_empty() {
            None
        } else {
            self.ancestor_at_depth(self.label_count() - 1)
        }
    }

    /// `self` with a wildcard label (`*`) prepended: `example.com.` becomes
    /// `*.example.com.`.
    pub fn prepend_wildcard(&self) -> Self {
        let mut labels = Vec::with_capacity(self.labels.len() + 1);
        labels.push(b"*".to_vec());
        labels.extend(self.labels.iter().cloned());
        Self { labels }
    }

    /// Lowercased wire-form labels, each length-prefixed, terminated by the
    /// root (zero) label -- the representation used for NSEC3 hashing and
    /// for the owner-name portion of RRSIG canonicalization.
    pub fn to_lowercase_wire(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for label in &self.labels {
            buf.push(label.len() as u8);
            buf.extend(label.iter().map(|b| b.to_ascii_lowercase()));
        }
        buf.push(0);
        buf
    }

    /// Render in presentation format (always fully qualified, trailing dot).
    pub fn to_presentation(&self) -> String {
        if self.labels.is_empty() {
            return ".".to_string();
        }
        let mut s = String::new();
        for label in &self.labels {
            for &b in label {
                if matches!(b, b'.' | b'\\') {
                    s.push('\\');
                }
                s.push(b as char);
            }
            s.push('.');
        }
        s
    }
}

fn ascii_label_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_ignore_ascii_case(y))
}

/// Canonical comparison of a single label, per RFC 4034 §6.1: compare raw
/// bytes after lowercasing, shorter label sorts first on a common prefix.
fn cmp_label(a: &[u8], b: &[u8]) -> Ordering {
    let a_lower = a.iter().map(|b| b.to_ascii_lowercase());
    let b_lower = b.iter().map(|b| b.to_ascii_lowercase());
    a_lower.cmp(b_lower).then_with(|| a.len().cmp(&b.len()))
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.labels.len() == other.labels.len()
            && self
                .labels
                .iter()
                .zip(other.labels.iter())
                .all(|(a, b)| ascii_label_eq(a, b))
    }
}

impl std::hash::Hash for Name {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.labels.len().hash(state);
        for label in &self.labels {
            for b in label {
                b.to_ascii_lowercase().hash(state);
            }
            0xffu8.hash(state); // label separator distinct from any byte value content
        }
    }
}

/// RFC 4034 §6.1 canonical DNS name ordering: labels are compared starting
/// from the *root end* (most significant label) inward, so `a.example.com.`
/// sorts after `example.com.` but before `b.example.com.`.
impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        let a = self.labels.iter().rev();
        let b = other.labels.iter().rev();
        for (la, lb) in a.zip(b) {
            match cmp_label(la, lb) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        self.labels.len().cmp(&other.labels.len())
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_presentation())
    }
}

/// Errors from [`Name::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NameParseError {
    #[error("empty label")]
    EmptyLabel,
    #[error("label exceeds 63 bytes")]
    LabelTooLong,
    #[error("name exceeds 127 labels")]
    NameTooLong,
    #[error("non-ASCII byte in name")]
    NonAscii,
    #[error("trailing escape character")]
    TrailingEscape,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_roundtrip() {
        let n = Name::parse("www.Example.COM.").unwrap();
        assert_eq!(n.label_count(), 3);
        assert_eq!(n.to_presentation(), "www.Example.COM.");
    }

    #[test]
    fn equality_is_case_insensitive() {
        assert_eq!(
            Name::parse("WWW.example.com.").unwrap(),
            Name::parse("www.EXAMPLE.com.").unwrap()
        );
    }

    #[test]
    fn subdomain_checks() {
        let child = Name::parse("www.example.com.").unwrap();
        let parent = Name::parse("example.com.").unwrap();
        assert!(child.is_subdomain_of(&parent));
        assert!(child.is_strict_subdomain_of(&parent));
        assert!(!parent.is_strict_subdomain_of(&child));
        assert!(parent.is_subdomain_of(&parent));
    }

    #[test]
    fn ancestor_at_depth_walks_upward() {
        let name = Name::parse("www.example.com.").unwrap();
        assert_eq!(name.ancestor_at_depth(2).unwrap(), Name::parse("example.com.").unwrap());
        assert_eq!(name.ancestor_at_depth(0).unwrap(), Name::root());
        assert!(name.ancestor_at_depth(4).is_none());
    }

    #[test]
    fn wildcard_prepend() {
        let name = Name::parse("example.com.").unwrap();
        assert_eq!(name.prepend_wildcard(), Name::parse("*.example.com.").unwrap());
    }

    #[test]
    fn canonical_ordering_matches_rfc4034_example() {
        // RFC 4034 section 6.1, restricted to the ASCII-escape-free subset
        // of the example ordering (ascending).
        let names = [
            "example.",
            "a.example.",
            "yljkjljk.a.example.",
            "Z.a.example.",
            "zABC.a.EXAMPLE.",
            "z.example.",
            "*.z.example.",
        ];
        let mut parsed: Vec<Name> = names.iter().map(|n| Name::parse(n).unwrap()).collect();
        let original = parsed.clone();
        parsed.sort();
        assert_eq!(parsed, original);
    }

    #[test]
    fn to_lowercase_wire_lowercases_and_terminates() {
        let name = Name::parse("WWW.example.com.").unwrap();
        let wire = name.to_lowercase_wire();
        assert_eq!(wire.last(), Some(&0));
        assert_eq!(&wire[1..4], b"www");
    }
}
