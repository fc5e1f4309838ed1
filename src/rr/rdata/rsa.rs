// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! [RFC 3110](https://www.rfc-editor.org/rfc/rfc3110), the exponent-then-
//! modulus encoding RSA public keys use in DNSKEY RDATA.

/// A view over an RFC 3110 RSA public key blob: exponent followed by
/// modulus, with a one- or three-octet exponent length prefix.
#[derive(Debug)]
pub(crate) struct RSAPublicKey<'a> {
    n: &'a [u8],
    e: &'a [u8],
}

impl<'a> RSAPublicKey<'a> {
    /// Split an RFC 3110 key blob into its exponent and modulus. The
    /// length prefix is one octet, unless that octet is zero, in which
    /// case the following two big-endian octets give the real length
    /// (for exponents 256 octets or longer).
    pub(crate) fn try_from(encoded: &'a [u8]) -> Result<Self, &'static str> {
        let (e_len_len, e_len) = match encoded.first() {
            Some(&0) if encoded.len() >= 3 => {
                (3, (usize::from(encoded[1]) << 8) | usize::from(encoded[2]))
            }
            Some(e_len) if *e_len != 0 => (1, usize::from(*e_len)),
            _ => return Err("bad RSA public key: empty or zero-length exponent"),
        };

        if encoded.len() < e_len_len + e_len {
            return Err("bad RSA public key: truncated exponent or modulus");
        }

        let (e, n) = encoded[e_len_len..].split_at(e_len);
        Ok(Self { n, e })
    }

    pub(crate) fn n(&self) -> &[u8] {
        self.n
    }

    pub(crate) fn e(&self) -> &[u8] {
        self.e
    }
}
