// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! DNSSEC-relevant resource record data: DNSKEY, DS, RRSIG, NSEC, NSEC3,
//! NSEC3PARAM, and the RSA key-blob helper used to reshape RFC 3110 keys
//! for the crypto backend.

mod dnskey;
mod ds;
mod nsec;
mod nsec3;
pub(crate) mod rsa;
mod rrsig;
mod type_bitmap;

pub use dnskey::DNSKEY;
pub use ds::DS;
pub use nsec::NSEC;
pub use nsec3::{NSEC3, NSEC3PARAM};
pub(crate) use nsec3::hash_name;
pub use rrsig::RRSIG;
pub use type_bitmap::TypeBitMap;

pub use crate::crypto::PublicKeyBuf;
