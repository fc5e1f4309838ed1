// Copyright 2015-2024 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Resource record data model: names, classes, types, and RRsets.

pub mod rdata;
mod record;

pub use record::{Class, Record, RData, RRset, RecordType};

pub use crate::name::{Name, NameParseError};
