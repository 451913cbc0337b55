// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for BlueAir device control.
//!
//! # Types
//!
//! - [`AttributeValue`] - Value of a device state attribute (boolean or integer)
//! - [`Region`] - BlueAir cloud region an account is registered in

mod attribute_value;
mod region;

pub use attribute_value::{AttributeKind, AttributeValue};
pub use region::Region;
