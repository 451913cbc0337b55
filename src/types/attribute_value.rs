// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state attribute values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The value of a single device state attribute.
///
/// BlueAir devices report every controllable attribute either as a boolean
/// (`standby`, `childlock`, `nightmode`, ...) or as an integer (`fanspeed`,
/// `brightness`, `filterusage`, ...). Enumerated attributes are integers.
///
/// # Examples
///
/// ```
/// use blueair_lib::types::AttributeValue;
///
/// let standby = AttributeValue::from(true);
/// let fan = AttributeValue::from(64);
///
/// assert_eq!(standby.as_bool(), Some(true));
/// assert_eq!(fan.as_int(), Some(64));
/// assert_eq!(fan.to_string(), "64");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A boolean attribute.
    Bool(bool),
    /// An integer or enumerated-integer attribute.
    Int(i64),
}

/// The kind of an [`AttributeValue`], used for type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// Boolean attribute.
    Bool,
    /// Integer attribute.
    Int,
}

impl AttributeValue {
    /// Returns the kind of this value.
    #[must_use]
    pub const fn kind(&self) -> AttributeKind {
        match self {
            Self::Bool(_) => AttributeKind::Bool,
            Self::Int(_) => AttributeKind::Int,
        }
    }

    /// Returns the boolean value, if this is a boolean attribute.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(_) => None,
        }
    }

    /// Returns the integer value, if this is an integer attribute.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(_) => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("boolean"),
            Self::Int => f.write_str("integer"),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u8> for AttributeValue {
    fn from(value: u8) -> Self {
        Self::Int(i64::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_of_values() {
        assert_eq!(AttributeValue::Bool(false).kind(), AttributeKind::Bool);
        assert_eq!(AttributeValue::Int(3).kind(), AttributeKind::Int);
    }

    #[test]
    fn accessors_reject_other_kind() {
        assert_eq!(AttributeValue::Bool(true).as_int(), None);
        assert_eq!(AttributeValue::Int(1).as_bool(), None);
    }

    #[test]
    fn serializes_untagged() {
        assert_eq!(
            serde_json::to_string(&AttributeValue::Bool(true)).unwrap(),
            "true"
        );
        assert_eq!(serde_json::to_string(&AttributeValue::Int(11)).unwrap(), "11");

        let parsed: AttributeValue = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, AttributeValue::Int(42));
        let parsed: AttributeValue = serde_json::from_str("false").unwrap();
        assert_eq!(parsed, AttributeValue::Bool(false));
    }

    #[test]
    fn display() {
        assert_eq!(AttributeValue::Bool(true).to_string(), "true");
        assert_eq!(AttributeValue::Int(-2).to_string(), "-2");
        assert_eq!(AttributeKind::Int.to_string(), "integer");
    }
}
