// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BlueAir cloud regions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The BlueAir cloud region an account belongs to.
///
/// Each region has its own Gigya identity endpoint. Only some regions have
/// a dedicated AWS API deployment; the others are served by the EU one.
///
/// The serialized names match the labels used in the plugin configuration.
///
/// # Examples
///
/// ```
/// use blueair_lib::types::Region;
///
/// let region: Region = "USA".parse().unwrap();
/// assert_eq!(region.gigya_region(), "us1");
/// assert_eq!(region.aws_region(), "us-east-2");
///
/// // Australia has no AWS deployment of its own
/// assert_eq!(Region::Au.aws_region(), "eu-west-1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Region {
    /// Default region, covering every country not listed separately.
    #[default]
    #[serde(rename = "Default (all other regions)")]
    Eu,
    /// Australia.
    #[serde(rename = "Australia")]
    Au,
    /// China.
    #[serde(rename = "China")]
    Cn,
    /// Russia.
    #[serde(rename = "Russia")]
    Ru,
    /// United States.
    #[serde(rename = "USA")]
    Us,
}

impl Region {
    /// All supported regions.
    pub const ALL: [Self; 5] = [Self::Eu, Self::Au, Self::Cn, Self::Ru, Self::Us];

    /// Returns the configuration label of this region.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Eu => "Default (all other regions)",
            Self::Au => "Australia",
            Self::Cn => "China",
            Self::Ru => "Russia",
            Self::Us => "USA",
        }
    }

    /// Returns the Gigya data center of this region.
    #[must_use]
    pub const fn gigya_region(self) -> &'static str {
        match self {
            Self::Eu => "eu1",
            Self::Au => "au1",
            Self::Cn => "cn1",
            Self::Ru => "ru1",
            Self::Us => "us1",
        }
    }

    /// Returns the Gigya API key of this region.
    #[must_use]
    pub const fn gigya_api_key(self) -> &'static str {
        match self {
            Self::Eu => "3_qRseYzrUJl1VyxvSJANalu_kNgQ83swB1B9uzgms58--5w1ClVNmrFdsDnWVQQCl",
            Self::Au => "3_Z2N0mIFC6j2fx1z2sq76R3pwkCMaMX2y9btPb0_PgI_3wfjSJoofFnBbxbtuQksN",
            Self::Cn => "3_h3UEfJnA-zDpFPR9L4412HO7Mz2VVeN4wprbWYafPN1gX0kSnLcZ9VSfFi7bEIIU",
            Self::Ru => "3_wYhHEBaOcS_w6idVM3mh8UjyjOP-3Dwn3w9Z6AYc0FhGf-uIwUkrcoCdsYarND2k",
            Self::Us => "3_-xUbbrIY8QCbHDWQs1tLXE-CZBQ50SGElcOY5hF1euE11wCoIlNbjMGAFQ6UwhMY",
        }
    }

    /// Returns the AWS API Gateway id serving this region.
    #[must_use]
    pub const fn rest_api_id(self) -> &'static str {
        match self {
            Self::Us => "on1keymlmh",
            Self::Cn => "ftbkyp79si",
            Self::Eu | Self::Au | Self::Ru => "hkgmr8v960",
        }
    }

    /// Returns the AWS region serving this region.
    #[must_use]
    pub const fn aws_region(self) -> &'static str {
        match self {
            Self::Us => "us-east-2",
            Self::Cn => "cn-north-1",
            Self::Eu | Self::Au | Self::Ru => "eu-west-1",
        }
    }

    /// Base URL of the Gigya accounts API.
    #[must_use]
    pub fn gigya_base_url(self) -> String {
        format!("https://accounts.{}.gigya.com", self.gigya_region())
    }

    /// Base URL of the BlueAir device API.
    #[must_use]
    pub fn api_base_url(self) -> String {
        format!(
            "https://{}.execute-api.{}.amazonaws.com/prod/c",
            self.rest_api_id(),
            self.aws_region()
        )
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Region {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::InvalidRegion(s.to_string()))
    }
}
