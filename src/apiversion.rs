// Copyright 2018 Dmitry Tantsur <dtantsur@protonmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! API microversions.

use std::fmt;
use std::str::FromStr;

use reqwest::header::HeaderValue;
use serde::de::Error as DeserError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{Error, ErrorKind};

/// API version (major, minor).
///
/// Services with microversion support (e.g. shared file systems) accept it in a header.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct ApiVersion(pub u16, pub u16);

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.0, self.1)
    }
}

impl From<(u16, u16)> for ApiVersion {
    fn from(value: (u16, u16)) -> ApiVersion {
        ApiVersion(value.0, value.1)
    }
}

impl From<ApiVersion> for HeaderValue {
    fn from(value: ApiVersion) -> HeaderValue {
        // Only digits and a dot, always a valid header value.
        HeaderValue::from_str(&value.to_string()).expect("invalid API version header")
    }
}

impl FromStr for ApiVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<ApiVersion, Error> {
        let invalid = || {
            Error::new(
                ErrorKind::InvalidInput,
                format!("Invalid API version: expected X.Y or X, got {}", s),
            )
        };

        let version = s.strip_prefix('v').unwrap_or(s);
        let (major, minor) = match version.split_once('.') {
            Some((major, minor)) => (major, Some(minor)),
            None => (version, None),
        };

        let major = major.parse().map_err(|_| invalid())?;
        let minor = match minor {
            Some(minor) => minor.parse().map_err(|_| invalid())?,
            None => 0,
        };

        Ok(ApiVersion(major, minor))
    }
}

impl Serialize for ApiVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ApiVersion {
    fn deserialize<D>(deserializer: D) -> Result<ApiVersion, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        ApiVersion::from_str(&value).map_err(DeserError::custom)
    }
}
