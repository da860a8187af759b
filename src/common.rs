// Copyright 2019 Dmitry Tantsur <dtantsur@protonmail.com>
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

//! Reusable JSON structures and protocol bits.

use std::ops::{Deref, DerefMut};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::Error as DeserError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{Error, ErrorKind};

/// A link to a resource.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct Link {
    /// Resource URL.
    pub href: String,
    /// Relationship between the referencing and the referenced object.
    #[serde(default)]
    pub rel: String,
}

crate::protocol_enum! {
    #[doc = "Sorting direction."]
    enum SortDir {
        #[doc = "Ascending order."]
        Asc = "asc",
        #[doc = "Descending order."]
        Desc = "desc"
    }
}

/// A resource decoded together with an extension.
///
/// API extensions add fields to the JSON representation of a base resource. Both halves are
/// decoded from the same JSON object in one pass:
///
/// ```rust
/// use oscloud::common::Extended;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// struct Base {
///     id: String,
/// }
///
/// #[derive(Debug, Deserialize)]
/// struct Ext {
///     port_security_enabled: bool,
/// }
///
/// let value: Extended<Base, Ext> = serde_json::from_str(
///     r#"{"id": "1234", "port_security_enabled": true}"#,
/// ).unwrap();
/// assert_eq!(value.id, "1234");
/// assert!(value.extension.port_security_enabled);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Extended<B, E> {
    /// The base resource.
    #[serde(flatten)]
    pub base: B,
    /// Extension fields.
    #[serde(flatten)]
    pub extension: E,
}

impl<B, E> Deref for Extended<B, E> {
    type Target = B;

    fn deref(&self) -> &B {
        &self.base
    }
}

impl<B, E> DerefMut for Extended<B, E> {
    fn deref_mut(&mut self) -> &mut B {
        &mut self.base
    }
}

/// Decode a response body, optionally unwrapping it from a root key.
///
/// Any structure can be used as the target, including an [Extended](struct.Extended.html)
/// overlay:
///
/// ```rust
/// use oscloud::common::{extract_into, Extended};
/// use oscloud::networking::v2::extensions::portsecurity::PortSecurityExt;
/// use oscloud::networking::v2::ports::Port;
///
/// let body = serde_json::json!({
///     "port": {"id": "1234", "network_id": "abcd", "port_security_enabled": false}
/// });
/// let port: Extended<Port, PortSecurityExt> = extract_into(body, Some("port")).unwrap();
/// assert_eq!(port.id, "1234");
/// assert_eq!(port.extension.port_security_enabled, Some(false));
/// ```
pub fn extract_into<T: DeserializeOwned>(body: Value, root: Option<&str>) -> Result<T, Error> {
    let value = match (root, body) {
        (Some(key), Value::Object(mut map)) => map.remove(key).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidResponse,
                format!("Missing {} in the response", key),
            )
        })?,
        (Some(key), other) => {
            return Err(Error::new(
                ErrorKind::InvalidResponse,
                format!("Expected an object with {}, got {}", key, other),
            ))
        }
        (None, body) => body,
    };
    T::deserialize(value).map_err(|e| {
        Error::new(
            ErrorKind::InvalidResponse,
            format!("Failed to decode the response: {}", e),
        )
    })
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    // Many services omit the time zone, the time is always UTC.
    let naive = value.trim_end_matches('Z');
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
        .map(|ts| ts.and_utc())
}

/// Deserialize a timestamp in any of the formats used by OpenStack services.
pub fn deserialize_timestamp<'de, D>(des: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(des)?;
    parse_timestamp(&value)
        .ok_or_else(|| D::Error::custom(format!("Invalid timestamp {}", value)))
}

/// Deserialize an optional timestamp, treating `null` and empty strings as `None`.
pub fn deserialize_optional_timestamp<'de, D>(des: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(des)? {
        Some(value) if !value.is_empty() => parse_timestamp(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("Invalid timestamp {}", value))),
        _ => Ok(None),
    }
}

/// Deserialize `null` as the default value.
pub fn null_as_default<'de, D, T>(des: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(des)?.unwrap_or_default())
}

#[cfg(test)]
pub mod test {
    use chrono::{TimeZone, Timelike, Utc};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Stamps {
        #[serde(deserialize_with = "deserialize_timestamp")]
        created_at: DateTime<Utc>,
        #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
        updated_at: Option<DateTime<Utc>>,
        #[serde(default, deserialize_with = "null_as_default")]
        tags: Vec<String>,
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2019, 6, 30, 4, 15, 37).unwrap();
        for value in &[
            "2019-06-30T04:15:37",
            "2019-06-30T04:15:37Z",
            "2019-06-30T04:15:37+00:00",
            "2019-06-30 04:15:37",
        ] {
            let body = format!(r#"{{"created_at": "{}"}}"#, value);
            let stamps: Stamps = serde_json::from_str(&body).unwrap();
            assert_eq!(stamps.created_at, expected, "{}", value);
            assert!(stamps.updated_at.is_none());
        }
    }

    #[test]
    fn test_timestamp_fractions() {
        let stamps: Stamps = serde_json::from_str(
            r#"{"created_at": "2014-07-07T18:25:31.275934", "updated_at": "", "tags": null}"#,
        )
        .unwrap();
        assert_eq!(stamps.created_at.nanosecond(), 275_934_000);
        assert!(stamps.updated_at.is_none());
        assert!(stamps.tags.is_empty());
    }

    #[test]
    fn test_timestamp_invalid() {
        assert!(serde_json::from_str::<Stamps>(r#"{"created_at": "yesterday"}"#).is_err());
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Base {
        id: String,
        name: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Ext {
        #[serde(default)]
        port_security_enabled: Option<bool>,
    }

    #[test]
    fn test_extract_into() {
        let body = serde_json::json!({"thing": {"id": "1", "name": "p"}});
        let value: Base = extract_into(body.clone(), Some("thing")).unwrap();
        assert_eq!(value.id, "1");

        let err = extract_into::<Base>(body.clone(), Some("other")).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);

        let err = extract_into::<Base>(body, None).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);

        let err = extract_into::<Base>(Value::Null, Some("thing")).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
    }

    #[test]
    fn test_extended() {
        let value: Extended<Base, Ext> =
            serde_json::from_str(r#"{"id": "1", "name": "p", "port_security_enabled": false}"#)
                .unwrap();
        assert_eq!(value.name, "p");
        assert_eq!(value.extension.port_security_enabled, Some(false));

        let value: Extended<Base, Ext> =
            serde_json::from_str(r#"{"id": "1", "name": "p"}"#).unwrap();
        assert!(value.extension.port_security_enabled.is_none());
    }
}
