// Copyright 2021 Dmitry Tantsur <dtantsur@protonmail.com>
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

//! Request options: query strings and JSON bodies.
//!
//! Every option structure of a resource module implements [ToQuery](trait.ToQuery.html) (for
//! listing) or [ToBody](trait.ToBody.html) (for creating and updating). Callers with special
//! needs can provide their own implementations instead of the stock structures.

use serde::Serialize;
use serde_json::{Map, Value};

use super::{Error, ErrorKind};

/// Anything that can render itself into a query string.
pub trait ToQuery {
    /// Render the query string without the leading `?`.
    ///
    /// An empty string means no query.
    fn to_query(&self) -> Result<String, Error>;
}

/// Anything that can render itself into a JSON request body.
pub trait ToBody {
    /// Render the request body.
    fn to_body(&self) -> Result<Value, Error>;
}

impl ToQuery for () {
    fn to_query(&self) -> Result<String, Error> {
        Ok(String::new())
    }
}

impl<T: ToQuery + ?Sized> ToQuery for &T {
    fn to_query(&self) -> Result<String, Error> {
        (**self).to_query()
    }
}

impl<T: ToQuery> ToQuery for Option<T> {
    fn to_query(&self) -> Result<String, Error> {
        match self {
            Some(value) => value.to_query(),
            None => Ok(String::new()),
        }
    }
}

impl ToBody for Value {
    fn to_body(&self) -> Result<Value, Error> {
        Ok(self.clone())
    }
}

impl<T: ToBody + ?Sized> ToBody for &T {
    fn to_body(&self) -> Result<Value, Error> {
        (**self).to_body()
    }
}

/// Serialize a flat structure into a query string.
///
/// `None` fields must be skipped by the structure itself.
pub fn build_query_string<T: Serialize + ?Sized>(opts: &T) -> Result<String, Error> {
    serde_urlencoded::to_string(opts).map_err(|e| {
        Error::new(
            ErrorKind::InvalidInput,
            format!("Cannot build a query string: {}", e),
        )
    })
}

/// Append repeated parameters (`key=v1&key=v2`) to a query string.
pub fn append_repeated<I, S>(query: &mut String, key: &str, values: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for value in values {
        let _ = serializer.append_pair(key, value.as_ref());
    }
    let extra = serializer.finish();
    if !extra.is_empty() {
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&extra);
    }
}

/// Serialize options into a JSON object, optionally wrapped into a root key.
///
/// ```rust
/// # use serde::Serialize;
/// #[derive(Serialize)]
/// struct Opts {
///     name: String,
/// }
///
/// let body = oscloud::params::build_request_body(
///     &Opts { name: "example.org.".into() },
///     Some("zone"),
/// ).unwrap();
/// assert_eq!(body, serde_json::json!({"zone": {"name": "example.org."}}));
/// ```
pub fn build_request_body<T: Serialize + ?Sized>(
    opts: &T,
    root: Option<&str>,
) -> Result<Value, Error> {
    let value = serde_json::to_value(opts).map_err(|e| {
        Error::new(
            ErrorKind::InvalidInput,
            format!("Cannot build a request body: {}", e),
        )
    })?;

    if !value.is_object() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "Request options must serialize into a JSON object",
        ));
    }

    Ok(match root {
        Some(key) => {
            let mut map = Map::with_capacity(1);
            let _ = map.insert(key.to_string(), value);
            Value::Object(map)
        }
        None => value,
    })
}

/// Add a field to a request body built by [build_request_body](fn.build_request_body.html).
///
/// Used for API extensions and free-form values. Overriding an existing field is an error.
pub fn insert_into_body(
    body: &mut Value,
    root: Option<&str>,
    key: &str,
    value: Value,
) -> Result<(), Error> {
    let target = match root {
        Some(root) => body.get_mut(root),
        None => Some(body),
    };
    let map = match target {
        Some(Value::Object(map)) => map,
        _ => {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Request body must be a JSON object",
            ))
        }
    };
    if map.contains_key(key) {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("Field {} is already set in the request body", key),
        ));
    }
    let _ = map.insert(key.to_string(), value);
    Ok(())
}

/// Fail with `InvalidInput` if a required string argument is empty.
#[inline]
pub fn require(argument: &str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        Err(Error::new(
            ErrorKind::InvalidInput,
            format!("Missing input for argument [{}]", argument),
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
pub mod test {
    use serde::Serialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Default, Serialize)]
    struct Query {
        #[serde(skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        all_tenants: Option<bool>,
    }

    #[test]
    fn test_query_string() {
        let q = Query {
            limit: Some(2),
            name: Some("my share".into()),
            all_tenants: Some(true),
        };
        assert_eq!(
            build_query_string(&q).unwrap(),
            "limit=2&name=my+share&all_tenants=true"
        );
        assert_eq!(build_query_string(&Query::default()).unwrap(), "");
    }

    #[test]
    fn test_append_repeated() {
        let mut query = String::from("limit=2");
        append_repeated(&mut query, "tags", &["a", "b"]);
        assert_eq!(query, "limit=2&tags=a&tags=b");

        let mut query = String::new();
        append_repeated(&mut query, "fixed_ips", &["ip_address=10.0.0.2"]);
        assert_eq!(query, "fixed_ips=ip_address%3D10.0.0.2");

        let mut query = String::from("limit=2");
        append_repeated(&mut query, "tags", Vec::<String>::new());
        assert_eq!(query, "limit=2");
    }

    #[test]
    fn test_request_body() {
        let q = Query {
            limit: Some(2),
            ..Default::default()
        };
        assert_eq!(
            build_request_body(&q, Some("root")).unwrap(),
            json!({"root": {"limit": 2}})
        );
        assert_eq!(build_request_body(&q, None).unwrap(), json!({"limit": 2}));
    }

    #[test]
    fn test_request_body_not_object() {
        let err = build_request_body(&42, None).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_insert_into_body() {
        let mut body = json!({"port": {"name": "p"}});
        insert_into_body(&mut body, Some("port"), "port_security_enabled", json!(false)).unwrap();
        assert_eq!(
            body,
            json!({"port": {"name": "p", "port_security_enabled": false}})
        );

        let err = insert_into_body(&mut body, Some("port"), "name", json!("q"))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = insert_into_body(&mut body, Some("network"), "name", json!("q"))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let mut body = json!({});
        insert_into_body(&mut body, None, "cascade", json!(true)).unwrap();
        assert_eq!(body, json!({"cascade": true}));
    }

    #[test]
    fn test_require() {
        assert!(require("name", "x").is_ok());
        let err = require("name", "").err().unwrap();
        assert_eq!(err.message(), "Missing input for argument [name]");
    }

    #[test]
    fn test_optional_query() {
        let none: Option<()> = None;
        assert_eq!(none.to_query().unwrap(), "");
        assert_eq!(().to_query().unwrap(), "");
    }
}
