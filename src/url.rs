// Copyright 2019 Dmitry Tantsur <divius.inside@gmail.com>
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

//! Handy primitives for working with URLs.

use reqwest::Url;

use super::{Error, ErrorKind};

fn ensure_base(url: &Url) -> Result<(), Error> {
    if url.cannot_be_a_base() {
        Err(Error::new(
            ErrorKind::InvalidInput,
            format!("URL {} cannot be used as a base", url),
        ))
    } else {
        Ok(())
    }
}

/// Append path segments to the URL.
pub fn extend<I>(mut url: Url, segments: I) -> Result<Url, Error>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    ensure_base(&url)?;
    if let Ok(mut path) = url.path_segments_mut() {
        let _ = path.pop_if_empty().extend(segments);
    }
    Ok(url)
}

/// Make sure the URL path ends with a slash.
pub fn with_trailing_slash(mut url: Url) -> Result<Url, Error> {
    ensure_base(&url)?;
    if !url.path().ends_with('/') {
        if let Ok(mut path) = url.path_segments_mut() {
            let _ = path.push("");
        }
    }
    Ok(url)
}

/// Replace the query string, an empty query removes it.
pub fn with_query(mut url: Url, query: &str) -> Url {
    url.set_query(if query.is_empty() { None } else { Some(query) });
    url
}

/// Get the value of a query parameter.
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Set a query parameter, keeping all other parameters in order.
pub fn set_query_param(mut url: Url, name: &str, value: &str) -> Url {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != name)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.push((name.to_string(), value.to_string()));
    let _ = url.query_pairs_mut().clear().extend_pairs(pairs);
    url
}
