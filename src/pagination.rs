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

//! Generic pagination over OpenStack collections.
//!
//! Listing calls return a [Pager](struct.Pager.html), which issues no requests until it is
//! iterated. Three page flavors are supported:
//!
//! * [LinkedPage](struct.LinkedPage.html): the server returns a `next` link,
//! * [MarkerPage](struct.MarkerPage.html): the client computes the next `offset` from the
//!   `offset` and `limit` query parameters,
//! * [SinglePage](struct.SinglePage.html): the collection is never paginated.
//!
//! Iteration stops on an empty page, on a missing next page and on the first error.

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::client::AuthenticatedClient;
use super::url;
use super::{Error, ErrorKind};

/// Raw result of fetching one page.
#[derive(Clone, Debug)]
pub struct PageResult {
    /// URL the page was fetched from.
    pub url: Url,
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Decoded JSON body (`null` for empty bodies).
    pub body: Value,
}

impl PageResult {
    /// Create a page result from an HTTP response.
    pub async fn from_response(response: Response) -> Result<PageResult, Error> {
        let url = response.url().clone();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok(PageResult {
            url,
            status,
            headers,
            body,
        })
    }

    /// Number of items under the given collection key.
    ///
    /// A missing or `null` collection counts as empty.
    pub fn count(&self, key: &str) -> Result<usize, Error> {
        match self.body.get(key) {
            None | Some(Value::Null) => Ok(0),
            Some(Value::Array(items)) => Ok(items.len()),
            Some(other) => Err(Error::new(
                ErrorKind::InvalidResponse,
                format!("Expected an array in {}, got {}", key, other),
            )),
        }
    }

    /// Decode items under the given collection key.
    pub fn extract_key<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, Error> {
        match self.body.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(items) => Ok(Vec::<T>::deserialize(items)?),
        }
    }
}

/// Where the server puts a link to the next page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextLink {
    /// `<collection>_links: [{"href": ..., "rel": "next"}]`, used by most services.
    Collection,
    /// A string at the given path of the body, e.g. `links.next` for DNS.
    Path(&'static [&'static str]),
}

/// A resource that is returned in collections.
pub trait Resource: DeserializeOwned {
    /// Key of the collection in the listing body.
    const COLLECTION: &'static str;

    /// Location of the next page link for linked pagination.
    const NEXT_LINK: NextLink = NextLink::Collection;
}

/// A single page of a collection.
pub trait Page: Sized {
    /// Wrap a fetched result.
    fn from_result(result: PageResult) -> Result<Self, Error>;

    /// Access the fetched result.
    fn result(&self) -> &PageResult;

    /// Unwrap the fetched result.
    fn into_result(self) -> PageResult;

    /// Key of the collection, used to merge pages.
    fn collection_key(&self) -> &'static str;

    /// URL of the next page, `None` if this is the last page.
    fn next_page_url(&self) -> Result<Option<Url>, Error>;

    /// Whether the page contains no items.
    fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.result().count(self.collection_key())? == 0)
    }
}

/// A page of a resource collection.
pub trait ResourcePage: Page {
    /// Type of items.
    type Item: Resource;

    /// Decode items of the page.
    fn extract(&self) -> Result<Vec<Self::Item>, Error> {
        self.extract_into()
    }

    /// Decode items of the page into a different structure.
    ///
    /// Useful with [Extended](../common/struct.Extended.html) to decode API extensions.
    fn extract_into<U: DeserializeOwned>(&self) -> Result<Vec<U>, Error> {
        self.result().extract_key(Self::Item::COLLECTION)
    }
}

#[derive(Deserialize)]
struct PageLink {
    href: String,
    #[serde(default)]
    rel: String,
}

fn find_next_link(
    result: &PageResult,
    collection: &str,
    link: NextLink,
) -> Result<Option<String>, Error> {
    match link {
        NextLink::Collection => {
            let key = format!("{}_links", collection);
            let links: Vec<PageLink> = match result.body.get(&key) {
                None | Some(Value::Null) => return Ok(None),
                Some(value) => Vec::deserialize(value)?,
            };
            Ok(links.into_iter().find(|l| l.rel == "next").map(|l| l.href))
        }
        NextLink::Path(path) => {
            let mut current = &result.body;
            for segment in path {
                match current.get(segment) {
                    Some(value) => current = value,
                    None => return Ok(None),
                }
            }
            Ok(current.as_str().map(String::from))
        }
    }
}

/// Compute the next offset from the `offset` and `limit` query parameters.
///
/// Returns `None` when no `limit` was requested (the server returned everything at once) or
/// when the limit is zero.
pub fn next_offset(page_url: &Url) -> Result<Option<u64>, Error> {
    let parse = |name: &str, value: String| {
        value.parse::<u64>().map_err(|_| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("Query parameter {} must be a number, got {}", name, value),
            )
        })
    };

    let limit = match url::query_param(page_url, "limit") {
        Some(value) => parse("limit", value)?,
        None => return Ok(None),
    };
    if limit == 0 {
        return Ok(None);
    }

    let offset = match url::query_param(page_url, "offset") {
        Some(value) => parse("offset", value)?,
        None => 0,
    };

    offset
        .checked_add(limit)
        .map(Some)
        .ok_or_else(|| Error::new(ErrorKind::InvalidInput, "Pagination offset overflow"))
}

macro_rules! resource_page {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        pub struct $name<T> {
            result: PageResult,
            _resource: PhantomData<fn() -> T>,
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                $name {
                    result: self.result.clone(),
                    _resource: PhantomData,
                }
            }
        }

        impl<T> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("result", &self.result)
                    .finish()
            }
        }

        impl<T: Resource> ResourcePage for $name<T> {
            type Item = T;
        }
    };
}

resource_page! {
    /// A page with a link to the next page in the body.
    LinkedPage
}

resource_page! {
    /// A page of an offset/limit paginated collection.
    MarkerPage
}

resource_page! {
    /// A collection that is returned in one response.
    SinglePage
}

impl<T: Resource> Page for LinkedPage<T> {
    fn from_result(result: PageResult) -> Result<Self, Error> {
        Ok(LinkedPage {
            result,
            _resource: PhantomData,
        })
    }

    fn result(&self) -> &PageResult {
        &self.result
    }

    fn into_result(self) -> PageResult {
        self.result
    }

    fn collection_key(&self) -> &'static str {
        T::COLLECTION
    }

    fn next_page_url(&self) -> Result<Option<Url>, Error> {
        match find_next_link(&self.result, T::COLLECTION, T::NEXT_LINK)? {
            Some(href) if !href.is_empty() => Ok(Some(self.result.url.join(&href)?)),
            _ => Ok(None),
        }
    }
}

impl<T: Resource> Page for MarkerPage<T> {
    fn from_result(result: PageResult) -> Result<Self, Error> {
        Ok(MarkerPage {
            result,
            _resource: PhantomData,
        })
    }

    fn result(&self) -> &PageResult {
        &self.result
    }

    fn into_result(self) -> PageResult {
        self.result
    }

    fn collection_key(&self) -> &'static str {
        T::COLLECTION
    }

    fn next_page_url(&self) -> Result<Option<Url>, Error> {
        if self.is_empty()? {
            return Ok(None);
        }
        Ok(next_offset(&self.result.url)?.map(|offset| {
            url::set_query_param(self.result.url.clone(), "offset", &offset.to_string())
        }))
    }
}

impl<T: Resource> Page for SinglePage<T> {
    fn from_result(result: PageResult) -> Result<Self, Error> {
        Ok(SinglePage {
            result,
            _resource: PhantomData,
        })
    }

    fn result(&self) -> &PageResult {
        &self.result
    }

    fn into_result(self) -> PageResult {
        self.result
    }

    fn collection_key(&self) -> &'static str {
        T::COLLECTION
    }

    fn next_page_url(&self) -> Result<Option<Url>, Error> {
        Ok(None)
    }
}

/// Lazy, forward-only iteration over pages.
///
/// Construction issues no requests. Iteration methods consume the pager, so a pager cannot be
/// restarted.
pub struct Pager<P> {
    client: AuthenticatedClient,
    initial: Result<Url, Error>,
    headers: HeaderMap,
    _page: PhantomData<fn() -> P>,
}

impl<P> fmt::Debug for Pager<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pager")
            .field("initial", &self.initial)
            .field("headers", &self.headers)
            .finish()
    }
}

/// Iteration state shared by all ways of consuming a pager.
pub(crate) struct PagerState<P> {
    client: AuthenticatedClient,
    headers: HeaderMap,
    next: Option<Result<Url, Error>>,
    visited: HashSet<Url>,
    _page: PhantomData<fn() -> P>,
}

impl<P: Page> PagerState<P> {
    /// Fetch the next page if there is one.
    pub(crate) async fn fetch(&mut self) -> Result<Option<P>, Error> {
        let url = match self.next.take() {
            Some(url) => url?,
            None => return Ok(None),
        };

        debug!("Fetching page {}", url);
        let response = self
            .client
            .request(Method::GET, url)
            .headers(self.headers.clone())
            .expect_status(&[StatusCode::OK, StatusCode::NO_CONTENT])
            .send()
            .await?;
        let page = P::from_result(PageResult::from_response(response).await?)?;
        Ok(Some(page))
    }

    /// Prepare fetching the page that follows the provided one.
    pub(crate) fn advance(&mut self, page: &P) -> Result<(), Error> {
        let _ = self.visited.insert(page.result().url.clone());
        self.next = match page.next_page_url()? {
            Some(url) if self.visited.contains(&url) => {
                warn!(
                    "Next page of {} is {} which was already fetched, stopping",
                    page.result().url,
                    url
                );
                None
            }
            Some(url) => Some(Ok(url)),
            None => {
                debug!("No more pages after {}", page.result().url);
                None
            }
        };
        Ok(())
    }
}

fn merge_collection(target: &mut Value, source: Value, key: &str) -> Result<(), Error> {
    let items = match source {
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            _ => return Ok(()),
        },
        _ => return Ok(()),
    };

    let target = target.as_object_mut().ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidResponse,
            "Cannot merge pages: the body is not an object",
        )
    })?;
    match target.get_mut(key) {
        Some(Value::Array(existing)) => existing.extend(items),
        _ => {
            let _ = target.insert(key.to_string(), Value::Array(items));
        }
    }
    Ok(())
}

impl<P: Page> Pager<P> {
    /// Create a pager starting at the given URL.
    pub fn new(client: AuthenticatedClient, url: Url) -> Pager<P> {
        Pager {
            client,
            initial: Ok(url),
            headers: HeaderMap::new(),
            _page: PhantomData,
        }
    }

    /// Create a pager that fails on iteration.
    ///
    /// Used when building the initial URL fails, so that listing calls do not have to return
    /// a `Result`.
    pub fn from_error(client: AuthenticatedClient, error: Error) -> Pager<P> {
        Pager {
            client,
            initial: Err(error),
            headers: HeaderMap::new(),
            _page: PhantomData,
        }
    }

    /// Send these headers with every page request.
    pub fn with_headers(mut self, headers: HeaderMap) -> Pager<P> {
        self.headers.extend(headers);
        self
    }

    /// Send a header with every page request.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Pager<P> {
        let _ = self.headers.insert(name, value);
        self
    }

    /// The first URL to fetch.
    pub fn initial_url(&self) -> Result<&Url, Error> {
        self.initial.as_ref().map_err(Clone::clone)
    }

    pub(crate) fn into_state(self) -> PagerState<P> {
        PagerState {
            client: self.client,
            headers: self.headers,
            next: Some(self.initial),
            visited: HashSet::new(),
            _page: PhantomData,
        }
    }

    /// Visit pages one by one.
    ///
    /// Stops after an empty page (which is not visited), when `visit` returns `false`, when
    /// there is no next page or on the first error. Pages visited before an error are not
    /// affected by it.
    ///
    /// ```rust,no_run
    /// # async fn example() -> Result<(), oscloud::Error> {
    /// use oscloud::dns::v2::zones;
    /// use oscloud::pagination::ResourcePage;
    ///
    /// let session = oscloud::Session::from_env()?;
    /// let dns = session.adapter(oscloud::services::DNS)?;
    /// zones::list(&dns, &zones::ListOpts::default())
    ///     .each_page(|page| {
    ///         for zone in page.extract()? {
    ///             println!("{} {}", zone.id, zone.name);
    ///         }
    ///         Ok(true)
    ///     })
    ///     .await?;
    /// # Ok(()) }
    /// ```
    pub async fn each_page<F>(self, mut visit: F) -> Result<(), Error>
    where
        F: FnMut(&P) -> Result<bool, Error>,
    {
        let mut state = self.into_state();
        while let Some(page) = state.fetch().await? {
            if page.is_empty()? {
                debug!("Page {} is empty, stopping", page.result().url);
                break;
            }
            if !visit(&page)? {
                debug!("Iteration stopped after {}", page.result().url);
                break;
            }
            state.advance(&page)?;
        }
        Ok(())
    }

    /// Fetch all pages and merge them into one.
    ///
    /// The result carries the URL, status and headers of the first page. If the first page is
    /// empty, it is returned as it is.
    pub async fn all_pages(self) -> Result<P, Error> {
        let mut state = self.into_state();
        let mut merged: Option<PageResult> = None;
        while let Some(page) = state.fetch().await? {
            let empty = page.is_empty()?;
            if !empty {
                state.advance(&page)?;
            }

            let key = page.collection_key();
            let result = page.into_result();
            if let Some(acc) = merged.as_mut() {
                if !empty {
                    merge_collection(&mut acc.body, result.body, key)?;
                }
            } else {
                merged = Some(result);
            }

            if empty {
                break;
            }
        }

        let merged = merged.ok_or_else(|| {
            Error::new(ErrorKind::InvalidResponse, "No pages have been fetched")
        })?;
        P::from_result(merged)
    }
}

impl<P: ResourcePage> Pager<P> {
    /// Fetch all pages and decode their items.
    pub async fn all(self) -> Result<Vec<P::Item>, Error> {
        self.all_pages().await?.extract()
    }
}
