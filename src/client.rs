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

//! Low-level authenticated client.

use std::collections::HashMap;
use std::convert::TryFrom;
use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Error as HttpError;
use log::trace;
use reqwest::{
    Body, Client, Method, Request, RequestBuilder as HttpRequestBuilder, Response, StatusCode, Url,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use static_assertions::assert_eq_size;

use crate::services::VersionedService;
use crate::{ApiVersion, AuthType, Error, ErrorKind};

/// Authenticated HTTP client.
///
/// Uses `Arc` internally and should be reused when possible by cloning it.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    client: Client,
    auth: Arc<dyn AuthType>,
}

assert_eq_size!(AuthenticatedClient, Option<AuthenticatedClient>);

impl AuthenticatedClient {
    /// Create a new authenticated client.
    pub async fn new<Auth: AuthType + 'static>(
        client: Client,
        auth_type: Auth,
    ) -> Result<AuthenticatedClient, Error> {
        auth_type.refresh(&client).await?;
        Ok(AuthenticatedClient::new_internal(
            client,
            Arc::new(auth_type),
        ))
    }

    #[inline]
    pub(crate) fn new_internal(client: Client, auth: Arc<dyn AuthType>) -> AuthenticatedClient {
        AuthenticatedClient { client, auth }
    }

    /// Get a reference to the authentication type in use.
    #[inline]
    pub fn auth_type(&self) -> &dyn AuthType {
        self.auth.as_ref()
    }

    async fn authenticate(&self, request: HttpRequestBuilder) -> Result<Request, Error> {
        self.auth
            .authenticate(&self.client, request)
            .await?
            .build()
            .map_err(Error::from)
    }

    /// Get a URL for the requested service.
    #[inline]
    pub fn get_endpoint(&self, service_type: &str) -> Result<Url, Error> {
        self.auth.get_endpoint(service_type)
    }

    /// Get a reference to the inner (non-authenticated) client.
    #[inline]
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Update the authentication.
    ///
    /// # Warning
    ///
    /// Authentication will also be updated for clones of this client, since they share the same
    /// authentication object.
    #[inline]
    pub async fn refresh(&self) -> Result<(), Error> {
        self.auth.refresh(&self.client).await
    }

    /// Set a new authentication for this client.
    #[inline]
    pub fn set_auth_type<Auth: AuthType + 'static>(&mut self, auth_type: Auth) {
        self.auth = Arc::new(auth_type);
    }

    /// Start an authenticated request.
    #[inline]
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.request_service((), method, url)
    }

    /// Start an authenticated request for a service.
    pub(crate) fn request_service<S>(
        &self,
        service: S,
        method: Method,
        url: Url,
    ) -> RequestBuilder<S> {
        trace!("Preparing HTTP {} request to {}", method, url);
        RequestBuilder {
            inner: self.client.request(method, url),
            client: self.clone(),
            service,
            expected: Vec::new(),
        }
    }
}

impl From<AuthenticatedClient> for Client {
    fn from(value: AuthenticatedClient) -> Client {
        value.client
    }
}

/// A request builder with error handling.
///
/// If the type parameter `S` is a service, additional functionality is available.
#[derive(Debug)]
#[must_use = "preparing a request is not enough to run it"]
pub struct RequestBuilder<S = ()> {
    inner: HttpRequestBuilder,
    client: AuthenticatedClient,
    service: S,
    expected: Vec<StatusCode>,
}

#[derive(Debug, Deserialize)]
struct Message {
    message: Option<String>,
    faultstring: Option<String>,
    title: Option<String>,
    // Legacy format: JSON inside JSON
    error_message: Option<serde_json::Value>,
}

impl Message {
    fn convert(self, recursive: bool) -> Option<String> {
        if let Some(value) = self.message.or(self.faultstring).or(self.title) {
            return Some(value);
        }
        if !recursive {
            return None;
        }
        let nested = match self.error_message? {
            serde_json::Value::String(json) => serde_json::from_str::<Message>(&json).ok(),
            other => serde_json::from_value::<Message>(other).ok(),
        };
        nested.and_then(|msg| msg.convert(false))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorResponse {
    Map(HashMap<String, Message>),
    Message(Message),
}

fn extract_message(text: String) -> String {
    serde_json::from_str::<ErrorResponse>(&text)
        .ok()
        .and_then(|body| match body {
            ErrorResponse::Map(map) => map.into_values().next().and_then(|v| v.convert(true)),
            ErrorResponse::Message(msg) => msg.convert(true),
        })
        .unwrap_or(text)
}

/// Check for OpenStack errors in the response.
pub async fn check(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let message = extract_message(response.text().await?);
        trace!("HTTP request returned {}; error: {}", status, message);
        Err(Error::new(status.into(), message).with_status(status))
    } else {
        trace!(
            "HTTP request to {} returned {}",
            response.url(),
            response.status()
        );
        Ok(response)
    }
}

fn check_expected(response: Response, expected: &[StatusCode]) -> Result<Response, Error> {
    let status = response.status();
    if expected.is_empty() || expected.contains(&status) {
        Ok(response)
    } else {
        Err(Error::new(
            ErrorKind::InvalidResponse,
            format!(
                "Expected HTTP {:?} from {}, got {}",
                expected.iter().map(StatusCode::as_u16).collect::<Vec<_>>(),
                response.url(),
                status
            ),
        )
        .with_status(status))
    }
}

impl<S> RequestBuilder<S> {
    /// Add a body to the request.
    pub fn body<T: Into<Body>>(self, body: T) -> RequestBuilder<S> {
        RequestBuilder {
            inner: self.inner.body(body),
            ..self
        }
    }

    /// Add a header to the request.
    pub fn header<K, V>(self, key: K, value: V) -> RequestBuilder<S>
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<HttpError>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<HttpError>,
    {
        RequestBuilder {
            inner: self.inner.header(key, value),
            ..self
        }
    }

    /// Add headers to a request.
    pub fn headers(self, headers: HeaderMap) -> RequestBuilder<S> {
        RequestBuilder {
            inner: self.inner.headers(headers),
            ..self
        }
    }

    /// Add a JSON body to the request.
    pub fn json<T: Serialize + ?Sized>(self, json: &T) -> RequestBuilder<S> {
        RequestBuilder {
            inner: self.inner.json(json),
            ..self
        }
    }

    /// Send a query with the request.
    pub fn query<T: Serialize + ?Sized>(self, query: &T) -> RequestBuilder<S> {
        RequestBuilder {
            inner: self.inner.query(query),
            ..self
        }
    }

    /// Override the timeout for the request.
    pub fn timeout(self, timeout: Duration) -> RequestBuilder<S> {
        RequestBuilder {
            inner: self.inner.timeout(timeout),
            ..self
        }
    }

    /// Only accept the provided success codes.
    ///
    /// Any other non-error code results in an `InvalidResponse` error. By default
    /// every 2xx and 3xx code is accepted.
    pub fn expect_status(self, codes: &[StatusCode]) -> RequestBuilder<S> {
        RequestBuilder {
            expected: codes.to_vec(),
            ..self
        }
    }

    /// Send the request and receive JSON in response.
    pub async fn fetch_json<T>(self) -> Result<T, Error>
    where
        T: DeserializeOwned + Send,
    {
        self.send().await?.json::<T>().await.map_err(Error::from)
    }

    /// Send the request and check for errors.
    pub async fn send(self) -> Result<Response, Error> {
        let expected = self.expected.clone();
        let response = check(self.send_unchecked().await?).await?;
        check_expected(response, &expected)
    }

    /// Send the request without checking for HTTP and OpenStack errors.
    pub async fn send_unchecked(self) -> Result<Response, Error> {
        let req = self.client.authenticate(self.inner).await?;
        trace!("Sending HTTP {} request to {}", req.method(), req.url());
        self.client.client.execute(req).await.map_err(Error::from)
    }
}

impl<S> RequestBuilder<S>
where
    S: VersionedService,
{
    /// Add an API version to this request.
    pub fn api_version<A: Into<ApiVersion>>(self, version: A) -> RequestBuilder<S> {
        let (name, value) = self.service.get_version_header(version.into());
        RequestBuilder {
            inner: self.inner.header(name, value),
            ..self
        }
    }

    /// Set the API version on the request.
    pub fn set_api_version<A: Into<ApiVersion>>(&mut self, version: A) {
        take_mut::take(self, |rb| rb.api_version(version));
    }
}

impl<S> RequestBuilder<S>
where
    S: Clone,
{
    /// Attempt to clone this request builder.
    pub fn try_clone(&self) -> Option<RequestBuilder<S>> {
        self.inner.try_clone().map(|inner| RequestBuilder {
            inner,
            client: self.client.clone(),
            service: self.service.clone(),
            expected: self.expected.clone(),
        })
    }
}
