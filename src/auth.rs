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

//! Base code for authentication.

use std::collections::HashMap;
use std::fmt::{self, Debug};

use async_trait::async_trait;
use http::header::HeaderValue;
use reqwest::{Client, RequestBuilder, Url};
use static_assertions::{assert_impl_all, assert_obj_safe};

use super::{Error, ErrorKind};

const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Trait for an authentication type.
///
/// Token issuing and service catalog lookup happen outside of this crate. An authentication
/// type only has to:
///
/// 1. decorate outgoing requests with whatever credentials it holds,
/// 2. return an endpoint URL for the given service type.
#[async_trait]
pub trait AuthType: Debug + Sync + Send {
    /// Authenticate a request.
    async fn authenticate(
        &self,
        client: &Client,
        request: RequestBuilder,
    ) -> Result<RequestBuilder, Error>;

    /// Get a URL for the requested service.
    fn get_endpoint(&self, service_type: &str) -> Result<Url, Error>;

    /// Refresh the authentication (renew the token, etc).
    async fn refresh(&self, client: &Client) -> Result<(), Error>;
}

assert_obj_safe!(AuthType);

fn parse_endpoint<U: AsRef<str>>(endpoint: U) -> Result<Url, Error> {
    Url::parse(endpoint.as_ref()).map_err(|e| {
        Error::new(
            ErrorKind::InvalidInput,
            format!("Invalid endpoint {}: {}", endpoint.as_ref(), e),
        )
    })
}

/// Authentication type that provides no authentication.
///
/// This type always uses a pre-defined endpoint and sends no authenticaiton information:
/// ```rust,no_run
/// let auth = oscloud::NoAuth::new("http://127.0.0.1:9001")
///     .expect("Invalid endpoint");
/// let session = oscloud::Session::new(auth);
/// ```
#[derive(Clone, Debug)]
pub struct NoAuth {
    endpoint: Option<Url>,
}

assert_impl_all!(NoAuth: Send, Sync);

impl NoAuth {
    /// Create a new fake authentication method using a fixed endpoint.
    ///
    /// This endpoint will be returned in response to all `get_endpoint` calls
    /// of the [AuthType](trait.AuthType.html) trait.
    #[inline]
    pub fn new<U>(endpoint: U) -> Result<NoAuth, Error>
    where
        U: AsRef<str>,
    {
        Ok(NoAuth {
            endpoint: Some(parse_endpoint(endpoint)?),
        })
    }

    /// Create a new fake authentication method without an endpoint.
    ///
    /// All calls to `get_endpoint` will fail. This option is only useful with endpoint overrides.
    #[inline]
    pub fn new_without_endpoint() -> NoAuth {
        NoAuth { endpoint: None }
    }
}

#[async_trait]
impl AuthType for NoAuth {
    async fn authenticate(
        &self,
        _client: &Client,
        request: RequestBuilder,
    ) -> Result<RequestBuilder, Error> {
        Ok(request)
    }

    fn get_endpoint(&self, service_type: &str) -> Result<Url, Error> {
        self.endpoint.clone().ok_or_else(|| {
            Error::new(
                ErrorKind::EndpointNotFound,
                format!(
                    "None authentication without an endpoint, use an override for {}",
                    service_type
                ),
            )
        })
    }

    /// This call does nothing for `NoAuth`.
    async fn refresh(&self, _client: &Client) -> Result<(), Error> {
        Ok(())
    }
}

/// Authentication with a pre-issued token.
///
/// The token is sent in the `X-Auth-Token` header of every request. Endpoints are not looked up
/// in a catalog: either a default one is used or one registered for a specific service type.
///
/// ```rust,no_run
/// let auth = oscloud::Token::new("gAAAAABc...")
///     .with_endpoint("dns", "http://127.0.0.1:9001")
///     .expect("Invalid endpoint");
/// let session = oscloud::Session::new(auth);
/// ```
#[derive(Clone)]
pub struct Token {
    token: HeaderValue,
    default_endpoint: Option<Url>,
    endpoints: HashMap<String, Url>,
}

assert_impl_all!(Token: Send, Sync);

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("token", &"***")
            .field("default_endpoint", &self.default_endpoint)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

impl Token {
    /// Create a token authentication without endpoints.
    pub fn new<S: AsRef<str>>(token: S) -> Token {
        let mut value = HeaderValue::from_str(token.as_ref())
            .unwrap_or_else(|_| HeaderValue::from_static(""));
        value.set_sensitive(true);
        Token {
            token: value,
            default_endpoint: None,
            endpoints: HashMap::new(),
        }
    }

    /// Use this endpoint for services without a specific endpoint.
    pub fn with_default_endpoint<U: AsRef<str>>(mut self, endpoint: U) -> Result<Token, Error> {
        self.default_endpoint = Some(parse_endpoint(endpoint)?);
        Ok(self)
    }

    /// Register an endpoint for the given service type.
    pub fn with_endpoint<S, U>(mut self, service_type: S, endpoint: U) -> Result<Token, Error>
    where
        S: Into<String>,
        U: AsRef<str>,
    {
        let _ = self
            .endpoints
            .insert(service_type.into(), parse_endpoint(endpoint)?);
        Ok(self)
    }
}

#[async_trait]
impl AuthType for Token {
    async fn authenticate(
        &self,
        _client: &Client,
        request: RequestBuilder,
    ) -> Result<RequestBuilder, Error> {
        if self.token.is_empty() {
            return Err(Error::new(
                ErrorKind::AuthenticationFailed,
                "Authentication token is empty or contains invalid characters",
            ));
        }
        Ok(request.header(AUTH_TOKEN_HEADER, self.token.clone()))
    }

    fn get_endpoint(&self, service_type: &str) -> Result<Url, Error> {
        self.endpoints
            .get(service_type)
            .or(self.default_endpoint.as_ref())
            .cloned()
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::EndpointNotFound,
                    format!("No endpoint configured for service {}", service_type),
                )
            })
    }

    /// The token is issued externally, so there is nothing to refresh.
    async fn refresh(&self, _client: &Client) -> Result<(), Error> {
        Ok(())
    }
}
