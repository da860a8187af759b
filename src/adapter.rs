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

//! Adapter for a specific service.

use log::trace;
use reqwest::header::HeaderMap;
use reqwest::{Method, Url};

use super::client::{AuthenticatedClient, RequestBuilder};
use super::pagination::{Page, Pager};
use super::params::ToQuery;
use super::services::{ServiceType, VersionedService};
use super::url;
use super::{ApiVersion, Error};

/// Adapter for a specific service.
///
/// An `Adapter` is a client bound to one service: it knows the resource base URL (the service
/// endpoint plus the version prefix) and the headers to send with every request. All resource
/// functions accept an adapter of the matching service type, so passing e.g. a networking
/// adapter to a DNS call is a compile error.
///
/// Clones are cheap and share the authentication.
#[derive(Debug, Clone)]
pub struct Adapter<Srv> {
    client: AuthenticatedClient,
    service: Srv,
    resource_base: Url,
    default_headers: HeaderMap,
}

impl<Srv: ServiceType> Adapter<Srv> {
    /// Create an adapter for the service at the given endpoint.
    ///
    /// The resource prefix of the service is appended to the endpoint.
    pub fn new(client: AuthenticatedClient, service: Srv, endpoint: Url) -> Result<Self, Error> {
        let resource_base = url::extend(endpoint, service.resource_prefix())?;
        let resource_base = url::with_trailing_slash(resource_base)?;
        trace!(
            "Using {} for service {}",
            resource_base,
            service.catalog_type()
        );
        Ok(Adapter {
            client,
            service,
            resource_base,
            default_headers: HeaderMap::new(),
        })
    }

    /// Service type of this adapter.
    #[inline]
    pub fn service(&self) -> &Srv {
        &self.service
    }

    /// Underlying authenticated client.
    #[inline]
    pub fn client(&self) -> &AuthenticatedClient {
        &self.client
    }

    /// Base URL of all resources of this service.
    #[inline]
    pub fn resource_base(&self) -> &Url {
        &self.resource_base
    }

    /// Headers sent with every request.
    #[inline]
    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    /// Construct a resource URL from path segments.
    pub fn get_endpoint<I>(&self, path: I) -> Result<Url, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        url::extend(self.resource_base.clone(), path)
    }

    /// Start a request to a resource.
    ///
    /// Prefer `get`, `post`, `put`, `patch` and `delete`.
    pub fn request<I>(&self, method: Method, path: I) -> Result<RequestBuilder<Srv>, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let url = self.get_endpoint(path)?;
        Ok(self
            .client
            .request_service(self.service.clone(), method, url)
            .headers(self.default_headers.clone()))
    }

    /// Start a GET request.
    #[inline]
    pub fn get<I>(&self, path: I) -> Result<RequestBuilder<Srv>, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.request(Method::GET, path)
    }

    /// Start a POST request.
    #[inline]
    pub fn post<I>(&self, path: I) -> Result<RequestBuilder<Srv>, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.request(Method::POST, path)
    }

    /// Start a PUT request.
    #[inline]
    pub fn put<I>(&self, path: I) -> Result<RequestBuilder<Srv>, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.request(Method::PUT, path)
    }

    /// Start a PATCH request.
    #[inline]
    pub fn patch<I>(&self, path: I) -> Result<RequestBuilder<Srv>, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.request(Method::PATCH, path)
    }

    /// Start a DELETE request.
    #[inline]
    pub fn delete<I>(&self, path: I) -> Result<RequestBuilder<Srv>, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.request(Method::DELETE, path)
    }

    /// Create a pager over a collection.
    ///
    /// Errors in the path or the query are reported on the first iteration.
    pub fn pager<P, I, Q>(&self, path: I, query: Q) -> Pager<P>
    where
        P: Page,
        I: IntoIterator,
        I::Item: AsRef<str>,
        Q: ToQuery,
    {
        let url = self
            .get_endpoint(path)
            .and_then(|url| Ok(url::with_query(url, &query.to_query()?)));
        let pager = match url {
            Ok(url) => Pager::new(self.client.clone(), url),
            Err(err) => Pager::from_error(self.client.clone(), err),
        };
        pager.with_headers(self.default_headers.clone())
    }
}

impl<Srv: VersionedService> Adapter<Srv> {
    /// Send this API version with every request.
    pub fn set_default_api_version<A: Into<ApiVersion>>(&mut self, version: A) {
        let (name, value) = self.service.get_version_header(version.into());
        let _ = self.default_headers.insert(name, value);
    }

    /// Convert this adapter into one that sends the API version with every request.
    #[inline]
    pub fn with_default_api_version<A: Into<ApiVersion>>(mut self, version: A) -> Self {
        self.set_default_api_version(version);
        self
    }
}

#[cfg(test)]
pub(crate) mod test {
    use reqwest::{Client, Url};
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::Adapter;
    use crate::client::AuthenticatedClient;
    use crate::pagination::{ResourcePage, SinglePage};
    use crate::pagination::test::Item;
    use crate::services::{self, ServiceType};
    use crate::{Error, ErrorKind, NoAuth};

    /// Create an adapter talking to a mock server without authentication.
    pub(crate) async fn new_adapter<S: ServiceType>(service: S, server: &MockServer) -> Adapter<S> {
        let client = AuthenticatedClient::new(Client::new(), NoAuth::new_without_endpoint())
            .await
            .unwrap();
        let endpoint = Url::parse(&server.uri()).unwrap();
        Adapter::new(client, service, endpoint).unwrap()
    }

    #[tokio::test]
    async fn test_resource_base() {
        let server = MockServer::start().await;
        let adapter = new_adapter(services::NETWORK, &server).await;
        assert_eq!(
            adapter.resource_base().as_str(),
            format!("{}/v2.0/", server.uri())
        );
        assert_eq!(
            adapter.get_endpoint(&["ports", "1234"]).unwrap().as_str(),
            format!("{}/v2.0/ports/1234", server.uri())
        );
    }

    #[tokio::test]
    async fn test_default_api_version() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/shares/1"))
            .and(header("x-openstack-manila-api-version", "2.46"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"share": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = new_adapter(services::SHARED_FILE_SYSTEMS, &server)
            .await
            .with_default_api_version((2, 46));
        let _ = adapter
            .get(&["shares", "1"])
            .unwrap()
            .send()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_pager_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/items"))
            .and(query_param("name", "a b"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"items": [{"id": "1"}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        struct Query;
        impl crate::params::ToQuery for Query {
            fn to_query(&self) -> Result<String, Error> {
                Ok("name=a+b".into())
            }
        }

        let adapter = new_adapter(services::DNS, &server).await;
        let page = adapter
            .pager::<SinglePage<Item>, _, _>(&["items"], Query)
            .all_pages()
            .await
            .unwrap();
        assert_eq!(page.extract().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_pager_query_error() {
        let server = MockServer::start().await;
        struct Query;
        impl crate::params::ToQuery for Query {
            fn to_query(&self) -> Result<String, Error> {
                Err(Error::new(ErrorKind::InvalidInput, "nope"))
            }
        }

        let adapter = new_adapter(services::DNS, &server).await;
        let err = adapter
            .pager::<SinglePage<Item>, _, _>(&["items"], Query)
            .all()
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
