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

//! Session structure definition.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use reqwest::{Client, Url};

use super::adapter::Adapter;
use super::client::AuthenticatedClient;
use super::loading::CloudConfig;
use super::services::ServiceType;
use super::{AuthType, Error};

/// An OpenStack API session.
///
/// The session object serves as a wrapper around an [authentication type](trait.AuthType.html)
/// and resolves [adapters](struct.Adapter.html) for services.
///
/// # Note
///
/// All clones of one session share the same authentication. Use
/// [with_auth_type](#method.with_auth_type) to detach a session.
#[derive(Debug, Clone)]
pub struct Session {
    client: AuthenticatedClient,
    endpoint_overrides: HashMap<String, Url>,
}

impl Session {
    /// Create a new session with a given authentication plugin.
    pub fn new<Auth: AuthType + 'static>(auth_type: Auth) -> Session {
        Session::new_with_client(Client::new(), auth_type)
    }

    /// Create a new session with a given authentication plugin and an HTTP client.
    pub fn new_with_client<Auth: AuthType + 'static>(client: Client, auth_type: Auth) -> Session {
        Session::new_with_authenticated_client(AuthenticatedClient::new_internal(
            client,
            Arc::new(auth_type),
        ))
    }

    /// Create a new session from an authenticated client.
    #[inline]
    pub fn new_with_authenticated_client(client: AuthenticatedClient) -> Session {
        Session {
            client,
            endpoint_overrides: HashMap::new(),
        }
    }

    /// Create a `Session` from a `clouds.yaml` configuration file.
    ///
    /// See [CloudConfig::from_config](struct.CloudConfig.html#method.from_config) for details.
    #[inline]
    pub fn from_config<S: AsRef<str>>(cloud_name: S) -> Result<Session, Error> {
        CloudConfig::from_config(cloud_name)?.create_session()
    }

    /// Create a `Session` from environment variables.
    ///
    /// See [CloudConfig::from_env](struct.CloudConfig.html#method.from_env) for details.
    #[inline]
    pub fn from_env() -> Result<Session, Error> {
        CloudConfig::from_env()?.create_session()
    }

    /// Get a reference to the authentication type in use.
    #[inline]
    pub fn auth_type(&self) -> &dyn AuthType {
        self.client.auth_type()
    }

    /// Get a reference to the authenticated client.
    #[inline]
    pub fn client(&self) -> &AuthenticatedClient {
        &self.client
    }

    /// Endpoint overrides in use.
    #[inline]
    pub fn endpoint_overrides(&self) -> &HashMap<String, Url> {
        &self.endpoint_overrides
    }

    /// Modify endpoint overrides.
    ///
    /// This call does not affect adapters that have already been created.
    #[inline]
    pub fn endpoint_overrides_mut(&mut self) -> &mut HashMap<String, Url> {
        &mut self.endpoint_overrides
    }

    /// Update the authentication.
    ///
    /// # Warning
    ///
    /// Authentication will also be updated for clones of this `Session`, since they share the same
    /// authentication object.
    #[inline]
    pub async fn refresh(&self) -> Result<(), Error> {
        self.client.refresh().await
    }

    /// Set a new authentication for this `Session`.
    ///
    /// This call does not affect clones of this `Session`.
    #[inline]
    pub fn set_auth_type<Auth: AuthType + 'static>(&mut self, auth_type: Auth) {
        self.client.set_auth_type(auth_type);
    }

    /// Override the endpoint of a service.
    ///
    /// The resource prefix of the service (e.g. `v2.0`) is still appended to the override.
    pub fn set_endpoint_override<S: Into<String>>(&mut self, service_type: S, url: Url) {
        let _ = self.endpoint_overrides.insert(service_type.into(), url);
    }

    /// Convert this session into one using the given authentication.
    #[inline]
    pub fn with_auth_type<Auth: AuthType + 'static>(mut self, auth_type: Auth) -> Session {
        self.set_auth_type(auth_type);
        self
    }

    /// Convert this session into one using the given endpoint override.
    #[inline]
    pub fn with_endpoint_override<S: Into<String>>(mut self, service_type: S, url: Url) -> Session {
        self.set_endpoint_override(service_type, url);
        self
    }

    /// Convert this session into one using the given endpoint overrides.
    #[inline]
    pub fn with_endpoint_overrides(mut self, endpoint_overrides: HashMap<String, Url>) -> Session {
        self.endpoint_overrides = endpoint_overrides;
        self
    }

    /// Get the endpoint of the service (without the resource prefix).
    pub fn get_endpoint<Srv: ServiceType>(&self, service: &Srv) -> Result<Url, Error> {
        let catalog_type = service.catalog_type();
        if let Some(url) = self.endpoint_overrides.get(catalog_type) {
            debug!("Using override {} for service {}", url, catalog_type);
            Ok(url.clone())
        } else {
            self.client.get_endpoint(catalog_type)
        }
    }

    /// Create an adapter for the given service.
    ///
    /// ```rust,no_run
    /// # fn example() -> Result<(), oscloud::Error> {
    /// let session = oscloud::Session::from_env()?;
    /// let network = session.adapter(oscloud::services::NETWORK)?;
    /// println!("Networking resources are at {}", network.resource_base());
    /// # Ok(()) }
    /// ```
    pub fn adapter<Srv: ServiceType>(&self, service: Srv) -> Result<Adapter<Srv>, Error> {
        let endpoint = self.get_endpoint(&service)?;
        Adapter::new(self.client.clone(), service, endpoint)
    }
}

impl From<Session> for AuthenticatedClient {
    fn from(value: Session) -> AuthenticatedClient {
        value.client
    }
}
