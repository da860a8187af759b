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

//! Cloud configuration structure.

use std::collections::HashMap;
use std::convert::TryFrom;
use std::sync::Arc;

use log::debug;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::config;
use super::env;
use crate::client::AuthenticatedClient;
use crate::{AuthType, Error, ErrorKind, NoAuth, Session, Token};

const ENDPOINT_OVERRIDE_SUFFIX: &str = "_endpoint_override";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub(crate) struct Auth {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) token: Option<String>,
}

/// Cloud configuration.
///
/// This is a source from which sessions and authentications can be created.
/// It can be loaded from a `clouds.yaml` configuration file or from environment variables.
/// Additionally, the configuration can be serialized and deserialized.
///
/// Two authentication types are understood: `none` (requests are sent as they are) and `token`
/// (a pre-issued token is sent in the `X-Auth-Token` header). Options ending in
/// `_endpoint_override` provide per-service endpoints.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[cfg_attr(test, derive(PartialEq))]
pub struct CloudConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) auth: Option<Auth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) auth_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) cacert: Option<String>,
    #[serde(flatten)]
    pub(crate) options: HashMap<String, serde_yaml::Value>,
}

#[inline]
fn require(value: Option<String>, message: &str) -> Result<String, Error> {
    value.ok_or_else(|| Error::new(ErrorKind::InvalidConfig, message))
}

impl Auth {
    fn create_none_auth(self) -> Result<NoAuth, Error> {
        if let Some(endpoint) = self.endpoint {
            NoAuth::new(&endpoint)
        } else {
            Ok(NoAuth::new_without_endpoint())
        }
    }

    fn create_token_auth(self) -> Result<Token, Error> {
        let token = require(self.token, "Token authentication requires a token")?;
        let auth = Token::new(token);
        if let Some(endpoint) = self.endpoint {
            auth.with_default_endpoint(&endpoint)
        } else {
            Ok(auth)
        }
    }

    fn create_auth(self, auth_type: Option<String>) -> Result<Arc<dyn AuthType>, Error> {
        let auth_type = auth_type.unwrap_or_else(|| {
            if self.token.is_some() {
                "token"
            } else {
                "none"
            }
            .into()
        });

        Ok(match auth_type.as_str() {
            "token" => Arc::new(self.create_token_auth()?),
            "none" => Arc::new(self.create_none_auth()?),
            _ => {
                return Err(Error::new(
                    ErrorKind::InvalidConfig,
                    format!("Unsupported authentication type: {}", auth_type),
                ))
            }
        })
    }
}

// This structure is not strictly necessary but very handy for unit tests.
#[derive(Debug)]
pub(crate) struct SessionConfig {
    pub(crate) client: AuthenticatedClient,
    pub(crate) endpoint_overrides: HashMap<String, Url>,
}

impl CloudConfig {
    /// Create a cloud config from the configuration file.
    ///
    /// `clouds.yaml` is searched for in the current directory, then in
    /// `~/.config/openstack/` and finally in `/etc/openstack/`. Values from
    /// `secure.yaml` and profiles from `clouds-public.yaml` are merged in.
    pub fn from_config<S: AsRef<str>>(cloud_name: S) -> Result<CloudConfig, Error> {
        config::from_config(cloud_name.as_ref())
    }

    /// Create a cloud config from environment variables.
    ///
    /// Understands `OS_CLOUD` (delegates to [from_config](#method.from_config)),
    /// `OS_AUTH_TYPE`, `OS_TOKEN`, `OS_ENDPOINT`, `OS_CACERT` and
    /// `OS_<SERVICE>_ENDPOINT_OVERRIDE`.
    pub fn from_env() -> Result<CloudConfig, Error> {
        env::from_env()
    }

    fn create_endpoint_overrides(&self) -> Result<HashMap<String, Url>, Error> {
        let mut result = HashMap::with_capacity(self.options.len());
        for (key, value) in &self.options {
            if let Some(service_type) = key.strip_suffix(ENDPOINT_OVERRIDE_SUFFIX) {
                let value = value.as_str().ok_or_else(|| {
                    Error::new(
                        ErrorKind::InvalidConfig,
                        format!("{} must be a string, got {:?}", key, value),
                    )
                })?;
                let url = Url::parse(value).map_err(|e| {
                    Error::new(
                        ErrorKind::InvalidConfig,
                        format!("Invalid {} `{}`: {}", key, value, e),
                    )
                })?;
                debug!("Endpoint override for {}: {}", service_type, url);
                // Service types like load-balancer cannot be spelled in variable names
                let with_dashes = service_type.replace('_', "-");
                let _ = result.insert(with_dashes, url.clone());
                let _ = result.insert(service_type.to_string(), url);
            }
        }
        Ok(result)
    }

    pub(crate) fn create_session_config(self) -> Result<SessionConfig, Error> {
        let endpoint_overrides = self.create_endpoint_overrides()?;
        let auth = self.auth.unwrap_or_default().create_auth(self.auth_type)?;
        let client = AuthenticatedClient::new_internal(super::get_client(self.cacert)?, auth);
        Ok(SessionConfig {
            client,
            endpoint_overrides,
        })
    }

    /// Create a session from this configuration.
    pub fn create_session(self) -> Result<Session, Error> {
        let config = self.create_session_config()?;
        Ok(Session::new_with_authenticated_client(config.client)
            .with_endpoint_overrides(config.endpoint_overrides))
    }

    fn check_auth_type(&self, expected: &str) -> Result<(), Error> {
        match self.auth_type {
            Some(ref auth_type) if auth_type != expected => Err(Error::new(
                ErrorKind::InvalidConfig,
                format!(
                    "Invalid authentication type, expected {}, got {}",
                    expected, auth_type
                ),
            )),
            _ => Ok(()),
        }
    }
}

impl TryFrom<CloudConfig> for Session {
    type Error = Error;

    fn try_from(value: CloudConfig) -> Result<Session, Error> {
        value.create_session()
    }
}

impl TryFrom<CloudConfig> for NoAuth {
    type Error = Error;

    fn try_from(value: CloudConfig) -> Result<NoAuth, Error> {
        value.check_auth_type("none")?;
        value.auth.unwrap_or_default().create_none_auth()
    }
}

impl TryFrom<CloudConfig> for Token {
    type Error = Error;

    fn try_from(value: CloudConfig) -> Result<Token, Error> {
        value.check_auth_type("token")?;
        value.auth.unwrap_or_default().create_token_auth()
    }
}
