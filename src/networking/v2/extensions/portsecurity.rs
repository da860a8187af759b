// Copyright 2024 Dmitry Tantsur <dtantsur@protonmail.com>
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

//! Port security extension.
//!
//! Adds the `port_security_enabled` field to ports. Decode it with
//! `Extended<Port, PortSecurityExt>` and set it by wrapping the port options:
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), oscloud::Error> {
//! use oscloud::common::Extended;
//! use oscloud::networking::v2::extensions::portsecurity::{PortCreateOptsExt, PortSecurityExt};
//! use oscloud::networking::v2::ports::{self, Port};
//!
//! let session = oscloud::Session::from_env()?;
//! let network = session.adapter(oscloud::services::NETWORK)?;
//! let opts = PortCreateOptsExt {
//!     base: ports::CreateOpts {
//!         network_id: "a87cc70a-3e15-4acf-8205-9b711a3531b7".into(),
//!         ..Default::default()
//!     },
//!     port_security_enabled: Some(false),
//! };
//! let port: Extended<Port, PortSecurityExt> = ports::create_into(&network, opts).await?;
//! assert_eq!(port.extension.port_security_enabled, Some(false));
//! # Ok(()) }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::networking::v2::ports::PortUpdate;
use crate::params::{insert_into_body, ToBody};
use crate::Error;

const FIELD: &str = "port_security_enabled";

/// Port security fields of a port.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PortSecurityExt {
    /// Whether port security is enabled, `None` if the extension is not available.
    #[serde(default)]
    pub port_security_enabled: Option<bool>,
}

fn extend(mut body: Value, enabled: Option<bool>) -> Result<Value, Error> {
    if let Some(enabled) = enabled {
        insert_into_body(&mut body, Some("port"), FIELD, Value::Bool(enabled))?;
    }
    Ok(body)
}

/// Port creation options with port security.
#[derive(Clone, Debug, Default)]
pub struct PortCreateOptsExt<B> {
    /// Base creation options.
    pub base: B,
    /// Whether to enable port security.
    pub port_security_enabled: Option<bool>,
}

impl<B: ToBody> ToBody for PortCreateOptsExt<B> {
    fn to_body(&self) -> Result<Value, Error> {
        extend(self.base.to_body()?, self.port_security_enabled)
    }
}

/// Port update options with port security.
#[derive(Clone, Debug, Default)]
pub struct PortUpdateOptsExt<B> {
    /// Base update options.
    pub base: B,
    /// Whether to enable port security.
    pub port_security_enabled: Option<bool>,
}

impl<B: ToBody> ToBody for PortUpdateOptsExt<B> {
    fn to_body(&self) -> Result<Value, Error> {
        extend(self.base.to_body()?, self.port_security_enabled)
    }
}

impl<B: PortUpdate> PortUpdate for PortUpdateOptsExt<B> {
    fn revision_number(&self) -> Option<u64> {
        self.base.revision_number()
    }
}
