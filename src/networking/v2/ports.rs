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

//! Ports.
//!
//! Extensions add fields to ports. Decode them with the `_into` variants and an
//! [Extended](../../../common/struct.Extended.html) structure:
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), oscloud::Error> {
//! use oscloud::common::Extended;
//! use oscloud::networking::v2::extensions::portsecurity::PortSecurityExt;
//! use oscloud::networking::v2::ports::{self, Port};
//!
//! let session = oscloud::Session::from_env()?;
//! let network = session.adapter(oscloud::services::NETWORK)?;
//! let port: Extended<Port, PortSecurityExt> =
//!     ports::get_into(&network, "46d4bfb9-b26e-41f3-bd2e-e6dcc1ccedb2").await?;
//! println!("Port security: {:?}", port.extension.port_security_enabled);
//! # Ok(()) }
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{debug, trace};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::{deserialize_optional_timestamp, extract_into, null_as_default, SortDir};
use crate::pagination::{LinkedPage, Pager, Resource};
use crate::params::{
    append_repeated, build_query_string, build_request_body, insert_into_body, require, ToBody,
    ToQuery,
};
use crate::services::NetworkService;
use crate::{Adapter, Error};

const ROOT: &str = "port";

crate::protocol_enum! {
    #[doc = "Status of a port."]
    #[non_exhaustive]
    enum PortStatus = Unknown {
        #[doc = "Port is active."]
        Active = "ACTIVE",
        #[doc = "Port is being built."]
        Build = "BUILD",
        #[doc = "Port is down."]
        Down = "DOWN",
        #[doc = "Port is in an error state."]
        Error = "ERROR",
        #[doc = "Status does not apply to this port."]
        NotApplicable = "N/A",
        #[doc = "Status not known to this library."]
        Unknown = "UNKNOWN"
    }
}

/// A fixed IP address of a port.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct IP {
    /// Subnet of the address.
    pub subnet_id: String,
    /// IP address, allocated automatically if empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip_address: String,
}

/// An additional address pair allowed to pass through a port.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AddressPair {
    /// IP address or CIDR.
    pub ip_address: String,
    /// MAC address, the port's MAC address if empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mac_address: String,
}

/// A network port.
#[derive(Clone, Debug, Deserialize)]
pub struct Port {
    /// Unique ID.
    pub id: String,
    /// Network the port belongs to.
    pub network_id: String,
    /// Port name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Port description.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Administrative state.
    #[serde(default)]
    pub admin_state_up: bool,
    /// Current status.
    #[serde(default)]
    pub status: PortStatus,
    /// MAC address.
    #[serde(default, deserialize_with = "null_as_default")]
    pub mac_address: String,
    /// Fixed IP addresses.
    #[serde(default, deserialize_with = "null_as_default")]
    pub fixed_ips: Vec<IP>,
    /// Owning project (legacy name).
    #[serde(default, deserialize_with = "null_as_default")]
    pub tenant_id: String,
    /// Owning project.
    #[serde(default, deserialize_with = "null_as_default")]
    pub project_id: String,
    /// Entity using the port, e.g. `network:router_interface`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub device_owner: String,
    /// Security groups applied to the port.
    #[serde(default, deserialize_with = "null_as_default")]
    pub security_groups: Vec<String>,
    /// ID of the device using the port.
    #[serde(default, deserialize_with = "null_as_default")]
    pub device_id: String,
    /// Additional allowed address pairs.
    #[serde(default, deserialize_with = "null_as_default")]
    pub allowed_address_pairs: Vec<AddressPair>,
    /// Tags.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    /// Whether the uplink status is propagated to the port.
    #[serde(default, deserialize_with = "null_as_default")]
    pub propagate_uplink_status: bool,
    /// Incremented on every change.
    #[serde(default)]
    pub revision_number: u64,
    /// Creation time.
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Resource for Port {
    const COLLECTION: &'static str = "ports";
}

/// A page of ports.
pub type PortPage = LinkedPage<Port>;

/// Filter on fixed IP addresses.
#[derive(Clone, Debug, Default)]
pub struct FixedIpOpts {
    /// Exact IP address.
    pub ip_address: Option<String>,
    /// Substring of an IP address.
    pub ip_address_substr: Option<String>,
    /// Subnet of an IP address.
    pub subnet_id: Option<String>,
}

/// Filtering and sorting of ports.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ListOpts {
    /// Filter by status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PortStatus>,
    /// Filter by name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Filter by description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Filter by administrative state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_state_up: Option<bool>,
    /// Filter by network.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,
    /// Filter by project (legacy name).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Filter by project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Filter by the device owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_owner: Option<String>,
    /// Filter by MAC address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    /// Filter by ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Filter by the device ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Maximum number of ports per page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// ID of the last port of the previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Field to sort by.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    /// Sorting direction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_dir: Option<SortDir>,
    /// Ports with all of these comma-separated tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    /// Ports with any of these comma-separated tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags_any: Option<String>,
    /// Ports without all of these comma-separated tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_tags: Option<String>,
    /// Ports without any of these comma-separated tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_tags_any: Option<String>,
    /// Filter by security groups.
    #[serde(skip)]
    pub security_groups: Vec<String>,
    /// Filter by fixed IP addresses.
    #[serde(skip)]
    pub fixed_ips: Vec<FixedIpOpts>,
}

impl ToQuery for ListOpts {
    fn to_query(&self) -> Result<String, Error> {
        let mut query = build_query_string(self)?;
        append_repeated(&mut query, "security_groups", &self.security_groups);
        let fixed_ips = self.fixed_ips.iter().flat_map(|item| {
            [
                ("ip_address", &item.ip_address),
                ("ip_address_substr", &item.ip_address_substr),
                ("subnet_id", &item.subnet_id),
            ]
            .into_iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| format!("{}={}", key, v)))
        });
        append_repeated(&mut query, "fixed_ips", fixed_ips);
        Ok(query)
    }
}

/// Port creation options.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CreateOpts {
    /// Network to create the port on.
    pub network_id: String,
    /// Port name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Port description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Administrative state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_state_up: Option<bool>,
    /// MAC address, generated if missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    /// Fixed IP addresses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_ips: Option<Vec<IP>>,
    /// ID of the device using the port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Entity using the port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_owner: Option<String>,
    /// Owning project (legacy name, admin only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Owning project (admin only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Security groups, an empty list disables the default group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_groups: Option<Vec<String>>,
    /// Additional allowed address pairs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_address_pairs: Vec<AddressPair>,
    /// Whether the uplink status is propagated to the port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub propagate_uplink_status: Option<bool>,
    /// Free-form fields not covered by this structure.
    ///
    /// Overriding one of the known fields is an error.
    #[serde(skip)]
    pub value_specs: HashMap<String, String>,
}

fn add_value_specs(body: &mut Value, value_specs: &HashMap<String, String>) -> Result<(), Error> {
    for (key, value) in value_specs {
        insert_into_body(body, Some(ROOT), key, Value::String(value.clone()))?;
    }
    Ok(())
}

impl ToBody for CreateOpts {
    fn to_body(&self) -> Result<Value, Error> {
        require("network_id", &self.network_id)?;
        let mut body = build_request_body(self, Some(ROOT))?;
        add_value_specs(&mut body, &self.value_specs)?;
        Ok(body)
    }
}

/// Port update options.
///
/// `None` leaves a field unchanged while an empty list clears it.
#[derive(Clone, Debug, Default, Serialize)]
pub struct UpdateOpts {
    /// Port name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Port description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Administrative state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_state_up: Option<bool>,
    /// Fixed IP addresses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_ips: Option<Vec<IP>>,
    /// ID of the device using the port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Entity using the port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_owner: Option<String>,
    /// Security groups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_groups: Option<Vec<String>>,
    /// Additional allowed address pairs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_address_pairs: Option<Vec<AddressPair>>,
    /// Whether the uplink status is propagated to the port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub propagate_uplink_status: Option<bool>,
    /// Free-form fields not covered by this structure.
    #[serde(skip)]
    pub value_specs: HashMap<String, String>,
    /// Only update the port if its revision number matches.
    ///
    /// Sent as the `If-Match` header.
    #[serde(skip)]
    pub revision_number: Option<u64>,
}

impl ToBody for UpdateOpts {
    fn to_body(&self) -> Result<Value, Error> {
        let mut body = build_request_body(self, Some(ROOT))?;
        add_value_specs(&mut body, &self.value_specs)?;
        Ok(body)
    }
}

/// Options of a port update.
pub trait PortUpdate: ToBody {
    /// Revision number for a conditional update.
    fn revision_number(&self) -> Option<u64> {
        None
    }
}

impl PortUpdate for UpdateOpts {
    fn revision_number(&self) -> Option<u64> {
        self.revision_number
    }
}

impl PortUpdate for Value {}

impl<T: PortUpdate + ?Sized> PortUpdate for &T {
    fn revision_number(&self) -> Option<u64> {
        (**self).revision_number()
    }
}

/// List ports.
pub fn list<Q: ToQuery>(adapter: &Adapter<NetworkService>, opts: Q) -> Pager<PortPage> {
    adapter.pager(&["ports"], opts)
}

/// Get a port by its ID.
#[inline]
pub async fn get(adapter: &Adapter<NetworkService>, id: &str) -> Result<Port, Error> {
    get_into(adapter, id).await
}

/// Get a port by its ID, decoding it into a custom structure.
pub async fn get_into<T: DeserializeOwned>(
    adapter: &Adapter<NetworkService>,
    id: &str,
) -> Result<T, Error> {
    trace!("Fetching port {}", id);
    let body = adapter.get(&["ports", id])?.fetch_json().await?;
    extract_into(body, Some(ROOT))
}

/// Create a port.
#[inline]
pub async fn create<B: ToBody>(adapter: &Adapter<NetworkService>, opts: B) -> Result<Port, Error> {
    create_into(adapter, opts).await
}

/// Create a port, decoding the result into a custom structure.
pub async fn create_into<T: DeserializeOwned, B: ToBody>(
    adapter: &Adapter<NetworkService>,
    opts: B,
) -> Result<T, Error> {
    let body = opts.to_body()?;
    trace!("Creating a port with {}", body);
    let result = adapter
        .post(&["ports"])?
        .json(&body)
        .expect_status(&[StatusCode::CREATED])
        .fetch_json()
        .await?;
    debug!("Created a port on network {}", body[ROOT]["network_id"]);
    extract_into(result, Some(ROOT))
}

/// Update a port.
#[inline]
pub async fn update<B: PortUpdate>(
    adapter: &Adapter<NetworkService>,
    id: &str,
    opts: B,
) -> Result<Port, Error> {
    update_into(adapter, id, opts).await
}

/// Update a port, decoding the result into a custom structure.
pub async fn update_into<T: DeserializeOwned, B: PortUpdate>(
    adapter: &Adapter<NetworkService>,
    id: &str,
    opts: B,
) -> Result<T, Error> {
    let body = opts.to_body()?;
    trace!("Updating port {} with {}", id, body);
    let mut request = adapter
        .put(&["ports", id])?
        .json(&body)
        .expect_status(&[StatusCode::OK, StatusCode::CREATED]);
    if let Some(revision) = opts.revision_number() {
        request = request.header("If-Match", format!("revision_number={}", revision));
    }
    let result = request.fetch_json().await?;
    debug!("Updated port {}", id);
    extract_into(result, Some(ROOT))
}

/// Delete a port.
pub async fn delete(adapter: &Adapter<NetworkService>, id: &str) -> Result<(), Error> {
    debug!("Deleting port {}", id);
    let _ = adapter
        .delete(&["ports", id])?
        .expect_status(&[StatusCode::NO_CONTENT])
        .send()
        .await?;
    Ok(())
}
