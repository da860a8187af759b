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

//! Octavia load balancers.
//!
//! Changes are applied asynchronously: `create`, `update`, `delete` and `failover` leave the
//! load balancer in one of the `PENDING_*` provisioning statuses. Use
//! [wait_for_provisioning_status](fn.wait_for_provisioning_status.html) to wait for them.

use chrono::{DateTime, Utc};
use log::{debug, trace};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::{deserialize_optional_timestamp, extract_into, null_as_default, SortDir};
use crate::pagination::{LinkedPage, Pager, Resource};
use crate::params::{build_query_string, build_request_body, ToBody, ToQuery};
use crate::services::LoadBalancerService;
use crate::{Adapter, Error, ErrorKind, Waiter};

crate::protocol_enum! {
    #[doc = "Provisioning status of a load balancer or its children."]
    #[non_exhaustive]
    enum ProvisioningStatus = Unknown {
        #[doc = "Provisioned and ready."]
        Active = "ACTIVE",
        #[doc = "Deleted."]
        Deleted = "DELETED",
        #[doc = "Provisioning failed."]
        Error = "ERROR",
        #[doc = "Being created."]
        PendingCreate = "PENDING_CREATE",
        #[doc = "Being updated."]
        PendingUpdate = "PENDING_UPDATE",
        #[doc = "Being deleted."]
        PendingDelete = "PENDING_DELETE",
        #[doc = "Status not known to this library."]
        Unknown = "UNKNOWN"
    }
}

impl ProvisioningStatus {
    /// Whether a change is still being applied.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            ProvisioningStatus::PendingCreate
                | ProvisioningStatus::PendingUpdate
                | ProvisioningStatus::PendingDelete
        )
    }
}

crate::protocol_enum! {
    #[doc = "Observed operating status of a load balancer or its children."]
    #[non_exhaustive]
    enum OperatingStatus = Unknown {
        #[doc = "Operating normally."]
        Online = "ONLINE",
        #[doc = "Administratively disabled."]
        Offline = "OFFLINE",
        #[doc = "Some members are in an error state."]
        Degraded = "DEGRADED",
        #[doc = "Operating in an error state."]
        Error = "ERROR",
        #[doc = "Not accepting new connections."]
        Draining = "DRAINING",
        #[doc = "No health monitor is configured."]
        NoMonitor = "NO_MONITOR",
        #[doc = "Status not known to this library."]
        Unknown = "UNKNOWN"
    }
}

/// An additional virtual IP of a load balancer.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AdditionalVip {
    /// Subnet of the address.
    pub subnet_id: String,
    /// The address, allocated from the subnet if empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip_address: String,
}

/// A load balancer.
#[derive(Clone, Debug, Deserialize)]
pub struct LoadBalancer {
    /// Unique ID.
    pub id: String,
    /// ID of the owning project.
    #[serde(default)]
    pub project_id: String,
    /// Creation time.
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Human-readable name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Human-readable description.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Subnet of the virtual IP.
    #[serde(default, deserialize_with = "null_as_default")]
    pub vip_subnet_id: String,
    /// The virtual IP address.
    #[serde(default, deserialize_with = "null_as_default")]
    pub vip_address: String,
    /// Neutron port of the virtual IP.
    #[serde(default, deserialize_with = "null_as_default")]
    pub vip_port_id: String,
    /// Network of the virtual IP.
    #[serde(default, deserialize_with = "null_as_default")]
    pub vip_network_id: String,
    /// Flavor of the load balancer.
    #[serde(default, deserialize_with = "null_as_default")]
    pub flavor_id: String,
    /// Availability zone.
    #[serde(default, deserialize_with = "null_as_default")]
    pub availability_zone: String,
    /// Provider driver, e.g. `amphora` or `ovn`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub provider: String,
    /// Administrative state.
    #[serde(default)]
    pub admin_state_up: bool,
    /// Provisioning status.
    #[serde(default)]
    pub provisioning_status: ProvisioningStatus,
    /// Operating status.
    #[serde(default)]
    pub operating_status: OperatingStatus,
    /// Tags.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    /// Additional virtual IPs.
    #[serde(default, deserialize_with = "null_as_default")]
    pub additional_vips: Vec<AdditionalVip>,
}

impl Resource for LoadBalancer {
    const COLLECTION: &'static str = "loadbalancers";
}

/// A page of load balancers.
pub type LoadBalancerPage = LinkedPage<LoadBalancer>;

/// Status of a health monitor in a status tree.
#[derive(Clone, Debug, Deserialize)]
pub struct MonitorStatus {
    /// Unique ID.
    pub id: String,
    /// Monitor type, e.g. `PING` or `HTTP`.
    #[serde(rename = "type", default)]
    pub monitor_type: String,
    /// Provisioning status.
    #[serde(default)]
    pub provisioning_status: ProvisioningStatus,
    /// Operating status.
    #[serde(default)]
    pub operating_status: OperatingStatus,
}

/// Status of a pool member in a status tree.
#[derive(Clone, Debug, Deserialize)]
pub struct MemberStatus {
    /// Unique ID.
    pub id: String,
    /// Human-readable name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Address of the backend.
    #[serde(default)]
    pub address: String,
    /// Port of the backend.
    #[serde(default)]
    pub protocol_port: u16,
    /// Provisioning status.
    #[serde(default)]
    pub provisioning_status: ProvisioningStatus,
    /// Operating status.
    #[serde(default)]
    pub operating_status: OperatingStatus,
}

/// Status of a pool in a status tree.
#[derive(Clone, Debug, Deserialize)]
pub struct PoolStatus {
    /// Unique ID.
    pub id: String,
    /// Human-readable name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Provisioning status.
    #[serde(default)]
    pub provisioning_status: ProvisioningStatus,
    /// Operating status.
    #[serde(default)]
    pub operating_status: OperatingStatus,
    /// Health monitor of the pool.
    #[serde(default, rename = "healthmonitor")]
    pub health_monitor: Option<MonitorStatus>,
    /// Pool members.
    #[serde(default, deserialize_with = "null_as_default")]
    pub members: Vec<MemberStatus>,
}

/// Status of a listener in a status tree.
#[derive(Clone, Debug, Deserialize)]
pub struct ListenerStatus {
    /// Unique ID.
    pub id: String,
    /// Human-readable name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Provisioning status.
    #[serde(default)]
    pub provisioning_status: ProvisioningStatus,
    /// Operating status.
    #[serde(default)]
    pub operating_status: OperatingStatus,
    /// Pools of the listener.
    #[serde(default, deserialize_with = "null_as_default")]
    pub pools: Vec<PoolStatus>,
}

/// Status of a load balancer in a status tree.
#[derive(Clone, Debug, Deserialize)]
pub struct LoadBalancerStatus {
    /// Unique ID.
    pub id: String,
    /// Human-readable name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Provisioning status.
    #[serde(default)]
    pub provisioning_status: ProvisioningStatus,
    /// Operating status.
    #[serde(default)]
    pub operating_status: OperatingStatus,
    /// Listeners of the load balancer.
    #[serde(default, deserialize_with = "null_as_default")]
    pub listeners: Vec<ListenerStatus>,
}

/// Statuses of a load balancer and all its children.
#[derive(Clone, Debug, Deserialize)]
pub struct StatusTree {
    /// The load balancer itself.
    #[serde(default)]
    pub loadbalancer: Option<LoadBalancerStatus>,
}

/// Traffic statistics of a load balancer.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Stats {
    /// Currently open connections.
    #[serde(default)]
    pub active_connections: u64,
    /// Bytes received.
    #[serde(default)]
    pub bytes_in: u64,
    /// Bytes sent.
    #[serde(default)]
    pub bytes_out: u64,
    /// Requests that could not be fulfilled.
    #[serde(default)]
    pub request_errors: u64,
    /// Connections handled in total.
    #[serde(default)]
    pub total_connections: u64,
}

/// Filtering and sorting of load balancers.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ListOpts {
    /// Maximum number of load balancers per page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// ID of the last load balancer of the previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Field to sort by.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    /// Sorting direction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_dir: Option<SortDir>,
    /// Filter by ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Filter by name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Filter by description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Filter by project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Filter by the administrative state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_state_up: Option<bool>,
    /// Filter by the provisioning status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_status: Option<ProvisioningStatus>,
    /// Filter by the operating status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_status: Option<OperatingStatus>,
    /// Filter by the virtual IP address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vip_address: Option<String>,
    /// Filter by the virtual IP port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vip_port_id: Option<String>,
    /// Filter by the virtual IP subnet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vip_subnet_id: Option<String>,
    /// Filter by the virtual IP network.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vip_network_id: Option<String>,
    /// Filter by flavor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavor_id: Option<String>,
    /// Filter by availability zone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    /// Filter by provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Load balancers with all of these comma-separated tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    /// Load balancers with any of these comma-separated tags.
    #[serde(rename = "tags-any", skip_serializing_if = "Option::is_none")]
    pub tags_any: Option<String>,
    /// Load balancers without all of these comma-separated tags.
    #[serde(rename = "not-tags", skip_serializing_if = "Option::is_none")]
    pub not_tags: Option<String>,
    /// Load balancers without any of these comma-separated tags.
    #[serde(rename = "not-tags-any", skip_serializing_if = "Option::is_none")]
    pub not_tags_any: Option<String>,
}

impl ToQuery for ListOpts {
    fn to_query(&self) -> Result<String, Error> {
        build_query_string(self)
    }
}

/// Load balancer creation options.
///
/// One of `vip_subnet_id`, `vip_network_id` or `vip_port_id` is required.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CreateOpts {
    /// Human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Port to use for the virtual IP.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vip_port_id: Option<String>,
    /// Subnet to allocate the virtual IP from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vip_subnet_id: Option<String>,
    /// Network to allocate the virtual IP from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vip_network_id: Option<String>,
    /// Fixed virtual IP address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vip_address: Option<String>,
    /// Owning project (admin only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Flavor of the load balancer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavor_id: Option<String>,
    /// Availability zone to create the load balancer in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    /// Provider driver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Administrative state, up by default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_state_up: Option<bool>,
    /// Tags to assign.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Additional virtual IPs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional_vips: Vec<AdditionalVip>,
}

impl ToBody for CreateOpts {
    fn to_body(&self) -> Result<Value, Error> {
        if self.vip_port_id.is_none()
            && self.vip_subnet_id.is_none()
            && self.vip_network_id.is_none()
        {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "One of vip_port_id, vip_subnet_id or vip_network_id is required",
            ));
        }
        build_request_body(self, Some("loadbalancer"))
    }
}

/// Load balancer update options.
#[derive(Clone, Debug, Default, Serialize)]
pub struct UpdateOpts {
    /// Human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Administrative state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_state_up: Option<bool>,
    /// Replaces all tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl ToBody for UpdateOpts {
    fn to_body(&self) -> Result<Value, Error> {
        build_request_body(self, Some("loadbalancer"))
    }
}

/// Load balancer deletion options.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct DeleteOpts {
    /// Delete all children (listeners, pools, members) as well.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cascade: bool,
}

impl ToQuery for DeleteOpts {
    fn to_query(&self) -> Result<String, Error> {
        build_query_string(self)
    }
}

/// List load balancers.
pub fn list<Q: ToQuery>(
    adapter: &Adapter<LoadBalancerService>,
    opts: Q,
) -> Pager<LoadBalancerPage> {
    adapter.pager(&["lbaas", "loadbalancers"], opts)
}

/// Get a load balancer by its ID.
pub async fn get(adapter: &Adapter<LoadBalancerService>, id: &str) -> Result<LoadBalancer, Error> {
    trace!("Fetching load balancer {}", id);
    let result = adapter
        .get(&["lbaas", "loadbalancers", id])?
        .fetch_json()
        .await?;
    extract_into(result, Some("loadbalancer"))
}

/// Create a load balancer.
pub async fn create<B: ToBody>(
    adapter: &Adapter<LoadBalancerService>,
    opts: B,
) -> Result<LoadBalancer, Error> {
    let body = opts.to_body()?;
    trace!("Creating a load balancer with {}", body);
    let result = adapter
        .post(&["lbaas", "loadbalancers"])?
        .json(&body)
        .expect_status(&[StatusCode::CREATED, StatusCode::ACCEPTED])
        .fetch_json()
        .await?;
    let lb: LoadBalancer = extract_into(result, Some("loadbalancer"))?;
    debug!("Created load balancer {}", lb.id);
    Ok(lb)
}

/// Update a load balancer.
pub async fn update<B: ToBody>(
    adapter: &Adapter<LoadBalancerService>,
    id: &str,
    opts: B,
) -> Result<LoadBalancer, Error> {
    let body = opts.to_body()?;
    trace!("Updating load balancer {} with {}", id, body);
    let result = adapter
        .put(&["lbaas", "loadbalancers", id])?
        .json(&body)
        .expect_status(&[StatusCode::OK, StatusCode::ACCEPTED])
        .fetch_json()
        .await?;
    extract_into(result, Some("loadbalancer"))
}

/// Delete a load balancer.
///
/// Without `cascade` the load balancer must not have any listeners or pools.
pub async fn delete(
    adapter: &Adapter<LoadBalancerService>,
    id: &str,
    opts: DeleteOpts,
) -> Result<(), Error> {
    debug!("Deleting load balancer {} (cascade: {})", id, opts.cascade);
    let _ = adapter
        .delete(&["lbaas", "loadbalancers", id])?
        .query(&opts)
        .expect_status(&[StatusCode::NO_CONTENT])
        .send()
        .await?;
    Ok(())
}

/// Get the status tree of a load balancer.
pub async fn get_statuses(
    adapter: &Adapter<LoadBalancerService>,
    id: &str,
) -> Result<StatusTree, Error> {
    let result = adapter
        .get(&["lbaas", "loadbalancers", id, "status"])?
        .fetch_json()
        .await?;
    extract_into(result, Some("statuses"))
}

/// Get traffic statistics of a load balancer.
pub async fn get_stats(adapter: &Adapter<LoadBalancerService>, id: &str) -> Result<Stats, Error> {
    let result = adapter
        .get(&["lbaas", "loadbalancers", id, "stats"])?
        .fetch_json()
        .await?;
    extract_into(result, Some("stats"))
}

/// Fail over the amphorae of a load balancer (admin only).
pub async fn failover(adapter: &Adapter<LoadBalancerService>, id: &str) -> Result<(), Error> {
    debug!("Requesting a failover of load balancer {}", id);
    let _ = adapter
        .put(&["lbaas", "loadbalancers", id, "failover"])?
        .expect_status(&[StatusCode::ACCEPTED])
        .send()
        .await?;
    Ok(())
}

/// Wait for a load balancer to reach the given provisioning status.
///
/// Waiting for `Deleted` succeeds once the load balancer is gone. `Error` is a failure unless it
/// is the expected status.
///
/// ```rust,no_run
/// # async fn example() -> Result<(), oscloud::Error> {
/// use std::time::Duration;
///
/// use oscloud::loadbalancer::v2::loadbalancers::{self, ProvisioningStatus};
///
/// let session = oscloud::Session::from_env()?;
/// let lb = session.adapter(oscloud::services::LOAD_BALANCER)?;
/// loadbalancers::wait_for_provisioning_status(
///     &lb,
///     "36e08a3e-a78f-4b40-a229-1e7e23eee1ab",
///     ProvisioningStatus::Active,
///     Duration::from_secs(600),
/// )
/// .await?;
/// # Ok(()) }
/// ```
pub async fn wait_for_provisioning_status<W: Into<Waiter>>(
    adapter: &Adapter<LoadBalancerService>,
    id: &str,
    status: ProvisioningStatus,
    waiter: W,
) -> Result<(), Error> {
    waiter
        .into()
        .wait(|| async move {
            let lb = match get(adapter, id).await {
                Ok(lb) => lb,
                Err(err) if err.is_not_found() && status == ProvisioningStatus::Deleted => {
                    debug!("Load balancer {} has been deleted", id);
                    return Ok(true);
                }
                Err(err) => return Err(err),
            };
            match lb.provisioning_status {
                current if current == status => Ok(true),
                ProvisioningStatus::Error => Err(Error::new(
                    ErrorKind::OperationFailed,
                    format!("Load balancer {} got into the ERROR state", id),
                )),
                current => {
                    debug!(
                        "Load balancer {} is {}, waiting for {}",
                        id, current, status
                    );
                    Ok(false)
                }
            }
        })
        .await
}
