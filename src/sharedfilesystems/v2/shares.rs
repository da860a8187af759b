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

//! Shares.

use std::collections::{BTreeMap, HashMap};
use std::iter;

use chrono::{DateTime, Utc};
use log::{debug, trace};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::common::{deserialize_optional_timestamp, extract_into, null_as_default, Link, SortDir};
use crate::pagination::{MarkerPage, Pager, Resource};
use crate::params::{
    append_repeated, build_query_string, build_request_body, require, ToBody, ToQuery,
};
use crate::services::SharedFileSystemsService;
use crate::{Adapter, Error, ErrorKind, Waiter};

crate::protocol_enum! {
    #[doc = "Status of a share."]
    #[non_exhaustive]
    enum ShareStatus = Unknown {
        #[doc = "Share is being created."]
        Creating = "creating",
        #[doc = "Share is ready for use."]
        Available = "available",
        #[doc = "Share is being deleted."]
        Deleting = "deleting",
        #[doc = "Share has been deleted."]
        Deleted = "deleted",
        #[doc = "Share creation failed."]
        Error = "error",
        #[doc = "Share deletion failed."]
        ErrorDeleting = "error_deleting",
        #[doc = "Share is being extended."]
        Extending = "extending",
        #[doc = "Share is being shrunk."]
        Shrinking = "shrinking",
        #[doc = "Share is being migrated."]
        Migrating = "migrating",
        #[doc = "Status not known to this library."]
        Unknown = "unknown"
    }
}

impl ShareStatus {
    /// Whether the status means a failed operation.
    pub fn is_error(&self) -> bool {
        matches!(self, ShareStatus::Error | ShareStatus::ErrorDeleting)
    }
}

/// A share.
///
/// Summary listings only contain `id`, `name` and `links`.
#[derive(Clone, Debug, Deserialize)]
pub struct Share {
    /// Availability zone of the share.
    #[serde(default)]
    pub availability_zone: Option<String>,
    /// Share description.
    #[serde(default)]
    pub description: Option<String>,
    /// Description inherited from the block storage API.
    #[serde(default)]
    pub display_description: Option<String>,
    /// Name inherited from the block storage API.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Whether the share has replicas.
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_replicas: bool,
    /// Host of the share.
    #[serde(default)]
    pub host: Option<String>,
    /// Unique ID.
    pub id: String,
    /// Whether the share is visible to all projects.
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_public: bool,
    /// Links to the share.
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: Vec<Link>,
    /// Custom metadata.
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: HashMap<String, String>,
    /// Share name.
    #[serde(default)]
    pub name: Option<String>,
    /// ID of the owning project.
    #[serde(default, deserialize_with = "null_as_default")]
    pub project_id: String,
    /// Replication type.
    #[serde(default)]
    pub replication_type: Option<String>,
    /// ID of the share network.
    #[serde(default)]
    pub share_network_id: Option<String>,
    /// File system protocol, e.g. `NFS`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub share_proto: String,
    /// ID of the share server.
    #[serde(default)]
    pub share_server_id: Option<String>,
    /// ID of the share type.
    #[serde(default)]
    pub share_type: Option<String>,
    /// Name of the share type.
    #[serde(default)]
    pub share_type_name: Option<String>,
    /// Size in GiB.
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: u64,
    /// Snapshot the share was created from.
    #[serde(default)]
    pub snapshot_id: Option<String>,
    /// Current status.
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: ShareStatus,
    /// Task state, used for migrations.
    #[serde(default)]
    pub task_state: Option<String>,
    /// Volume type.
    #[serde(default)]
    pub volume_type: Option<String>,
    /// Consistency group of the share.
    #[serde(default)]
    pub consistency_group_id: Option<String>,
    /// Whether the backend supports snapshots of the share.
    #[serde(default, deserialize_with = "null_as_default")]
    pub snapshot_support: bool,
    /// Consistency group snapshot member the share was created from.
    #[serde(default)]
    pub source_cgsnapshot_member_id: Option<String>,
    /// Creation time.
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Resource for Share {
    const COLLECTION: &'static str = "shares";
}

/// A page of shares.
///
/// Shares are paginated by `offset` and `limit`.
pub type SharePage = MarkerPage<Share>;

/// Filtering and sorting of shares.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ListOpts {
    /// Maximum number of shares per page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Number of shares to skip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    /// List shares of all projects (admin only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_tenants: Option<bool>,
    /// Filter by name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Filter by status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ShareStatus>,
    /// Filter by share server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_server_id: Option<String>,
    /// Filter by metadata.
    #[serde(skip)]
    pub metadata: BTreeMap<String, String>,
    /// Filter by share type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_type_id: Option<String>,
    /// Field to sort by.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    /// Sorting direction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_dir: Option<SortDir>,
    /// Filter by source snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    /// Filter by share network.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_network_id: Option<String>,
    /// Filter by project (admin only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Filter by visibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    /// Filter by consistency group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistency_group_id: Option<String>,
}

impl ToQuery for ListOpts {
    fn to_query(&self) -> Result<String, Error> {
        let mut query = build_query_string(self)?;
        if !self.metadata.is_empty() {
            // Manila expects the filter as a serialized dictionary.
            let metadata = serde_json::to_string(&self.metadata)?;
            append_repeated(&mut query, "metadata", iter::once(metadata));
        }
        Ok(query)
    }
}

/// Share creation options.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CreateOpts {
    /// File system protocol, e.g. `NFS` or `CIFS`.
    pub share_proto: String,
    /// Size in GiB.
    pub size: u32,
    /// Share name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Share description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Name for compatibility with the block storage API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Description for compatibility with the block storage API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_description: Option<String>,
    /// Share type name or ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_type: Option<String>,
    /// Deprecated alias of `share_type`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,
    /// Snapshot to create the share from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    /// Whether the share is visible to all projects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    /// Custom metadata.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    /// Share network to use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_network_id: Option<String>,
    /// Consistency group to create the share in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistency_group_id: Option<String>,
    /// Availability zone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
}

impl ToBody for CreateOpts {
    fn to_body(&self) -> Result<serde_json::Value, Error> {
        require("share_proto", &self.share_proto)?;
        if self.size == 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Missing input for argument [size]",
            ));
        }
        build_request_body(self, Some("share"))
    }
}

/// List shares.
///
/// With `detail` set to `true` all fields of shares are returned, otherwise only their IDs,
/// names and links.
pub fn list<Q: ToQuery>(
    adapter: &Adapter<SharedFileSystemsService>,
    opts: Q,
    detail: bool,
) -> Pager<SharePage> {
    if detail {
        adapter.pager(&["shares", "detail"], opts)
    } else {
        adapter.pager(&["shares"], opts)
    }
}

/// Create a share.
pub async fn create<B: ToBody>(
    adapter: &Adapter<SharedFileSystemsService>,
    opts: B,
) -> Result<Share, Error> {
    let body = opts.to_body()?;
    trace!("Creating a share with {}", body);
    let result = adapter
        .post(&["shares"])?
        .json(&body)
        .expect_status(&[StatusCode::OK, StatusCode::CREATED])
        .fetch_json()
        .await?;
    let share: Share = extract_into(result, Some("share"))?;
    debug!("Created share {}", share.id);
    Ok(share)
}

/// Get a share by its ID.
pub async fn get(adapter: &Adapter<SharedFileSystemsService>, id: &str) -> Result<Share, Error> {
    trace!("Fetching share {}", id);
    let result = adapter.get(&["shares", id])?.fetch_json().await?;
    extract_into(result, Some("share"))
}

/// Delete a share.
///
/// The share is deleted asynchronously, use [wait_for_status](fn.wait_for_status.html) with
/// `ShareStatus::Deleted` to wait for it to disappear.
pub async fn delete(adapter: &Adapter<SharedFileSystemsService>, id: &str) -> Result<(), Error> {
    debug!("Deleting share {}", id);
    let _ = adapter
        .delete(&["shares", id])?
        .expect_status(&[StatusCode::ACCEPTED])
        .send()
        .await?;
    Ok(())
}

/// Wait for a share to reach the given status.
///
/// Waiting for `Deleted` succeeds once the share is gone. Error statuses are a failure unless
/// one of them is expected.
pub async fn wait_for_status<W: Into<Waiter>>(
    adapter: &Adapter<SharedFileSystemsService>,
    id: &str,
    status: ShareStatus,
    waiter: W,
) -> Result<(), Error> {
    waiter
        .into()
        .wait(|| async move {
            match get(adapter, id).await {
                Ok(share) if share.status == status => Ok(true),
                Ok(share) if share.status.is_error() => Err(Error::new(
                    ErrorKind::OperationFailed,
                    format!("Share {} got into the {} state", id, share.status),
                )),
                Ok(share) => {
                    debug!("Share {} is {}, waiting for {}", id, share.status, status);
                    Ok(false)
                }
                Err(err) if err.is_not_found() && status == ShareStatus::Deleted => Ok(true),
                Err(err) => Err(err),
            }
        })
        .await
}
