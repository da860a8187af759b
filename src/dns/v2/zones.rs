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

//! DNS zones.
//!
//! Designate processes zone changes asynchronously: `create`, `update` and `delete` return the
//! zone in the `PENDING` status. Use [wait_for_status](fn.wait_for_status.html) to wait for
//! the change to propagate.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{debug, trace};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::common::{
    deserialize_optional_timestamp, deserialize_timestamp, null_as_default, SortDir,
};
use crate::pagination::{LinkedPage, NextLink, Pager, Resource};
use crate::params::{build_query_string, build_request_body, require, ToBody, ToQuery};
use crate::services::DnsService;
use crate::{Adapter, Error, ErrorKind, Waiter};

const ALL_PROJECTS_HEADER: &str = "x-auth-all-projects";

crate::protocol_enum! {
    #[doc = "Status of a zone."]
    #[non_exhaustive]
    enum ZoneStatus = Unknown {
        #[doc = "Zone is active."]
        Active = "ACTIVE",
        #[doc = "Zone changes are being applied."]
        Pending = "PENDING",
        #[doc = "Zone is in an error state."]
        Error = "ERROR",
        #[doc = "Zone has been deleted."]
        Deleted = "DELETED",
        #[doc = "Value not known to this library."]
        Unknown = "UNKNOWN"
    }
}

crate::protocol_enum! {
    #[doc = "Action being applied to a zone."]
    #[non_exhaustive]
    enum ZoneAction = Unknown {
        #[doc = "No action in progress."]
        None = "NONE",
        #[doc = "Zone is being created."]
        Create = "CREATE",
        #[doc = "Zone is being updated."]
        Update = "UPDATE",
        #[doc = "Zone is being deleted."]
        Delete = "DELETE",
        #[doc = "Value not known to this library."]
        Unknown = "UNKNOWN"
    }
}

crate::protocol_enum! {
    #[doc = "Type of a zone."]
    enum ZoneType {
        #[doc = "Zone managed by Designate."]
        Primary = "PRIMARY",
        #[doc = "Zone transferred from external masters."]
        Secondary = "SECONDARY"
    }
}

/// A DNS zone.
#[derive(Clone, Debug, Deserialize)]
pub struct Zone {
    /// Unique ID.
    pub id: String,
    /// ID of the pool hosting the zone.
    #[serde(default)]
    pub pool_id: String,
    /// ID of the owning project.
    #[serde(default)]
    pub project_id: String,
    /// Zone name, e.g. `example.org.`.
    pub name: String,
    /// Administrator e-mail.
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    /// Default TTL of records.
    #[serde(default)]
    pub ttl: u32,
    /// Serial number in the SOA record.
    #[serde(default)]
    pub serial: u64,
    /// Current status.
    #[serde(default)]
    pub status: ZoneStatus,
    /// Action currently being applied.
    #[serde(default)]
    pub action: ZoneAction,
    /// Zone description.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Master servers of a secondary zone.
    #[serde(default, deserialize_with = "null_as_default")]
    pub masters: Vec<String>,
    /// Zone type.
    #[serde(rename = "type")]
    pub zone_type: ZoneType,
    /// Scheduling attributes.
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: HashMap<String, String>,
    /// When the zone was last transferred from a master.
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub transferred_at: Option<DateTime<Utc>>,
    /// Incremented on every change.
    #[serde(default)]
    pub version: u64,
    /// Creation time.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    /// Last update time.
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Links to the zone.
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: HashMap<String, String>,
}

impl Resource for Zone {
    const COLLECTION: &'static str = "zones";
    const NEXT_LINK: NextLink = NextLink::Path(&["links", "next"]);
}

/// A page of zones.
pub type ZonePage = LinkedPage<Zone>;

/// A zone shared with another project.
#[derive(Clone, Debug, Deserialize)]
pub struct ZoneShare {
    /// Unique ID of the share.
    pub id: String,
    /// ID of the shared zone.
    pub zone_id: String,
    /// ID of the project owning the zone.
    #[serde(default)]
    pub project_id: String,
    /// ID of the project the zone is shared with.
    pub target_project_id: String,
    /// Creation time.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    /// Last update time.
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Links to the share.
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: HashMap<String, String>,
}

impl Resource for ZoneShare {
    const COLLECTION: &'static str = "shared_zones";
    const NEXT_LINK: NextLink = NextLink::Path(&["links", "next"]);
}

/// A page of zone shares.
pub type ZoneSharePage = LinkedPage<ZoneShare>;

/// Filtering and sorting of zones.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ListOpts {
    /// Maximum number of zones per page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// ID of the last zone of the previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Field to sort by.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    /// Sorting direction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_dir: Option<SortDir>,
    /// Filter by description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Filter by e-mail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Filter by name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Filter by status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ZoneStatus>,
    /// Filter by TTL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// Filter by type.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub zone_type: Option<ZoneType>,
}

impl ToQuery for ListOpts {
    fn to_query(&self) -> Result<String, Error> {
        build_query_string(self)
    }
}

/// Zone creation options.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CreateOpts {
    /// Zone name, must end with a dot.
    pub name: String,
    /// Administrator e-mail, required for primary zones.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Zone type, `PRIMARY` by default.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub zone_type: Option<ZoneType>,
    /// Default TTL of records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// Zone description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Master servers, required for secondary zones.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub masters: Vec<String>,
    /// Scheduling attributes.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
}

impl ToBody for CreateOpts {
    fn to_body(&self) -> Result<serde_json::Value, Error> {
        require("name", &self.name)?;
        build_request_body(self, None)
    }
}

/// Zone update options.
///
/// Only the provided fields are changed.
#[derive(Clone, Debug, Default, Serialize)]
pub struct UpdateOpts {
    /// Administrator e-mail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Default TTL of records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// Master servers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masters: Option<Vec<String>>,
    /// Zone description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ToBody for UpdateOpts {
    fn to_body(&self) -> Result<serde_json::Value, Error> {
        build_request_body(self, None)
    }
}

/// Options for sharing a zone with another project.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ShareZoneOpts {
    /// Project to share the zone with.
    pub target_project_id: String,
}

impl ToBody for ShareZoneOpts {
    fn to_body(&self) -> Result<serde_json::Value, Error> {
        require("target_project_id", &self.target_project_id)?;
        build_request_body(self, None)
    }
}

/// Options for listing zone shares.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ListSharesOpts {
    /// List shares of all projects (admin only).
    ///
    /// Sent as the `X-Auth-All-Projects` header.
    #[serde(skip)]
    pub all_projects: bool,
    /// Filter by the target project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_project_id: Option<String>,
}

impl ToQuery for ListSharesOpts {
    fn to_query(&self) -> Result<String, Error> {
        build_query_string(self)
    }
}

/// List zones.
pub fn list<Q: ToQuery>(adapter: &Adapter<DnsService>, opts: Q) -> Pager<ZonePage> {
    adapter.pager(&["zones"], opts)
}

/// Get a zone by its ID.
pub async fn get(adapter: &Adapter<DnsService>, id: &str) -> Result<Zone, Error> {
    trace!("Fetching zone {}", id);
    adapter.get(&["zones", id])?.fetch_json().await
}

/// Create a zone.
pub async fn create<B: ToBody>(adapter: &Adapter<DnsService>, opts: B) -> Result<Zone, Error> {
    let body = opts.to_body()?;
    trace!("Creating a zone with {}", body);
    let zone: Zone = adapter
        .post(&["zones"])?
        .json(&body)
        .expect_status(&[StatusCode::CREATED, StatusCode::ACCEPTED])
        .fetch_json()
        .await?;
    debug!("Created zone {} ({})", zone.id, zone.name);
    Ok(zone)
}

/// Update a zone.
pub async fn update<B: ToBody>(
    adapter: &Adapter<DnsService>,
    id: &str,
    opts: B,
) -> Result<Zone, Error> {
    let body = opts.to_body()?;
    trace!("Updating zone {} with {}", id, body);
    adapter
        .patch(&["zones", id])?
        .json(&body)
        .expect_status(&[StatusCode::OK, StatusCode::ACCEPTED])
        .fetch_json()
        .await
}

/// Delete a zone.
///
/// Returns the zone with the `DELETE` action pending.
pub async fn delete(adapter: &Adapter<DnsService>, id: &str) -> Result<Zone, Error> {
    debug!("Deleting zone {}", id);
    adapter
        .delete(&["zones", id])?
        .expect_status(&[StatusCode::ACCEPTED])
        .fetch_json()
        .await
}

/// Share a zone with another project.
pub async fn share<B: ToBody>(
    adapter: &Adapter<DnsService>,
    zone_id: &str,
    opts: B,
) -> Result<ZoneShare, Error> {
    let body = opts.to_body()?;
    let share: ZoneShare = adapter
        .post(&["zones", zone_id, "shares"])?
        .json(&body)
        .expect_status(&[StatusCode::CREATED])
        .fetch_json()
        .await?;
    debug!(
        "Shared zone {} with project {}",
        zone_id, share.target_project_id
    );
    Ok(share)
}

/// Stop sharing a zone.
pub async fn unshare(
    adapter: &Adapter<DnsService>,
    zone_id: &str,
    share_id: &str,
) -> Result<(), Error> {
    debug!("Removing share {} of zone {}", share_id, zone_id);
    let _ = adapter
        .delete(&["zones", zone_id, "shares", share_id])?
        .expect_status(&[StatusCode::NO_CONTENT])
        .send()
        .await?;
    Ok(())
}

/// List shares of a zone.
pub fn list_shares(
    adapter: &Adapter<DnsService>,
    zone_id: &str,
    opts: &ListSharesOpts,
) -> Pager<ZoneSharePage> {
    let pager = adapter.pager(&["zones", zone_id, "shares"], opts);
    if opts.all_projects {
        pager.with_header(
            HeaderName::from_static(ALL_PROJECTS_HEADER),
            HeaderValue::from_static("true"),
        )
    } else {
        pager
    }
}

/// Wait for a zone to reach the given status.
///
/// Waiting for `DELETED` succeeds once the zone is gone. The `ERROR` status is a failure
/// unless it is the expected one.
///
/// ```rust,no_run
/// # async fn example() -> Result<(), oscloud::Error> {
/// use std::time::Duration;
///
/// use oscloud::dns::v2::zones::{self, ZoneStatus};
///
/// let session = oscloud::Session::from_env()?;
/// let dns = session.adapter(oscloud::services::DNS)?;
/// let zone = zones::get(&dns, "a86dba58-0043-4cc6-a1bb-69d5e86f3ca3").await?;
/// zones::wait_for_status(&dns, &zone.id, ZoneStatus::Active, Duration::from_secs(300)).await?;
/// # Ok(()) }
/// ```
pub async fn wait_for_status<W: Into<Waiter>>(
    adapter: &Adapter<DnsService>,
    id: &str,
    status: ZoneStatus,
    waiter: W,
) -> Result<(), Error> {
    waiter
        .into()
        .wait(|| async move {
            let zone = match get(adapter, id).await {
                Ok(zone) => zone,
                Err(err) if err.is_not_found() && status == ZoneStatus::Deleted => {
                    debug!("Zone {} has been deleted", id);
                    return Ok(true);
                }
                Err(err) => return Err(err),
            };
            if zone.status == status {
                Ok(true)
            } else if zone.status == ZoneStatus::Error {
                Err(Error::new(
                    ErrorKind::OperationFailed,
                    format!("Zone {} got into the ERROR state", id),
                ))
            } else {
                debug!("Zone {} is {}, waiting for {}", id, zone.status, status);
                Ok(false)
            }
        })
        .await
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use serde_json::{json, Value};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::adapter::test::new_adapter;
    use crate::services::DNS;
    use crate::ResourcePage;

    fn first_zone() -> Value {
        json!({
            "id": "a86dba58-0043-4cc6-a1bb-69d5e86f3ca3",
            "pool_id": "572ba08c-d929-4c70-8e42-03824bb24ca2",
            "project_id": "4335d1f0-f793-11e2-b778-0800200c9a66",
            "name": "example.org.",
            "email": "joe@example.org",
            "ttl": 7200,
            "serial": 1404757531,
            "status": "ACTIVE",
            "action": "CREATE",
            "description": "This is an example zone.",
            "masters": [],
            "type": "PRIMARY",
            "transferred_at": null,
            "version": 1,
            "created_at": "2014-07-07T18:25:31.275934",
            "updated_at": null,
            "links": {
                "self": "https://127.0.0.1:9001/v2/zones/a86dba58-0043-4cc6-a1bb-69d5e86f3ca3"
            }
        })
    }

    fn second_zone() -> Value {
        json!({
            "id": "34c4561c-9205-4386-9df5-167436f5a222",
            "pool_id": "572ba08c-d929-4c70-8e42-03824bb24ca2",
            "project_id": "4335d1f0-f793-11e2-b778-0800200c9a66",
            "name": "foo.example.com.",
            "email": "joe@foo.example.com",
            "ttl": 7200,
            "serial": 1488053571,
            "status": "ACTIVE",
            "action": "CREATE",
            "description": "This is another example zone.",
            "masters": ["example.com."],
            "type": "PRIMARY",
            "transferred_at": null,
            "version": 1,
            "created_at": "2014-07-07T18:25:31.275934",
            "updated_at": "2015-02-25T20:23:01.234567",
            "links": {
                "self": "https://127.0.0.1:9001/v2/zones/34c4561c-9205-4386-9df5-167436f5a222"
            }
        })
    }

    fn zone_with(status: &str, action: &str) -> Value {
        let mut zone = first_zone();
        zone["status"] = json!(status);
        zone["action"] = json!(action);
        zone
    }

    fn share_body() -> Value {
        json!({
            "id": "fd40b017-bf97-461c-8d30-d4e922b28edd",
            "zone_id": "a3365b47-ee93-43ad-9a60-2b2ca96b1898",
            "project_id": "16ade46c85a1435bb86d9138d37da57e",
            "target_project_id": "232e37df46af42089710e2ae39111c2f",
            "created_at": "2022-11-30T22:20:27.000000",
            "updated_at": null,
            "links": {
                "self": "http://127.0.0.1:60053/v2/zones/a3365b47-ee93-43ad-9a60-2b2ca96b1898/shares/fd40b017-bf97-461c-8d30-d4e922b28edd",
                "zone": "http://127.0.0.1:60053/v2/zones/a3365b47-ee93-43ad-9a60-2b2ca96b1898"
            }
        })
    }

    #[test]
    fn test_list_query() {
        let opts = ListOpts {
            limit: Some(10),
            sort_dir: Some(SortDir::Desc),
            status: Some(ZoneStatus::Active),
            zone_type: Some(ZoneType::Secondary),
            ..Default::default()
        };
        assert_eq!(
            opts.to_query().unwrap(),
            "limit=10&sort_dir=desc&status=ACTIVE&type=SECONDARY"
        );
        assert_eq!(ListOpts::default().to_query().unwrap(), "");
    }

    #[test]
    fn test_create_body() {
        let opts = CreateOpts {
            name: "example.org.".into(),
            email: Some("joe@example.org".into()),
            zone_type: Some(ZoneType::Primary),
            ttl: Some(7200),
            description: Some("This is an example zone.".into()),
            ..Default::default()
        };
        assert_eq!(
            opts.to_body().unwrap(),
            json!({
                "name": "example.org.",
                "email": "joe@example.org",
                "type": "PRIMARY",
                "ttl": 7200,
                "description": "This is an example zone."
            })
        );

        let err = CreateOpts::default().to_body().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_decode_zone() {
        let zone: Zone = serde_json::from_value(second_zone()).unwrap();
        assert_eq!(zone.name, "foo.example.com.");
        assert_eq!(zone.status, ZoneStatus::Active);
        assert_eq!(zone.action, ZoneAction::Create);
        assert_eq!(zone.zone_type, ZoneType::Primary);
        assert_eq!(zone.masters, vec!["example.com.".to_string()]);
        assert!(zone.transferred_at.is_none());
        assert!(zone.updated_at.is_some());
        assert!(zone.links.contains_key("self"));
    }

    #[tokio::test]
    async fn test_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/zones"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "links": {"self": format!("{}/v2/zones?limit=2", server.uri())},
                "metadata": {"total_count": 2},
                "zones": [first_zone(), second_zone()]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dns = new_adapter(DNS, &server).await;
        let opts = ListOpts {
            limit: Some(2),
            ..Default::default()
        };
        let zones = list(&dns, &opts).all().await.unwrap();
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].id, "a86dba58-0043-4cc6-a1bb-69d5e86f3ca3");
        assert_eq!(zones[1].name, "foo.example.com.");
    }

    #[tokio::test]
    async fn test_list_follows_next_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/zones"))
            .and(query_param("marker", "34c4561c-9205-4386-9df5-167436f5a222"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"zones": [], "links": {}})),
            )
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/zones"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "links": {
                    "next": format!(
                        "{}/v2/zones?limit=2&marker=34c4561c-9205-4386-9df5-167436f5a222",
                        server.uri()
                    )
                },
                "zones": [first_zone(), second_zone()]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dns = new_adapter(DNS, &server).await;
        let page = list(&dns, ()).all_pages().await.unwrap();
        assert_eq!(page.extract().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/zones/a86dba58-0043-4cc6-a1bb-69d5e86f3ca3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(first_zone()))
            .expect(1)
            .mount(&server)
            .await;

        let dns = new_adapter(DNS, &server).await;
        let zone = get(&dns, "a86dba58-0043-4cc6-a1bb-69d5e86f3ca3")
            .await
            .unwrap();
        assert_eq!(zone.email, "joe@example.org");
        assert_eq!(zone.ttl, 7200);
        assert_eq!(zone.serial, 1404757531);
        assert_eq!(zone.description, "This is an example zone.");
        assert!(zone.masters.is_empty());
        assert!(zone.updated_at.is_none());
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/zones/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "code": 404,
                "type": "zone_not_found",
                "message": "Could not find Zone"
            })))
            .mount(&server)
            .await;

        let dns = new_adapter(DNS, &server).await;
        let err = get(&dns, "missing").await.err().unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/zones"))
            .and(body_json(json!({
                "name": "example.org.",
                "email": "joe@example.org",
                "type": "PRIMARY",
                "ttl": 7200,
                "description": "This is an example zone."
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(zone_with("PENDING", "CREATE")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dns = new_adapter(DNS, &server).await;
        let zone = create(
            &dns,
            CreateOpts {
                name: "example.org.".into(),
                email: Some("joe@example.org".into()),
                zone_type: Some(ZoneType::Primary),
                ttl: Some(7200),
                description: Some("This is an example zone.".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(zone.name, "example.org.");
        assert_eq!(zone.email, "joe@example.org");
        assert_eq!(zone.ttl, 7200);
        assert_eq!(zone.status, ZoneStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_invalid_does_not_send() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let dns = new_adapter(DNS, &server).await;
        let err = create(&dns, CreateOpts::default()).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_update() {
        let server = MockServer::start().await;
        let mut updated = zone_with("PENDING", "UPDATE");
        updated["ttl"] = json!(600);
        updated["description"] = json!("Updated Description");
        Mock::given(method("PATCH"))
            .and(path("/v2/zones/a86dba58-0043-4cc6-a1bb-69d5e86f3ca3"))
            .and(body_json(json!({"ttl": 600, "description": "Updated Description"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(updated))
            .expect(1)
            .mount(&server)
            .await;

        let dns = new_adapter(DNS, &server).await;
        let zone = update(
            &dns,
            "a86dba58-0043-4cc6-a1bb-69d5e86f3ca3",
            UpdateOpts {
                ttl: Some(600),
                description: Some("Updated Description".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(zone.ttl, 600);
        assert_eq!(zone.action, ZoneAction::Update);
    }

    #[tokio::test]
    async fn test_delete() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v2/zones/a86dba58-0043-4cc6-a1bb-69d5e86f3ca3"))
            .respond_with(
                ResponseTemplate::new(202).set_body_json(zone_with("PENDING", "DELETE")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dns = new_adapter(DNS, &server).await;
        let zone = delete(&dns, "a86dba58-0043-4cc6-a1bb-69d5e86f3ca3")
            .await
            .unwrap();
        assert_eq!(zone.action, ZoneAction::Delete);
        assert_eq!(zone.status, ZoneStatus::Pending);
    }

    #[tokio::test]
    async fn test_share() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/zones/a3365b47-ee93-43ad-9a60-2b2ca96b1898/shares"))
            .and(body_json(json!({"target_project_id": "232e37df46af42089710e2ae39111c2f"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(share_body()))
            .expect(1)
            .mount(&server)
            .await;

        let dns = new_adapter(DNS, &server).await;
        let created = share(
            &dns,
            "a3365b47-ee93-43ad-9a60-2b2ca96b1898",
            ShareZoneOpts {
                target_project_id: "232e37df46af42089710e2ae39111c2f".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(created.id, "fd40b017-bf97-461c-8d30-d4e922b28edd");
        assert_eq!(created.project_id, "16ade46c85a1435bb86d9138d37da57e");
        assert_eq!(created.links.len(), 2);
    }

    #[tokio::test]
    async fn test_unshare() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(
                "/v2/zones/a3365b47-ee93-43ad-9a60-2b2ca96b1898/shares/fd40b017-bf97-461c-8d30-d4e922b28edd",
            ))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let dns = new_adapter(DNS, &server).await;
        unshare(
            &dns,
            "a3365b47-ee93-43ad-9a60-2b2ca96b1898",
            "fd40b017-bf97-461c-8d30-d4e922b28edd",
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_list_shares_all_projects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/zones/a3365b47-ee93-43ad-9a60-2b2ca96b1898/shares"))
            .and(header("x-auth-all-projects", "true"))
            .and(query_param("target_project_id", "232e37df46af42089710e2ae39111c2f"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "shared_zones": [share_body()],
                "links": {"self": "http://127.0.0.1:60053/v2/zones/a3365b47-ee93-43ad-9a60-2b2ca96b1898/shares"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dns = new_adapter(DNS, &server).await;
        let opts = ListSharesOpts {
            all_projects: true,
            target_project_id: Some("232e37df46af42089710e2ae39111c2f".into()),
        };
        let shares = list_shares(&dns, "a3365b47-ee93-43ad-9a60-2b2ca96b1898", &opts)
            .all()
            .await
            .unwrap();
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].zone_id, "a3365b47-ee93-43ad-9a60-2b2ca96b1898");
    }

    fn fast_waiter() -> Waiter {
        Waiter::new(Duration::from_secs(5)).with_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_wait_for_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/zones/a86dba58-0043-4cc6-a1bb-69d5e86f3ca3"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(zone_with("PENDING", "CREATE")),
            )
            .up_to_n_times(2)
            .with_priority(1)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/zones/a86dba58-0043-4cc6-a1bb-69d5e86f3ca3"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(zone_with("ACTIVE", "NONE")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dns = new_adapter(DNS, &server).await;
        wait_for_status(
            &dns,
            "a86dba58-0043-4cc6-a1bb-69d5e86f3ca3",
            ZoneStatus::Active,
            fast_waiter(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_deleted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/zones/a86dba58-0043-4cc6-a1bb-69d5e86f3ca3"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let dns = new_adapter(DNS, &server).await;
        wait_for_status(
            &dns,
            "a86dba58-0043-4cc6-a1bb-69d5e86f3ca3",
            ZoneStatus::Deleted,
            fast_waiter(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/zones/a86dba58-0043-4cc6-a1bb-69d5e86f3ca3"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(zone_with("ERROR", "CREATE")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dns = new_adapter(DNS, &server).await;
        let err = wait_for_status(
            &dns,
            "a86dba58-0043-4cc6-a1bb-69d5e86f3ca3",
            ZoneStatus::Active,
            fast_waiter(),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::OperationFailed);
    }

    #[tokio::test]
    async fn test_wait_for_status_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/zones/a86dba58-0043-4cc6-a1bb-69d5e86f3ca3"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(zone_with("PENDING", "CREATE")),
            )
            .mount(&server)
            .await;

        let dns = new_adapter(DNS, &server).await;
        let waiter =
            Waiter::new(Duration::from_millis(200)).with_interval(Duration::from_millis(20));
        let err = wait_for_status(
            &dns,
            "a86dba58-0043-4cc6-a1bb-69d5e86f3ca3",
            ZoneStatus::Active,
            waiter,
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::OperationTimedOut);
    }
}
