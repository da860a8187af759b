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

//! Firewall rules.

use log::{debug, trace};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::{extract_into, null_as_default, SortDir};
use crate::pagination::{LinkedPage, Pager, Resource};
use crate::params::{build_query_string, build_request_body, ToBody, ToQuery};
use crate::services::NetworkService;
use crate::{Adapter, Error, ErrorKind};

const ROOT: &str = "firewall_rule";

crate::protocol_enum! {
    #[doc = "IP protocol of a rule."]
    enum Protocol {
        #[doc = "Any protocol."]
        Any = "any",
        #[doc = "ICMP."]
        Icmp = "icmp",
        #[doc = "TCP."]
        Tcp = "tcp",
        #[doc = "UDP."]
        Udp = "udp"
    }
}

crate::protocol_enum! {
    #[doc = "Action taken on matching traffic."]
    enum Action {
        #[doc = "Let the traffic through."]
        Allow = "allow",
        #[doc = "Drop the traffic silently."]
        Deny = "deny",
        #[doc = "Drop the traffic and notify the sender."]
        Reject = "reject"
    }
}

crate::protocol_enum! {
    #[doc = "IP version of a rule."]
    enum IpVersion: u8 {
        #[doc = "IPv4."]
        V4 = 4,
        #[doc = "IPv6."]
        V6 = 6
    }
}

/// A firewall rule.
#[derive(Clone, Debug, Deserialize)]
pub struct Rule {
    /// Unique ID.
    pub id: String,
    /// Rule name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Rule description.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// IP protocol, `None` matches any protocol.
    #[serde(default)]
    pub protocol: Option<Protocol>,
    /// Action on matching traffic.
    pub action: Action,
    /// IP version.
    pub ip_version: IpVersion,
    /// Source address or CIDR.
    #[serde(default)]
    pub source_ip_address: Option<String>,
    /// Destination address or CIDR.
    #[serde(default)]
    pub destination_ip_address: Option<String>,
    /// Source port or port range `start:end`.
    #[serde(default)]
    pub source_port: Option<String>,
    /// Destination port or port range `start:end`.
    #[serde(default)]
    pub destination_port: Option<String>,
    /// Source firewall group.
    #[serde(default)]
    pub source_firewall_group_id: Option<String>,
    /// Destination firewall group.
    #[serde(default)]
    pub destination_firewall_group_id: Option<String>,
    /// Whether the rule is visible to other projects.
    #[serde(default, deserialize_with = "null_as_default")]
    pub shared: bool,
    /// Whether the rule is applied.
    #[serde(default, deserialize_with = "null_as_default")]
    pub enabled: bool,
    /// Policies using the rule.
    #[serde(default, deserialize_with = "null_as_default")]
    pub firewall_policy_id: Vec<String>,
    /// Owning project (legacy name).
    #[serde(default, deserialize_with = "null_as_default")]
    pub tenant_id: String,
    /// Owning project.
    #[serde(default, deserialize_with = "null_as_default")]
    pub project_id: String,
}

impl Resource for Rule {
    const COLLECTION: &'static str = "firewall_rules";
}

/// A page of firewall rules.
pub type RulePage = LinkedPage<Rule>;

/// Filtering and sorting of firewall rules.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ListOpts {
    /// Filter by project (legacy name).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Filter by project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Filter by name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Filter by description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Filter by protocol.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    /// Filter by action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    /// Filter by IP version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_version: Option<IpVersion>,
    /// Filter by source address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip_address: Option<String>,
    /// Filter by destination address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_ip_address: Option<String>,
    /// Filter by source port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_port: Option<String>,
    /// Filter by destination port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_port: Option<String>,
    /// Filter by the enabled flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Filter by the shared flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
    /// Filter by ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Maximum number of rules per page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// ID of the last rule of the previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Field to sort by.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    /// Sorting direction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_dir: Option<SortDir>,
}

impl ToQuery for ListOpts {
    fn to_query(&self) -> Result<String, Error> {
        build_query_string(self)
    }
}

// Neutron expects null rather than "any".
fn clear_any_protocol(body: &mut Value, protocol: Option<Protocol>) {
    if protocol == Some(Protocol::Any) {
        if let Some(rule) = body.get_mut(ROOT).and_then(Value::as_object_mut) {
            let _ = rule.insert("protocol".into(), Value::Null);
        }
    }
}

/// Firewall rule creation options.
///
/// `protocol` and `action` are required.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CreateOpts {
    /// IP protocol.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    /// Action on matching traffic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    /// Owning project (legacy name, admin only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Owning project (admin only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Rule name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Rule description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// IP version, 4 by default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_version: Option<IpVersion>,
    /// Source address or CIDR.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip_address: Option<String>,
    /// Destination address or CIDR.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_ip_address: Option<String>,
    /// Source port or port range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_port: Option<String>,
    /// Destination port or port range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_port: Option<String>,
    /// Whether the rule is visible to other projects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
    /// Whether the rule is applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl ToBody for CreateOpts {
    fn to_body(&self) -> Result<Value, Error> {
        if self.protocol.is_none() {
            return Err(missing("protocol"));
        }
        if self.action.is_none() {
            return Err(missing("action"));
        }
        let mut body = build_request_body(self, Some(ROOT))?;
        clear_any_protocol(&mut body, self.protocol);
        Ok(body)
    }
}

fn missing(argument: &str) -> Error {
    Error::new(
        ErrorKind::InvalidInput,
        format!("Missing input for argument [{}]", argument),
    )
}

/// Firewall rule update options.
///
/// Addresses and ports use a nested `Option`: `Some(None)` clears the value.
#[derive(Clone, Debug, Default, Serialize)]
pub struct UpdateOpts {
    /// Rule name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Rule description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// IP protocol.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    /// Action on matching traffic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    /// IP version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_version: Option<IpVersion>,
    /// Source address or CIDR.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip_address: Option<Option<String>>,
    /// Destination address or CIDR.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_ip_address: Option<Option<String>>,
    /// Source port or port range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_port: Option<Option<String>>,
    /// Destination port or port range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_port: Option<Option<String>>,
    /// Whether the rule is visible to other projects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
    /// Whether the rule is applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl ToBody for UpdateOpts {
    fn to_body(&self) -> Result<Value, Error> {
        let mut body = build_request_body(self, Some(ROOT))?;
        clear_any_protocol(&mut body, self.protocol);
        Ok(body)
    }
}

/// List firewall rules.
pub fn list<Q: ToQuery>(adapter: &Adapter<NetworkService>, opts: Q) -> Pager<RulePage> {
    adapter.pager(&["fwaas", "firewall_rules"], opts)
}

/// Get a firewall rule by its ID.
pub async fn get(adapter: &Adapter<NetworkService>, id: &str) -> Result<Rule, Error> {
    trace!("Fetching firewall rule {}", id);
    let body = adapter
        .get(&["fwaas", "firewall_rules", id])?
        .fetch_json()
        .await?;
    extract_into(body, Some(ROOT))
}

/// Create a firewall rule.
pub async fn create<B: ToBody>(adapter: &Adapter<NetworkService>, opts: B) -> Result<Rule, Error> {
    let body = opts.to_body()?;
    trace!("Creating a firewall rule with {}", body);
    let result = adapter
        .post(&["fwaas", "firewall_rules"])?
        .json(&body)
        .expect_status(&[StatusCode::CREATED])
        .fetch_json()
        .await?;
    let rule: Rule = extract_into(result, Some(ROOT))?;
    debug!("Created firewall rule {}", rule.id);
    Ok(rule)
}

/// Update a firewall rule.
pub async fn update<B: ToBody>(
    adapter: &Adapter<NetworkService>,
    id: &str,
    opts: B,
) -> Result<Rule, Error> {
    let body = opts.to_body()?;
    trace!("Updating firewall rule {} with {}", id, body);
    let result = adapter
        .put(&["fwaas", "firewall_rules", id])?
        .json(&body)
        .expect_status(&[StatusCode::OK])
        .fetch_json()
        .await?;
    extract_into(result, Some(ROOT))
}

/// Delete a firewall rule.
pub async fn delete(adapter: &Adapter<NetworkService>, id: &str) -> Result<(), Error> {
    debug!("Deleting firewall rule {}", id);
    let _ = adapter
        .delete(&["fwaas", "firewall_rules", id])?
        .expect_status(&[StatusCode::NO_CONTENT])
        .send()
        .await?;
    Ok(())
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::adapter::test::new_adapter;
    use crate::services::NETWORK;

    const RULE_ID: &str = "f03bd950-6c56-4f5e-a307-45967078f507";

    fn rule_body() -> Value {
        json!({
            "protocol": "tcp",
            "description": "ssh rule",
            "source_firewall_group_id": null,
            "destination_firewall_group_id": null,
            "source_port": null,
            "source_ip_address": null,
            "destination_ip_address": "192.168.1.0/24",
            "firewall_policy_id": [],
            "destination_port": "22",
            "id": RULE_ID,
            "name": "ssh_form_any",
            "tenant_id": "80cf934d6ffb4ef5b244f1c512ad1e61",
            "project_id": "80cf934d6ffb4ef5b244f1c512ad1e61",
            "enabled": true,
            "action": "allow",
            "ip_version": 4,
            "shared": false
        })
    }

    #[test]
    fn test_create_body() {
        let opts = CreateOpts {
            protocol: Some(Protocol::Tcp),
            action: Some(Action::Allow),
            name: Some("ssh_form_any".into()),
            destination_ip_address: Some("192.168.1.0/24".into()),
            destination_port: Some("22".into()),
            ip_version: Some(IpVersion::V4),
            ..Default::default()
        };
        assert_eq!(
            opts.to_body().unwrap(),
            json!({
                "firewall_rule": {
                    "protocol": "tcp",
                    "action": "allow",
                    "name": "ssh_form_any",
                    "ip_version": 4,
                    "destination_ip_address": "192.168.1.0/24",
                    "destination_port": "22"
                }
            })
        );
    }

    #[test]
    fn test_create_body_any_protocol() {
        let opts = CreateOpts {
            protocol: Some(Protocol::Any),
            action: Some(Action::Deny),
            ..Default::default()
        };
        assert_eq!(
            opts.to_body().unwrap(),
            json!({"firewall_rule": {"protocol": null, "action": "deny"}})
        );
    }

    #[test]
    fn test_create_body_required() {
        let err = CreateOpts {
            action: Some(Action::Allow),
            ..Default::default()
        }
        .to_body()
        .err()
        .unwrap();
        assert_eq!(err.message(), "Missing input for argument [protocol]");

        let err = CreateOpts {
            protocol: Some(Protocol::Udp),
            ..Default::default()
        }
        .to_body()
        .err()
        .unwrap();
        assert_eq!(err.message(), "Missing input for argument [action]");
    }

    #[test]
    fn test_update_body_clears() {
        let opts = UpdateOpts {
            description: Some("any traffic".into()),
            protocol: Some(Protocol::Any),
            source_ip_address: Some(None),
            destination_port: Some(Some("22".into())),
            ..Default::default()
        };
        assert_eq!(
            opts.to_body().unwrap(),
            json!({
                "firewall_rule": {
                    "description": "any traffic",
                    "protocol": null,
                    "source_ip_address": null,
                    "destination_port": "22"
                }
            })
        );
    }

    #[test]
    fn test_list_query() {
        let opts = ListOpts {
            protocol: Some(Protocol::Icmp),
            ip_version: Some(IpVersion::V6),
            enabled: Some(true),
            ..Default::default()
        };
        assert_eq!(
            opts.to_query().unwrap(),
            "protocol=icmp&ip_version=6&enabled=true"
        );
    }

    #[test]
    fn test_decode_any_protocol() {
        let mut body = rule_body();
        body["protocol"] = Value::Null;
        let rule: Rule = serde_json::from_value(body).unwrap();
        assert!(rule.protocol.is_none());
        assert_eq!(rule.ip_version, IpVersion::V4);
    }

    #[tokio::test]
    async fn test_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2.0/fwaas/firewall_rules"))
            .and(query_param("marker", RULE_ID))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"firewall_rules": []})),
            )
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2.0/fwaas/firewall_rules"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "firewall_rules": [rule_body()],
                "firewall_rules_links": [{
                    "href": format!(
                        "{}/v2.0/fwaas/firewall_rules?limit=1&marker={}",
                        server.uri(),
                        RULE_ID
                    ),
                    "rel": "next"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let network = new_adapter(NETWORK, &server).await;
        let rules = list(&network, ()).all().await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].protocol, Some(Protocol::Tcp));
        assert_eq!(rules[0].action, Action::Allow);
        assert_eq!(rules[0].destination_port.as_deref(), Some("22"));
        assert!(rules[0].source_port.is_none());
    }

    #[tokio::test]
    async fn test_create() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2.0/fwaas/firewall_rules"))
            .and(body_json(json!({
                "firewall_rule": {
                    "protocol": "tcp",
                    "action": "allow",
                    "name": "ssh_form_any",
                    "destination_ip_address": "192.168.1.0/24",
                    "destination_port": "22"
                }
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"firewall_rule": rule_body()})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let network = new_adapter(NETWORK, &server).await;
        let rule = create(
            &network,
            CreateOpts {
                protocol: Some(Protocol::Tcp),
                action: Some(Action::Allow),
                name: Some("ssh_form_any".into()),
                destination_ip_address: Some("192.168.1.0/24".into()),
                destination_port: Some("22".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(rule.id, RULE_ID);
        assert!(rule.enabled);
    }

    #[tokio::test]
    async fn test_get_update_delete() {
        let server = MockServer::start().await;
        let rule_path = format!("/v2.0/fwaas/firewall_rules/{}", RULE_ID);
        Mock::given(method("GET"))
            .and(path(rule_path.as_str()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"firewall_rule": rule_body()})),
            )
            .expect(1)
            .mount(&server)
            .await;
        let mut updated = rule_body();
        updated["source_ip_address"] = Value::Null;
        updated["enabled"] = json!(false);
        Mock::given(method("PUT"))
            .and(path(rule_path.as_str()))
            .and(body_json(json!({
                "firewall_rule": {"source_ip_address": null, "enabled": false}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"firewall_rule": updated})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(rule_path.as_str()))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let network = new_adapter(NETWORK, &server).await;
        let rule = get(&network, RULE_ID).await.unwrap();
        assert_eq!(rule.name, "ssh_form_any");

        let opts = UpdateOpts {
            source_ip_address: Some(None),
            enabled: Some(false),
            ..Default::default()
        };
        let rule = update(&network, RULE_ID, opts).await.unwrap();
        assert!(!rule.enabled);

        delete(&network, RULE_ID).await.unwrap();
    }
}
