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

//! OpenStack service types.

use std::fmt::Debug;

use reqwest::header::{HeaderName, HeaderValue};

use super::ApiVersion;

/// Trait representing a service type.
pub trait ServiceType: Debug + Clone + Send + Sync {
    /// Service type to look up the endpoint with.
    fn catalog_type(&self) -> &'static str;

    /// Path segments appended to the endpoint to get the resource base.
    ///
    /// For example, networking resources live under `v2.0/` of the endpoint.
    fn resource_prefix(&self) -> &'static [&'static str] {
        &[]
    }
}

/// A service that supports microversions.
pub trait VersionedService: ServiceType {
    /// Return a header and its value for the given API version.
    fn get_version_header(&self, version: ApiVersion) -> (HeaderName, HeaderValue);
}

/// A generic service with a fixed resource prefix.
#[derive(Copy, Clone, Debug)]
pub struct GenericService {
    catalog_type: &'static str,
    prefix: &'static [&'static str],
}

impl GenericService {
    /// Create a new generic service.
    pub const fn new(
        catalog_type: &'static str,
        prefix: &'static [&'static str],
    ) -> GenericService {
        GenericService {
            catalog_type,
            prefix,
        }
    }
}

impl ServiceType for GenericService {
    fn catalog_type(&self) -> &'static str {
        self.catalog_type
    }

    fn resource_prefix(&self) -> &'static [&'static str] {
        self.prefix
    }
}

/// The Shared File Systems service (Manila).
///
/// Its endpoint already contains the version and the project, so no prefix is added.
#[derive(Copy, Clone, Debug)]
pub struct SharedFileSystemsService {
    __use_new: (),
}

impl SharedFileSystemsService {
    /// Create a Shared File Systems service type.
    pub const fn new() -> SharedFileSystemsService {
        SharedFileSystemsService { __use_new: () }
    }
}

impl ServiceType for SharedFileSystemsService {
    fn catalog_type(&self) -> &'static str {
        "sharev2"
    }
}

impl VersionedService for SharedFileSystemsService {
    fn get_version_header(&self, version: ApiVersion) -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static("x-openstack-manila-api-version"),
            version.into(),
        )
    }
}

macro_rules! service {
    ($(#[$attr:meta])* $name:ident: $catalog:literal, [$($prefix:literal),*]) => {
        $(#[$attr])*
        #[derive(Copy, Clone, Debug)]
        pub struct $name {
            __use_new: (),
        }

        impl $name {
            #[doc = concat!("Create a service type for `", $catalog, "`.")]
            pub const fn new() -> $name {
                $name { __use_new: () }
            }
        }

        impl ServiceType for $name {
            fn catalog_type(&self) -> &'static str {
                $catalog
            }

            fn resource_prefix(&self) -> &'static [&'static str] {
                &[$($prefix),*]
            }
        }
    };
}

service! {
    #[doc = "The DNS service (Designate)."]
    DnsService: "dns", ["v2"]
}

service! {
    #[doc = "The Load Balancer service (Octavia)."]
    LoadBalancerService: "load-balancer", ["v2"]
}

service! {
    #[doc = "The Networking service (Neutron)."]
    NetworkService: "network", ["v2.0"]
}

/// DNS service (Designate).
pub const DNS: DnsService = DnsService::new();

/// Load balancer service (Octavia).
pub const LOAD_BALANCER: LoadBalancerService = LoadBalancerService::new();

/// Networking service (Neutron).
pub const NETWORK: NetworkService = NetworkService::new();

/// Shared File Systems service (Manila).
pub const SHARED_FILE_SYSTEMS: SharedFileSystemsService = SharedFileSystemsService::new();

#[cfg(test)]
pub mod test {
    use super::{
        GenericService, ServiceType, VersionedService, DNS, LOAD_BALANCER, NETWORK,
        SHARED_FILE_SYSTEMS,
    };
    use crate::ApiVersion;

    #[test]
    fn test_prefixes() {
        assert_eq!(DNS.resource_prefix(), &["v2"]);
        assert_eq!(LOAD_BALANCER.catalog_type(), "load-balancer");
        assert_eq!(NETWORK.resource_prefix(), &["v2.0"]);
        assert!(SHARED_FILE_SYSTEMS.resource_prefix().is_empty());
    }

    #[test]
    fn test_generic() {
        let service = GenericService::new("key-manager", &["v1"]);
        assert_eq!(service.catalog_type(), "key-manager");
        assert_eq!(service.resource_prefix(), &["v1"]);
    }

    #[test]
    fn test_manila_header() {
        let (name, value) = SHARED_FILE_SYSTEMS.get_version_header(ApiVersion(2, 42));
        assert_eq!(name.as_str(), "x-openstack-manila-api-version");
        assert_eq!(value.to_str().unwrap(), "2.42");
    }
}
