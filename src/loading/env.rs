// Copyright 2018-2020 Dmitry Tantsur <dtantsur@protonmail.com>
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

//! Support for `OS_` environment variables.

use std::collections::HashMap;
use std::env;

use log::debug;

use super::cloud::{Auth, CloudConfig};
use super::config;
use crate::Error;

const PREFIX: &str = "OS_";
const OVERRIDE_SUFFIX: &str = "_ENDPOINT_OVERRIDE";

// This is only used for unit testing.
trait Environment {
    fn get(&self, name: &str) -> Option<String>;

    fn all(&self) -> Vec<(String, String)>;
}

#[derive(Debug, Clone, Copy)]
struct RealEnvironment;

impl Environment for RealEnvironment {
    fn get(&self, name: &str) -> Option<String> {
        env::var(name).ok().filter(|value| !value.is_empty())
    }

    fn all(&self) -> Vec<(String, String)> {
        env::vars().collect()
    }
}

/// Collect `OS_<SERVICE>_ENDPOINT_OVERRIDE` into `<service>_endpoint_override` options.
fn endpoint_overrides<E: Environment>(env: &E) -> HashMap<String, serde_yaml::Value> {
    env.all()
        .into_iter()
        .filter_map(|(name, value)| {
            let service = name.strip_prefix(PREFIX)?.strip_suffix(OVERRIDE_SUFFIX)?;
            if service.is_empty() || value.is_empty() {
                return None;
            }
            let key = format!("{}_endpoint_override", service.to_lowercase());
            debug!("Found {} in the environment", name);
            Some((key, serde_yaml::Value::String(value)))
        })
        .collect()
}

fn _from_env<E: Environment>(env: E) -> Result<CloudConfig, Error> {
    if let Some(cloud_name) = env.get("OS_CLOUD") {
        debug!("Loading cloud {} from the configuration file", cloud_name);
        return config::from_config(&cloud_name);
    }

    let auth = Auth {
        endpoint: env.get("OS_ENDPOINT"),
        token: env.get("OS_TOKEN"),
    };

    Ok(CloudConfig {
        auth: Some(auth),
        auth_type: env.get("OS_AUTH_TYPE"),
        cacert: env.get("OS_CACERT"),
        options: endpoint_overrides(&env),
    })
}

/// Create a `CloudConfig` from environment variables.
pub fn from_env() -> Result<CloudConfig, Error> {
    _from_env(RealEnvironment)
}
