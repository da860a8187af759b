// Copyright 2018-2021 Dmitry Tantsur <dtantsur@protonmail.com>
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

//! Support for cloud configuration file.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use super::cloud::CloudConfig;
use crate::{Error, ErrorKind};

#[derive(Debug, Deserialize)]
struct Root {
    clouds: HashMap<String, CloudConfig>,
}

fn invalid<S: Into<String>>(message: S) -> Error {
    Error::new(ErrorKind::InvalidConfig, message)
}

/// Merge `src` into `dest` recursively.
///
/// Scalar values from `src` replace existing ones only if `overwrite` is true.
fn merge_mappings(src: Mapping, dest: &mut Mapping, overwrite: bool) {
    for (key, value) in src {
        if let Value::Mapping(nested) = value {
            if let Some(Value::Mapping(existing)) = dest.get_mut(&key) {
                merge_mappings(nested, existing, overwrite);
                continue;
            }
            if let Some(existing) = dest.get(&key) {
                warn!("Replacing {:?} with a mapping while merging", existing);
            }
            let _ = dest.insert(key, Value::Mapping(nested));
        } else if overwrite || !dest.contains_key(&key) {
            let _ = dest.insert(key, value);
        }
    }
}

fn get_mapping<'m>(root: &'m mut Mapping, key: &str, file: &str) -> Result<&'m mut Mapping, Error> {
    match root.get_mut(key) {
        Some(Value::Mapping(map)) => Ok(map),
        Some(other) => Err(invalid(format!(
            "{} object in {} must be a mapping, got {:?}",
            key, file, other
        ))),
        None => Err(invalid(format!("{} must contain a {} object", file, key))),
    }
}

/// Inject profiles from clouds-public.yaml into clouds.yaml.
fn inject_profiles(clouds_public: &mut Mapping, clouds: &mut Mapping) -> Result<(), Error> {
    let clouds_mapping = get_mapping(clouds, "clouds", "clouds.yaml")?;
    let profiles = get_mapping(clouds_public, "public-clouds", "clouds-public.yaml")?;

    for (cloud_name, cloud) in clouds_mapping.iter_mut() {
        let cloud_mapping = match cloud.as_mapping_mut() {
            Some(map) => map,
            None => {
                warn!("Cloud record {:?} is not a mapping, ignoring", cloud_name);
                continue;
            }
        };

        let profile_name = match cloud_mapping.get("profile") {
            Some(Value::String(name)) => name.clone(),
            Some(other) => {
                return Err(invalid(format!(
                    "Profile name {:?} is not a string",
                    other
                )))
            }
            None => continue,
        };

        match profiles.get(profile_name.as_str()) {
            Some(Value::Mapping(profile)) => {
                debug!("Applying profile {} to {:?}", profile_name, cloud_name);
                // Keys from the cloud itself take priority
                merge_mappings(profile.clone(), cloud_mapping, false);
            }
            Some(other) => {
                return Err(invalid(format!(
                    "Profile {} must be a mapping, got {:?}",
                    profile_name, other
                )))
            }
            None => {
                return Err(invalid(format!(
                    "Missing profile {} in clouds-public.yaml",
                    profile_name
                )))
            }
        }
    }

    Ok(())
}

fn find_config(filename: &str) -> Option<PathBuf> {
    let current = Path::new(filename);
    if current.is_file() {
        match current.canonicalize() {
            Ok(val) => return Some(val),
            Err(e) => warn!("Cannot canonicalize {:?}: {}", current, e),
        }
    }

    if let Some(mut home) = dirs::home_dir() {
        home.push(".config/openstack");
        home.push(filename);
        if home.is_file() {
            return Some(home);
        }
    } else {
        warn!("Cannot find home directory");
    }

    let abs = Path::new("/etc/openstack").join(filename);
    if abs.is_file() {
        Some(abs)
    } else {
        None
    }
}

#[inline]
fn with_one_key(key: &str) -> Mapping {
    let mut result = Mapping::with_capacity(1);
    let _ = result.insert(key.into(), Value::Mapping(Mapping::new()));
    result
}

fn read_yaml(filename: &str, default_root_key: Option<&str>) -> Result<Mapping, Error> {
    let path = match (find_config(filename), default_root_key) {
        (Some(path), _) => path,
        (None, Some(default)) => return Ok(with_one_key(default)),
        (None, None) => {
            return Err(invalid(format!(
                "{} was not found in any location",
                filename
            )))
        }
    };

    debug!("Reading {}", path.display());
    let content = File::open(&path)
        .map_err(|e| invalid(format!("Cannot read {}: {}", path.display(), e)))?;

    match serde_yaml::from_reader(content)
        .map_err(|e| invalid(format!("Cannot parse {}: {}", path.display(), e)))?
    {
        Value::Mapping(mapping) => Ok(mapping),
        other => Err(invalid(format!(
            "Root of {} is {:?}, not a mapping",
            path.display(),
            other
        ))),
    }
}

fn from_files(
    name: &str,
    mut clouds: Mapping,
    mut clouds_public: Mapping,
    secure: Mapping,
) -> Result<CloudConfig, Error> {
    merge_mappings(secure, &mut clouds, true);
    inject_profiles(&mut clouds_public, &mut clouds)?;

    let mut root: Root = serde_yaml::from_value(Value::Mapping(clouds))
        .map_err(|e| invalid(format!("Cannot parse the merged cloud configuration: {}", e)))?;
    root.clouds
        .remove(name)
        .ok_or_else(|| invalid(format!("No such cloud: {}", name)))
}

pub fn from_config(cloud_name: &str) -> Result<CloudConfig, Error> {
    let clouds = read_yaml("clouds.yaml", None)?;
    let clouds_public = read_yaml("clouds-public.yaml", Some("public-clouds"))?;
    let secure = read_yaml("secure.yaml", Some("clouds"))?;

    from_files(cloud_name, clouds, clouds_public, secure)
}

#[cfg(test)]
pub(crate) mod test {
    use std::io::Write;

    use serde_yaml::{Mapping, Value};

    use super::{find_config, from_files, inject_profiles, merge_mappings, read_yaml, with_one_key};
    use crate::ErrorKind;

    pub(crate) fn to_yaml<S: AsRef<str>>(source: S) -> Mapping {
        match serde_yaml::from_str(source.as_ref()).unwrap() {
            Value::Mapping(map) => map,
            other => panic!("Unexpected {:?}", other),
        }
    }

    fn lookup<'m>(root: &'m Mapping, path: &[&str]) -> &'m Value {
        let mut current = root.get(path[0]).unwrap();
        for key in &path[1..] {
            current = current.as_mapping().unwrap().get(*key).unwrap();
        }
        current
    }

    #[test]
    fn test_merge_overwrite() {
        let src = to_yaml(
            r#"
clouds:
  cloud_name:
    auth:
      token: secret
    region_name: region2"#,
        );
        let mut dest = to_yaml(
            r#"
clouds:
  cloud_name:
    auth:
      endpoint: http://127.0.0.1
    region_name: region1"#,
        );

        merge_mappings(src, &mut dest, true);

        assert_eq!(
            lookup(&dest, &["clouds", "cloud_name", "region_name"]),
            "region2"
        );
        assert_eq!(
            lookup(&dest, &["clouds", "cloud_name", "auth", "token"]),
            "secret"
        );
        assert_eq!(
            lookup(&dest, &["clouds", "cloud_name", "auth", "endpoint"]),
            "http://127.0.0.1"
        );
    }

    #[test]
    fn test_merge_no_overwrite() {
        let src = to_yaml("a: 1\nb: 2");
        let mut dest = to_yaml("a: 3");
        merge_mappings(src, &mut dest, false);
        assert_eq!(dest, to_yaml("a: 3\nb: 2"));
    }

    #[test]
    fn test_merge_type_mismatch() {
        let src = to_yaml(
            r#"
map1:
  map2:
    auth:
      token: secret"#,
        );
        let mut dest = to_yaml(
            r#"
map1:
  map2: 123"#,
        );

        merge_mappings(src.clone(), &mut dest, true);
        assert_eq!(src, dest);
    }

    #[test]
    fn test_from_files_token() {
        let clouds = to_yaml(
            r#"clouds:
  cloud_name:
    auth_type: token
    auth:
      endpoint: http://127.0.0.1:9001
    dns_endpoint_override: http://127.0.0.1:9001/"#,
        );
        let secure = to_yaml(
            r#"clouds:
  cloud_name:
    auth:
      token: abcdef"#,
        );

        let cfg = from_files("cloud_name", clouds, with_one_key("public-clouds"), secure).unwrap();
        assert_eq!(cfg.auth_type.as_deref(), Some("token"));
        let auth = cfg.auth.clone().unwrap();
        assert_eq!(auth.token.as_deref(), Some("abcdef"));
        let session = cfg.create_session().unwrap();
        assert_eq!(
            session
                .endpoint_overrides()
                .get("dns")
                .unwrap()
                .as_str(),
            "http://127.0.0.1:9001/"
        );
    }

    #[test]
    fn test_from_files_with_profile() {
        let clouds = to_yaml(
            r#"clouds:
  cloud_name:
    auth:
      token: abcdef
    profile: test_profile"#,
        );
        let clouds_public = to_yaml(
            r#"public-clouds:
  test_profile:
    auth:
      endpoint: http://127.0.0.1:9696
    network_endpoint_override: http://127.0.0.1:9696/"#,
        );

        let cfg = from_files("cloud_name", clouds, clouds_public, with_one_key("clouds")).unwrap();
        let auth = cfg.auth.clone().unwrap();
        assert_eq!(auth.endpoint.as_deref(), Some("http://127.0.0.1:9696"));
        assert!(cfg.options.contains_key("network_endpoint_override"));
    }

    #[test]
    fn test_from_files_none_without_auth() {
        let clouds = to_yaml(
            r#"clouds:
  cloud_name:
    auth_type: none"#,
        );

        let cfg = from_files(
            "cloud_name",
            clouds,
            with_one_key("public-clouds"),
            with_one_key("clouds"),
        )
        .unwrap();
        assert!(cfg.create_session().is_ok());
    }

    #[test]
    fn test_from_files_no_such_cloud() {
        let clouds = to_yaml(
            r#"clouds:
  cloud_name:
    auth_type: none"#,
        );

        let err = from_files(
            "other",
            clouds,
            with_one_key("public-clouds"),
            with_one_key("clouds"),
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
        assert_eq!(err.message(), "No such cloud: other");
    }

    #[test]
    fn test_inject_profiles_missing() {
        let mut clouds = to_yaml(
            r#"
clouds:
  cloud_name:
    auth:
      token: abcdef
    profile: test_profile"#,
        );
        let mut clouds_public = to_yaml(
            r#"
public-clouds:
  test_profile_other:
    auth:
      endpoint: http://127.0.0.1"#,
        );

        let err = inject_profiles(&mut clouds_public, &mut clouds)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
        assert_eq!(
            err.message(),
            "Missing profile test_profile in clouds-public.yaml"
        );
    }

    #[test]
    fn test_inject_profiles_keeps_cloud_values() {
        let mut clouds = to_yaml(
            r#"
clouds:
  cloud_name:
    auth:
      endpoint: http://127.0.0.1:9001
    profile: test_profile"#,
        );
        let mut clouds_public = to_yaml(
            r#"
public-clouds:
  test_profile:
    auth:
      endpoint: http://example.com
      token: abcdef"#,
        );

        inject_profiles(&mut clouds_public, &mut clouds).unwrap();
        assert_eq!(
            lookup(&clouds, &["clouds", "cloud_name", "auth", "endpoint"]),
            "http://127.0.0.1:9001"
        );
        assert_eq!(
            lookup(&clouds, &["clouds", "cloud_name", "auth", "token"]),
            "abcdef"
        );
    }

    #[test]
    fn test_read_yaml_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "clouds:\n  local:\n    auth_type: none").unwrap();
        file.flush().unwrap();

        let path = file.path().to_str().unwrap();
        assert!(find_config(path).is_some());
        let mapping = read_yaml(path, None).unwrap();
        assert_eq!(lookup(&mapping, &["clouds", "local", "auth_type"]), "none");
    }

    #[test]
    fn test_read_yaml_not_a_mapping() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "- just\n- a list").unwrap();
        file.flush().unwrap();

        let err = read_yaml(file.path().to_str().unwrap(), None)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn test_read_yaml_missing() {
        let err = read_yaml("doesnt_exist", None).err().unwrap();
        assert_eq!(err.message(), "doesnt_exist was not found in any location");
        let mapping = read_yaml("doesnt_exist", Some("clouds")).unwrap();
        assert_eq!(mapping, with_one_key("clouds"));
    }

    #[test]
    fn test_find_config_fail() {
        assert_eq!(find_config("shouldnt_exist"), None);
    }
}
