// Copyright 2020 Dmitry Tantsur <dtantsur@protonmail.com>
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

//! Useful macros for defining protocol structures.

/// A macro for defining serializable and deserializable protocol enums.
///
/// `Clone`, `Copy`, `Debug`, `Serialize`/`Deserialize`, `Display` and equality traits are
/// automatically derived.
///
/// The easiest variant assumes that the carrier type is a string:
///
/// ```rust
/// oscloud::protocol_enum! {
///     #[doc = "Possible firewall rule actions."]
///     enum RuleAction {
///         Allow = "allow",
///         Deny = "deny",
///         Reject = "reject"
///     }
/// }
///
/// assert_eq!(RuleAction::Deny.as_str(), "deny");
/// assert_eq!("reject".parse::<RuleAction>().unwrap(), RuleAction::Reject);
/// ```
///
/// The second variant assumes a non-string carrier type, which must be (de-)serializable:
///
/// ```rust
/// oscloud::protocol_enum! {
///     #[doc = "IP protocol versions."]
///     enum IpVersion: u8 {
///         V4 = 4,
///         V6 = 6
///     }
/// }
///
/// assert_eq!(u8::from(IpVersion::V6), 6);
/// ```
///
/// These two variants produce a failure when an unknown value is deserialized. Statuses are often
/// extended by newer services, so string enumerations can provide a fallback value instead:
///
/// ```rust
/// oscloud::protocol_enum! {
///     #[doc = "Possible zone statuses."]
///     #[non_exhaustive]
///     enum ZoneStatus = Unknown {
///         Active = "ACTIVE",
///         Pending = "PENDING",
///         Error = "ERROR",
///         Unknown = "UNKNOWN"
///     }
/// }
///
/// let status: ZoneStatus = serde_json::from_str("\"SHINY\"").unwrap();
/// assert_eq!(status, ZoneStatus::Unknown);
/// ```
#[macro_export]
macro_rules! protocol_enum {
    {$(#[$attr:meta])* enum $name:ident: $carrier:ty {
        $($(#[$iattr:meta])* $item:ident = $val:literal),+
    }} => (
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$iattr])* $item),+,
        }

        impl From<$name> for $carrier {
            /// Converts the enum to the carrier value.
            fn from(value: $name) -> $carrier {
                match value {
                    $($name::$item => $val),+,
                }
            }
        }

        impl ::std::fmt::Display for $name {
            /// Displays the underlying protocol value.
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&<$carrier>::from(*self), f)
            }
        }

        impl<'de> ::serde::de::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
                    where D: ::serde::de::Deserializer<'de> {
                let value: $carrier = ::serde::de::Deserialize::deserialize(deserializer)?;
                match value {
                    $($val => Ok($name::$item)),+,
                    other => Err(<D::Error as ::serde::de::Error>::custom(format!(
                        "Unexpected {}: {}", stringify!($name), other
                    ))),
                }
            }
        }

        impl ::serde::ser::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
                    where S: ::serde::ser::Serializer {
                ::serde::ser::Serialize::serialize(&<$carrier>::from(*self), serializer)
            }
        }
    );

    {$(#[$attr:meta])* enum $name:ident {
        $($(#[$iattr:meta])* $item:ident = $val:literal),+
    }} => (
        $crate::protocol_enum! {
            $(#[$attr])*
            __string $name {
                $($(#[$iattr])* $item = $val),+
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::Error;

            fn from_str(value: &str) -> ::std::result::Result<Self, Self::Err> {
                match value {
                    $($val => Ok($name::$item)),+,
                    other => Err($crate::Error::new(
                        $crate::ErrorKind::InvalidInput,
                        format!("Unexpected {}: {}", stringify!($name), other),
                    )),
                }
            }
        }

        impl<'de> ::serde::de::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
                    where D: ::serde::de::Deserializer<'de> {
                let value: String = ::serde::de::Deserialize::deserialize(deserializer)?;
                value.parse().map_err(<D::Error as ::serde::de::Error>::custom)
            }
        }
    );

    {$(#[$attr:meta])* enum $name:ident = $default:ident {
        $($(#[$iattr:meta])* $item:ident = $val:literal),+
    }} => (
        $crate::protocol_enum! {
            $(#[$attr])*
            __string $name {
                $($(#[$iattr])* $item = $val),+
            }
        }

        impl Default for $name {
            fn default() -> $name {
                $name::$default
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ::std::convert::Infallible;

            /// Unknown values are converted to the default.
            fn from_str(value: &str) -> ::std::result::Result<Self, Self::Err> {
                Ok(match value {
                    $($val => $name::$item),+,
                    _ => Default::default(),
                })
            }
        }

        impl<'de> ::serde::de::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
                    where D: ::serde::de::Deserializer<'de> {
                let value: String = ::serde::de::Deserialize::deserialize(deserializer)?;
                Ok(match value.parse() {
                    Ok(result) => result,
                    Err(never) => match never {},
                })
            }
        }
    );

    {$(#[$attr:meta])* __string $name:ident {
        $($(#[$iattr:meta])* $item:ident = $val:literal),+
    }} => (
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$iattr])* $item),+,
        }

        impl $name {
            /// The underlying protocol value.
            pub fn as_str(&self) -> &'static str {
                match *self {
                    $($name::$item => $val),+,
                }
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.as_str().to_string()
            }
        }

        impl ::std::fmt::Display for $name {
            /// Displays the underlying protocol value.
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::serde::ser::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
                    where S: ::serde::ser::Serializer {
                serializer.serialize_str(self.as_str())
            }
        }
    );
}
