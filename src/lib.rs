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

//! Asynchronous OpenStack client bindings.
//!
//! # Sessions and adapters
//!
//! A [Session](struct.Session.html) wraps an [authentication type](trait.AuthType.html) and
//! resolves service endpoints. An [Adapter](struct.Adapter.html) is bound to one service and is
//! what all resource functions accept:
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), oscloud::Error> {
//! use oscloud::dns::v2::zones;
//!
//! let session = oscloud::Session::from_env()?;
//! let dns = session.adapter(oscloud::services::DNS)?;
//!
//! let zone = zones::create(
//!     &dns,
//!     &zones::CreateOpts {
//!         name: "example.org.".into(),
//!         email: Some("joe@example.org".into()),
//!         ttl: Some(7200),
//!         ..Default::default()
//!     },
//! )
//! .await?;
//! println!("Created zone {}", zone.id);
//! # Ok(()) }
//! ```
//!
//! # Pagination
//!
//! Listing calls return a lazy [Pager](pagination/struct.Pager.html). Nothing is fetched until
//! it is iterated with `each_page`, `all_pages`, `all` or, with the `stream` feature, turned
//! into a stream.
//!
//! # Waiting
//!
//! Long-running operations are tracked with [wait_for](fn.wait_for.html) or resource-specific
//! helpers like `zones::wait_for_status`.

#![crate_name = "oscloud"]
#![crate_type = "lib"]
// NOTE: we do not use generic deny(warnings) to avoid breakages with new
// versions of the compiler. Add more warnings here as you discover them.
// Taken from https://github.com/rust-unofficial/patterns/
#![deny(
    improper_ctypes,
    missing_debug_implementations,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    trivial_numeric_casts,
    unconditional_recursion,
    unsafe_code,
    unused_allocation,
    unused_comparisons,
    unused_doc_comments,
    unused_import_braces,
    unused_parens,
    while_true
)]
#![warn(missing_docs, unused)]
#![allow(
    clippy::new_ret_no_self,
    clippy::should_implement_trait,
    clippy::wrong_self_convention
)]

mod adapter;
mod apiversion;
mod auth;
pub mod client;
pub mod common;
mod error;
mod loading;
mod macros;
pub mod pagination;
pub mod params;
pub mod services;
mod session;
#[cfg(feature = "stream")]
mod stream;
mod url;
mod waiter;

pub mod dns;
pub mod loadbalancer;
pub mod networking;
pub mod sharedfilesystems;

pub use crate::adapter::Adapter;
pub use crate::apiversion::ApiVersion;
pub use crate::auth::{AuthType, NoAuth, Token};
pub use crate::error::{Error, ErrorKind};
pub use crate::loading::CloudConfig;
pub use crate::pagination::{LinkedPage, MarkerPage, Page, Pager, ResourcePage, SinglePage};
pub use crate::params::{ToBody, ToQuery};
pub use crate::session::Session;
pub use crate::waiter::{wait_for, Waiter, DEFAULT_INTERVAL};
