//! # ionoskit
//!
//! Blocking client for the IONOS Cloud REST API.
//!
//! This crate provides:
//! - Credential resolution (token or username/password)
//! - JSON requests over a pluggable [`Transport`](transport::Transport)
//! - Request ids from `Location` headers and request-status polling
//! - Typed errors mapped from HTTP status codes
//!
//! ## Example
//!
//! ```no_run
//! use ionoskit::{Client, ClientConfig, Credentials};
//! use serde_json::json;
//!
//! let credentials = Credentials::resolve(None, Some("me".into()), Some("secret".into()))?;
//! let client = Client::new(ClientConfig::new(credentials));
//!
//! let accepted = client.post(
//!     "/datacenters",
//!     &json!({"properties": {"name": "web", "location": "de/fra"}}),
//! )?;
//! if let Some(id) = accepted.request_id {
//!     println!("request {id}: {:?}", client.request_status(&id)?);
//! }
//! # Ok::<(), ionoskit::Error>(())
//! ```

#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod request;
pub mod transport;

pub use client::{Accepted, Client};
pub use config::{ClientConfig, Credentials, DEFAULT_API_URL};
pub use error::{Error, ErrorCategory, Result};
pub use request::{RequestStatus, extract_request_id};
