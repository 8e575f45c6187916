//! Azure DevOps infrastructure adapter.
//!
//! Implements the port traits defined in the [`workflow`] crate
//! ([`workflow::DevOpsConnector`], [`workflow::DevOpsClient`]) over the Azure
//! DevOps REST API using [`reqwest`].
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. URL layout,
//! authentication headers, API versioning, and HTTP status mapping live here;
//! the [`workflow`] crate never sees them.
//!
//! ## Status mapping
//!
//! | Response | [`workflow::ProviderError`] |
//! |----------|-----------------------------|
//! | 404 | `NotFound` |
//! | 401, 403, 203 (sign-in page) | `Unauthorized` |
//! | other non-2xx | `Api` (with `Retry-After`, if sent) |
//! | no response | `Transport` |
//! | undecodable body | `InvalidResponse` |

mod client;
mod models;

pub use client::{AzureDevOpsClient, AzureDevOpsConnector, API_VERSION, DEFAULT_TIMEOUT};
