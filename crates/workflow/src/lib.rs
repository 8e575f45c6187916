//! Azure DevOps subscription synchronisation domain.
//!
//! Keeps the service hook subscriptions of one project in line with a fixed
//! catalog, lists the project's repositories, and finds each repository's
//! update configuration file. Authenticated connections are cached per
//! (project URL, token).
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no HTTP code. The
//! remote platform is reached through [`DevOpsConnector`] / [`DevOpsClient`],
//! implemented by the `azure-devops` crate (and by fakes in tests).
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`SubscriptionId`, `ProjectId`, ...) |
//! | [`types`] | Wire and value types (`Subscription`, `Repository`, `ProjectUrl`, ...) |
//! | [`errors`] | `ProviderError`, `WorkflowError`, `RetryPolicy` |
//! | [`ports`] | Port traits and the system clock |
//! | [`settings`] | Raw options and their validated form |
//! | [`catalog`] | Desired subscriptions and platform identity constants |
//! | [`connection_cache`] | Expiring cache of authenticated handles |
//! | [`reconciler`] | Subscription create/update reconciliation |
//! | [`repositories`] | Repository listing |
//! | [`config_file`] | Multi-path configuration file probing |
//! | [`provider`] | Facade composing the above for one project |

mod cancellation;
pub mod catalog;
pub mod config_file;
pub mod connection_cache;
pub mod errors;
pub mod identifiers;
pub mod ports;
pub mod provider;
pub mod reconciler;
pub mod repositories;
pub mod settings;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use catalog::{DesiredSubscription, SUBSCRIPTION_CATALOG};
pub use connection_cache::{connection_cache_key, ConnectionCache, DEFAULT_CONNECTION_TTL};
pub use errors::{ProviderError, RetryPolicy, WorkflowError};
pub use identifiers::{CommitSha, ProjectId, RepositoryId, SubscriptionId, SyncRunId};
pub use ports::{Clock, ConnectionHandle, DevOpsClient, DevOpsConnector, SystemClock};
pub use provider::DevOpsProvider;
pub use reconciler::{publisher_inputs, same_endpoint, SubscriptionReconciler};
pub use settings::{WorkflowOptions, WorkflowSettings, DEFAULT_CONFIGURATION_FILE_PATHS};
pub use types::{
    ConfigFileItem, InputFilter, InputFilterCondition, InputFilterOperator,
    ProcessSynchronization, ProjectUrl, Repository, Secret, Subscription, SubscriptionsQuery,
    Timestamp,
};
