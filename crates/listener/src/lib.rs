//! Synchronisation trigger consumer.
//!
//! Consumes [`workflow::ProcessSynchronization`] messages, either one at a
//! time through [`SynchronizationProcessor::process`] or as a stream from an
//! in-process channel through [`SynchronizationProcessor::run`]. How messages
//! reach the channel (queue, HTTP endpoint, timer) is up to the host.
//!
//! For each message the processor:
//!
//! 1. Validates the scope: at most one of `repositoryId` /
//!    `repositoryProviderId` may be set. Neither means the whole project.
//! 2. Resolves the target repositories through [`workflow::DevOpsProvider`].
//!    A `repositoryId` refers to a stored record and is translated to the
//!    provider's id by the [`SynchronizationSink`].
//! 3. Probes each repository for its configuration file.
//! 4. Hands each result to the [`SynchronizationSink`], which owns
//!    persistence and job scheduling.
//!
//! ## Architectural Layer
//!
//! **Orchestration.** Sequences calls between the [`workflow`] core and the
//! sink port. No transport details live here.

mod errors;
mod processor;
mod scope;
mod sink;

pub use errors::{ListenerError, SinkError};
pub use processor::{RepositorySynchronization, SynchronizationProcessor, SynchronizationReport};
pub use scope::SynchronizationScope;
pub use sink::{LoggingSink, SynchronizationSink};
