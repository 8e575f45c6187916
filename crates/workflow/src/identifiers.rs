//! Newtype identifiers.
//!
//! Azure DevOps hands out GUID-shaped strings for almost everything. Wrapping
//! each kind in its own type keeps a [`SubscriptionId`] from being passed
//! where a [`ProjectId`] is expected even though both are strings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// String-wrapped newtypes: blank values are rejected at construction.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// `None` for empty or whitespace-only input.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let value = value.into();
                (!value.trim().is_empty()).then_some(Self(value))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: assigned by Azure DevOps
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a service hook subscription.
    ///
    /// Opaque; assigned by the remote platform on creation.
    SubscriptionId
}

string_id! {
    /// Identifies a team project (the resolved GUID, not the display name).
    ProjectId
}

string_id! {
    /// Identifies a Git repository within a project.
    RepositoryId
}

string_id! {
    /// A Git commit SHA (40-character lowercase hex string).
    CommitSha
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies one processed synchronisation trigger.
///
/// Generated fresh for every message; recorded on spans so all activity for a
/// single trigger can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncRunId(Uuid);

impl SyncRunId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for SyncRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self.0.as_hyphenated(), f)
    }
}
