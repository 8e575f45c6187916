use workflow::ProcessSynchronization;

use crate::ListenerError;

/// Which repositories one trigger covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynchronizationScope {
    /// Every repository in the configured project.
    Project,
    /// A repository record held by the automation service.
    Record(String),
    /// A repository identified by the provider's own id.
    Provider(String),
}

impl SynchronizationScope {
    /// Derives the scope of `message`. Blank identifiers count as absent.
    pub fn of(message: &ProcessSynchronization) -> Result<Self, ListenerError> {
        let record = present(message.repository_id.as_deref());
        let provider = present(message.repository_provider_id.as_deref());

        match (record, provider) {
            (None, None) => Ok(Self::Project),
            (Some(id), None) => Ok(Self::Record(id.to_string())),
            (None, Some(id)) => Ok(Self::Provider(id.to_string())),
            (Some(record), Some(provider)) => Err(ListenerError::AmbiguousScope {
                repository_id: record.to_string(),
                repository_provider_id: provider.to_string(),
            }),
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
