//! The fixed set of service hook subscriptions this system maintains.
//!
//! The identity constants here are part of the remote contract: the platform
//! rejects updates that change publisher, consumer, or consumer action, so
//! they are only ever set when a subscription is created.

/// Publisher for Azure DevOps (TFS) events.
pub const PUBLISHER_ID: &str = "tfs";

/// Generic web hook consumer.
pub const CONSUMER_ID: &str = "webHooks";

/// "Post via HTTP" action of the web hook consumer.
pub const CONSUMER_ACTION_ID: &str = "httpRequest";

/// User name sent with basic auth on every delivery.
pub const BASIC_AUTH_USERNAME: &str = "vsts";

pub const EVENT_TYPE_PUSH: &str = "git.push";
pub const EVENT_TYPE_PULL_REQUEST_UPDATED: &str = "git.pullrequest.updated";
pub const EVENT_TYPE_PULL_REQUEST_MERGED: &str = "git.pullrequest.merged";
pub const EVENT_TYPE_PULL_REQUEST_COMMENT: &str = "ms.vss-code.git-pullrequest-comment-event";

/// One (event type, resource version) pair that must have exactly one
/// subscription pointing at our webhook endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DesiredSubscription {
    pub event_type: &'static str,
    pub resource_version: &'static str,
}

impl DesiredSubscription {
    pub const fn new(event_type: &'static str, resource_version: &'static str) -> Self {
        Self {
            event_type,
            resource_version,
        }
    }
}

/// The desired catalog, in reconciliation order.
pub const SUBSCRIPTION_CATALOG: [DesiredSubscription; 4] = [
    DesiredSubscription::new(EVENT_TYPE_PUSH, "1.0"),
    DesiredSubscription::new(EVENT_TYPE_PULL_REQUEST_UPDATED, "1.0"),
    DesiredSubscription::new(EVENT_TYPE_PULL_REQUEST_MERGED, "1.0"),
    DesiredSubscription::new(EVENT_TYPE_PULL_REQUEST_COMMENT, "2.0"),
];
