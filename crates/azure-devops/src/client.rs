//! Azure DevOps REST client.
//!
//! API documentation: <https://learn.microsoft.com/rest/api/azure/devops/>

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;
use workflow::{
    ConfigFileItem, ConnectionHandle, DevOpsClient, DevOpsConnector, ProjectId, ProjectUrl,
    ProviderError, Repository, Secret, Subscription, SubscriptionsQuery,
};

use crate::models::{GitItem, RepositoryList, SubscriptionsQueryResponse, TeamProject};

/// REST API version sent with every request.
pub const API_VERSION: &str = "7.1";

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Builds authenticated [`AzureDevOpsClient`]s.
///
/// One `reqwest::Client` (and so one connection pool) is shared by every
/// client this connector hands out.
#[derive(Clone)]
pub struct AzureDevOpsConnector {
    http: Client,
}

impl AzureDevOpsConnector {
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("devops-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(transport)?;
        Ok(Self { http })
    }
}

#[async_trait]
impl DevOpsConnector for AzureDevOpsConnector {
    async fn connect(
        &self,
        project_url: &ProjectUrl,
        token: &Secret,
    ) -> Result<ConnectionHandle, ProviderError> {
        let client = AzureDevOpsClient::new(
            self.http.clone(),
            project_url.organization_url(),
            token.clone(),
        )?;
        client.handshake().await?;
        info!(organization = %project_url.organization_url(), "Authenticated");
        Ok(Arc::new(client))
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Authenticated client rooted at one organisation (or collection) URL.
pub struct AzureDevOpsClient {
    http: Client,
    organization_url: Url,
    token: Secret,
}

impl AzureDevOpsClient {
    pub fn new(http: Client, organization_url: &str, token: Secret) -> Result<Self, ProviderError> {
        let organization_url =
            Url::parse(organization_url).map_err(|e| ProviderError::InvalidResponse {
                message: format!("invalid organization URL '{organization_url}': {e}"),
            })?;
        Ok(Self {
            http,
            organization_url,
            token,
        })
    }

    /// Verifies the credentials with a cheap authenticated call.
    async fn handshake(&self) -> Result<(), ProviderError> {
        let url = self.url(&["_apis", "connectionData"])?;
        self.send(self.request(Method::GET, url), "connection data")
            .await
            .map(drop)
    }

    /// `{organization}/{segments...}?api-version=...`
    fn url(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.organization_url.clone();
        url.path_segments_mut()
            .map_err(|()| ProviderError::InvalidResponse {
                message: format!("'{}' cannot be a base URL", self.organization_url),
            })?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, url = %url, "Azure DevOps request");
        self.http
            .request(method, url)
            .basic_auth("", Some(self.token.expose()))
    }

    async fn send(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<Response, ProviderError> {
        let response = request.send().await.map_err(transport)?;
        check(response, resource).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<T, ProviderError> {
        let response = self.send(request, resource).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::InvalidResponse {
                message: format!("{resource}: {e}"),
            })
    }
}

#[async_trait]
impl DevOpsClient for AzureDevOpsClient {
    async fn get_project_id(&self, project: &str) -> Result<ProjectId, ProviderError> {
        let url = self.url(&["_apis", "projects", project])?;
        let team_project: TeamProject = self
            .send_json(self.request(Method::GET, url), &format!("project {project}"))
            .await?;
        ProjectId::new(team_project.id).ok_or_else(|| ProviderError::InvalidResponse {
            message: format!("project {project} has an empty id"),
        })
    }

    async fn query_subscriptions(
        &self,
        query: &SubscriptionsQuery,
    ) -> Result<Vec<Subscription>, ProviderError> {
        let url = self.url(&["_apis", "hooks", "subscriptionsquery"])?;
        let response: SubscriptionsQueryResponse = self
            .send_json(
                self.request(Method::POST, url).json(query),
                "subscriptions query",
            )
            .await?;
        Ok(response.results)
    }

    async fn create_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, ProviderError> {
        let url = self.url(&["_apis", "hooks", "subscriptions"])?;
        self.send_json(
            self.request(Method::POST, url).json(subscription),
            "subscription",
        )
        .await
    }

    async fn update_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, ProviderError> {
        let id = subscription
            .id
            .as_ref()
            .ok_or_else(|| ProviderError::InvalidResponse {
                message: "cannot update a subscription without an id".into(),
            })?;
        let url = self.url(&["_apis", "hooks", "subscriptions", id.as_str()])?;
        self.send_json(
            self.request(Method::PUT, url).json(subscription),
            &format!("subscription {id}"),
        )
        .await
    }

    async fn list_repositories(&self, project: &str) -> Result<Vec<Repository>, ProviderError> {
        let url = self.url(&[project, "_apis", "git", "repositories"])?;
        let list: RepositoryList = self
            .send_json(
                self.request(Method::GET, url),
                &format!("repositories of {project}"),
            )
            .await?;
        Ok(list.value)
    }

    async fn get_repository(
        &self,
        project: &str,
        repository: &str,
    ) -> Result<Repository, ProviderError> {
        let url = self.url(&[project, "_apis", "git", "repositories", repository])?;
        self.send_json(
            self.request(Method::GET, url),
            &format!("repository {repository}"),
        )
        .await
    }

    async fn get_item(
        &self,
        project: &str,
        repository: &str,
        path: &str,
    ) -> Result<ConfigFileItem, ProviderError> {
        let mut url = self.url(&[project, "_apis", "git", "repositories", repository, "items"])?;
        url.query_pairs_mut()
            .append_pair("path", path)
            .append_pair("latestProcessedChange", "true")
            .append_pair("includeContent", "true")
            .append_pair("$format", "json");

        let item: GitItem = self
            .send_json(self.request(Method::GET, url), &format!("{repository}:{path}"))
            .await?;
        Ok(item.into_config_file())
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn transport(error: reqwest::Error) -> ProviderError {
    ProviderError::Transport {
        message: error.to_string(),
    }
}

/// Maps non-success responses onto [`ProviderError`].
///
/// Azure DevOps answers a rejected personal access token with `203` and an
/// HTML sign-in page rather than `401`, so `203` is treated as unauthorised.
async fn check(response: Response, resource: &str) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() && status != StatusCode::NON_AUTHORITATIVE_INFORMATION {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let message = response.text().await.unwrap_or_default();

    Err(match status {
        StatusCode::NOT_FOUND => ProviderError::NotFound {
            resource: resource.to_string(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Unauthorized { message },
        StatusCode::NON_AUTHORITATIVE_INFORMATION => ProviderError::Unauthorized {
            message: "credentials were rejected (sign-in page returned)".into(),
        },
        _ => ProviderError::Api {
            status: status.as_u16(),
            message,
            retry_after,
        },
    })
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
