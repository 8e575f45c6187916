//! Workflow settings.
//!
//! [`WorkflowOptions`] is the raw, deserialised form where every value may be
//! missing. [`WorkflowOptions::validate`] turns it into [`WorkflowSettings`]
//! or fails before any network call is attempted.

use serde::Deserialize;
use url::Url;

use crate::{ProjectUrl, Secret, WorkflowError};

/// Paths probed for the repository configuration file when none are configured.
pub const DEFAULT_CONFIGURATION_FILE_PATHS: [&str; 4] = [
    ".azuredevops/dependabot.yml",
    ".azuredevops/dependabot.yaml",
    ".github/dependabot.yml",
    ".github/dependabot.yaml",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorkflowOptions {
    /// e.g. `https://dev.azure.com/contoso/Fabrikam`
    pub project_url: Option<String>,
    /// Personal access token used to call the Azure DevOps API.
    pub project_token: Option<Secret>,
    /// Public URL subscriptions deliver events to.
    pub webhook_endpoint: Option<String>,
    /// Basic-auth password the platform presents on every delivery.
    pub subscription_password: Option<Secret>,
    pub configuration_file_paths: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub project_url: ProjectUrl,
    pub project_token: Secret,
    pub webhook_endpoint: Url,
    pub subscription_password: Secret,
    pub configuration_file_paths: Vec<String>,
}

impl WorkflowOptions {
    pub fn validate(self) -> Result<WorkflowSettings, WorkflowError> {
        let project_url = ProjectUrl::parse(&required(self.project_url, "project_url")?)?;

        let project_token = required_secret(self.project_token, "project_token")?;

        let raw_endpoint = required(self.webhook_endpoint, "webhook_endpoint")?;
        let webhook_endpoint = Url::parse(&raw_endpoint).map_err(|e| WorkflowError::Configuration {
            message: format!("webhook_endpoint '{raw_endpoint}' is not a valid URL: {e}"),
        })?;
        if !matches!(webhook_endpoint.scheme(), "http" | "https") {
            return Err(WorkflowError::Configuration {
                message: format!("webhook_endpoint '{raw_endpoint}' must be http or https"),
            });
        }

        let subscription_password =
            required_secret(self.subscription_password, "subscription_password")?;

        let configuration_file_paths = match self.configuration_file_paths {
            Some(paths) if paths.iter().any(|p| p.trim().is_empty()) => {
                return Err(WorkflowError::Configuration {
                    message: "configuration_file_paths must not contain empty entries".into(),
                });
            }
            Some(paths) if !paths.is_empty() => paths,
            _ => DEFAULT_CONFIGURATION_FILE_PATHS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        };

        Ok(WorkflowSettings {
            project_url,
            project_token,
            webhook_endpoint,
            subscription_password,
            configuration_file_paths,
        })
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, WorkflowError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| WorkflowError::Configuration {
            message: format!("{name} is required"),
        })
}

fn required_secret(value: Option<Secret>, name: &str) -> Result<Secret, WorkflowError> {
    value
        .filter(|v| !v.is_blank())
        .ok_or_else(|| WorkflowError::Configuration {
            message: format!("{name} is required"),
        })
}
