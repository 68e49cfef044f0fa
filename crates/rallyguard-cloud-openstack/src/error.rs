//! OpenStack provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenStackError {
    #[error("openstack CLI not found: {0}")]
    CliNotFound(String),

    #[error("openstack command failed: {0}")]
    CommandFailed(String),

    #[error("Unexpected openstack output: {0}")]
    UnexpectedOutput(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<OpenStackError> for rallyguard_cloud::CloudError {
    fn from(e: OpenStackError) -> Self {
        match e {
            OpenStackError::CommandFailed(msg) => rallyguard_cloud::CloudError::CommandFailed(msg),
            other => rallyguard_cloud::CloudError::Api(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, OpenStackError>;
