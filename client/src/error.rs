//! Error handling for the GraphQL client

use stock_wizard_shared::RemoteError;
use thiserror::Error;

/// One entry of a GraphQL `errors` array
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQlError {
    pub message: String,
    pub path: Vec<String>,
}

impl std::fmt::Display for GraphQlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} (at {})", self.message, self.path.join("."))
        }
    }
}

fn format_graphql_errors(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Client error types
#[derive(Error, Debug)]
pub enum ClientError {
    // Transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Unauthorized")]
    Unauthorized,

    // Response errors
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQl(Vec<GraphQlError>),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No data in response")]
    MissingData,

    #[error("Not found: {0}")]
    NotFound(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] validator::ValidationErrors),
}

impl From<ClientError> for RemoteError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http(_) | ClientError::Status(_) | ClientError::Unauthorized => {
                RemoteError::Transport(err.to_string())
            }
            ClientError::GraphQl(_) => RemoteError::Query(err.to_string()),
            ClientError::NotFound(what) => RemoteError::NotFound(what),
            ClientError::Parse(_) | ClientError::MissingData => {
                RemoteError::Decode(err.to_string())
            }
            ClientError::Configuration(_) | ClientError::InvalidConfiguration(_) => {
                RemoteError::Transport(err.to_string())
            }
        }
    }
}
