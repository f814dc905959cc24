use thiserror::Error;

/// Everything that can abort a dashboard pass.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("{provider} request failed with status {status}: {message}")]
    UpstreamFetch {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("Failed to send request to {provider}: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected response from {provider}: {message}")]
    UnexpectedResponse {
        provider: &'static str,
        message: String,
    },

    #[error("Malformed timestamp '{0}'")]
    MalformedTimestamp(String),

    #[error("Tried to reduce an empty group")]
    EmptyGroupReduction,

    #[error("No API key configured for provider '{0}'.\nHint: run `skycast configure {0}` and enter your API key.")]
    MissingApiKey(&'static str),
}

impl DashboardError {
    /// Short text suitable for showing to the user instead of the full chain.
    pub fn user_message(&self) -> &'static str {
        match self {
            DashboardError::LocationNotFound(_) => {
                "Location not found. Please enter a city name again."
            }
            DashboardError::InvalidLocation(_) => {
                "Enter a city name or coordinates as `lat,lon`."
            }
            DashboardError::UpstreamFetch { .. } | DashboardError::Http { .. } => {
                "Error fetching weather data. Please try again."
            }
            DashboardError::UnexpectedResponse { .. } => {
                "Unexpected response format. Please try a different location."
            }
            DashboardError::MalformedTimestamp(_) | DashboardError::EmptyGroupReduction => {
                "The weather provider sent data that could not be summarized."
            }
            DashboardError::MissingApiKey(_) => "An API key is required for this provider.",
        }
    }

    /// Whether the user can fix this by entering a different location.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            DashboardError::LocationNotFound(_) | DashboardError::InvalidLocation(_)
        )
    }
}
