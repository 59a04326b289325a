use std::fmt;

#[derive(Debug)]
pub enum BackendApiError {
    /// A backend profile was configured without a credential string.
    MissingCredential { backend: String },
    /// The requested backend id is not registered.
    UnknownBackend(String),
    /// The requested model is not listed for the backend.
    UnknownModel { backend: String, model: String },
    /// No backend was selected and none was named in the request.
    NoBackendSelected,
    /// The profile's default model is missing from its model table.
    InvalidDefaultModel { backend: String, model: String },
    Request(reqwest::Error),
}

impl fmt::Display for BackendApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential { backend } => {
                write!(f, "backend '{backend}' has no credential configured")
            }
            Self::UnknownBackend(backend) => write!(f, "unknown backend '{backend}'"),
            Self::UnknownModel { backend, model } => {
                write!(f, "backend '{backend}' does not provide model '{model}'")
            }
            Self::NoBackendSelected => write!(f, "no backend is selected"),
            Self::InvalidDefaultModel { backend, model } => write!(
                f,
                "backend '{backend}' defaults to model '{model}' which is not in its model table"
            ),
            Self::Request(error) => write!(f, "request error: {error}"),
        }
    }
}

impl std::error::Error for BackendApiError {}

impl From<reqwest::Error> for BackendApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}
