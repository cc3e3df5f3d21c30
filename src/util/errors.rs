use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Important data missing: {0}")]
    MissingRequiredData(&'static str),
    #[error("Missing configuration value: {0}")]
    MissingConfig(&'static str),
    #[error("Response received is not ok [{0}]")]
    FailedStatusCode(String),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid url for {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },
}
