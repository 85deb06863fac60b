use thiserror::Error;


/// Fetch failure of a single site request
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// TLS certificate chain not trusted (url, details)
    #[error("URL: {0} has untrusted TLS certificate. Details: {1}")]
    UntrustedCertificate(String, String),

    /// Request timed out (url, timeout in seconds)
    #[error("URL: {0} couldn't be reached in time frame of {1} seconds")]
    Timeout(String, u64),

    /// Connection couldn't be established (url, details)
    #[error("Failed to connect to URL: {0}. Details: {1}")]
    Connection(String, String),

    /// Any other transport failure (url, details)
    #[error("Request to URL: {0} failed. Details: {1}")]
    Transport(String, String),
}


impl FetchError {
    /// Whether the failure is caused by an untrusted certificate chain
    pub fn is_untrusted_certificate(&self) -> bool {
        matches!(self, FetchError::UntrustedCertificate(..))
    }
}


/// Date extraction failure. Always degrades to "not updated".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// Site defines no date selector
    #[error("No date selector defined")]
    NoSelector,

    /// Selector couldn't be parsed (selector, details)
    #[error("Invalid date selector: \"{0}\". Details: {1}")]
    InvalidSelector(String, String),

    /// Selector matched nothing, or only blank text
    #[error("Date selector: \"{0}\" matched no text")]
    NoMatch(String),

    /// Extracted text doesn't match the date format (text, format)
    #[error("Date: \"{0}\" doesn't match format: \"{1}\"")]
    UnparsableDate(String, String),
}


/// Site store failure
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store can't be used at all
    #[error("Site store unavailable: {0}")]
    Unavailable(String),

    /// IO failure on a record (record, details)
    #[error("IO failure on site record: {0}. Details: {1}")]
    Io(String, #[source] std::io::Error),

    /// Record (de)serialization failure (record, details)
    #[error("Malformed site record: {0}. Details: {1}")]
    Serialization(String, #[source] serde_json::Error),

    /// No record with given id
    #[error("No site record with id: {0}")]
    NotFound(u64),
}


/// Failure that stops a whole run
#[derive(Debug, Error)]
pub enum SweepError {
    /// Sites couldn't be listed
    #[error("Couldn't list sites for {0}. Details: {1}")]
    Listing(String, #[source] StoreError),

    /// Worker pool couldn't be built
    #[error("Couldn't build worker pool: {0}")]
    WorkerPool(String),

    /// Site store couldn't be opened
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Actor mailbox failure
    #[error("Actor communication failure: {0}")]
    Actor(String),
}


/// Configuration failure
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file couldn't be read (path, details)
    #[error("Couldn't read configuration file: {0}. Details: {1}")]
    Io(String, #[source] std::io::Error),

    /// Config file isn't valid (path, details)
    #[error("Configuration error in file: {0}. Details: {1}")]
    Parse(String, #[source] serde_json::Error),
}
