use curl::{
    easy::{Easy2, Handler, WriteError},
    Error as CurlError,
};
use std::{cmp::min, fmt, time::Duration};

use crate::{
    checks::site::Site,
    configuration::{
        CHECK_CONNECTION_TIMEOUT, CHECK_MAX_REDIRECTIONS, CHECK_TIMEOUT, DEFAULT_AGENT_NAME,
    },
    products::unexpected::FetchError,
    *,
};


/// Certificate verification failures which mean the chain itself isn't trusted.
/// Host name mismatch or expiry aren't among them.
const UNTRUSTED_CHAIN_PROBLEMS: [&str; 5] = [
    "unable to get local issuer certificate",
    "unable to get issuer certificate",
    "unable to verify the first certificate",
    "self signed certificate",
    "self-signed certificate",
];


/// Collects content from Curl:
pub struct Collector(Vec<u8>);


impl Handler for Collector {
    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        self.0.extend_from_slice(data);
        Ok(data.len())
    }
}


impl fmt::Debug for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Collector({} bytes)", self.0.len())
    }
}


/// TLS verification mode of a request
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TlsVerification {
    /// Peer and host are verified
    Enabled,

    /// Peer and host verification skipped
    Disabled,
}


/// Raw HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status_code: u32,

    /// Response body as text
    pub body: String,
}


/// Successful fetch of a site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// HTTP status code
    pub status_code: u32,

    /// Response body as text
    pub body: String,

    /// Verification mode the response was obtained with
    pub tls: TlsVerification,
}


/// Performs single HTTP GET requests
pub trait Transport: Send + Sync {
    /// GET given URL
    fn get(&self, url: &str, tls: TlsVerification) -> Result<Response, FetchError>;
}


/// Fetch site content. Untrusted certificate chain gets one more attempt with verification disabled.
#[instrument(skip(transport, site), fields(domain = %site.domain))]
pub fn fetch<T: Transport + ?Sized>(transport: &T, site: &Site) -> Result<Fetched, FetchError> {
    let url = site.url();
    trace!("Fetching URL: {}", url);
    let (response, tls) = match transport.get(&url, TlsVerification::Enabled) {
        Ok(response) => (response, TlsVerification::Enabled),
        Err(err) if err.is_untrusted_certificate() => {
            warn!("{}. Retrying with TLS verification disabled.", err);
            let response = transport.get(&url, TlsVerification::Disabled)?;
            (response, TlsVerification::Disabled)
        }
        Err(err) => {
            debug!("{}", err);
            return Err(err);
        }
    };
    debug!("URL: {} responded with code: {}", url, response.status_code);
    Ok(Fetched {
        status_code: response.status_code,
        body: response.body,
        tls,
    })
}


/// Curl driven transport
#[derive(Debug, Clone)]
pub struct CurlTransport {
    timeout: u64,
    connection_timeout: u64,
    user_agent: String,
}


impl Default for CurlTransport {
    fn default() -> CurlTransport {
        CurlTransport::new(CHECK_TIMEOUT, CHECK_CONNECTION_TIMEOUT, None)
    }
}


impl CurlTransport {
    /// New transport with timeouts in seconds. Connection timeout never exceeds the total one.
    pub fn new(timeout: u64, connection_timeout: u64, user_agent: Option<String>) -> CurlTransport {
        let timeout = timeout.max(1);
        CurlTransport {
            timeout,
            connection_timeout: min(connection_timeout.max(1), timeout),
            user_agent: user_agent.unwrap_or_else(|| {
                format!(
                    "{name}/{version}",
                    name = DEFAULT_AGENT_NAME,
                    version = env!("CARGO_PKG_VERSION")
                )
            }),
        }
    }


    fn request(&self, url: &str, tls: TlsVerification) -> Result<Response, CurlError> {
        let verify = tls == TlsVerification::Enabled;
        let mut curl = Easy2::new(Collector(Vec::new()));
        curl.url(url)?;
        curl.useragent(&self.user_agent)?;
        curl.get(true)?;
        curl.follow_location(true)?;
        curl.max_redirections(CHECK_MAX_REDIRECTIONS)?;
        curl.connect_timeout(Duration::from_secs(self.connection_timeout))?;
        curl.timeout(Duration::from_secs(self.timeout))?;
        curl.ssl_verify_peer(verify)?;
        curl.ssl_verify_host(verify)?;
        if !verify {
            trace!("Disabled TLS-PEER and TLS-HOST verification for: {}", url);
        }
        curl.perform()?;

        let status_code = curl.response_code()?;
        let body = String::from_utf8_lossy(&curl.get_ref().0).into_owned();
        Ok(Response { status_code, body })
    }


    /// Converts CurlError to FetchError
    fn classify(&self, url: &str, err: CurlError) -> FetchError {
        if is_untrusted_chain(&err) {
            FetchError::UntrustedCertificate(url.to_string(), err.to_string())
        } else if err.is_operation_timedout() {
            FetchError::Timeout(url.to_string(), self.timeout)
        } else if err.is_couldnt_connect()
            || err.is_couldnt_resolve_host()
            || err.is_couldnt_resolve_proxy()
        {
            FetchError::Connection(url.to_string(), err.to_string())
        } else {
            FetchError::Transport(url.to_string(), err.to_string())
        }
    }
}


/// Whether Curl refused the certificate chain as untrusted
fn is_untrusted_chain(err: &CurlError) -> bool {
    if err.is_ssl_issuer_error() {
        return true;
    }
    if !(err.is_ssl_cacert() || err.is_peer_failed_verification()) {
        return false;
    }
    names_untrusted_chain(err.extra_description().unwrap_or_else(|| err.description()))
}


fn names_untrusted_chain(details: &str) -> bool {
    let details = details.to_lowercase();
    UNTRUSTED_CHAIN_PROBLEMS
        .iter()
        .any(|problem| details.contains(problem))
}


impl Transport for CurlTransport {
    fn get(&self, url: &str, tls: TlsVerification) -> Result<Response, FetchError> {
        self.request(url, tls)
            .map_err(|err| self.classify(url, err))
    }
}
