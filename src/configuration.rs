//
// Default configuration and default values:
//


/// Default config file paths, first existing wins:
pub const CONFIG_PATHS: [&str; 2] = ["/etc/sitecheck/sitecheck.conf", "sitecheck.conf"];

/// Default directory holding site records:
pub const DEFAULT_SITES_DIR: &str = "sites";

/// Default name used in the user agent
pub const DEFAULT_AGENT_NAME: &str = "sitecheck";


/// Check timeout in seconds
pub const CHECK_TIMEOUT: u64 = 30;

/// Check connection timeout in seconds
pub const CHECK_CONNECTION_TIMEOUT: u64 = 30;

/// Max redirections to follow per check
pub const CHECK_MAX_REDIRECTIONS: u32 = 10;

/// Default successful HTTP code for content sites
pub const CHECK_DEFAULT_SUCCESSFUL_HTTP_CODE: u32 = 200;


/// Max age in days of an extracted content date for a site to be considered fresh
pub const MAX_DELAY_UPDATE_DAYS: i64 = 2;

/// Date format used when a site defines none (legacy date letters)
pub const DEFAULT_DATE_FORMAT: &str = "Y-m-d H:i:s";


/// Default amount of sites evaluated in parallel
pub const DEFAULT_CONCURRENCY: usize = 8;


/// Glyph for a passed verdict
pub const GLYPH_PASSED: &str = "✅";

/// Glyph for a failed verdict
pub const GLYPH_FAILED: &str = "❌";

/// Glyph for a verdict that wasn't assessed
pub const GLYPH_SKIPPED: &str = "➖";
