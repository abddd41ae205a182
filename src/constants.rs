// src/constants.rs

/// Base URL of the Bitbucket Cloud REST API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.bitbucket.org/2.0";

/// Base URL used to build clone URLs when the API omits an HTTPS clone link.
pub const DEFAULT_WEB_BASE_URL: &str = "https://bitbucket.org";

/// Page size requested from the repository listing endpoint.
pub const LISTING_PAGE_LEN: u32 = 100;

/// Page size used by the credential check.
pub const PROBE_PAGE_LEN: u32 = 1;

/// Timeout for a single API request.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// User agent sent with API requests.
pub const USER_AGENT: &str = concat!("bitbucket-sync/", env!("CARGO_PKG_VERSION"));

/// Default and upper bound for the worker pool size.
pub const DEFAULT_JOBS: usize = 4;
pub const MAX_JOBS: usize = 16;

/// Defaults for the config file and its optional fields.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_OUTPUT_DIR: &str = "downloads";

/// Example values shipped in `config.example.json`.
pub const PLACEHOLDER_VALUES: &[&str] = &[
    "your-workspace-slug",
    "your-bitbucket-username",
    "your-api-token-here",
];

/// Extension of archive snapshots, and the suffix of an archive being written.
pub const ARCHIVE_EXTENSION: &str = "zip";
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Prefix of per-repository scratch directories used while archiving.
pub const SCRATCH_PREFIX: &str = "bitbucket-sync-";

/// Clone depth for archive snapshots. History is discarded anyway.
pub const ARCHIVE_CLONE_DEPTH: u32 = 1;

/// Horizontal rule used by the human-readable report.
pub const REPORT_RULE: &str = "============================================================";
