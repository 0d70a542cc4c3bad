//! Global constants for the labelling client

/// Persistence service address used when no configuration is present
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Request timeout in seconds used when no configuration is present
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Application title shown in the browser tab and the terminal banner
pub const APP_TITLE: &str = "Labelbox Web App";

/// Id of the DOM element the browser client renders into
pub const ROOT_ELEMENT_ID: &str = "labelweb-root";
