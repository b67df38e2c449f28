/// Error code registry for stockpipe
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 3000-3999: Storage errors
/// - 4000-4999: Execution errors
/// - 5000-5999: Orchestration errors
/// - 6000-6999: Crawl errors
/// - 7000-7999: Data errors
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_PARSE_ERROR: u16 = 1002;
    pub const CONFIG_MISSING_REQUIRED: u16 = 1003;
    pub const CONFIG_INVALID_VALUE: u16 = 1004;
    pub const CONFIG_VALIDATION_FAILED: u16 = 1005;

    // Storage errors (3000-3999)
    pub const STORAGE_GENERIC: u16 = 3000;
    pub const STORAGE_IO_ERROR: u16 = 3001;
    pub const STORAGE_NOT_FOUND: u16 = 3004;
    pub const STORAGE_LOCK_FAILED: u16 = 3005;
    pub const STORAGE_CORRUPTED: u16 = 3006;
    pub const STORAGE_BACKEND_ERROR: u16 = 3010;
    pub const STORAGE_SERIALIZATION_ERROR: u16 = 3011;

    // Execution errors (4000-4999)
    pub const EXEC_GENERIC: u16 = 4000;
    pub const EXEC_ASSET_FAILED: u16 = 4001;
    pub const EXEC_INTERRUPTED: u16 = 4006;

    // Orchestration errors (5000-5999)
    pub const ORCH_GENERIC: u16 = 5000;
    pub const ORCH_JOB_NOT_FOUND: u16 = 5001;
    pub const ORCH_ASSET_NOT_FOUND: u16 = 5002;
    pub const ORCH_INVALID_PARTITION: u16 = 5003;
    pub const ORCH_DUPLICATE_DEFINITION: u16 = 5004;
    pub const ORCH_UNKNOWN_DEPENDENCY: u16 = 5005;
    pub const ORCH_CIRCULAR_DEPENDENCY: u16 = 5010;

    // Crawl errors (6000-6999)
    pub const CRAWL_HTTP_ERROR: u16 = 6001;
    pub const CRAWL_API_ERROR: u16 = 6002;
    pub const CRAWL_API_INFORMATION: u16 = 6003;
    pub const CRAWL_PARSE_ERROR: u16 = 6004;

    // Data errors (7000-7999)
    pub const DATA_INVALID_FORMAT: u16 = 7001;
    pub const DATA_EMPTY: u16 = 7002;
    pub const DATA_CSV_ERROR: u16 = 7003;
    pub const DATA_PARQUET_ERROR: u16 = 7004;
    pub const DATA_PLOT_ERROR: u16 = 7005;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        1001 => "Configuration file not found",
        1002 => "Failed to parse configuration",
        1003 => "Required configuration field is missing",
        1004 => "Invalid value in configuration",
        1005 => "Configuration validation failed",

        3000 => "Generic storage error",
        3001 => "Storage I/O error",
        3004 => "Storage item not found",
        3005 => "Could not acquire a storage lock",
        3006 => "Storage data is corrupted",
        3010 => "Storage backend error",
        3011 => "Storage serialization error",

        4000 => "Generic execution error",
        4001 => "Asset materialization failed",
        4006 => "Execution interrupted",

        5000 => "Generic orchestration error",
        5001 => "Job not found",
        5002 => "Asset not found",
        5003 => "Invalid partition key",
        5004 => "Duplicate definition",
        5005 => "Asset depends on an unknown asset",
        5010 => "Circular dependency between assets",

        6001 => "HTTP request failed",
        6002 => "Price API returned an error message",
        6003 => "Price API returned an information notice instead of data",
        6004 => "Failed to parse price API response",

        7001 => "Invalid data format",
        7002 => "Dataset is empty",
        7003 => "CSV read/write error",
        7004 => "Parquet encode/decode error",
        7005 => "Chart rendering error",
        _ => "Unknown error code",
    }
}
