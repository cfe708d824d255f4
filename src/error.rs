// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for failures surfaced to the host.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}
