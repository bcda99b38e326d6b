//! Scan-level error taxonomy

use thiserror::Error;

/// Errors that end or preempt a scan. Everything else recovers locally
/// and is accounted for in the ledger.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Invalid manifest or configuration. Exit code 64.
    #[error("usage error: {0}")]
    Usage(String),

    /// Browser crash or unreachable target. Exit code 40.
    #[error("infrastructure failure: {0}")]
    Infrastructure(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = ScanError::Usage("expectation nav-1 has no target_path".into());
        assert!(e.to_string().starts_with("usage error"));
        let e = ScanError::Infrastructure("browser exited".into());
        assert!(e.to_string().starts_with("infrastructure failure"));
    }
}
