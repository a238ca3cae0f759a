/// Failures surfaced by the progression engine's public operations.
#[derive(Debug, thiserror::Error)]
pub enum ProgressionError {
    /// No signed-in identity was bound to the call. Nothing was written.
    #[error("not authenticated")]
    Unauthenticated,

    /// A store read, write, or subscribe call failed. Propagated unchanged.
    #[error("stats store unavailable: {0:#}")]
    StoreUnavailable(#[source] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::ProgressionError;

    #[test]
    fn messages_name_the_condition() {
        assert_eq!(ProgressionError::Unauthenticated.to_string(), "not authenticated");

        let err = ProgressionError::StoreUnavailable(
            anyhow::anyhow!("connection refused").context("failed to read stats for `u1`"),
        );
        assert_eq!(
            err.to_string(),
            "stats store unavailable: failed to read stats for `u1`: connection refused"
        );
        assert!(matches!(err, ProgressionError::StoreUnavailable(_)));
    }
}
