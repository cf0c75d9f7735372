//! Typed errors the driver needs to tell apart.

use thiserror::Error;

/// The participant pressed the abort key.
///
/// Travels through `anyhow::Error`; callers detect it with
/// `err.downcast_ref::<Aborted>()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("session aborted by participant")]
pub struct Aborted;

/// Whether an error chain ends in an [`Aborted`].
pub fn is_aborted(err: &anyhow::Error) -> bool {
    err.downcast_ref::<Aborted>().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_abort_survives_context() {
        let err: anyhow::Result<()> = Err(Aborted.into());
        let err = err.context("running trial 4").unwrap_err();
        assert!(is_aborted(&err));
        assert!(!is_aborted(&anyhow::anyhow!("disk full")));
    }
}
