use async_trait::async_trait;
use solana_sdk::transaction::VersionedTransaction;
use std::fmt;

/// Final result of one bundle submission.
///
/// Submission never surfaces a raw error; every failure is folded into one
/// of these variants so callers only branch on `is_confirmed()` while logs
/// keep the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Every transaction in the bundle reported `confirmed`
    Confirmed { bundle_id: String },
    /// The polling window elapsed without confirmation
    NotConfirmed { bundle_id: String },
    /// Bundle was accepted but a status poll failed, polling stopped
    StatusCheckFailed { bundle_id: String, reason: String },
    /// Relay could not be reached for submission
    RelayUnreachable(String),
    /// Relay answered but refused the bundle
    RelayRejected(String),
    /// Signer failed validation, nothing was sent
    InvalidSigner(String),
    /// Fee transaction could not be built, signed or serialized
    BuildFailed(String),
}

impl SubmissionOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, SubmissionOutcome::Confirmed { .. })
    }

    pub fn bundle_id(&self) -> Option<&str> {
        match self {
            SubmissionOutcome::Confirmed { bundle_id }
            | SubmissionOutcome::NotConfirmed { bundle_id }
            | SubmissionOutcome::StatusCheckFailed { bundle_id, .. } => Some(bundle_id),
            _ => None,
        }
    }

    /// Short machine-friendly tag for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            SubmissionOutcome::Confirmed { .. } => "confirmed",
            SubmissionOutcome::NotConfirmed { .. } => "not_confirmed",
            SubmissionOutcome::StatusCheckFailed { .. } => "status_check_failed",
            SubmissionOutcome::RelayUnreachable(_) => "relay_unreachable",
            SubmissionOutcome::RelayRejected(_) => "relay_rejected",
            SubmissionOutcome::InvalidSigner(_) => "invalid_signer",
            SubmissionOutcome::BuildFailed(_) => "build_failed",
        }
    }
}

impl fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionOutcome::Confirmed { bundle_id } => write!(f, "bundle {} confirmed", bundle_id),
            SubmissionOutcome::NotConfirmed { bundle_id } => {
                write!(f, "bundle {} not confirmed in time", bundle_id)
            }
            SubmissionOutcome::StatusCheckFailed { bundle_id, reason } => {
                write!(f, "status check for bundle {} failed: {}", bundle_id, reason)
            }
            SubmissionOutcome::RelayUnreachable(e) => write!(f, "relay unreachable: {}", e),
            SubmissionOutcome::RelayRejected(e) => write!(f, "relay rejected bundle: {}", e),
            SubmissionOutcome::InvalidSigner(e) => write!(f, "invalid signer: {}", e),
            SubmissionOutcome::BuildFailed(e) => write!(f, "fee transaction build failed: {}", e),
        }
    }
}

/// Submits a signed transaction together with a priority-fee transfer
#[async_trait]
pub trait BundleSubmitter: Send + Sync {
    async fn submit(&self, transaction: VersionedTransaction, tip_lamports: u64) -> SubmissionOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_confirmed_is_confirmed() {
        assert!(SubmissionOutcome::Confirmed { bundle_id: "b".into() }.is_confirmed());

        let failures = [
            SubmissionOutcome::NotConfirmed { bundle_id: "b".into() },
            SubmissionOutcome::StatusCheckFailed { bundle_id: "b".into(), reason: "x".into() },
            SubmissionOutcome::RelayUnreachable("x".into()),
            SubmissionOutcome::RelayRejected("x".into()),
            SubmissionOutcome::InvalidSigner("x".into()),
            SubmissionOutcome::BuildFailed("x".into()),
        ];
        for outcome in failures {
            assert!(!outcome.is_confirmed(), "{} should not be confirmed", outcome.kind());
        }
    }

    #[test]
    fn test_bundle_id_only_after_acceptance() {
        let outcome = SubmissionOutcome::NotConfirmed { bundle_id: "abc".into() };
        assert_eq!(outcome.bundle_id(), Some("abc"));
        assert_eq!(SubmissionOutcome::RelayUnreachable("down".into()).bundle_id(), None);
    }

    #[test]
    fn test_display() {
        let outcome = SubmissionOutcome::RelayRejected("bundle simulation failed".into());
        assert!(outcome.to_string().contains("simulation failed"));
        assert_eq!(outcome.kind(), "relay_rejected");
    }
}
