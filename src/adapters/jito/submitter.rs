//! Jito Bundle Submitter
//!
//! Pairs a signed swap with a tip transfer to a random tip account,
//! submits both as one bundle and polls until every bundle id reports
//! `confirmed` or the confirmation window closes.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction,
    transaction::VersionedTransaction,
};
use tokio::time::Instant;

use super::client::BundleRelay;
use super::config::{tip_accounts, JitoConfig};
use super::error::JitoError;
use super::types::all_confirmed;
use crate::ports::bundle::{BundleSubmitter, SubmissionOutcome};

pub struct JitoBundleSubmitter<R: BundleRelay> {
    relay: R,
    signer: Arc<Keypair>,
    tip_accounts: Vec<Pubkey>,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl<R: BundleRelay> JitoBundleSubmitter<R> {
    pub fn new(relay: R, signer: Arc<Keypair>, config: &JitoConfig) -> Result<Self, JitoError> {
        let tip_accounts = config
            .tip_accounts
            .iter()
            .map(|s| Pubkey::from_str(s).map_err(|e| JitoError::InvalidTipAccount(format!("{}: {}", s, e))))
            .collect::<Result<Vec<_>, _>>()?;

        if tip_accounts.is_empty() {
            return Err(JitoError::InvalidTipAccount("no tip accounts configured".to_string()));
        }

        Ok(Self {
            relay,
            signer,
            tip_accounts,
            confirm_timeout: config.confirm_timeout,
            poll_interval: config.poll_interval,
        })
    }

    /// Signer must yield a real, on-curve public key
    fn validate_signer(&self) -> Result<Pubkey, String> {
        let pubkey = self.signer.try_pubkey().map_err(|e| e.to_string())?;
        if pubkey == Pubkey::default() {
            return Err("signer public key is the default key".to_string());
        }
        if !pubkey.is_on_curve() {
            return Err(format!("signer public key {} is not on curve", pubkey));
        }
        Ok(pubkey)
    }

    fn build_tip_transaction(
        &self,
        payer: &Pubkey,
        tip_account: &Pubkey,
        tip_lamports: u64,
        blockhash: Hash,
    ) -> Result<VersionedTransaction, String> {
        let instruction = system_instruction::transfer(payer, tip_account, tip_lamports);
        let message = v0::Message::try_compile(payer, &[instruction], &[], blockhash)
            .map_err(|e| format!("compile tip message: {}", e))?;

        VersionedTransaction::try_new(VersionedMessage::V0(message), &[self.signer.as_ref()])
            .map_err(|e| format!("sign tip transaction: {}", e))
    }

    /// Poll until confirmed, the window closes, or a status call fails
    async fn await_confirmation(&self, bundle_id: String) -> SubmissionOutcome {
        let ids = vec![bundle_id.clone()];
        let started = Instant::now();

        while started.elapsed() < self.confirm_timeout {
            match self.relay.get_bundle_statuses(ids.clone()).await {
                Ok(statuses) => {
                    if all_confirmed(&ids, &statuses) {
                        tracing::debug!(bundle_id = %bundle_id, elapsed_ms = started.elapsed().as_millis() as u64, "Bundle confirmed");
                        return SubmissionOutcome::Confirmed { bundle_id };
                    }
                }
                Err(e) => {
                    return SubmissionOutcome::StatusCheckFailed {
                        bundle_id,
                        reason: e.to_string(),
                    };
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        SubmissionOutcome::NotConfirmed { bundle_id }
    }
}

fn encode(tx: &VersionedTransaction) -> Result<String, String> {
    bincode::serialize(tx)
        .map(|bytes| bs58::encode(bytes).into_string())
        .map_err(|e| format!("serialize transaction: {}", e))
}

#[async_trait]
impl<R: BundleRelay> BundleSubmitter for JitoBundleSubmitter<R> {
    async fn submit(&self, transaction: VersionedTransaction, tip_lamports: u64) -> SubmissionOutcome {
        let payer = match self.validate_signer() {
            Ok(pubkey) => pubkey,
            Err(reason) => return SubmissionOutcome::InvalidSigner(reason),
        };

        let Some(tip_account) = tip_accounts::random_tip_account(&self.tip_accounts) else {
            return SubmissionOutcome::BuildFailed("no tip account available".to_string());
        };

        let blockhash = *transaction.message.recent_blockhash();
        let entries = self
            .build_tip_transaction(&payer, &tip_account, tip_lamports, blockhash)
            .and_then(|tip_tx| Ok(vec![encode(&tip_tx)?, encode(&transaction)?]));

        let entries = match entries {
            Ok(entries) => entries,
            Err(reason) => return SubmissionOutcome::BuildFailed(reason),
        };

        tracing::info!(
            tip_account = %tip_account,
            tip_lamports,
            "Submitting bundle"
        );

        let bundle_id = match self.relay.send_bundle(entries).await {
            Ok(id) => id,
            Err(e) if e.is_connectivity() => return SubmissionOutcome::RelayUnreachable(e.to_string()),
            Err(e) => return SubmissionOutcome::RelayRejected(e.to_string()),
        };

        tracing::info!(bundle_id = %bundle_id, "Bundle accepted, polling for confirmation");
        self.await_confirmation(bundle_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::jito::client::MockBundleRelay;
    use crate::adapters::jito::types::BundleStatusEntry;
    use solana_sdk::message::Message;

    fn fast_config() -> JitoConfig {
        JitoConfig::default().with_polling(Duration::from_millis(40), Duration::from_millis(5))
    }

    fn primary_tx(signer: &Keypair, blockhash: Hash) -> VersionedTransaction {
        let ix = system_instruction::transfer(&signer.pubkey(), &Pubkey::new_unique(), 1);
        let message = Message::new_with_blockhash(&[ix], Some(&signer.pubkey()), &blockhash);
        VersionedTransaction::try_new(VersionedMessage::Legacy(message), &[signer]).unwrap()
    }

    fn confirmed(id: &str) -> Vec<Option<BundleStatusEntry>> {
        vec![Some(BundleStatusEntry {
            bundle_id: id.to_string(),
            confirmation_status: Some("confirmed".to_string()),
            slot: Some(1),
            transactions: Vec::new(),
        })]
    }

    #[tokio::test]
    async fn test_confirmed_bundle() {
        let signer = Arc::new(Keypair::new());
        let blockhash = Hash::new_unique();
        let tx = primary_tx(&signer, blockhash);
        let expected_primary = encode(&tx).unwrap();

        let mut relay = MockBundleRelay::new();
        relay
            .expect_send_bundle()
            .withf(move |txs| txs.len() == 2 && txs[1] == expected_primary)
            .times(1)
            .returning(|_| Ok("bundle-1".to_string()));
        relay
            .expect_get_bundle_statuses()
            .withf(|ids| ids == &vec!["bundle-1".to_string()])
            .times(1)
            .returning(|_| Ok(confirmed("bundle-1")));

        let submitter = JitoBundleSubmitter::new(relay, signer, &fast_config()).unwrap();
        let outcome = submitter.submit(tx, 1_000_000).await;

        assert_eq!(outcome, SubmissionOutcome::Confirmed { bundle_id: "bundle-1".to_string() });
    }

    #[tokio::test]
    async fn test_tip_transaction_reuses_blockhash_and_pays_tip_account() {
        let signer = Arc::new(Keypair::new());
        let payer = signer.pubkey();
        let blockhash = Hash::new_unique();
        let tx = primary_tx(&signer, blockhash);

        let mut relay = MockBundleRelay::new();
        relay
            .expect_send_bundle()
            .withf(move |txs| {
                let bytes = bs58::decode(&txs[0]).into_vec().unwrap();
                let tip: VersionedTransaction = bincode::deserialize(&bytes).unwrap();
                let keys = tip.message.static_account_keys();
                *tip.message.recent_blockhash() == blockhash
                    && keys[0] == payer
                    && keys.iter().any(|k| tip_accounts::TIP_ACCOUNTS.contains(&k.to_string().as_str()))
                    && tip.verify_with_results().iter().all(|ok| *ok)
            })
            .returning(|_| Ok("bundle-2".to_string()));
        relay
            .expect_get_bundle_statuses()
            .returning(|_| Ok(confirmed("bundle-2")));

        let submitter = JitoBundleSubmitter::new(relay, signer, &fast_config()).unwrap();
        assert!(submitter.submit(tx, 5_000).await.is_confirmed());
    }

    #[tokio::test]
    async fn test_polls_until_confirmed() {
        let signer = Arc::new(Keypair::new());
        let tx = primary_tx(&signer, Hash::new_unique());

        let mut relay = MockBundleRelay::new();
        relay.expect_send_bundle().returning(|_| Ok("b".to_string()));

        let mut seq = mockall::Sequence::new();
        relay
            .expect_get_bundle_statuses()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![None]));
        relay
            .expect_get_bundle_statuses()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(confirmed("b")));

        let submitter = JitoBundleSubmitter::new(relay, signer, &fast_config()).unwrap();
        assert!(submitter.submit(tx, 1).await.is_confirmed());
    }

    #[tokio::test]
    async fn test_window_elapses_without_confirmation() {
        let signer = Arc::new(Keypair::new());
        let tx = primary_tx(&signer, Hash::new_unique());

        let mut relay = MockBundleRelay::new();
        relay.expect_send_bundle().returning(|_| Ok("slow".to_string()));
        relay.expect_get_bundle_statuses().returning(|_| {
            Ok(vec![Some(BundleStatusEntry {
                bundle_id: "slow".to_string(),
                confirmation_status: Some("processed".to_string()),
                slot: None,
                transactions: Vec::new(),
            })])
        });

        let submitter = JitoBundleSubmitter::new(relay, signer, &fast_config()).unwrap();
        let outcome = submitter.submit(tx, 1).await;

        assert_eq!(outcome, SubmissionOutcome::NotConfirmed { bundle_id: "slow".to_string() });
    }

    #[tokio::test]
    async fn test_status_error_aborts_polling() {
        let signer = Arc::new(Keypair::new());
        let tx = primary_tx(&signer, Hash::new_unique());

        let mut relay = MockBundleRelay::new();
        relay.expect_send_bundle().returning(|_| Ok("b".to_string()));
        relay
            .expect_get_bundle_statuses()
            .times(1)
            .returning(|_| Err(JitoError::NetworkError("connection reset".to_string())));

        let submitter = JitoBundleSubmitter::new(relay, signer, &fast_config()).unwrap();
        let outcome = submitter.submit(tx, 1).await;

        assert_eq!(outcome.kind(), "status_check_failed");
        assert!(!outcome.is_confirmed());
    }

    #[tokio::test]
    async fn test_send_failures_are_classified() {
        let signer = Arc::new(Keypair::new());

        let mut relay = MockBundleRelay::new();
        relay
            .expect_send_bundle()
            .times(1)
            .returning(|_| Err(JitoError::NetworkError("refused".to_string())));
        relay.expect_get_bundle_statuses().never();
        let submitter = JitoBundleSubmitter::new(relay, signer.clone(), &fast_config()).unwrap();
        let outcome = submitter.submit(primary_tx(&signer, Hash::new_unique()), 1).await;
        assert_eq!(outcome, SubmissionOutcome::RelayUnreachable("Network error: refused".to_string()));

        let mut relay = MockBundleRelay::new();
        relay.expect_send_bundle().returning(|_| {
            Err(JitoError::ApiError {
                code: -32602,
                message: "bundle contains an already processed transaction".to_string(),
            })
        });
        let submitter = JitoBundleSubmitter::new(relay, signer.clone(), &fast_config()).unwrap();
        let outcome = submitter.submit(primary_tx(&signer, Hash::new_unique()), 1).await;
        assert_eq!(outcome.kind(), "relay_rejected");
    }

    #[test]
    fn test_invalid_tip_account_rejected() {
        let config = fast_config().with_tip_accounts(vec!["not-a-key".to_string()]);
        let result = JitoBundleSubmitter::new(MockBundleRelay::new(), Arc::new(Keypair::new()), &config);
        assert!(matches!(result, Err(JitoError::InvalidTipAccount(_))));

        let config = fast_config().with_tip_accounts(vec![]);
        let result = JitoBundleSubmitter::new(MockBundleRelay::new(), Arc::new(Keypair::new()), &config);
        assert!(result.is_err());
    }

    #[test]
    fn test_generated_signer_is_valid() {
        let submitter =
            JitoBundleSubmitter::new(MockBundleRelay::new(), Arc::new(Keypair::new()), &fast_config()).unwrap();
        assert!(submitter.validate_signer().is_ok());
    }
}
