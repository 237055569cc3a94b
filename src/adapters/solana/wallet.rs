use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    signer::SignerError,
    transaction::VersionedTransaction,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Failed to load keypair from file: {0}")]
    LoadError(String),
    #[error("Failed to sign transaction: {0}")]
    SigningError(String),
    #[error("Invalid keypair bytes: {0}")]
    InvalidKeypair(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<SignerError> for WalletError {
    fn from(err: SignerError) -> Self {
        WalletError::SigningError(err.to_string())
    }
}

/// Wallet manager for loading and signing with a Solana keypair
#[derive(Clone)]
pub struct WalletManager {
    keypair: Arc<Keypair>,
}

impl WalletManager {
    /// Load keypair from a file path (JSON array format)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WalletError> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| WalletError::LoadError(format!("Failed to read file: {}", e)))?;

        // Parse JSON array of bytes
        let bytes: Vec<u8> = serde_json::from_str(&contents)
            .map_err(|e| WalletError::LoadError(format!("Invalid JSON format: {}", e)))?;

        Self::from_bytes(&bytes)
    }

    /// Load keypair from a base58 encoded 64-byte secret key
    pub fn from_base58(secret: &str) -> Result<Self, WalletError> {
        let bytes = bs58::decode(secret.trim())
            .into_vec()
            .map_err(|e| WalletError::InvalidKeypair(format!("Invalid base58: {}", e)))?;

        Self::from_bytes(&bytes)
    }

    /// Load keypair from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        let keypair = Keypair::try_from(bytes)
            .map_err(|e| WalletError::InvalidKeypair(e.to_string()))?;

        Ok(Self {
            keypair: Arc::new(keypair),
        })
    }

    /// Create a new random keypair (for testing)
    pub fn new_random() -> Self {
        Self {
            keypair: Arc::new(Keypair::new()),
        }
    }

    /// Get the public key as Pubkey
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Sign every signature slot this wallet is responsible for.
    ///
    /// The message is left untouched, so the blockhash chosen by whoever
    /// built the transaction is kept.
    pub fn sign_transaction(&self, transaction: VersionedTransaction) -> Result<VersionedTransaction, WalletError> {
        let signed = VersionedTransaction::try_new(transaction.message, &[self.keypair.as_ref()])?;
        Ok(signed)
    }

    /// Shared handle for components that sign on their own
    pub fn keypair(&self) -> Arc<Keypair> {
        Arc::clone(&self.keypair)
    }
}
