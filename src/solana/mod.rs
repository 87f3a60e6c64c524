//! Solana ledger types the adapters exchange with the wallets.
//!
//! Only what the adapters need to move a transaction around is here. The
//! transport to the ledger is abstracted behind [`Connection`].

mod hash;
mod transaction;

use async_trait::async_trait;

pub use self::{
    hash::{Hash, ParseKeyError, PublicKey, Signature},
    transaction::{
        AccountMeta, CompiledInstruction, Instruction, Message, MessageHeader, Transaction,
        TransactionError,
    },
};

/// chain identifiers as used by the wallet-standard
pub const SOLANA_MAINNET_CHAIN: &str = "solana:mainnet";
pub const SOLANA_DEVNET_CHAIN: &str = "solana:devnet";
pub const SOLANA_TESTNET_CHAIN: &str = "solana:testnet";
pub const SOLANA_LOCALNET_CHAIN: &str = "solana:localnet";

pub fn is_solana_chain(chain: &str) -> bool {
    chain.starts_with("solana:")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

/// Options forwarded to the ledger (or the wallet) when submitting a
/// transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOptions {
    #[serde(default)]
    pub skip_preflight: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preflight_commitment: Option<Commitment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_context_slot: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ConnectionError(pub String);

/// Access to a ledger node, supplied by the application.
#[async_trait(?Send)]
pub trait Connection {
    async fn latest_blockhash(&self, commitment: Commitment) -> Result<Hash, ConnectionError>;

    /// submit an already signed transaction
    async fn send_raw_transaction(
        &self,
        transaction: &[u8],
        options: &SendOptions,
    ) -> Result<Signature, ConnectionError>;
}
