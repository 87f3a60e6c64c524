use crate::{
    error::WalletError,
    event::{Event, EventChannel},
    solana::{Connection, PublicKey, SendOptions, Signature, Transaction},
    standard::{Feature, StandardAccount},
};
use async_trait::async_trait;

/// Name reserved for the platform adapter used on mobile devices.
///
/// This adapter is always ranked first, see [`sort_by_priority`].
///
/// [`sort_by_priority`]: crate::sort::sort_by_priority
pub const MOBILE_WALLET_ADAPTER_NAME: &str = "Mobile Wallet Adapter";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum WalletReadyState {
    /// the wallet is present in the environment and can be connected to
    Installed,
    NotDetected,
    /// the wallet is not present but can be loaded on demand (e.g. an SDK or
    /// a remote signer)
    Loadable,
    /// the wallet cannot be used on this platform
    Unsupported,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    Connect(PublicKey),
    Disconnect,
    Error(WalletError),
    ReadyStateChange(WalletReadyState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AdapterEventKind {
    Connect,
    Disconnect,
    Error,
    ReadyStateChange,
}

impl AdapterEventKind {
    pub const ALL: [AdapterEventKind; 4] = [
        AdapterEventKind::Connect,
        AdapterEventKind::Disconnect,
        AdapterEventKind::Error,
        AdapterEventKind::ReadyStateChange,
    ];
}

impl Event for AdapterEvent {
    type Kind = AdapterEventKind;

    fn kind(&self) -> AdapterEventKind {
        match self {
            AdapterEvent::Connect(_) => AdapterEventKind::Connect,
            AdapterEvent::Disconnect => AdapterEventKind::Disconnect,
            AdapterEvent::Error(_) => AdapterEventKind::Error,
            AdapterEvent::ReadyStateChange(_) => AdapterEventKind::ReadyStateChange,
        }
    }
}

/// Sign In With Solana request.
///
/// Every field is optional, the wallet fills in what is missing.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInOutput {
    /// the account that signed in
    pub account: StandardAccount,
    pub signed_message: Vec<u8>,
    pub signature: Signature,
}

/// The uniform interface over every kind of wallet.
///
/// `connected` is derived from `public_key`, implementations only keep the
/// key. Operations that are not supported by the wallet fail with
/// [`WalletError::FeatureNotSupported`].
#[async_trait(?Send)]
pub trait WalletAdapter {
    /// unique name of the wallet, used as identifier everywhere
    fn name(&self) -> &str;

    fn url(&self) -> &str;

    /// HTML ready icon (usually a data URI)
    fn icon(&self) -> &str;

    fn ready_state(&self) -> WalletReadyState;

    fn public_key(&self) -> Option<PublicKey>;

    fn connected(&self) -> bool {
        self.public_key().is_some()
    }

    fn connecting(&self) -> bool;

    fn events(&self) -> &EventChannel<AdapterEvent>;

    async fn connect(&self) -> Result<(), WalletError>;

    /// connect without prompting the user, used to restore a previous session
    async fn auto_connect(&self) -> Result<(), WalletError> {
        self.connect().await
    }

    async fn disconnect(&self) -> Result<(), WalletError>;

    async fn send_transaction(
        &self,
        transaction: Transaction,
        connection: Option<&dyn Connection>,
        options: &SendOptions,
    ) -> Result<Signature, WalletError>;

    async fn sign_transaction(&self, _transaction: Transaction) -> Result<Transaction, WalletError> {
        Err(WalletError::unsupported(Feature::SignTransaction.tag()))
    }

    /// sign the transactions one after the other, stopping at the first
    /// failure
    async fn sign_all_transactions(
        &self,
        transactions: Vec<Transaction>,
    ) -> Result<Vec<Transaction>, WalletError> {
        let mut signed = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            signed.push(self.sign_transaction(transaction).await?);
        }
        Ok(signed)
    }

    async fn sign_message(&self, _message: &[u8]) -> Result<Signature, WalletError> {
        Err(WalletError::unsupported(Feature::SignMessage.tag()))
    }

    async fn sign_in(&self, _input: SignInInput) -> Result<SignInOutput, WalletError> {
        Err(WalletError::unsupported(Feature::SignIn.tag()))
    }
}
