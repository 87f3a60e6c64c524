//! The wallet-standard provider interface.
//!
//! Wallets announce themselves with a map of namespaced capability tags
//! (`standard:connect`, `solana:signTransaction`...). [`StandardWallet`] is
//! the Rust view of such an object, [`CompliantWallet`] is the value obtained
//! once the capability tags have been checked.

use crate::{
    adapter::SignInInput,
    error::{ProviderError, WalletError},
    event::Subscription,
    solana::{SOLANA_MAINNET_CHAIN, SendOptions, is_solana_chain},
};
use async_trait::async_trait;
use std::{fmt, rc::Rc};

pub const STANDARD_CONNECT: &str = "standard:connect";
pub const STANDARD_DISCONNECT: &str = "standard:disconnect";
pub const STANDARD_EVENTS: &str = "standard:events";
pub const SOLANA_SIGN_TRANSACTION: &str = "solana:signTransaction";
pub const SOLANA_SIGN_AND_SEND_TRANSACTION: &str = "solana:signAndSendTransaction";
pub const SOLANA_SIGN_MESSAGE: &str = "solana:signMessage";
pub const SOLANA_SIGN_IN: &str = "solana:signIn";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    Connect,
    Disconnect,
    Events,
    SignTransaction,
    SignAndSendTransaction,
    SignMessage,
    SignIn,
}

impl Feature {
    pub const fn tag(self) -> &'static str {
        match self {
            Feature::Connect => STANDARD_CONNECT,
            Feature::Disconnect => STANDARD_DISCONNECT,
            Feature::Events => STANDARD_EVENTS,
            Feature::SignTransaction => SOLANA_SIGN_TRANSACTION,
            Feature::SignAndSendTransaction => SOLANA_SIGN_AND_SEND_TRANSACTION,
            Feature::SignMessage => SOLANA_SIGN_MESSAGE,
            Feature::SignIn => SOLANA_SIGN_IN,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            STANDARD_CONNECT => Some(Feature::Connect),
            STANDARD_DISCONNECT => Some(Feature::Disconnect),
            STANDARD_EVENTS => Some(Feature::Events),
            SOLANA_SIGN_TRANSACTION => Some(Feature::SignTransaction),
            SOLANA_SIGN_AND_SEND_TRANSACTION => Some(Feature::SignAndSendTransaction),
            SOLANA_SIGN_MESSAGE => Some(Feature::SignMessage),
            SOLANA_SIGN_IN => Some(Feature::SignIn),
            _ => None,
        }
    }

    /// the features carrying a Solana signing identity
    pub fn is_solana(self) -> bool {
        matches!(
            self,
            Feature::SignTransaction
                | Feature::SignAndSendTransaction
                | Feature::SignMessage
                | Feature::SignIn
        )
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One signing identity exposed by a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StandardAccount {
    pub address: String,
    /// some wallets omit the key, or expose an empty one
    pub public_key: Option<Vec<u8>>,
    pub chains: Vec<String>,
    pub features: Vec<String>,
    pub label: Option<String>,
    pub icon: Option<String>,
}

impl StandardAccount {
    fn has_solana_feature(&self) -> bool {
        self.features
            .iter()
            .filter_map(|tag| Feature::from_tag(tag))
            .any(Feature::is_solana)
    }
}

/// Find the account to use as the Solana identity.
///
/// Wallets are not all compliant, the search is progressively more lenient:
///
/// 1. an account advertising a Solana feature tag;
/// 2. any account with a non empty public key;
/// 3. any account with a public key field at all.
pub fn find_solana_account(accounts: &[StandardAccount]) -> Option<&StandardAccount> {
    accounts
        .iter()
        .find(|account| account.has_solana_feature() && account.public_key.is_some())
        .or_else(|| {
            accounts.iter().find(|account| {
                account
                    .public_key
                    .as_ref()
                    .is_some_and(|key| !key.is_empty())
            })
        })
        .or_else(|| accounts.iter().find(|account| account.public_key.is_some()))
}

/// the chain to put on signing requests for this account
pub fn solana_chain(account: &StandardAccount, wallet_chains: &[String]) -> String {
    account
        .chains
        .iter()
        .chain(wallet_chains)
        .find(|chain| is_solana_chain(chain))
        .cloned()
        .unwrap_or_else(|| SOLANA_MAINNET_CHAIN.to_owned())
}

/// Properties reported by the `standard:events` change event. Only the
/// properties that changed are set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StandardChange {
    pub accounts: Option<Vec<StandardAccount>>,
    pub chains: Option<Vec<String>>,
    pub features: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedMessage {
    pub signed_message: Vec<u8>,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInResult {
    pub account: StandardAccount,
    pub signed_message: Vec<u8>,
    pub signature: Vec<u8>,
}

pub type ChangeListener = Rc<dyn Fn(&StandardChange)>;

/// A wallet implementing the wallet-standard.
///
/// The capability methods are only called if [`StandardWallet::features`]
/// lists the matching tag.
#[async_trait(?Send)]
pub trait StandardWallet {
    fn name(&self) -> String;

    fn icon(&self) -> String;

    fn version(&self) -> String;

    fn chains(&self) -> Vec<String>;

    /// the capability tags of the wallet's feature map
    fn features(&self) -> Vec<String>;

    /// the accounts the application is currently authorized to use
    fn accounts(&self) -> Vec<StandardAccount>;

    /// `standard:connect`
    async fn connect(&self, silent: bool) -> Result<Vec<StandardAccount>, ProviderError>;

    /// `standard:disconnect`
    async fn disconnect(&self) -> Result<(), ProviderError>;

    /// `standard:events`, subscribe to the `change` event
    fn on_change(&self, listener: ChangeListener) -> Subscription;

    /// `solana:signTransaction`, returns the signed transaction bytes
    async fn sign_transaction(
        &self,
        account: &StandardAccount,
        chain: &str,
        transaction: &[u8],
    ) -> Result<Vec<u8>, ProviderError>;

    /// `solana:signAndSendTransaction`, returns the signature bytes
    async fn sign_and_send_transaction(
        &self,
        account: &StandardAccount,
        chain: &str,
        transaction: &[u8],
        options: &SendOptions,
    ) -> Result<Vec<u8>, ProviderError>;

    /// `solana:signMessage`
    async fn sign_message(
        &self,
        account: &StandardAccount,
        message: &[u8],
    ) -> Result<SignedMessage, ProviderError>;

    /// `solana:signIn`
    async fn sign_in(&self, input: &SignInInput) -> Result<SignInResult, ProviderError>;
}

/// The ways a wallet can move a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionSupport {
    Sign,
    SignAndSend,
    Both,
}

impl TransactionSupport {
    pub fn can_sign(self) -> bool {
        matches!(self, TransactionSupport::Sign | TransactionSupport::Both)
    }

    pub fn can_sign_and_send(self) -> bool {
        matches!(self, TransactionSupport::SignAndSend | TransactionSupport::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capabilities {
    pub transactions: TransactionSupport,
    pub disconnect: bool,
    pub sign_message: bool,
    pub sign_in: bool,
}

impl Capabilities {
    /// check the capability tags of a wallet
    ///
    /// `standard:connect` and `standard:events` are mandatory, and the wallet
    /// needs at least one of `solana:signTransaction` or
    /// `solana:signAndSendTransaction`.
    pub fn from_features<S: AsRef<str>>(name: &str, features: &[S]) -> Result<Self, WalletError> {
        let has = |feature: Feature| features.iter().any(|tag| tag.as_ref() == feature.tag());
        let invalid = |reason: String| WalletError::InvalidProvider {
            name: name.to_owned(),
            reason,
        };

        for required in [Feature::Connect, Feature::Events] {
            if !has(required) {
                return Err(invalid(format!("missing `{required}'")));
            }
        }

        let transactions = match (has(Feature::SignTransaction), has(Feature::SignAndSendTransaction)) {
            (true, true) => TransactionSupport::Both,
            (true, false) => TransactionSupport::Sign,
            (false, true) => TransactionSupport::SignAndSend,
            (false, false) => {
                return Err(invalid(format!(
                    "needs `{}' or `{}'",
                    Feature::SignTransaction,
                    Feature::SignAndSendTransaction
                )));
            }
        };

        Ok(Self {
            transactions,
            disconnect: has(Feature::Disconnect),
            sign_message: has(Feature::SignMessage),
            sign_in: has(Feature::SignIn),
        })
    }

    pub fn supports(&self, feature: Feature) -> bool {
        match feature {
            Feature::Connect | Feature::Events => true,
            Feature::Disconnect => self.disconnect,
            Feature::SignTransaction => self.transactions.can_sign(),
            Feature::SignAndSendTransaction => self.transactions.can_sign_and_send(),
            Feature::SignMessage => self.sign_message,
            Feature::SignIn => self.sign_in,
        }
    }
}

/// A wallet whose capability tags were validated.
#[derive(Clone)]
pub struct CompliantWallet {
    wallet: Rc<dyn StandardWallet>,
    capabilities: Capabilities,
}

impl CompliantWallet {
    pub fn validate(wallet: Rc<dyn StandardWallet>) -> Result<Self, WalletError> {
        let capabilities = Capabilities::from_features(&wallet.name(), wallet.features().as_slice())?;
        Ok(Self {
            wallet,
            capabilities,
        })
    }

    pub fn wallet(&self) -> &Rc<dyn StandardWallet> {
        &self.wallet
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

impl fmt::Debug for CompliantWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompliantWallet")
            .field("name", &self.wallet.name())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}
