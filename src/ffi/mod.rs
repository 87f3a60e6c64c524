//! Bindings to the JavaScript objects of the wallet-standard.
//!
//! Only the shapes are declared here, see the `browser` module for the
//! conversion into [`StandardWallet`](crate::standard::StandardWallet).

pub mod features;
pub mod wallet;

pub use self::{
    features::{
        ConnectFeature, DisconnectFeature, EventsFeature, SignAndSendTransactionFeature,
        SignInFeature, SignMessageFeature, SignTransactionFeature,
    },
    wallet::{Wallet, WalletAccount},
};

/// dispatched by wallets, the `detail` is a callback expecting the
/// registration API
pub const REGISTER_WALLET_EVENT: &str = "wallet-standard:register-wallet";

/// dispatched by the application, the `detail` is the registration API
pub const APP_READY_EVENT: &str = "wallet-standard:app-ready";

/// `window.navigator` property older wallets push their registration
/// callback onto
pub const LEGACY_WALLETS_SLOT: &str = "wallets";
