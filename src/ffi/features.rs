//! The objects found in a wallet's feature map.
//!
//! The signing capabilities take one input object and resolve to an array
//! with one output per input.

use js_sys::Function;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    /// `standard:connect`
    #[derive(Clone, PartialEq)]
    pub type ConnectFeature;

    /// Request access to the wallet's accounts.
    ///
    /// `input` is `{ silent: boolean }`: a silent request must not prompt the
    /// user and resolves with no accounts if the application was not
    /// authorized before. Resolves to `{ accounts: WalletAccount[] }`.
    #[wasm_bindgen(method, catch)]
    pub async fn connect(this: &ConnectFeature, input: JsValue) -> Result<JsValue, JsValue>;
}

#[wasm_bindgen]
extern "C" {
    /// `standard:disconnect`
    #[derive(Clone, PartialEq)]
    pub type DisconnectFeature;

    #[wasm_bindgen(method, catch)]
    pub async fn disconnect(this: &DisconnectFeature) -> Result<JsValue, JsValue>;
}

#[wasm_bindgen]
extern "C" {
    /// `standard:events`
    #[derive(Clone, PartialEq)]
    pub type EventsFeature;

    /// Listen to `event` (only `"change"` is defined). The listener receives
    /// the properties that changed: `{ accounts?, chains?, features? }`.
    ///
    /// Returns the function removing the listener.
    #[wasm_bindgen(method)]
    pub fn on(this: &EventsFeature, event: &str, listener: &Function) -> Function;
}

#[wasm_bindgen]
extern "C" {
    /// `solana:signTransaction`
    #[derive(Clone, PartialEq)]
    pub type SignTransactionFeature;

    /// `input` is `{ account, chain, transaction: Uint8Array }`, resolves to
    /// `[{ signedTransaction: Uint8Array }]`.
    #[wasm_bindgen(method, catch, js_name = "signTransaction")]
    pub async fn sign_transaction(
        this: &SignTransactionFeature,
        input: JsValue,
    ) -> Result<JsValue, JsValue>;
}

#[wasm_bindgen]
extern "C" {
    /// `solana:signAndSendTransaction`
    #[derive(Clone, PartialEq)]
    pub type SignAndSendTransactionFeature;

    /// `input` is `{ account, chain, transaction: Uint8Array, options? }`,
    /// resolves to `[{ signature: Uint8Array }]`.
    #[wasm_bindgen(method, catch, js_name = "signAndSendTransaction")]
    pub async fn sign_and_send_transaction(
        this: &SignAndSendTransactionFeature,
        input: JsValue,
    ) -> Result<JsValue, JsValue>;
}

#[wasm_bindgen]
extern "C" {
    /// `solana:signMessage`
    #[derive(Clone, PartialEq)]
    pub type SignMessageFeature;

    /// `input` is `{ account, message: Uint8Array }`, resolves to
    /// `[{ signedMessage: Uint8Array, signature: Uint8Array }]`. The wallet
    /// may prefix the message, hence the returned `signedMessage`.
    #[wasm_bindgen(method, catch, js_name = "signMessage")]
    pub async fn sign_message(
        this: &SignMessageFeature,
        input: JsValue,
    ) -> Result<JsValue, JsValue>;
}

#[wasm_bindgen]
extern "C" {
    /// `solana:signIn`
    #[derive(Clone, PartialEq)]
    pub type SignInFeature;

    /// Sign In With Solana. Resolves to
    /// `[{ account, signedMessage: Uint8Array, signature: Uint8Array }]`.
    #[wasm_bindgen(method, catch, js_name = "signIn")]
    pub async fn sign_in(this: &SignInFeature, input: JsValue) -> Result<JsValue, JsValue>;
}
