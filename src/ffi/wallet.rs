use js_sys::{Array, Object};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[derive(Clone, PartialEq)]
    pub type Wallet;

    /// The version of the wallet-standard the wallet implements.
    #[wasm_bindgen(method, getter)]
    pub fn version(this: &Wallet) -> String;

    /// Name of the wallet, to display to the user and to identify the wallet.
    #[wasm_bindgen(method, getter)]
    pub fn name(this: &Wallet) -> String;

    /// A data URI of the wallet's icon (SVG, WebP, PNG or GIF).
    #[wasm_bindgen(method, getter)]
    pub fn icon(this: &Wallet) -> String;

    /// The chains (e.g. `solana:mainnet`) supported by the wallet.
    #[wasm_bindgen(method, getter)]
    pub fn chains(this: &Wallet) -> Array;

    /// The capabilities of the wallet, keyed by their namespaced tag
    /// (`standard:connect`, `solana:signTransaction`...). The value is the
    /// object implementing the capability.
    #[wasm_bindgen(method, getter)]
    pub fn features(this: &Wallet) -> Object;

    /// The accounts the application has been authorized to use.
    ///
    /// Empty until the application connects.
    #[wasm_bindgen(method, getter)]
    pub fn accounts(this: &Wallet) -> Array;
}

#[wasm_bindgen]
extern "C" {
    #[derive(Clone, PartialEq)]
    pub type WalletAccount;

    /// Address of the account, for Solana the base58 encoded public key.
    #[wasm_bindgen(method, getter)]
    pub fn address(this: &WalletAccount) -> String;

    /// The raw public key bytes, expected to be a `Uint8Array`.
    ///
    /// Not every wallet sets it, keep it as a [`JsValue`].
    #[wasm_bindgen(method, getter, js_name = "publicKey")]
    pub fn public_key(this: &WalletAccount) -> JsValue;

    #[wasm_bindgen(method, getter)]
    pub fn chains(this: &WalletAccount) -> Array;

    /// The capability tags this account can be used with.
    #[wasm_bindgen(method, getter)]
    pub fn features(this: &WalletAccount) -> Array;

    #[wasm_bindgen(method, getter)]
    pub fn label(this: &WalletAccount) -> Option<String>;

    #[wasm_bindgen(method, getter)]
    pub fn icon(this: &WalletAccount) -> Option<String>;
}
