use crate::{
    adapter::SignInInput,
    error::{ProviderError, ProviderErrorCode},
    event::Subscription,
    ffi,
    solana::SendOptions,
    standard::{
        ChangeListener, Feature, SignInResult, SignedMessage, StandardAccount, StandardChange,
        StandardWallet,
    },
};
use async_trait::async_trait;
use js_sys::{Array, Object, Reflect, Uint8Array};
use std::cell::RefCell;
use wasm_bindgen::{JsCast as _, JsValue, closure::Closure};

/// A wallet-standard wallet injected in the page.
pub struct JsStandardWallet {
    wallet: ffi::Wallet,
    /// the account objects returned by the last `connect`, signing requests
    /// must carry the wallet's own object
    connected: RefCell<Vec<ffi::WalletAccount>>,
}

/// check the value has the shape of a wallet-standard wallet before using
/// the getters
pub fn looks_like_standard_wallet(value: &JsValue) -> bool {
    if !value.is_object() {
        return false;
    }

    let property = |name: &str| Reflect::get(value, &JsValue::from_str(name)).ok();
    let has_string_property =
        |name: &str| property(name).and_then(|value| value.as_string()).is_some();

    has_string_property("name")
        && has_string_property("version")
        && has_string_property("icon")
        && property("chains").is_some_and(|chains| chains.is_array())
        && property("accounts").is_some_and(|accounts| accounts.is_array())
        && property("features").is_some_and(|features| features.is_object())
}

fn provider_error(error: JsValue) -> ProviderError {
    if let Some(error) = error.dyn_ref::<js_sys::Error>() {
        let code = Reflect::get(error, &JsValue::from_str("code"))
            .ok()
            .and_then(|code| serde_wasm_bindgen::from_value(code).ok())
            .unwrap_or(ProviderErrorCode::InternalError);
        return ProviderError::new(code, String::from(error.message()));
    }

    serde_wasm_bindgen::from_value(error).unwrap_or_else(|decode_error| {
        ProviderError::new(
            ProviderErrorCode::InternalError,
            format!("Couldn't decode the error content: {decode_error}"),
        )
    })
}

fn invalid_response(message: impl Into<String>) -> ProviderError {
    ProviderError::new(ProviderErrorCode::InternalError, message)
}

fn strings(array: &Array) -> Vec<String> {
    array.iter().filter_map(|value| value.as_string()).collect()
}

fn field(object: &JsValue, name: &str) -> Option<JsValue> {
    Reflect::get(object, &JsValue::from_str(name))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

fn bytes(object: &JsValue, name: &str) -> Result<Vec<u8>, ProviderError> {
    field(object, name)
        .and_then(|value| value.dyn_into::<Uint8Array>().ok())
        .map(|array| array.to_vec())
        .ok_or_else(|| invalid_response(format!("expected `{name}' to be a Uint8Array")))
}

/// the signing capabilities resolve to one output per input
fn first_output(outputs: JsValue) -> Result<JsValue, ProviderError> {
    outputs
        .dyn_into::<Array>()
        .ok()
        .map(|outputs| outputs.get(0))
        .filter(JsValue::is_object)
        .ok_or_else(|| invalid_response("the wallet returned no output"))
}

fn account(account: &ffi::WalletAccount) -> StandardAccount {
    StandardAccount {
        address: account.address(),
        public_key: account
            .public_key()
            .dyn_into::<Uint8Array>()
            .ok()
            .map(|key| key.to_vec()),
        chains: strings(&account.chains()),
        features: strings(&account.features()),
        label: account.label(),
        icon: account.icon(),
    }
}

fn accounts(array: &Array) -> Vec<ffi::WalletAccount> {
    array
        .iter()
        .filter(JsValue::is_object)
        .map(JsValue::unchecked_into)
        .collect()
}

fn change(properties: &JsValue) -> StandardChange {
    StandardChange {
        accounts: field(properties, "accounts")
            .and_then(|value| value.dyn_into::<Array>().ok())
            .map(|array| accounts(&array).iter().map(account).collect()),
        chains: field(properties, "chains")
            .and_then(|value| value.dyn_into::<Array>().ok())
            .map(|array| strings(&array)),
        features: field(properties, "features")
            .and_then(|value| value.dyn_into::<Object>().ok())
            .map(|features| strings(&Object::keys(&features))),
    }
}

fn input(entries: &[(&str, &JsValue)]) -> Result<JsValue, ProviderError> {
    let object = Object::new();
    for (key, value) in entries {
        Reflect::set(&object, &JsValue::from_str(key), value).map_err(provider_error)?;
    }
    Ok(object.into())
}

impl JsStandardWallet {
    pub fn new(wallet: ffi::Wallet) -> Self {
        Self {
            wallet,
            connected: RefCell::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &ffi::Wallet {
        &self.wallet
    }

    fn feature<T: wasm_bindgen::JsCast>(&self, feature: Feature) -> Result<T, ProviderError> {
        field(&self.wallet.features(), feature.tag())
            .map(JsValue::unchecked_into)
            .ok_or_else(|| {
                ProviderError::new(
                    ProviderErrorCode::UnsupportedMethod,
                    format!("the wallet has no `{feature}' feature"),
                )
            })
    }

    /// the wallet's object for this account
    fn js_account(&self, wanted: &StandardAccount) -> Result<ffi::WalletAccount, ProviderError> {
        accounts(&self.wallet.accounts())
            .into_iter()
            .chain(self.connected.borrow().iter().cloned())
            .find(|account| account.address() == wanted.address)
            .ok_or_else(|| {
                ProviderError::new(
                    ProviderErrorCode::Unauthorized,
                    format!("account {} is not authorized", wanted.address),
                )
            })
    }
}

#[async_trait(?Send)]
impl StandardWallet for JsStandardWallet {
    fn name(&self) -> String {
        self.wallet.name()
    }

    fn icon(&self) -> String {
        self.wallet.icon()
    }

    fn version(&self) -> String {
        self.wallet.version()
    }

    fn chains(&self) -> Vec<String> {
        strings(&self.wallet.chains())
    }

    fn features(&self) -> Vec<String> {
        strings(&Object::keys(&self.wallet.features()))
    }

    fn accounts(&self) -> Vec<StandardAccount> {
        accounts(&self.wallet.accounts())
            .iter()
            .map(account)
            .collect()
    }

    async fn connect(&self, silent: bool) -> Result<Vec<StandardAccount>, ProviderError> {
        let feature: ffi::ConnectFeature = self.feature(Feature::Connect)?;
        let output = feature
            .connect(input(&[("silent", &JsValue::from_bool(silent))])?)
            .await
            .map_err(provider_error)?;

        let connected = field(&output, "accounts")
            .and_then(|value| value.dyn_into::<Array>().ok())
            .map(|array| accounts(&array))
            .ok_or_else(|| invalid_response("connect did not return the accounts"))?;

        let standard = connected.iter().map(account).collect();
        *self.connected.borrow_mut() = connected;
        Ok(standard)
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        let feature: ffi::DisconnectFeature = self.feature(Feature::Disconnect)?;
        feature.disconnect().await.map_err(provider_error)?;
        self.connected.borrow_mut().clear();
        Ok(())
    }

    fn on_change(&self, listener: ChangeListener) -> Subscription {
        let feature: ffi::EventsFeature = match self.feature(Feature::Events) {
            Ok(feature) => feature,
            Err(error) => {
                log::warn!("`{}' cannot report changes: {error}", self.name());
                return Subscription::new(|| ());
            }
        };

        let callback = Closure::<dyn FnMut(JsValue)>::new(move |properties: JsValue| {
            listener(&change(&properties))
        });
        let off = feature.on("change", callback.as_ref().unchecked_ref());

        Subscription::new(move || {
            if let Err(error) = off.call0(&JsValue::NULL) {
                log::warn!("couldn't remove the change listener: {error:?}");
            }
            drop(callback);
        })
    }

    async fn sign_transaction(
        &self,
        account: &StandardAccount,
        chain: &str,
        transaction: &[u8],
    ) -> Result<Vec<u8>, ProviderError> {
        let feature: ffi::SignTransactionFeature = self.feature(Feature::SignTransaction)?;
        let request = input(&[
            ("account", &JsValue::from(self.js_account(account)?)),
            ("chain", &JsValue::from_str(chain)),
            ("transaction", &JsValue::from(Uint8Array::from(transaction))),
        ])?;

        let outputs = feature
            .sign_transaction(request)
            .await
            .map_err(provider_error)?;
        bytes(&first_output(outputs)?, "signedTransaction")
    }

    async fn sign_and_send_transaction(
        &self,
        account: &StandardAccount,
        chain: &str,
        transaction: &[u8],
        options: &SendOptions,
    ) -> Result<Vec<u8>, ProviderError> {
        let feature: ffi::SignAndSendTransactionFeature =
            self.feature(Feature::SignAndSendTransaction)?;
        let options = serde_wasm_bindgen::to_value(options).map_err(|error| {
            ProviderError::new(ProviderErrorCode::InvalidParams, error.to_string())
        })?;
        let request = input(&[
            ("account", &JsValue::from(self.js_account(account)?)),
            ("chain", &JsValue::from_str(chain)),
            ("transaction", &JsValue::from(Uint8Array::from(transaction))),
            ("options", &options),
        ])?;

        let outputs = feature
            .sign_and_send_transaction(request)
            .await
            .map_err(provider_error)?;
        bytes(&first_output(outputs)?, "signature")
    }

    async fn sign_message(
        &self,
        account: &StandardAccount,
        message: &[u8],
    ) -> Result<SignedMessage, ProviderError> {
        let feature: ffi::SignMessageFeature = self.feature(Feature::SignMessage)?;
        let request = input(&[
            ("account", &JsValue::from(self.js_account(account)?)),
            ("message", &JsValue::from(Uint8Array::from(message))),
        ])?;

        let output = first_output(feature.sign_message(request).await.map_err(provider_error)?)?;
        Ok(SignedMessage {
            signed_message: bytes(&output, "signedMessage")?,
            signature: bytes(&output, "signature")?,
        })
    }

    async fn sign_in(&self, input: &SignInInput) -> Result<SignInResult, ProviderError> {
        let feature: ffi::SignInFeature = self.feature(Feature::SignIn)?;
        let request = serde_wasm_bindgen::to_value(input).map_err(|error| {
            ProviderError::new(ProviderErrorCode::InvalidParams, error.to_string())
        })?;

        let output = first_output(feature.sign_in(request).await.map_err(provider_error)?)?;
        let signed_in: ffi::WalletAccount = field(&output, "account")
            .map(JsValue::unchecked_into)
            .ok_or_else(|| invalid_response("signIn did not return the account"))?;

        let result = SignInResult {
            account: account(&signed_in),
            signed_message: bytes(&output, "signedMessage")?,
            signature: bytes(&output, "signature")?,
        };
        self.connected.borrow_mut().push(signed_in);
        Ok(result)
    }
}
