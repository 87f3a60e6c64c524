//! The wallet-standard registration handshake.
//!
//! Wallets and the application may load in any order:
//!
//! * a wallet loading after the application dispatches
//!   `wallet-standard:register-wallet` with a callback, the application calls
//!   it with the registration API;
//! * an application loading after the wallet dispatches
//!   `wallet-standard:app-ready` with the registration API, wallets listening
//!   for it register themselves;
//! * older wallets push their callback onto `navigator.wallets`.

use super::wallet::{JsStandardWallet, looks_like_standard_wallet};
use crate::{
    ffi::{APP_READY_EVENT, LEGACY_WALLETS_SLOT, REGISTER_WALLET_EVENT},
    registry::WalletRegistry,
};
use js_sys::{Array, Function, Object, Reflect};
use std::rc::Rc;
use wasm_bindgen::{JsCast as _, JsValue, closure::Closure};
use web_sys::{CustomEvent, CustomEventInit, Window};

/// `{ register(wallet) => unregister }`
fn registration_api(registry: &WalletRegistry) -> Result<Object, JsValue> {
    let registry = registry.clone();
    let register = Closure::<dyn FnMut(JsValue) -> JsValue>::new(move |wallet: JsValue| {
        if !looks_like_standard_wallet(&wallet) {
            log::warn!("ignoring the registration of an object that is not a wallet");
            return Closure::once_into_js(|| ());
        }

        let wallet = JsStandardWallet::new(wallet.unchecked_into());
        match registry.register_owned(Rc::new(wallet)) {
            Some(registration) => Closure::once_into_js(move || {
                registration.unregister();
            }),
            // the name belongs to an earlier registration
            None => Closure::once_into_js(|| ()),
        }
    });

    let api = Object::new();
    Reflect::set(&api, &JsValue::from_str("register"), register.as_ref())?;
    // the wallets may register at any time of the page's life
    register.forget();
    Ok(api)
}

fn call_registration_callback(callback: &JsValue, api: &Object) {
    let Some(callback) = callback.dyn_ref::<Function>() else {
        log::warn!("wallet registration callback is not a function: {callback:?}");
        return;
    };
    if let Err(error) = callback.call1(&JsValue::NULL, api) {
        log::warn!("wallet registration callback failed: {error:?}");
    }
}

fn listen_for_wallets(window: &Window, api: &Object) -> Result<(), JsValue> {
    let api = api.clone();
    let listener = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
        if let Some(event) = event.dyn_ref::<CustomEvent>() {
            call_registration_callback(&event.detail(), &api);
        }
    });
    window.add_event_listener_with_callback(
        REGISTER_WALLET_EVENT,
        listener.as_ref().unchecked_ref(),
    )?;
    listener.forget();
    Ok(())
}

/// replace `navigator.wallets` by an object whose `push` registers the
/// wallets, and register the callbacks already pushed
fn intercept_legacy_slot(window: &Window, api: &Object) -> Result<(), JsValue> {
    let navigator = window.navigator();
    let slot_key = JsValue::from_str(LEGACY_WALLETS_SLOT);
    let pending = Reflect::get(&navigator, &slot_key)?;

    let push = Closure::<dyn FnMut(JsValue)>::new({
        let api = api.clone();
        move |callback: JsValue| call_registration_callback(&callback, &api)
    });
    let slot = Object::new();
    Reflect::set(&slot, &JsValue::from_str("push"), push.as_ref())?;
    push.forget();
    Reflect::set(&navigator, &slot_key, &slot)?;

    if let Some(pending) = pending.dyn_ref::<Array>() {
        for callback in pending.iter() {
            call_registration_callback(&callback, api);
        }
    }
    Ok(())
}

fn announce(window: &Window, api: &Object) {
    let init = CustomEventInit::new();
    init.set_detail(api);
    let event = match CustomEvent::new_with_event_init_dict(APP_READY_EVENT, &init) {
        Ok(event) => event,
        Err(error) => {
            log::warn!("couldn't create the `{APP_READY_EVENT}' event: {error:?}");
            return;
        }
    };
    if let Err(error) = window.dispatch_event(&event) {
        log::warn!("couldn't dispatch the `{APP_READY_EVENT}' event: {error:?}");
    }
}

/// Wire the page's wallets into the registry.
///
/// The application readiness is announced now and again following the
/// registry's schedule, until the registry is disposed.
pub fn install(registry: &WalletRegistry) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let api = registration_api(registry)?;

    listen_for_wallets(&window, &api)?;
    intercept_legacy_slot(&window, &api)?;

    let schedule = registry.schedule_announcements(move || announce(&window, &api));
    wasm_bindgen_futures::spawn_local(schedule);
    Ok(())
}
