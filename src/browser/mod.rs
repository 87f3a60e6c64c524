//! Browser side of the connector.
//!
//! Provides the [`Timer`] and [`KeyValueStore`] of a web page, the wallets
//! injected by the browser extensions and the page wide registry.
//!
//! [`KeyValueStore`]: crate::manager::KeyValueStore

mod register;
mod storage;
mod wallet;

pub use self::{
    register::install,
    storage::LocalStorageStore,
    wallet::{JsStandardWallet, looks_like_standard_wallet},
};
use crate::{
    environment::{self, Environment},
    manager::AdapterManager,
    registry::{Timer, WalletRegistry},
};
use futures::{FutureExt as _, future::LocalBoxFuture};
use std::{rc::Rc, time::Duration};

/// [`Timer`] on `setTimeout`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserTimer;

impl Timer for BrowserTimer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        gloo_timers::future::sleep(duration).boxed_local()
    }
}

thread_local! {
    static REGISTRY: WalletRegistry = {
        let registry = WalletRegistry::new(Rc::new(BrowserTimer));
        if let Err(error) = install(&registry) {
            log::warn!("couldn't listen for the page's wallets: {error:?}");
        }
        registry
    };

    static USER_AGENT: Option<String> = web_sys::window()
        .and_then(|window| window.navigator().user_agent().ok());
}

/// The registry of the wallets of this page.
///
/// Created and installed on first use.
pub fn registry() -> WalletRegistry {
    REGISTRY.with(WalletRegistry::clone)
}

/// `navigator.userAgent`, read once
pub fn user_agent() -> Option<String> {
    USER_AGENT.with(Clone::clone)
}

/// classify the page with the detected wallets
pub fn environment() -> Environment {
    environment::classify(&registry().get_adapters(), user_agent().as_deref())
}

/// A manager over the page's wallets, remembering the selection in
/// `localStorage`.
///
/// `adapters` are the adapters supplied by the application, they take
/// precedence over the detected wallets of the same name. The saved selection
/// starts loading right away, see [`AdapterManager::is_ready`].
pub fn adapter_manager(adapters: Vec<Rc<dyn crate::adapter::WalletAdapter>>) -> AdapterManager {
    let manager = AdapterManager::new(Vec::new(), Rc::new(LocalStorageStore));
    // follows the registry for the page's lifetime
    let _registry = manager.follow_registry(&registry(), adapters);

    let restoring = manager.clone();
    wasm_bindgen_futures::spawn_local(async move {
        if let Some(adapter) = restoring.restore().await {
            log::debug!("restored the selection of `{}'", adapter.name());
        }
    });
    manager
}
