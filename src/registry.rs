//! Catalog of the wallet-standard wallets detected at runtime.
//!
//! Wallets register themselves asynchronously (see the `browser` module for
//! the window handshake). Each one is validated, wrapped in a
//! [`StandardWalletAdapter`] and kept under its name until it is unregistered.

use crate::{
    adapter::WalletAdapter,
    event::{Event, EventChannel, Subscription},
    standard::StandardWallet,
    standard_adapter::StandardWalletAdapter,
};
use chrono::{DateTime, Utc};
use futures::{
    FutureExt as _,
    channel::oneshot,
    future::{self, AbortHandle, Abortable, Either, LocalBoxFuture},
};
use std::{cell::RefCell, rc::Rc, time::Duration};

/// Source of delays, so the registry does not depend on a particular runtime.
pub trait Timer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// when to broadcast the application readiness again, counted from the
    /// first broadcast. Wallets injected late still get a chance to register.
    pub announce_delays_ms: Vec<u64>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            announce_delays_ms: vec![100, 500, 1_000, 3_000, 10_000],
        }
    }
}

#[derive(Clone)]
pub struct RegistryEntry {
    adapter: Rc<StandardWalletAdapter>,
    registered_at: DateTime<Utc>,
    last_used_at: DateTime<Utc>,
}

impl RegistryEntry {
    pub fn name(&self) -> &str {
        self.adapter.name()
    }

    pub fn adapter(&self) -> Rc<StandardWalletAdapter> {
        Rc::clone(&self.adapter)
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    pub fn last_used_at(&self) -> DateTime<Utc> {
        self.last_used_at
    }
}

/// Sent to the change listeners with the full list of registered adapters.
#[derive(Clone)]
pub struct RegistryEvent(pub Vec<Rc<dyn WalletAdapter>>);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistryEventKind;

impl Event for RegistryEvent {
    type Kind = RegistryEventKind;

    fn kind(&self) -> RegistryEventKind {
        RegistryEventKind
    }
}

/// One registration made with [`WalletRegistry::register_owned`].
pub struct Registration {
    registry: WalletRegistry,
    adapter: Rc<StandardWalletAdapter>,
}

impl Registration {
    pub fn adapter(&self) -> Rc<dyn WalletAdapter> {
        self.adapter.clone() as Rc<dyn WalletAdapter>
    }

    /// remove this registration, `false` if it is already gone
    pub fn unregister(self) -> bool {
        self.registry
            .remove(|entry| Rc::ptr_eq(&entry.adapter, &self.adapter))
    }
}

#[derive(Clone)]
pub struct WalletRegistry {
    inner: Rc<Inner>,
}

struct Inner {
    entries: RefCell<Vec<RegistryEntry>>,
    events: EventChannel<RegistryEvent>,
    timer: Rc<dyn Timer>,
    config: RegistryConfig,
    announcements: RefCell<Option<AbortHandle>>,
}

impl WalletRegistry {
    pub fn new(timer: Rc<dyn Timer>) -> Self {
        Self::with_config(timer, RegistryConfig::default())
    }

    pub fn with_config(timer: Rc<dyn Timer>, config: RegistryConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                entries: RefCell::new(Vec::new()),
                events: EventChannel::new(),
                timer,
                config,
                announcements: RefCell::new(None),
            }),
        }
    }

    /// Register a wallet, returns its adapter.
    ///
    /// Registering a name twice returns the adapter of the first registration.
    /// A wallet that is not compliant is logged and ignored (`None`).
    pub fn register(&self, wallet: Rc<dyn StandardWallet>) -> Option<Rc<dyn WalletAdapter>> {
        let name = wallet.name();

        if let Some(adapter) = self.touch(&name) {
            log::debug!("wallet `{name}' is already registered");
            return Some(adapter);
        }

        self.insert(wallet)
            .map(|adapter| adapter as Rc<dyn WalletAdapter>)
    }

    /// Register a wallet on behalf of its owner.
    ///
    /// Unlike [`Self::register`], a name already taken is not shared: `None`
    /// is returned and the existing registration stays with its owner.
    pub fn register_owned(&self, wallet: Rc<dyn StandardWallet>) -> Option<Registration> {
        let name = wallet.name();

        if self.find(&name).is_some() {
            log::debug!("wallet `{name}' is already registered, keeping the first one");
            return None;
        }

        let adapter = self.insert(wallet)?;
        Some(Registration {
            registry: self.clone(),
            adapter,
        })
    }

    fn insert(&self, wallet: Rc<dyn StandardWallet>) -> Option<Rc<StandardWalletAdapter>> {
        let name = wallet.name();
        let adapter = match StandardWalletAdapter::new(wallet) {
            Ok(adapter) => Rc::new(adapter),
            Err(error) => {
                log::warn!("couldn't register wallet `{name}': {error}");
                return None;
            }
        };

        let now = Utc::now();
        self.inner.entries.borrow_mut().push(RegistryEntry {
            adapter: Rc::clone(&adapter),
            registered_at: now,
            last_used_at: now,
        });
        log::debug!("wallet `{name}' registered");

        self.notify();
        Some(adapter)
    }

    /// remove the wallet, returns `false` if it was not registered
    pub fn unregister(&self, name: &str) -> bool {
        self.remove(|entry| entry.name() == name)
    }

    fn remove(&self, predicate: impl Fn(&RegistryEntry) -> bool) -> bool {
        let removed = {
            let mut entries = self.inner.entries.borrow_mut();
            entries
                .iter()
                .position(predicate)
                .map(|index| entries.remove(index))
        };

        let Some(entry) = removed else {
            return false;
        };
        entry.adapter.destroy();
        log::debug!("wallet `{}' unregistered", entry.name());

        self.notify();
        true
    }

    /// the registered adapters, in registration order
    pub fn get_adapters(&self) -> Vec<Rc<dyn WalletAdapter>> {
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|entry| entry.adapter.clone() as Rc<dyn WalletAdapter>)
            .collect()
    }

    pub fn entries(&self) -> Vec<RegistryEntry> {
        self.inner.entries.borrow().clone()
    }

    /// look up an adapter by name, marking it as used
    pub fn get(&self, name: &str) -> Option<Rc<dyn WalletAdapter>> {
        self.touch(name)
    }

    fn touch(&self, name: &str) -> Option<Rc<dyn WalletAdapter>> {
        let mut entries = self.inner.entries.borrow_mut();
        let entry = entries.iter_mut().find(|entry| entry.name() == name)?;
        entry.last_used_at = Utc::now();
        Some(entry.adapter.clone() as Rc<dyn WalletAdapter>)
    }

    fn find(&self, name: &str) -> Option<Rc<dyn WalletAdapter>> {
        self.inner
            .entries
            .borrow()
            .iter()
            .find(|entry| entry.name() == name)
            .map(|entry| entry.adapter.clone() as Rc<dyn WalletAdapter>)
    }

    /// `listener` is called with the full adapter list after every change
    pub fn add_change_listener(
        &self,
        listener: impl Fn(&[Rc<dyn WalletAdapter>]) + 'static,
    ) -> Subscription {
        self.inner
            .events
            .on(RegistryEventKind, move |RegistryEvent(adapters)| {
                listener(adapters)
            })
    }

    fn notify(&self) {
        let adapters = self.get_adapters();
        self.inner.events.emit(&RegistryEvent(adapters));
    }

    /// Merge the adapters supplied by the application with the detected ones.
    ///
    /// The supplied adapters come first and win over a detected adapter of
    /// the same name.
    pub fn get_detected_adapters(
        &self,
        explicit: &[Rc<dyn WalletAdapter>],
    ) -> Vec<Rc<dyn WalletAdapter>> {
        merge_adapters(explicit, self.get_adapters())
    }

    /// Wait until a wallet of this name is registered.
    ///
    /// Resolves to `None` if the timeout elapses first.
    pub async fn wait_for_registration(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Option<Rc<dyn WalletAdapter>> {
        if let Some(adapter) = self.find(name) {
            return Some(adapter);
        }

        let (sender, receiver) = oneshot::channel();
        let sender = RefCell::new(Some(sender));
        let wanted = name.to_owned();
        let subscription = self.add_change_listener(move |adapters| {
            let Some(adapter) = adapters.iter().find(|adapter| adapter.name() == wanted) else {
                return;
            };
            if let Some(sender) = sender.borrow_mut().take() {
                let _ = sender.send(Rc::clone(adapter));
            }
        });

        let result = match future::select(receiver, self.inner.timer.sleep(timeout)).await {
            Either::Left((Ok(adapter), _)) => Some(adapter),
            Either::Left((Err(_canceled), _)) => None,
            Either::Right(((), _)) => {
                log::debug!("wallet `{name}' did not register within {timeout:?}");
                None
            }
        };

        subscription.unsubscribe();
        result
    }

    /// Broadcast now, and again at each of the configured delays.
    ///
    /// The returned future drives the re-broadcasts and has to be spawned.
    /// It stops early when the registry is disposed or when announcements are
    /// scheduled again.
    pub fn schedule_announcements(
        &self,
        broadcast: impl Fn() + 'static,
    ) -> LocalBoxFuture<'static, ()> {
        broadcast();

        let (handle, registration) = AbortHandle::new_pair();
        let previous = self.inner.announcements.borrow_mut().replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }

        let timer = Rc::clone(&self.inner.timer);
        let delays: Vec<Duration> = self
            .inner
            .config
            .announce_delays_ms
            .iter()
            .copied()
            .map(Duration::from_millis)
            .collect();

        let schedule = async move {
            let mut elapsed = Duration::ZERO;
            for delay in delays {
                timer.sleep(delay.saturating_sub(elapsed)).await;
                elapsed = elapsed.max(delay);
                log::debug!("announcing the application again");
                broadcast();
            }
        };

        Abortable::new(schedule, registration).map(|_| ()).boxed_local()
    }

    /// Stop the announcements, drop every entry and listener.
    pub fn dispose(&self) {
        let announcements = self.inner.announcements.borrow_mut().take();
        if let Some(announcements) = announcements {
            announcements.abort();
        }

        let entries = std::mem::take(&mut *self.inner.entries.borrow_mut());
        for entry in entries {
            entry.adapter.destroy();
        }

        self.inner.events.clear();
    }
}

/// `explicit` first, then the `detected` adapters whose name is not taken
pub fn merge_adapters(
    explicit: &[Rc<dyn WalletAdapter>],
    detected: Vec<Rc<dyn WalletAdapter>>,
) -> Vec<Rc<dyn WalletAdapter>> {
    let mut adapters = explicit.to_vec();

    for detected in detected {
        if explicit
            .iter()
            .any(|adapter| adapter.name() == detected.name())
        {
            log::warn!(
                "`{}' was registered as a standard wallet, the adapter supplied by the \
                 application takes precedence and may be removed",
                detected.name()
            );
            continue;
        }
        adapters.push(detected);
    }

    adapters
}
