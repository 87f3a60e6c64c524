//! Selection and connection state of one application session.
//!
//! The [`AdapterManager`] is the surface a user interface binds to: it never
//! returns errors. Failures are reported through [`ManagerEvent::Error`] and
//! the operation returns `None`.

use crate::{
    adapter::{
        AdapterEvent, AdapterEventKind, SignInInput, SignInOutput, WalletAdapter, WalletReadyState,
    },
    error::WalletError,
    event::{Event, EventChannel, Subscription},
    registry::{WalletRegistry, merge_adapters},
    solana::{Connection, PublicKey, SendOptions, Signature, Transaction},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    future::Future,
    rc::Rc,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct StorageError(pub String);

/// Where the name of the last selected wallet is kept between sessions.
///
/// Failures are logged by the manager and otherwise ignored.
#[async_trait(?Send)]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// `None` removes the key
    async fn set(&self, key: &str, value: Option<&str>) -> Result<(), StorageError>;
}

/// In memory store, clones share the same values.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Rc<RefCell<HashMap<String, String>>>,
}

#[async_trait(?Send)]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.borrow().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Option<&str>) -> Result<(), StorageError> {
        let mut values = self.values.borrow_mut();
        match value {
            Some(value) => values.insert(key.to_owned(), value.to_owned()),
            None => values.remove(key),
        };
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// key of the selected wallet name in the [`KeyValueStore`]
    pub storage_key: String,
    /// errors reported within this window after the previous one are dropped
    pub error_suppression_ms: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            storage_key: "walletName".to_owned(),
            error_suppression_ms: 100,
        }
    }
}

#[derive(Clone)]
pub enum ManagerEvent {
    Connect(PublicKey),
    Disconnect,
    Error(WalletError),
    /// the selection changed, `None` when it was cleared
    AdapterChange(Option<Rc<dyn WalletAdapter>>),
    ReadyStateChange(WalletReadyState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ManagerEventKind {
    Connect,
    Disconnect,
    Error,
    AdapterChange,
    ReadyStateChange,
}

impl ManagerEventKind {
    pub const ALL: [ManagerEventKind; 5] = [
        ManagerEventKind::Connect,
        ManagerEventKind::Disconnect,
        ManagerEventKind::Error,
        ManagerEventKind::AdapterChange,
        ManagerEventKind::ReadyStateChange,
    ];
}

impl Event for ManagerEvent {
    type Kind = ManagerEventKind;

    fn kind(&self) -> ManagerEventKind {
        match self {
            ManagerEvent::Connect(_) => ManagerEventKind::Connect,
            ManagerEvent::Disconnect => ManagerEventKind::Disconnect,
            ManagerEvent::Error(_) => ManagerEventKind::Error,
            ManagerEvent::AdapterChange(_) => ManagerEventKind::AdapterChange,
            ManagerEvent::ReadyStateChange(_) => ManagerEventKind::ReadyStateChange,
        }
    }
}

impl fmt::Debug for ManagerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerEvent::Connect(public_key) => {
                f.debug_tuple("Connect").field(public_key).finish()
            }
            ManagerEvent::Disconnect => f.write_str("Disconnect"),
            ManagerEvent::Error(error) => f.debug_tuple("Error").field(error).finish(),
            ManagerEvent::AdapterChange(adapter) => f
                .debug_tuple("AdapterChange")
                .field(&adapter.as_ref().map(|adapter| adapter.name()))
                .finish(),
            ManagerEvent::ReadyStateChange(state) => {
                f.debug_tuple("ReadyStateChange").field(state).finish()
            }
        }
    }
}

/// Owns the selected adapter of an application and forwards its events.
///
/// Several managers may share the same adapters, each one has its own
/// selection.
#[derive(Clone)]
pub struct AdapterManager {
    inner: Rc<Inner>,
}

struct Selection {
    adapter: Rc<dyn WalletAdapter>,
    subscriptions: Vec<Subscription>,
}

struct Inner {
    adapters: RefCell<Vec<Rc<dyn WalletAdapter>>>,
    selection: RefCell<Option<Selection>>,
    /// bumped every time the selection changes, so a switch that awaited
    /// can tell it was overtaken
    epoch: Cell<u64>,
    store: Rc<dyn KeyValueStore>,
    config: ManagerConfig,
    events: EventChannel<ManagerEvent>,
    handling_error: Cell<bool>,
    last_error: Cell<Option<DateTime<Utc>>>,
    ready: Cell<bool>,
}

impl Inner {
    fn selected(&self) -> Option<Rc<dyn WalletAdapter>> {
        self.selection
            .borrow()
            .as_ref()
            .map(|selection| Rc::clone(&selection.adapter))
    }

    fn attach(self: &Rc<Self>, adapter: Rc<dyn WalletAdapter>) {
        let subscriptions = AdapterEventKind::ALL
            .iter()
            .map(|kind| {
                let manager = Rc::downgrade(self);
                adapter.events().on(*kind, move |event| {
                    if let Some(manager) = manager.upgrade() {
                        manager.forward(event);
                    }
                })
            })
            .collect();

        self.epoch.set(self.epoch.get() + 1);
        let previous = self.selection.borrow_mut().replace(Selection {
            adapter,
            subscriptions,
        });
        if let Some(previous) = previous {
            previous.release();
        }
    }

    /// stop listening to the selected adapter and forget it
    fn detach(&self) -> Option<Rc<dyn WalletAdapter>> {
        self.epoch.set(self.epoch.get() + 1);
        let selection = self.selection.borrow_mut().take()?;
        Some(selection.release())
    }

    fn forward(&self, event: &AdapterEvent) {
        match event {
            AdapterEvent::Connect(public_key) => {
                self.events.emit(&ManagerEvent::Connect(*public_key))
            }
            AdapterEvent::Disconnect => self.events.emit(&ManagerEvent::Disconnect),
            AdapterEvent::Error(error) => self.report_error(error.clone()),
            AdapterEvent::ReadyStateChange(state) => {
                self.events.emit(&ManagerEvent::ReadyStateChange(*state))
            }
        }
    }

    fn report_error(&self, error: WalletError) {
        let now = Utc::now();
        let window = i64::try_from(self.config.error_suppression_ms).unwrap_or(i64::MAX);
        let recent = self
            .last_error
            .get()
            .is_some_and(|last| (now - last).num_milliseconds() < window);

        if self.handling_error.get() || recent {
            log::debug!("suppressed wallet error: {error}");
            return;
        }

        self.last_error.set(Some(now));
        self.handling_error.set(true);
        self.events.emit(&ManagerEvent::Error(error));
        self.handling_error.set(false);
    }
}

impl Selection {
    fn release(self) -> Rc<dyn WalletAdapter> {
        for subscription in &self.subscriptions {
            subscription.unsubscribe();
        }
        self.adapter
    }
}

impl AdapterManager {
    pub fn new(adapters: Vec<Rc<dyn WalletAdapter>>, store: Rc<dyn KeyValueStore>) -> Self {
        Self::with_config(adapters, store, ManagerConfig::default())
    }

    pub fn with_config(
        adapters: Vec<Rc<dyn WalletAdapter>>,
        store: Rc<dyn KeyValueStore>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                adapters: RefCell::new(adapters),
                selection: RefCell::new(None),
                epoch: Cell::new(0),
                store,
                config,
                events: EventChannel::new(),
                handling_error: Cell::new(false),
                last_error: Cell::new(None),
                ready: Cell::new(false),
            }),
        }
    }

    pub fn events(&self) -> &EventChannel<ManagerEvent> {
        &self.inner.events
    }

    pub fn get_adapters(&self) -> Vec<Rc<dyn WalletAdapter>> {
        self.inner.adapters.borrow().clone()
    }

    /// replace the known adapters, typically on a registry change
    ///
    /// The current selection is kept.
    pub fn set_adapters(&self, adapters: Vec<Rc<dyn WalletAdapter>>) {
        log::debug!("{} wallet adapters available", adapters.len());
        *self.inner.adapters.borrow_mut() = adapters;
    }

    /// Keep the known adapters in sync with the registry.
    ///
    /// The adapters become `explicit` followed by the detected wallets, see
    /// [`WalletRegistry::get_detected_adapters`].
    pub fn follow_registry(
        &self,
        registry: &WalletRegistry,
        explicit: Vec<Rc<dyn WalletAdapter>>,
    ) -> Subscription {
        self.set_adapters(registry.get_detected_adapters(&explicit));

        let manager = Rc::downgrade(&self.inner);
        registry.add_change_listener(move |detected| {
            if let Some(manager) = manager.upgrade() {
                *manager.adapters.borrow_mut() = merge_adapters(&explicit, detected.to_vec());
            }
        })
    }

    pub fn get_selected_adapter(&self) -> Option<Rc<dyn WalletAdapter>> {
        self.inner.selected()
    }

    /// `true` once the persisted selection was loaded, see [`Self::restore`]
    pub fn is_ready(&self) -> bool {
        self.inner.ready.get()
    }

    fn find(&self, name: &str) -> Option<Rc<dyn WalletAdapter>> {
        self.inner
            .adapters
            .borrow()
            .iter()
            .find(|adapter| adapter.name() == name)
            .cloned()
    }

    async fn persist(&self, name: Option<&str>) {
        let key = &self.inner.config.storage_key;
        if let Err(error) = self.inner.store.set(key, name).await {
            log::warn!("couldn't save the selected wallet: {error}");
        }
    }

    /// Load the persisted wallet name and select it.
    ///
    /// A selection made while the name was loading is kept.
    pub async fn restore(&self) -> Option<Rc<dyn WalletAdapter>> {
        let epoch = self.inner.epoch.get();
        let name = match self.inner.store.get(&self.inner.config.storage_key).await {
            Ok(name) => name,
            Err(error) => {
                log::warn!("couldn't load the selected wallet: {error}");
                None
            }
        };

        let adapter = match name {
            Some(name) if self.inner.epoch.get() == epoch => {
                self.select_adapter(Some(&name)).await
            }
            _ => self.get_selected_adapter(),
        };
        self.inner.ready.set(true);
        adapter
    }

    /// Select the adapter of this name, `None` to clear the selection.
    ///
    /// The previous selection is disconnected. A name that matches no adapter
    /// clears the selection.
    pub async fn select_adapter(&self, name: Option<&str>) -> Option<Rc<dyn WalletAdapter>> {
        let current = self.inner.selected();
        match (&current, name) {
            (Some(current), Some(name)) if current.name() == name => {
                return Some(Rc::clone(current));
            }
            (None, None) => return None,
            _ => (),
        }

        let previous = self.inner.detach();
        let epoch = self.inner.epoch.get();

        if let Some(previous) = previous.as_ref().filter(|previous| previous.connected()) {
            if let Err(error) = previous.disconnect().await {
                log::warn!(
                    "couldn't disconnect `{}' while switching wallets: {error}",
                    previous.name()
                );
            }
            if self.inner.epoch.get() != epoch {
                log::debug!("selection changed while disconnecting `{}'", previous.name());
                return self.inner.selected();
            }
        }

        let adapter = name.and_then(|name| self.find(name));
        if let (Some(name), None) = (name, &adapter) {
            log::warn!("no wallet adapter named `{name}', clearing the selection");
        }

        if let Some(adapter) = &adapter {
            self.inner.attach(Rc::clone(adapter));
        }
        self.persist(adapter.as_ref().map(|adapter| adapter.name()))
            .await;

        if previous.is_some() || adapter.is_some() {
            self.inner
                .events
                .emit(&ManagerEvent::AdapterChange(adapter.clone()));
        }
        adapter
    }

    /// Connect the selected adapter.
    ///
    /// `None` if nothing is selected, if the connection failed or if another
    /// adapter was selected in the meantime.
    pub async fn connect(&self) -> Option<Rc<dyn WalletAdapter>> {
        let adapter = self.inner.selected()?;
        if adapter.connected() {
            return Some(adapter);
        }

        let epoch = self.inner.epoch.get();
        let result = adapter.connect().await;
        self.settle(adapter, epoch, result).await
    }

    /// Reconnect the persisted selection without prompting the user.
    pub async fn auto_connect(&self) -> Option<Rc<dyn WalletAdapter>> {
        if !self.is_ready() {
            self.restore().await;
        }

        let adapter = self.inner.selected()?;
        if adapter.connected() {
            return Some(adapter);
        }

        let epoch = self.inner.epoch.get();
        let result = adapter.auto_connect().await;
        if let Err(error) = &result {
            log::debug!("couldn't reconnect `{}': {error}", adapter.name());
        }
        self.settle(adapter, epoch, result).await
    }

    /// Outcome of a connection attempt started at `epoch`.
    ///
    /// An adapter deselected while connecting is disconnected again and its
    /// failure is not reported.
    async fn settle(
        &self,
        adapter: Rc<dyn WalletAdapter>,
        epoch: u64,
        result: Result<(), WalletError>,
    ) -> Option<Rc<dyn WalletAdapter>> {
        let still_selected = self.inner.epoch.get() == epoch
            || self
                .inner
                .selected()
                .is_some_and(|selected| selected.name() == adapter.name());

        if !still_selected {
            log::debug!("`{}' was deselected while connecting", adapter.name());
            if adapter.connected() {
                if let Err(error) = adapter.disconnect().await {
                    log::warn!("couldn't disconnect `{}': {error}", adapter.name());
                }
            }
            return None;
        }

        match result {
            Ok(()) => Some(adapter),
            Err(error) => {
                self.inner.report_error(error);
                None
            }
        }
    }

    /// Disconnect and deselect the current adapter.
    ///
    /// The selection is cleared even if the wallet fails to disconnect.
    pub async fn disconnect(&self) {
        let Some(adapter) = self.inner.selected() else {
            return;
        };

        let epoch = self.inner.epoch.get();
        if adapter.connected() {
            if let Err(error) = adapter.disconnect().await {
                log::warn!("couldn't disconnect `{}': {error}", adapter.name());
                self.inner.report_error(error);
            }
        }
        if self.inner.epoch.get() != epoch {
            return;
        }

        self.inner.detach();
        self.persist(None).await;
        self.inner.events.emit(&ManagerEvent::AdapterChange(None));
    }

    async fn with_selected<T, F>(
        &self,
        operation: impl FnOnce(Rc<dyn WalletAdapter>) -> F,
    ) -> Option<T>
    where
        F: Future<Output = Result<T, WalletError>>,
    {
        let Some(adapter) = self.inner.selected() else {
            self.inner.report_error(WalletError::NotConnected);
            return None;
        };

        match operation(adapter).await {
            Ok(value) => Some(value),
            Err(error) => {
                self.inner.report_error(error);
                None
            }
        }
    }

    pub async fn send_transaction(
        &self,
        transaction: Transaction,
        connection: Option<&dyn Connection>,
        options: &SendOptions,
    ) -> Option<Signature> {
        self.with_selected(|adapter| async move {
            adapter
                .send_transaction(transaction, connection, options)
                .await
        })
        .await
    }

    pub async fn sign_transaction(&self, transaction: Transaction) -> Option<Transaction> {
        self.with_selected(|adapter| async move { adapter.sign_transaction(transaction).await })
            .await
    }

    pub async fn sign_all_transactions(
        &self,
        transactions: Vec<Transaction>,
    ) -> Option<Vec<Transaction>> {
        self.with_selected(|adapter| async move {
            adapter.sign_all_transactions(transactions).await
        })
        .await
    }

    pub async fn sign_message(&self, message: &[u8]) -> Option<Signature> {
        self.with_selected(|adapter| async move { adapter.sign_message(message).await })
            .await
    }

    pub async fn sign_in(&self, input: SignInInput) -> Option<SignInOutput> {
        self.with_selected(|adapter| async move { adapter.sign_in(input).await })
            .await
    }

    /// Stop listening to the selected adapter and drop every listener.
    ///
    /// The adapter is not disconnected. Calling it again does nothing.
    pub fn dispose(&self) {
        if let Some(adapter) = self.inner.detach() {
            log::debug!("manager disposed, releasing `{}'", adapter.name());
        }
        self.inner.events.clear();
    }
}
