//! Scriptable wallets, adapters and environment doubles for the unit tests.

use crate::{
    adapter::{AdapterEvent, AdapterEventKind, SignInInput, WalletAdapter, WalletReadyState},
    error::{ProviderError, ProviderErrorCode, WalletError},
    event::{Event, EventChannel, Subscription},
    manager::{KeyValueStore, StorageError},
    registry::Timer,
    solana::{
        Commitment, Connection, ConnectionError, Hash, Instruction, PublicKey,
        SOLANA_DEVNET_CHAIN, SendOptions, Signature, Transaction, TransactionError,
    },
    standard::{
        ChangeListener, SOLANA_SIGN_AND_SEND_TRANSACTION, SOLANA_SIGN_IN, SOLANA_SIGN_MESSAGE,
        SOLANA_SIGN_TRANSACTION, STANDARD_CONNECT, STANDARD_DISCONNECT, STANDARD_EVENTS,
        SignInResult, SignedMessage, StandardAccount, StandardChange, StandardWallet,
    },
};
use async_trait::async_trait;
use cryptoxide::ed25519;
use futures::{channel::oneshot, future::LocalBoxFuture};
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Duration,
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// subscribe to the given kinds and collect every event
pub fn record<E>(channel: &EventChannel<E>, kinds: &[E::Kind]) -> Rc<RefCell<Vec<E>>>
where
    E: Event + Clone + 'static,
{
    let events = Rc::new(RefCell::new(Vec::new()));
    for kind in kinds {
        let events = events.clone();
        let _subscription =
            channel.on(*kind, move |event: &E| events.borrow_mut().push(event.clone()));
    }
    events
}

/// an instruction of a program taking no account
pub fn memo(data: &[u8]) -> Instruction {
    Instruction {
        program_id: PublicKey::new([5; 32]),
        accounts: Vec::new(),
        data: data.to_vec(),
    }
}

pub fn record_events(channel: &EventChannel<AdapterEvent>) -> Rc<RefCell<Vec<AdapterEvent>>> {
    record(channel, &AdapterEventKind::ALL)
}

struct Keypair {
    secret: [u8; 64],
    public: [u8; 32],
}

impl Keypair {
    fn from_seed(seed: u8) -> Self {
        let (secret, public) = ed25519::keypair(&[seed; 32]);
        Self { secret, public }
    }

    fn account(&self) -> StandardAccount {
        StandardAccount {
            address: PublicKey::new(self.public).to_string(),
            public_key: Some(self.public.to_vec()),
            chains: vec![SOLANA_DEVNET_CHAIN.to_owned()],
            features: vec![
                SOLANA_SIGN_TRANSACTION.to_owned(),
                SOLANA_SIGN_MESSAGE.to_owned(),
            ],
            label: None,
            icon: None,
        }
    }
}

/// A wallet-standard wallet signing with a fixed ed25519 key.
pub struct MockWallet {
    name: String,
    features: Vec<String>,
    keypair: Keypair,
    other: Keypair,
    listeners: Rc<RefCell<Vec<(u64, ChangeListener)>>>,
    next_listener: Cell<u64>,
    /// the accounts already authorized
    pub accounts: RefCell<Vec<StandardAccount>>,
    /// what `connect` returns, defaults to [`MockWallet::account`]
    pub connect_accounts: RefCell<Option<Vec<StandardAccount>>>,
    pub connect_error: RefCell<Option<ProviderError>>,
    pub disconnect_error: RefCell<Option<ProviderError>>,
    /// `connect` waits on it when set
    pub connect_gate: RefCell<Option<oneshot::Receiver<()>>>,
    pub connect_calls: Cell<usize>,
    pub last_connect_silent: Cell<Option<bool>>,
    pub disconnect_calls: Cell<usize>,
    pub sign_and_send_calls: Cell<usize>,
    /// the chain of every `sign_transaction` request
    pub sign_requests: RefCell<Vec<String>>,
}

impl MockWallet {
    pub fn new(name: &str) -> Rc<Self> {
        Self::with_features(
            name,
            &[
                STANDARD_CONNECT,
                STANDARD_DISCONNECT,
                STANDARD_EVENTS,
                SOLANA_SIGN_TRANSACTION,
                SOLANA_SIGN_AND_SEND_TRANSACTION,
                SOLANA_SIGN_MESSAGE,
                SOLANA_SIGN_IN,
            ],
        )
    }

    pub fn with_features(name: &str, features: &[&str]) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_owned(),
            features: features.iter().map(|tag| tag.to_string()).collect(),
            keypair: Keypair::from_seed(1),
            other: Keypair::from_seed(2),
            listeners: Rc::new(RefCell::new(Vec::new())),
            next_listener: Cell::new(0),
            accounts: RefCell::new(Vec::new()),
            connect_accounts: RefCell::new(None),
            connect_error: RefCell::new(None),
            disconnect_error: RefCell::new(None),
            connect_gate: RefCell::new(None),
            connect_calls: Cell::new(0),
            last_connect_silent: Cell::new(None),
            disconnect_calls: Cell::new(0),
            sign_and_send_calls: Cell::new(0),
            sign_requests: RefCell::new(Vec::new()),
        })
    }

    pub fn account(&self) -> StandardAccount {
        self.keypair.account()
    }

    pub fn other_account(&self) -> StandardAccount {
        self.other.account()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::new(self.keypair.public)
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        ed25519::verify(message, &self.keypair.public, &signature.to_bytes())
    }

    pub fn emit_change(&self, change: &StandardChange) {
        let listeners: Vec<ChangeListener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(change);
        }
    }

    pub fn change_listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn sign(&self, message: &[u8]) -> [u8; 64] {
        ed25519::signature(message, &self.keypair.secret)
    }
}

#[async_trait(?Send)]
impl StandardWallet for MockWallet {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn icon(&self) -> String {
        "data:image/svg+xml;base64,".to_owned()
    }

    fn version(&self) -> String {
        "1.0.0".to_owned()
    }

    fn chains(&self) -> Vec<String> {
        vec![SOLANA_DEVNET_CHAIN.to_owned()]
    }

    fn features(&self) -> Vec<String> {
        self.features.clone()
    }

    fn accounts(&self) -> Vec<StandardAccount> {
        self.accounts.borrow().clone()
    }

    async fn connect(&self, silent: bool) -> Result<Vec<StandardAccount>, ProviderError> {
        self.connect_calls.set(self.connect_calls.get() + 1);
        self.last_connect_silent.set(Some(silent));

        let gate = self.connect_gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if let Some(error) = self.connect_error.borrow().clone() {
            return Err(error);
        }

        let accounts = self
            .connect_accounts
            .borrow()
            .clone()
            .unwrap_or_else(|| vec![self.account()]);
        *self.accounts.borrow_mut() = accounts.clone();
        Ok(accounts)
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        self.disconnect_calls.set(self.disconnect_calls.get() + 1);
        self.accounts.borrow_mut().clear();

        match self.disconnect_error.borrow().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn on_change(&self, listener: ChangeListener) -> Subscription {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.listeners.borrow_mut().push((id, listener));

        let listeners = Rc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.borrow_mut().retain(|(other, _)| *other != id);
            }
        })
    }

    async fn sign_transaction(
        &self,
        _account: &StandardAccount,
        chain: &str,
        transaction: &[u8],
    ) -> Result<Vec<u8>, ProviderError> {
        self.sign_requests.borrow_mut().push(chain.to_owned());

        let invalid = |error: TransactionError| {
            ProviderError::new(ProviderErrorCode::InvalidParams, error.to_string())
        };
        let mut transaction = Transaction::from_bytes(transaction).map_err(invalid)?;
        let signature = self.sign(&transaction.message_bytes().map_err(invalid)?);
        transaction
            .add_signature(&self.public_key(), Signature::new(signature))
            .map_err(invalid)?;
        transaction.to_bytes().map_err(invalid)
    }

    async fn sign_and_send_transaction(
        &self,
        _account: &StandardAccount,
        _chain: &str,
        _transaction: &[u8],
        _options: &SendOptions,
    ) -> Result<Vec<u8>, ProviderError> {
        self.sign_and_send_calls
            .set(self.sign_and_send_calls.get() + 1);
        Ok(vec![9; 64])
    }

    async fn sign_message(
        &self,
        _account: &StandardAccount,
        message: &[u8],
    ) -> Result<SignedMessage, ProviderError> {
        Ok(SignedMessage {
            signed_message: message.to_vec(),
            signature: self.sign(message).to_vec(),
        })
    }

    async fn sign_in(&self, input: &SignInInput) -> Result<SignInResult, ProviderError> {
        let message = input.statement.clone().unwrap_or_default().into_bytes();
        Ok(SignInResult {
            account: self.account(),
            signature: self.sign(&message).to_vec(),
            signed_message: message,
        })
    }
}

/// An adapter whose outcome is scripted by the test.
pub struct MockAdapter {
    name: String,
    ready_state: Cell<WalletReadyState>,
    public_key: Cell<Option<PublicKey>>,
    events: EventChannel<AdapterEvent>,
    /// calls of every adapter sharing the journal, in order
    journal: Rc<RefCell<Vec<String>>>,
    pub connect_error: RefCell<Option<WalletError>>,
    pub disconnect_error: RefCell<Option<WalletError>>,
    pub connect_calls: Cell<usize>,
    pub auto_connect_calls: Cell<usize>,
    pub disconnect_calls: Cell<usize>,
}

impl MockAdapter {
    pub fn new(name: &str, ready_state: WalletReadyState) -> Rc<Self> {
        Self::with_journal(name, ready_state, Rc::default())
    }

    pub fn with_journal(
        name: &str,
        ready_state: WalletReadyState,
        journal: Rc<RefCell<Vec<String>>>,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_owned(),
            ready_state: Cell::new(ready_state),
            public_key: Cell::new(None),
            events: EventChannel::new(),
            journal,
            connect_error: RefCell::new(None),
            disconnect_error: RefCell::new(None),
            connect_calls: Cell::new(0),
            auto_connect_calls: Cell::new(0),
            disconnect_calls: Cell::new(0),
        })
    }

    /// the key this adapter connects with
    pub fn key(&self) -> PublicKey {
        let mut bytes = [0; 32];
        for (byte, name) in bytes.iter_mut().zip(self.name.bytes()) {
            *byte = name;
        }
        PublicKey::new(bytes)
    }

    pub fn emit(&self, event: AdapterEvent) {
        self.events.emit(&event);
    }

    fn connect_now(&self) -> Result<(), WalletError> {
        if let Some(error) = self.connect_error.borrow().clone() {
            self.events.emit(&AdapterEvent::Error(error.clone()));
            return Err(error);
        }
        if self.public_key.get().is_none() {
            self.public_key.set(Some(self.key()));
            self.events.emit(&AdapterEvent::Connect(self.key()));
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl WalletAdapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &str {
        "https://example.com"
    }

    fn icon(&self) -> &str {
        ""
    }

    fn ready_state(&self) -> WalletReadyState {
        self.ready_state.get()
    }

    fn public_key(&self) -> Option<PublicKey> {
        self.public_key.get()
    }

    fn connecting(&self) -> bool {
        false
    }

    fn events(&self) -> &EventChannel<AdapterEvent> {
        &self.events
    }

    async fn connect(&self) -> Result<(), WalletError> {
        self.connect_calls.set(self.connect_calls.get() + 1);
        self.journal.borrow_mut().push(format!("{}.connect", self.name));
        self.connect_now()
    }

    async fn auto_connect(&self) -> Result<(), WalletError> {
        self.auto_connect_calls
            .set(self.auto_connect_calls.get() + 1);
        self.journal
            .borrow_mut()
            .push(format!("{}.auto_connect", self.name));
        self.connect_now()
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        self.disconnect_calls.set(self.disconnect_calls.get() + 1);
        self.journal
            .borrow_mut()
            .push(format!("{}.disconnect", self.name));

        if self.public_key.take().is_some() {
            self.events.emit(&AdapterEvent::Disconnect);
        }
        match self.disconnect_error.borrow().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn send_transaction(
        &self,
        _transaction: Transaction,
        _connection: Option<&dyn Connection>,
        _options: &SendOptions,
    ) -> Result<Signature, WalletError> {
        self.public_key.get().ok_or(WalletError::NotConnected)?;
        Ok(Signature::new([1; 64]))
    }

    async fn sign_transaction(
        &self,
        mut transaction: Transaction,
    ) -> Result<Transaction, WalletError> {
        self.public_key.get().ok_or(WalletError::NotConnected)?;
        transaction.signatures.push(Signature::new([2; 64]));
        Ok(transaction)
    }

    async fn sign_message(&self, _message: &[u8]) -> Result<Signature, WalletError> {
        self.public_key.get().ok_or(WalletError::NotConnected)?;
        Ok(Signature::new([3; 64]))
    }
}

#[derive(Default)]
pub struct MockConnection {
    pub submitted: RefCell<Vec<Vec<u8>>>,
    pub fail: Cell<bool>,
}

impl MockConnection {
    pub const BLOCKHASH: Hash = Hash::new([4; 32]);
}

#[async_trait(?Send)]
impl Connection for MockConnection {
    async fn latest_blockhash(&self, _commitment: Commitment) -> Result<Hash, ConnectionError> {
        Ok(Self::BLOCKHASH)
    }

    async fn send_raw_transaction(
        &self,
        transaction: &[u8],
        _options: &SendOptions,
    ) -> Result<Signature, ConnectionError> {
        if self.fail.get() {
            return Err(ConnectionError("node unavailable".to_owned()));
        }
        self.submitted.borrow_mut().push(transaction.to_vec());

        let transaction = Transaction::from_bytes(transaction)
            .map_err(|error| ConnectionError(error.to_string()))?;
        transaction
            .signatures
            .first()
            .copied()
            .ok_or_else(|| ConnectionError("transaction not signed".to_owned()))
    }
}

pub struct TokioTimer;

impl Timer for TokioTimer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// a store that fails every operation
pub struct FailingStore;

#[async_trait(?Send)]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError("storage unavailable".to_owned()))
    }

    async fn set(&self, _key: &str, _value: Option<&str>) -> Result<(), StorageError> {
        Err(StorageError("storage unavailable".to_owned()))
    }
}
