use crate::{
    adapter::{AdapterEvent, SignInInput, SignInOutput, WalletAdapter, WalletReadyState},
    error::WalletError,
    event::{EventChannel, Subscription},
    solana::{Connection, PublicKey, SendOptions, Signature, Transaction},
    standard::{
        Capabilities, CompliantWallet, Feature, StandardAccount, StandardChange, StandardWallet,
        find_solana_account, solana_chain,
    },
};
use async_trait::async_trait;
use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

/// wallet-standard wallets do not advertise a website
pub const STANDARD_WALLET_URL: &str = "https://github.com/wallet-standard/wallet-standard";

/// [`WalletAdapter`] over a wallet-standard wallet.
///
/// Connection state machine: `idle -> connecting -> connected -> idle`.
/// Failing operations emit an [`AdapterEvent::Error`] *and* return the error.
#[derive(Clone)]
pub struct StandardWalletAdapter {
    inner: Rc<Inner>,
}

struct Inner {
    wallet: Rc<dyn StandardWallet>,
    name: String,
    icon: String,
    state: RefCell<State>,
    events: EventChannel<AdapterEvent>,
}

struct State {
    capabilities: Capabilities,
    ready_state: WalletReadyState,
    account: Option<StandardAccount>,
    public_key: Option<PublicKey>,
    connecting: bool,
    disconnecting: bool,
    changes: Option<Subscription>,
}

impl StandardWalletAdapter {
    /// wrap the wallet, failing if it is not a compliant Solana wallet
    pub fn new(wallet: Rc<dyn StandardWallet>) -> Result<Self, WalletError> {
        CompliantWallet::validate(wallet).map(Self::from_compliant)
    }

    pub fn from_compliant(wallet: CompliantWallet) -> Self {
        let capabilities = wallet.capabilities();
        let wallet = Rc::clone(wallet.wallet());

        Self {
            inner: Rc::new(Inner {
                name: wallet.name(),
                icon: wallet.icon(),
                wallet,
                state: RefCell::new(State {
                    capabilities,
                    ready_state: WalletReadyState::Installed,
                    account: None,
                    public_key: None,
                    connecting: false,
                    disconnecting: false,
                    changes: None,
                }),
                events: EventChannel::new(),
            }),
        }
    }

    pub fn wallet(&self) -> &Rc<dyn StandardWallet> {
        &self.inner.wallet
    }

    pub fn capabilities(&self) -> Capabilities {
        self.inner.state.borrow().capabilities
    }

    /// the wallet account backing the current connection
    pub fn account(&self) -> Option<StandardAccount> {
        self.inner.state.borrow().account.clone()
    }

    /// release the wallet's change listener
    pub fn destroy(&self) {
        let changes = self.inner.state.borrow_mut().changes.take();
        if let Some(changes) = changes {
            changes.unsubscribe();
        }
    }

    async fn connect_with(&self, silent: bool) -> Result<(), WalletError> {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.public_key.is_some() || state.connecting {
                return Ok(());
            }
            state.connecting = true;
        }

        let result = self.try_connect(silent).await;
        self.inner.state.borrow_mut().connecting = false;
        self.inner.report(result)
    }

    async fn try_connect(&self, silent: bool) -> Result<(), WalletError> {
        let wallet = &self.inner.wallet;

        // already authorized accounts do not need a prompt
        let mut accounts = wallet.accounts();
        if find_solana_account(&accounts).is_none() {
            accounts = wallet.connect(silent).await?;
        }

        let account = find_solana_account(&accounts)
            .cloned()
            .ok_or_else(|| WalletError::InvalidProviderResponse("no Solana account".to_owned()))?;
        let public_key = public_key_of(&account)?;

        self.inner.connected(account, public_key);
        self.subscribe_changes();
        self.inner.events.emit(&AdapterEvent::Connect(public_key));
        Ok(())
    }

    fn subscribe_changes(&self) {
        if self.inner.state.borrow().changes.is_some() {
            return;
        }

        let inner: Weak<Inner> = Rc::downgrade(&self.inner);
        let subscription = self.inner.wallet.on_change(Rc::new(move |change| {
            if let Some(inner) = inner.upgrade() {
                inner.changed(change);
            }
        }));
        self.inner.state.borrow_mut().changes = Some(subscription);
    }

    fn signing_account(&self, feature: Feature) -> Result<(StandardAccount, String), WalletError> {
        let state = self.inner.state.borrow();
        let account = state.account.clone().ok_or(WalletError::NotConnected)?;
        if !state.capabilities.supports(feature) {
            return Err(WalletError::unsupported(feature.tag()));
        }
        let chain = solana_chain(&account, &self.inner.wallet.chains());
        Ok((account, chain))
    }

    async fn try_sign_transaction(
        &self,
        transaction: Transaction,
    ) -> Result<Transaction, WalletError> {
        let (account, chain) = self.signing_account(Feature::SignTransaction)?;
        self.sign_with(&account, &chain, transaction).await
    }

    async fn sign_with(
        &self,
        account: &StandardAccount,
        chain: &str,
        transaction: Transaction,
    ) -> Result<Transaction, WalletError> {
        let bytes = serialize(&transaction)?;
        let signed = self
            .inner
            .wallet
            .sign_transaction(account, chain, &bytes)
            .await?;
        Transaction::from_bytes(&signed).map_err(|error| {
            WalletError::InvalidProviderResponse(format!("invalid signed transaction: {error}"))
        })
    }

    async fn try_send_transaction(
        &self,
        mut transaction: Transaction,
        connection: Option<&dyn Connection>,
        options: &SendOptions,
    ) -> Result<Signature, WalletError> {
        let (account, chain, capabilities, public_key) = {
            let state = self.inner.state.borrow();
            let (Some(account), Some(public_key)) = (state.account.clone(), state.public_key)
            else {
                return Err(WalletError::NotConnected);
            };
            let chain = solana_chain(&account, &self.inner.wallet.chains());
            (account, chain, state.capabilities, public_key)
        };

        if transaction.fee_payer.is_none() {
            transaction.fee_payer = Some(public_key);
        }

        match connection {
            Some(connection) if capabilities.transactions.can_sign() => {
                if transaction.recent_blockhash.is_none() {
                    let commitment = options.preflight_commitment.unwrap_or_default();
                    let blockhash = connection
                        .latest_blockhash(commitment)
                        .await
                        .map_err(|error| WalletError::NetworkSubmissionFailure(error.to_string()))?;
                    transaction.recent_blockhash = Some(blockhash);
                }

                let bytes = serialize(&transaction)?;
                let signed = self
                    .inner
                    .wallet
                    .sign_transaction(&account, &chain, &bytes)
                    .await?;
                connection
                    .send_raw_transaction(&signed, options)
                    .await
                    .map_err(|error| WalletError::NetworkSubmissionFailure(error.to_string()))
            }
            _ if capabilities.transactions.can_sign_and_send() => {
                let bytes = serialize(&transaction)?;
                let signature = self
                    .inner
                    .wallet
                    .sign_and_send_transaction(&account, &chain, &bytes, options)
                    .await?;
                Signature::try_from(signature.as_slice()).map_err(|error| {
                    WalletError::InvalidProviderResponse(format!("invalid signature: {error}"))
                })
            }
            _ => Err(WalletError::unsupported(
                Feature::SignAndSendTransaction.tag(),
            )),
        }
    }

    async fn try_sign_message(&self, message: &[u8]) -> Result<Signature, WalletError> {
        let (account, _) = self.signing_account(Feature::SignMessage)?;
        let signed = self.inner.wallet.sign_message(&account, message).await?;
        Signature::try_from(signed.signature.as_slice()).map_err(|error| {
            WalletError::InvalidProviderResponse(format!("invalid message signature: {error}"))
        })
    }

    async fn try_sign_in(&self, input: SignInInput) -> Result<SignInOutput, WalletError> {
        let _ = self.signing_account(Feature::SignIn)?;
        let output = self.inner.wallet.sign_in(&input).await?;
        let signature = Signature::try_from(output.signature.as_slice()).map_err(|error| {
            WalletError::InvalidProviderResponse(format!("invalid sign in signature: {error}"))
        })?;

        Ok(SignInOutput {
            account: output.account,
            signed_message: output.signed_message,
            signature,
        })
    }
}

impl Inner {
    fn report<T>(&self, result: Result<T, WalletError>) -> Result<T, WalletError> {
        if let Err(error) = &result {
            self.events.emit(&AdapterEvent::Error(error.clone()));
        }
        result
    }

    fn connected(&self, account: StandardAccount, public_key: PublicKey) {
        let mut state = self.state.borrow_mut();
        state.account = Some(account);
        state.public_key = Some(public_key);
    }

    /// clear the connection, returns if we were connected
    fn disconnected(&self) -> bool {
        let (was_connected, changes) = {
            let mut state = self.state.borrow_mut();
            state.account = None;
            (state.public_key.take().is_some(), state.changes.take())
        };

        if let Some(changes) = changes {
            changes.unsubscribe();
        }
        if was_connected {
            self.events.emit(&AdapterEvent::Disconnect);
        }
        was_connected
    }

    fn changed(&self, change: &StandardChange) {
        if let Some(features) = &change.features {
            self.features_changed(features);
        }
        if let Some(accounts) = &change.accounts {
            self.accounts_changed(accounts);
        }
    }

    fn features_changed(&self, features: &[String]) {
        let event = {
            let mut state = self.state.borrow_mut();
            match Capabilities::from_features(&self.name, features) {
                Ok(capabilities) => {
                    state.capabilities = capabilities;
                    (state.ready_state != WalletReadyState::Installed).then(|| {
                        state.ready_state = WalletReadyState::Installed;
                        WalletReadyState::Installed
                    })
                }
                Err(error) => {
                    log::warn!("{error}");
                    (state.ready_state != WalletReadyState::Unsupported).then(|| {
                        state.ready_state = WalletReadyState::Unsupported;
                        WalletReadyState::Unsupported
                    })
                }
            }
        };

        if let Some(ready_state) = event {
            self.events.emit(&AdapterEvent::ReadyStateChange(ready_state));
        }
    }

    fn accounts_changed(&self, accounts: &[StandardAccount]) {
        {
            let state = self.state.borrow();
            if state.public_key.is_none() || state.disconnecting {
                return;
            }
        }

        let found = find_solana_account(accounts)
            .and_then(|account| Some((account.clone(), public_key_of(account).ok()?)));

        match found {
            Some((account, public_key)) => {
                let previous = self.state.borrow().public_key;
                self.connected(account, public_key);
                if previous != Some(public_key) {
                    self.events.emit(&AdapterEvent::Connect(public_key));
                }
            }
            None => {
                self.disconnected();
            }
        }
    }
}

fn public_key_of(account: &StandardAccount) -> Result<PublicKey, WalletError> {
    let bytes = account.public_key.as_deref().unwrap_or_default();
    PublicKey::try_from(bytes).map_err(|error| {
        WalletError::InvalidProviderResponse(format!(
            "invalid public key for account `{}': {error}",
            account.address
        ))
    })
}

fn serialize(transaction: &Transaction) -> Result<Vec<u8>, WalletError> {
    transaction
        .to_bytes()
        .map_err(|error| WalletError::SerializationFailure(error.to_string()))
}

#[async_trait(?Send)]
impl WalletAdapter for StandardWalletAdapter {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn url(&self) -> &str {
        STANDARD_WALLET_URL
    }

    fn icon(&self) -> &str {
        &self.inner.icon
    }

    fn ready_state(&self) -> WalletReadyState {
        self.inner.state.borrow().ready_state
    }

    fn public_key(&self) -> Option<PublicKey> {
        self.inner.state.borrow().public_key
    }

    fn connecting(&self) -> bool {
        self.inner.state.borrow().connecting
    }

    fn events(&self) -> &EventChannel<AdapterEvent> {
        &self.inner.events
    }

    async fn connect(&self) -> Result<(), WalletError> {
        self.connect_with(false).await
    }

    async fn auto_connect(&self) -> Result<(), WalletError> {
        self.connect_with(true).await
    }

    /// Always succeeds: a failure of the wallet's own disconnect is only
    /// reported through the error event.
    async fn disconnect(&self) -> Result<(), WalletError> {
        let supported = self.capabilities().disconnect;
        if supported {
            self.inner.state.borrow_mut().disconnecting = true;
            let result = self.inner.wallet.disconnect().await;
            self.inner.state.borrow_mut().disconnecting = false;

            if let Err(error) = result {
                let error = WalletError::from(error);
                log::warn!("wallet `{}' failed to disconnect: {error}", self.inner.name);
                self.inner.events.emit(&AdapterEvent::Error(error));
            }
        }

        self.inner.disconnected();
        Ok(())
    }

    async fn send_transaction(
        &self,
        transaction: Transaction,
        connection: Option<&dyn Connection>,
        options: &SendOptions,
    ) -> Result<Signature, WalletError> {
        let result = self
            .try_send_transaction(transaction, connection, options)
            .await;
        self.inner.report(result)
    }

    async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction, WalletError> {
        let result = self.try_sign_transaction(transaction).await;
        self.inner.report(result)
    }

    async fn sign_all_transactions(
        &self,
        transactions: Vec<Transaction>,
    ) -> Result<Vec<Transaction>, WalletError> {
        let (account, chain) = match self.signing_account(Feature::SignTransaction) {
            Ok(signing) => signing,
            Err(error) => return self.inner.report(Err(error)),
        };

        // one at a time: wallets queue their prompts in order
        let mut signed = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            let result = self.sign_with(&account, &chain, transaction).await;
            signed.push(self.inner.report(result)?);
        }
        Ok(signed)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, WalletError> {
        let result = self.try_sign_message(message).await;
        self.inner.report(result)
    }

    async fn sign_in(&self, input: SignInInput) -> Result<SignInOutput, WalletError> {
        let result = self.try_sign_in(input).await;
        self.inner.report(result)
    }
}

impl fmt::Debug for StandardWalletAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("StandardWalletAdapter")
            .field("name", &self.inner.name)
            .field("ready_state", &state.ready_state)
            .field("public_key", &state.public_key)
            .field("connecting", &state.connecting)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapter::AdapterEventKind,
        error::{ProviderError, ProviderErrorCode},
        event::Event as _,
        solana::{Hash, SOLANA_DEVNET_CHAIN},
        standard::{
            SOLANA_SIGN_AND_SEND_TRANSACTION, SOLANA_SIGN_MESSAGE, SOLANA_SIGN_TRANSACTION,
            STANDARD_CONNECT, STANDARD_DISCONNECT, STANDARD_EVENTS,
        },
        test_support::{MockConnection, MockWallet, memo, record_events},
    };
    use futures::channel::oneshot;

    fn adapter(wallet: &Rc<MockWallet>) -> StandardWalletAdapter {
        StandardWalletAdapter::new(wallet.clone()).unwrap()
    }

    #[test]
    fn reject_wallet_without_transaction_capability() {
        let wallet = MockWallet::with_features(
            "NoTx",
            &[STANDARD_CONNECT, STANDARD_EVENTS, SOLANA_SIGN_MESSAGE],
        );
        let result = StandardWalletAdapter::new(wallet);
        assert!(matches!(result, Err(WalletError::InvalidProvider { .. })));
    }

    #[test]
    fn reject_wallet_without_events() {
        let wallet =
            MockWallet::with_features("NoEvents", &[STANDARD_CONNECT, SOLANA_SIGN_TRANSACTION]);
        assert!(StandardWalletAdapter::new(wallet).is_err());
    }

    #[tokio::test]
    async fn connect_emits_the_public_key() {
        let wallet = MockWallet::new("Phantom");
        let adapter = adapter(&wallet);
        let events = record_events(adapter.events());

        assert_eq!(adapter.ready_state(), WalletReadyState::Installed);
        assert!(!adapter.connected());

        adapter.connect().await.unwrap();

        assert!(adapter.connected());
        assert_eq!(adapter.public_key(), Some(wallet.public_key()));
        assert_eq!(
            *events.borrow(),
            vec![AdapterEvent::Connect(wallet.public_key())]
        );
        assert_eq!(wallet.connect_calls.get(), 1);
        assert!(wallet.last_connect_silent.get() == Some(false));
    }

    #[tokio::test]
    async fn connect_twice_calls_the_wallet_once() {
        let wallet = MockWallet::new("Phantom");
        let adapter = adapter(&wallet);

        adapter.connect().await.unwrap();
        adapter.connect().await.unwrap();

        assert_eq!(wallet.connect_calls.get(), 1);
    }

    #[tokio::test]
    async fn connect_while_connecting_is_a_noop() {
        let wallet = MockWallet::new("Phantom");
        let (release, gate) = oneshot::channel();
        *wallet.connect_gate.borrow_mut() = Some(gate);
        let adapter = adapter(&wallet);

        let first = adapter.connect();
        let second = async {
            // the first connect is pending on the gate by now
            assert!(adapter.connecting());
            let result = adapter.connect().await;
            release.send(()).unwrap();
            result
        };
        let (first, second) = futures::join!(first, second);

        first.unwrap();
        second.unwrap();
        assert_eq!(wallet.connect_calls.get(), 1);
        assert!(adapter.connected());
        assert!(!adapter.connecting());
    }

    #[tokio::test]
    async fn auto_connect_is_silent() {
        let wallet = MockWallet::new("Phantom");
        let adapter = adapter(&wallet);

        adapter.auto_connect().await.unwrap();
        assert_eq!(wallet.last_connect_silent.get(), Some(true));
    }

    #[tokio::test]
    async fn authorized_accounts_do_not_prompt() {
        let wallet = MockWallet::new("Phantom");
        *wallet.accounts.borrow_mut() = vec![wallet.account()];
        let adapter = adapter(&wallet);

        adapter.connect().await.unwrap();
        assert_eq!(wallet.connect_calls.get(), 0);
        assert!(adapter.connected());
    }

    #[tokio::test]
    async fn failed_connect_emits_and_returns_the_error() {
        let wallet = MockWallet::new("Phantom");
        let rejection = ProviderError::new(ProviderErrorCode::UserRejectedRequest, "no");
        *wallet.connect_error.borrow_mut() = Some(rejection.clone());
        let adapter = adapter(&wallet);
        let events = record_events(adapter.events());

        let error = adapter.connect().await.unwrap_err();

        assert_eq!(error, WalletError::ProviderRejected(rejection));
        assert_eq!(*events.borrow(), vec![AdapterEvent::Error(error)]);
        assert!(!adapter.connecting());
        assert!(!adapter.connected());
    }

    #[tokio::test]
    async fn connect_without_usable_account() {
        let wallet = MockWallet::new("Phantom");
        *wallet.connect_accounts.borrow_mut() = Some(vec![StandardAccount {
            address: "nokey".to_owned(),
            ..StandardAccount::default()
        }]);
        let adapter = adapter(&wallet);

        assert!(matches!(
            adapter.connect().await,
            Err(WalletError::InvalidProviderResponse(_))
        ));
    }

    #[tokio::test]
    async fn disconnect_swallows_wallet_errors() {
        let wallet = MockWallet::new("Phantom");
        *wallet.disconnect_error.borrow_mut() =
            Some(ProviderError::new(ProviderErrorCode::InternalError, "boom"));
        let adapter = adapter(&wallet);
        adapter.connect().await.unwrap();
        let events = record_events(adapter.events());

        adapter.disconnect().await.unwrap();

        assert!(!adapter.connected());
        assert_eq!(wallet.disconnect_calls.get(), 1);
        assert_eq!(wallet.change_listener_count(), 0);
        let events = events.borrow();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), AdapterEventKind::Error);
        assert_eq!(events[1], AdapterEvent::Disconnect);
    }

    #[tokio::test]
    async fn disconnect_when_idle_emits_nothing() {
        let wallet = MockWallet::new("Phantom");
        let adapter = adapter(&wallet);
        let events = record_events(adapter.events());

        adapter.disconnect().await.unwrap();
        assert!(events.borrow().is_empty());
    }

    #[tokio::test]
    async fn disconnect_without_capability_clears_locally() {
        let wallet = MockWallet::with_features(
            "Minimal",
            &[STANDARD_CONNECT, STANDARD_EVENTS, SOLANA_SIGN_TRANSACTION],
        );
        let adapter = adapter(&wallet);
        adapter.connect().await.unwrap();

        adapter.disconnect().await.unwrap();
        assert_eq!(wallet.disconnect_calls.get(), 0);
        assert!(!adapter.connected());
    }

    #[tokio::test]
    async fn account_change_to_the_same_key_is_idempotent() {
        let wallet = MockWallet::new("Phantom");
        let adapter = adapter(&wallet);
        adapter.connect().await.unwrap();
        let events = record_events(adapter.events());

        let other = wallet.other_account();
        let other_key = PublicKey::try_from(other.public_key.as_deref().unwrap()).unwrap();
        for _ in 0..2 {
            wallet.emit_change(&StandardChange {
                accounts: Some(vec![other.clone()]),
                ..StandardChange::default()
            });
        }

        assert_eq!(*events.borrow(), vec![AdapterEvent::Connect(other_key)]);
        assert_eq!(adapter.public_key(), Some(other_key));
    }

    #[tokio::test]
    async fn account_change_to_nothing_disconnects() {
        let wallet = MockWallet::new("Phantom");
        let adapter = adapter(&wallet);
        adapter.connect().await.unwrap();
        let events = record_events(adapter.events());

        wallet.emit_change(&StandardChange {
            accounts: Some(Vec::new()),
            ..StandardChange::default()
        });

        assert_eq!(*events.borrow(), vec![AdapterEvent::Disconnect]);
        assert!(!adapter.connected());
        assert_eq!(wallet.change_listener_count(), 0);
    }

    #[tokio::test]
    async fn account_change_while_idle_is_ignored() {
        let wallet = MockWallet::new("Phantom");
        let adapter = adapter(&wallet);
        let events = record_events(adapter.events());

        wallet.emit_change(&StandardChange {
            accounts: Some(vec![wallet.account()]),
            ..StandardChange::default()
        });

        assert!(events.borrow().is_empty());
        assert!(!adapter.connected());
    }

    #[tokio::test]
    async fn losing_features_makes_the_wallet_unsupported() {
        let wallet = MockWallet::new("Phantom");
        let adapter = adapter(&wallet);
        adapter.connect().await.unwrap();
        let events = record_events(adapter.events());

        wallet.emit_change(&StandardChange {
            features: Some(vec![STANDARD_CONNECT.to_owned()]),
            ..StandardChange::default()
        });

        assert_eq!(adapter.ready_state(), WalletReadyState::Unsupported);
        assert_eq!(
            *events.borrow(),
            vec![AdapterEvent::ReadyStateChange(WalletReadyState::Unsupported)]
        );
    }

    #[tokio::test]
    async fn sign_requires_a_connection() {
        let wallet = MockWallet::new("Phantom");
        let adapter = adapter(&wallet);
        let events = record_events(adapter.events());

        let error = adapter
            .sign_transaction(Transaction::new(vec![memo(&[1])]))
            .await
            .unwrap_err();
        assert_eq!(error, WalletError::NotConnected);
        assert_eq!(*events.borrow(), vec![AdapterEvent::Error(error)]);

        assert_eq!(
            adapter.sign_message(b"hello").await,
            Err(WalletError::NotConnected)
        );
    }

    #[tokio::test]
    async fn sign_transaction_with_the_wallet_key() {
        let wallet = MockWallet::new("Phantom");
        let adapter = adapter(&wallet);
        adapter.connect().await.unwrap();

        let transaction = Transaction::new(vec![memo(&[1, 2, 3])])
            .with_fee_payer(wallet.public_key())
            .with_recent_blockhash(Hash::new([3; 32]));
        let signed = adapter.sign_transaction(transaction.clone()).await.unwrap();

        assert_eq!(signed.signatures.len(), 1);
        assert_eq!(signed.instructions, transaction.instructions);
        assert_eq!(signed.fee_payer, Some(wallet.public_key()));
        assert!(wallet.verify(&signed.message_bytes().unwrap(), &signed.signatures[0]));
        assert_eq!(
            wallet.sign_requests.borrow().as_slice(),
            &[SOLANA_DEVNET_CHAIN.to_owned()]
        );
    }

    #[tokio::test]
    async fn sign_transaction_reports_serialization_failures() {
        let wallet = MockWallet::new("Phantom");
        let adapter = adapter(&wallet);
        adapter.connect().await.unwrap();

        let result = adapter
            .sign_transaction(Transaction::new(vec![memo(&[1])]))
            .await;
        assert!(matches!(result, Err(WalletError::SerializationFailure(_))));
        assert!(wallet.sign_requests.borrow().is_empty());
    }

    #[tokio::test]
    async fn sign_all_transactions_stops_at_the_first_failure() {
        let wallet = MockWallet::new("Phantom");
        let adapter = adapter(&wallet);
        adapter.connect().await.unwrap();

        let good = Transaction::new(vec![memo(&[1])])
            .with_fee_payer(wallet.public_key())
            .with_recent_blockhash(Hash::new([3; 32]));
        let bad = Transaction::new(vec![memo(&[2])]);

        let result = adapter
            .sign_all_transactions(vec![good.clone(), bad, good])
            .await;
        assert!(matches!(result, Err(WalletError::SerializationFailure(_))));
        assert_eq!(wallet.sign_requests.borrow().len(), 1);
    }

    #[tokio::test]
    async fn sign_all_transactions_in_order() {
        let wallet = MockWallet::new("Phantom");
        let adapter = adapter(&wallet);
        adapter.connect().await.unwrap();

        let transactions: Vec<_> = (0..3u8)
            .map(|n| {
                Transaction::new(vec![memo(&[n])])
                    .with_fee_payer(wallet.public_key())
                    .with_recent_blockhash(Hash::new([3; 32]))
            })
            .collect();
        let signed = adapter.sign_all_transactions(transactions).await.unwrap();

        let messages: Vec<_> = signed
            .iter()
            .map(|tx| tx.instructions[0].data.clone())
            .collect();
        assert_eq!(messages, vec![vec![0], vec![1], vec![2]]);
    }

    #[tokio::test]
    async fn sign_message_signature() {
        let wallet = MockWallet::new("Phantom");
        let adapter = adapter(&wallet);
        adapter.connect().await.unwrap();

        let signature = adapter.sign_message(b"hello").await.unwrap();
        assert!(wallet.verify(b"hello", &signature));
    }

    #[tokio::test]
    async fn unsupported_features() {
        let wallet = MockWallet::with_features(
            "Minimal",
            &[STANDARD_CONNECT, STANDARD_EVENTS, SOLANA_SIGN_TRANSACTION],
        );
        let adapter = adapter(&wallet);
        adapter.connect().await.unwrap();

        assert_eq!(
            adapter.sign_message(b"hello").await,
            Err(WalletError::unsupported(SOLANA_SIGN_MESSAGE))
        );
        assert!(matches!(
            adapter.sign_in(SignInInput::default()).await,
            Err(WalletError::FeatureNotSupported { .. })
        ));
        assert_eq!(
            adapter
                .send_transaction(
                    Transaction::new(vec![memo(&[1])]),
                    None,
                    &SendOptions::default()
                )
                .await,
            Err(WalletError::unsupported(SOLANA_SIGN_AND_SEND_TRANSACTION))
        );
    }

    #[tokio::test]
    async fn sign_in_returns_the_account() {
        let wallet = MockWallet::new("Phantom");
        let adapter = adapter(&wallet);
        adapter.connect().await.unwrap();

        let output = adapter
            .sign_in(SignInInput {
                statement: Some("sign in".to_owned()),
                ..SignInInput::default()
            })
            .await
            .unwrap();

        assert_eq!(output.account, wallet.account());
        assert_eq!(output.signed_message, b"sign in".to_vec());
        assert!(wallet.verify(b"sign in", &output.signature));
    }

    #[tokio::test]
    async fn send_through_the_connection() {
        let wallet = MockWallet::new("Phantom");
        let adapter = adapter(&wallet);
        adapter.connect().await.unwrap();
        let connection = MockConnection::default();

        // no fee payer and no blockhash: both are filled in
        let signature = adapter
            .send_transaction(
                Transaction::new(vec![memo(&[7])]),
                Some(&connection),
                &SendOptions::default(),
            )
            .await
            .unwrap();

        let submitted = connection.submitted.borrow();
        assert_eq!(submitted.len(), 1);
        let transaction = Transaction::from_bytes(&submitted[0]).unwrap();
        assert_eq!(transaction.fee_payer, Some(wallet.public_key()));
        assert_eq!(transaction.recent_blockhash, Some(MockConnection::BLOCKHASH));
        assert_eq!(signature, transaction.signatures[0]);
        assert_eq!(wallet.sign_and_send_calls.get(), 0);
    }

    #[tokio::test]
    async fn send_failures_are_network_failures() {
        let wallet = MockWallet::new("Phantom");
        let adapter = adapter(&wallet);
        adapter.connect().await.unwrap();
        let connection = MockConnection::default();
        connection.fail.set(true);

        let result = adapter
            .send_transaction(
                Transaction::new(vec![memo(&[7])]).with_recent_blockhash(Hash::new([1; 32])),
                Some(&connection),
                &SendOptions::default(),
            )
            .await;
        assert!(matches!(
            result,
            Err(WalletError::NetworkSubmissionFailure(_))
        ));
    }

    #[tokio::test]
    async fn send_through_the_wallet() {
        let wallet = MockWallet::new("Phantom");
        let adapter = adapter(&wallet);
        adapter.connect().await.unwrap();

        let signature = adapter
            .send_transaction(
                Transaction::new(vec![memo(&[7])]).with_recent_blockhash(Hash::new([1; 32])),
                None,
                &SendOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(wallet.sign_and_send_calls.get(), 1);
        assert_eq!(signature, Signature::new([9; 64]));
    }

    #[tokio::test]
    async fn send_through_the_wallet_reports_serialization_failures() {
        let wallet = MockWallet::new("Phantom");
        let adapter = adapter(&wallet);
        adapter.connect().await.unwrap();

        // the fee payer is defaulted, the missing blockhash is not
        let result = adapter
            .send_transaction(
                Transaction::new(vec![memo(&[7])]),
                None,
                &SendOptions::default(),
            )
            .await;
        assert!(matches!(result, Err(WalletError::SerializationFailure(_))));
        assert_eq!(wallet.sign_and_send_calls.get(), 0);
    }

    #[tokio::test]
    async fn destroy_releases_the_change_listener() {
        let wallet = MockWallet::with_features(
            "Phantom",
            &[
                STANDARD_CONNECT,
                STANDARD_DISCONNECT,
                STANDARD_EVENTS,
                SOLANA_SIGN_TRANSACTION,
            ],
        );
        let adapter = adapter(&wallet);
        adapter.connect().await.unwrap();
        assert_eq!(wallet.change_listener_count(), 1);

        adapter.destroy();
        adapter.destroy();
        assert_eq!(wallet.change_listener_count(), 0);
    }
}
