/*!

# Solana Connector for wallet-standard wallets

This library is meant to be used for web applications that need to interact with Solana wallets.
It discovers the wallets injected in the page, presents them behind one [`WalletAdapter`]
interface and keeps track of the wallet the user selected.

## Features

- Detect the wallet-standard wallets, even the ones loading after the application
- Connect, disconnect and reconnect silently on the next visit
- Sign transactions, messages and Sign In With Solana
- Send transactions through the wallet or through your own [`Connection`]

## Usage

In the browser the wallets of the page are collected in a [`WalletRegistry`] (see
`browser::registry()` when targeting `wasm32`). The detected adapters are ordered for
presentation with [`sort::sort_by_priority`]:

```no_run
use solana_connector::{WalletAdapter, WalletRegistry, sort::sort_by_priority};

# fn test(registry: WalletRegistry) {
for adapter in sort_by_priority(&registry.get_adapters()) {
    println!("Wallet: {} ({:?})", adapter.name(), adapter.ready_state());
}
# }
```

The application then binds to an [`AdapterManager`]. It owns the selected adapter, remembers
it in a [`KeyValueStore`] and never returns errors: failures are reported on its
[`events`](AdapterManager::events) and the operation returns `None`.

```no_run
# use solana_connector::{AdapterManager, ManagerEvent, ManagerEventKind, MemoryStore, WalletAdapter};
# use std::rc::Rc;
#
# async fn test(adapters: Vec<Rc<dyn WalletAdapter>>) {
let manager = AdapterManager::new(adapters, Rc::new(MemoryStore::default()));
let _errors = manager.events().on(ManagerEventKind::Error, |event| {
    if let ManagerEvent::Error(error) = event {
        eprintln!("wallet error: {error}");
    }
});

manager.select_adapter(Some("Phantom")).await;
if let Some(adapter) = manager.connect().await {
    println!("connected to {}", adapter.public_key().unwrap());
}
# }
```

A wallet-standard wallet can also be wrapped directly, the wallet is checked to be a
compliant Solana wallet first:

```no_run
# use solana_connector::{StandardWalletAdapter, WalletAdapter, standard::StandardWallet};
# use std::rc::Rc;
#
# async fn test(wallet: Rc<dyn StandardWallet>) -> anyhow::Result<()> {
let adapter = StandardWalletAdapter::new(wallet)?;
adapter.connect().await?;
let signature = adapter.sign_message(b"hello").await?;
# Ok(()) }
```

*/

pub mod adapter;
#[cfg(target_arch = "wasm32")]
pub mod browser;
pub mod environment;
pub mod error;
pub mod event;
pub mod ffi;
pub mod manager;
pub mod registry;
pub mod solana;
pub mod sort;
pub mod standard;
mod standard_adapter;
#[cfg(test)]
mod test_support;

pub use self::{
    adapter::{AdapterEvent, WalletAdapter, WalletReadyState},
    environment::{Environment, classify},
    error::WalletError,
    manager::{AdapterManager, KeyValueStore, ManagerEvent, ManagerEventKind, MemoryStore},
    registry::WalletRegistry,
    solana::{Connection, PublicKey, Signature, Transaction},
    standard_adapter::StandardWalletAdapter,
};
