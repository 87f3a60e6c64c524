//! Ordering and grouping of adapters for a wallet picker.
//!
//! None of these functions modify their input.

use crate::adapter::{MOBILE_WALLET_ADAPTER_NAME, WalletAdapter, WalletReadyState};
use std::rc::Rc;

fn is_mobile_adapter(adapter: &dyn WalletAdapter) -> bool {
    adapter.name() == MOBILE_WALLET_ADAPTER_NAME
}

fn priority(adapter: &dyn WalletAdapter) -> u8 {
    if is_mobile_adapter(adapter) {
        return 0;
    }
    match adapter.ready_state() {
        WalletReadyState::Installed => 1,
        WalletReadyState::Loadable => 2,
        WalletReadyState::NotDetected | WalletReadyState::Unsupported => 3,
    }
}

/// Mobile wallet adapter first, then installed, then loadable, then the rest.
///
/// The order within each group is kept.
pub fn sort_by_priority(adapters: &[Rc<dyn WalletAdapter>]) -> Vec<Rc<dyn WalletAdapter>> {
    let mut sorted = adapters.to_vec();
    sorted.sort_by_key(|adapter| priority(adapter.as_ref()));
    sorted
}

pub fn filter_by_ready_state(
    adapters: &[Rc<dyn WalletAdapter>],
    states: &[WalletReadyState],
) -> Vec<Rc<dyn WalletAdapter>> {
    adapters
        .iter()
        .filter(|adapter| states.contains(&adapter.ready_state()))
        .cloned()
        .collect()
}

/// Adapters shown up front and adapters kept behind a "more wallets" toggle.
#[derive(Clone, Default)]
pub struct Visibility {
    pub listed: Vec<Rc<dyn WalletAdapter>>,
    pub collapsed: Vec<Rc<dyn WalletAdapter>>,
}

/// Sort the adapters and split them: the usable ones (mobile wallet adapter,
/// installed, loadable) are listed, the others collapsed.
pub fn group_by_visibility(adapters: &[Rc<dyn WalletAdapter>]) -> Visibility {
    let (listed, collapsed) = sort_by_priority(adapters)
        .into_iter()
        .partition(|adapter| priority(adapter.as_ref()) < 3);
    Visibility { listed, collapsed }
}
