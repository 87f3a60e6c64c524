//! Desktop or mobile classification of the running environment.

use crate::adapter::{MOBILE_WALLET_ADAPTER_NAME, WalletAdapter, WalletReadyState};
use once_cell::sync::Lazy;
use regex::Regex;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Environment {
    Desktop,
    Mobile,
}

static MOBILE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)android|iphone|ipad|ipod").ok());
static IOS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?i)iphone|ipad|ipod").ok());
static WEBVIEW: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)webview|android.*(wv|\.0\.0\.0)").ok());

fn matches(regex: &Lazy<Option<Regex>>, user_agent: &str) -> bool {
    regex
        .as_ref()
        .is_some_and(|regex| regex.is_match(user_agent))
}

fn is_mobile(user_agent: &str) -> bool {
    matches(&MOBILE, user_agent)
}

/// in-app browsers: explicit webviews, and iOS agents not followed by a
/// `Safari/` token
fn is_webview(user_agent: &str) -> bool {
    if matches(&WEBVIEW, user_agent) {
        return true;
    }

    IOS.as_ref()
        .and_then(|ios| ios.find(user_agent))
        .is_some_and(|device| !user_agent[device.end()..].contains("Safari/"))
}

/// Guess whether wallets should be presented for a desktop or a mobile
/// device.
///
/// A wallet extension that is actually installed wins over the user agent,
/// unless the user agent is a plain mobile browser.
pub fn classify(adapters: &[Rc<dyn WalletAdapter>], user_agent: Option<&str>) -> Environment {
    let Some(user_agent) = user_agent else {
        return Environment::Desktop;
    };

    if is_mobile(user_agent) && !is_webview(user_agent) {
        return Environment::Mobile;
    }

    let installed = adapters.iter().any(|adapter| {
        adapter.name() != MOBILE_WALLET_ADAPTER_NAME
            && adapter.ready_state() == WalletReadyState::Installed
    });
    if installed {
        return Environment::Desktop;
    }

    if is_mobile(user_agent) {
        Environment::Mobile
    } else {
        Environment::Desktop
    }
}
