use std::cell::Cell;

/// Runtime network-status signal. Offline requests stay same-origin relative
/// so the service worker cache can intercept them.
pub trait NetworkStatus {
    fn is_online(&self) -> bool;
}

/// Fixed status, settable from tests and SSR contexts.
pub struct FixedNetworkStatus {
    online: Cell<bool>,
}

impl FixedNetworkStatus {
    pub fn online() -> Self {
        Self {
            online: Cell::new(true),
        }
    }

    pub fn offline() -> Self {
        Self {
            online: Cell::new(false),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.set(online);
    }
}

impl NetworkStatus for FixedNetworkStatus {
    fn is_online(&self) -> bool {
        self.online.get()
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserNetworkStatus;

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::NetworkStatus;

    /// `navigator.onLine`-backed status.
    pub struct BrowserNetworkStatus;

    impl NetworkStatus for BrowserNetworkStatus {
        fn is_online(&self) -> bool {
            match web_sys::window() {
                Some(window) => window.navigator().on_line(),
                None => true,
            }
        }
    }
}
