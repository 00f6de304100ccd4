use std::cell::RefCell;
use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("failed to write key {0}")]
    WriteFailed(String),
}

/// Durable string key/value storage. Backed by `localStorage` in the browser
/// and by an in-memory map elsewhere.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str);
}

/// Read/write access to the document cookie jar.
pub trait CookieStore {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&self, name: &str, value: &str);
}

#[derive(Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.values.borrow_mut().remove(key);
    }
}

#[derive(Default)]
pub struct MemoryCookieStore {
    cookies: RefCell<HashMap<String, String>>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieStore for MemoryCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        self.cookies.borrow().get(name).cloned()
    }

    fn set(&self, name: &str, value: &str) {
        self.cookies
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::{local_storage, window, BrowserCookieStore, BrowserStorage};

#[cfg(target_arch = "wasm32")]
mod browser {
    use wasm_bindgen::JsCast;
    use web_sys::{HtmlDocument, Storage, Window};

    use super::{CookieStore, KeyValueStore, StorageError};

    pub fn window() -> Result<Window, String> {
        web_sys::window().ok_or_else(|| "No window object".to_string())
    }

    pub fn local_storage() -> Result<Storage, String> {
        window()?
            .local_storage()
            .map_err(|_| "No localStorage".to_string())?
            .ok_or_else(|| "No localStorage".to_string())
    }

    /// `localStorage`-backed store.
    pub struct BrowserStorage;

    impl KeyValueStore for BrowserStorage {
        fn get(&self, key: &str) -> Option<String> {
            local_storage().ok()?.get_item(key).ok().flatten()
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            let storage = local_storage().map_err(StorageError::Unavailable)?;
            storage
                .set_item(key, value)
                .map_err(|_| StorageError::WriteFailed(key.to_string()))
        }

        fn remove(&self, key: &str) {
            if let Ok(storage) = local_storage() {
                let _ = storage.remove_item(key);
            }
        }
    }

    /// `document.cookie`-backed jar.
    pub struct BrowserCookieStore;

    impl BrowserCookieStore {
        fn html_document() -> Option<HtmlDocument> {
            web_sys::window()?.document()?.dyn_into::<HtmlDocument>().ok()
        }
    }

    impl CookieStore for BrowserCookieStore {
        fn get(&self, name: &str) -> Option<String> {
            let raw = Self::html_document()?.cookie().ok()?;
            raw.split(';').find_map(|pair| {
                let mut parts = pair.trim().splitn(2, '=');
                let key = parts.next()?;
                let value = parts.next()?;
                (key == name).then(|| value.to_string())
            })
        }

        fn set(&self, name: &str, value: &str) {
            if let Some(document) = Self::html_document() {
                let _ = document.set_cookie(&format!("{}={}; path=/", name, value));
            }
        }
    }
}
