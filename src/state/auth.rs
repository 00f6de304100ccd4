use std::cell::RefCell;
use std::rc::Rc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use leptos::*;
use serde_json::Value;

use crate::api::types::{ApiError, Session, UserAccount};
use crate::utils::storage::KeyValueStore;
use crate::utils::time::Clock;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const CURRENT_USER_KEY: &str = "current_user";

/// Narrow read-only view of the auth collaborator. Injected everywhere a
/// component depends on the signed-in identity.
pub trait SessionProvider {
    fn current_session(&self) -> Option<Session>;
}

/// Session resolved from persisted storage (the shape the auth collaborator
/// writes on sign-in). Expired tokens are treated as absent.
pub struct StoredSessionProvider {
    store: Rc<dyn KeyValueStore>,
    clock: Rc<dyn Clock>,
}

impl StoredSessionProvider {
    pub fn new(store: Rc<dyn KeyValueStore>, clock: Rc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

impl SessionProvider for StoredSessionProvider {
    fn current_session(&self) -> Option<Session> {
        let token = self.store.get(ACCESS_TOKEN_KEY)?;
        let user: UserAccount = serde_json::from_str(&self.store.get(CURRENT_USER_KEY)?).ok()?;
        let session = Session {
            expires_at: decode_expiry(&token),
            access_token: token,
            user_id: user.id,
            role: user.role,
        };
        if session.is_expired(self.clock.now()) {
            return None;
        }
        Some(session)
    }
}

/// Fixed session for tests and SSR contexts.
#[derive(Default)]
pub struct StaticSessionProvider {
    session: RefCell<Option<Session>>,
}

impl StaticSessionProvider {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: RefCell::new(Some(session)),
        }
    }

    pub fn set(&self, session: Option<Session>) {
        *self.session.borrow_mut() = session;
    }
}

impl SessionProvider for StaticSessionProvider {
    fn current_session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }
}

pub fn persist_session(
    store: &dyn KeyValueStore,
    token: &str,
    user: &UserAccount,
) -> Result<(), String> {
    store
        .set(ACCESS_TOKEN_KEY, token)
        .map_err(|_| "Failed to store token".to_string())?;
    let user_json =
        serde_json::to_string(user).map_err(|_| "Failed to serialize user profile".to_string())?;
    store
        .set(CURRENT_USER_KEY, &user_json)
        .map_err(|_| "Failed to store user profile".to_string())?;
    Ok(())
}

pub fn clear_session(store: &dyn KeyValueStore) {
    store.remove(ACCESS_TOKEN_KEY);
    store.remove(CURRENT_USER_KEY);
}

fn decode_claims(token: &str) -> Option<Value> {
    let mut parts = token.split('.');
    parts.next()?;
    let payload = parts.next()?;
    let decoded = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&decoded).ok()
}

pub fn decode_expiry(token: &str) -> Option<DateTime<Utc>> {
    let exp = decode_claims(token)?.get("exp")?.as_i64()?;
    Utc.timestamp_opt(exp, 0).single()
}

type AuthContext = (ReadSignal<AuthState>, WriteSignal<AuthState>);

#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub session: Option<Session>,
    pub is_authenticated: bool,
}

impl AuthState {
    pub fn from_provider(provider: &dyn SessionProvider) -> Self {
        let session = provider.current_session();
        Self {
            is_authenticated: session.is_some(),
            session,
        }
    }
}

#[component]
pub fn AuthProvider(children: Children) -> impl IntoView {
    let provider = use_context::<Rc<dyn SessionProvider>>()
        .unwrap_or_else(|| Rc::new(StaticSessionProvider::anonymous()));
    let ctx = create_signal(AuthState::from_provider(provider.as_ref()));
    provide_context::<AuthContext>(ctx);
    view! { <>{children()}</> }
}

pub fn use_auth() -> AuthContext {
    use_context::<AuthContext>().unwrap_or_else(|| create_signal(AuthState::default()))
}

/// Re-reads the provider, e.g. after the auth collaborator rotates the token.
pub fn refresh_auth(provider: &dyn SessionProvider, set_auth: WriteSignal<AuthState>) {
    set_auth.set(AuthState::from_provider(provider));
}

/// Callers route unrecoverable 401/403 failures here.
pub fn handle_auth_error(error: &ApiError) {
    if !error.is_auth_error() {
        return;
    }
    redirect_to_sign_in();
}

#[cfg(target_arch = "wasm32")]
pub fn redirect_to_sign_in() {
    if let Some(window) = web_sys::window() {
        let location = window.location();
        if let Ok(pathname) = location.pathname() {
            if pathname == "/sign-in" {
                return;
            }
        }
        let _ = location.set_href("/sign-in");
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn redirect_to_sign_in() {
    log::info!("Auth failure; sign-in redirect requested");
}
