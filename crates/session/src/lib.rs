use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Browser storage key the demo login writes.
pub const TOKEN_KEY: &str = "spotify_token";
/// Placeholder token value; there is no real OAuth.
pub const DEMO_TOKEN: &str = "demo-token";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("browser storage unavailable")]
    StorageUnavailable,
    #[error("session storage error: {0}")]
    Io(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub logged_in: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// "Connect with Spotify (Demo Mode)".
    DemoLogin,
    Logout,
}

impl SessionState {
    pub fn apply(self, event: SessionEvent) -> SessionState {
        match event {
            SessionEvent::DemoLogin => SessionState { logged_in: true },
            SessionEvent::Logout => SessionState { logged_in: false },
        }
    }
}

/// Top-level screen chosen from the session.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Login,
    Map,
}

impl Screen {
    pub fn for_session(state: &SessionState) -> Screen {
        if state.logged_in { Screen::Map } else { Screen::Login }
    }
}

pub trait SessionStore {
    fn load(&self) -> Result<SessionState, SessionError>;
    fn save(&mut self, state: &SessionState) -> Result<(), SessionError>;
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    token: Option<String>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logged_in() -> Self {
        Self {
            token: Some(DEMO_TOKEN.to_string()),
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self) -> Result<SessionState, SessionError> {
        Ok(state_from_token(self.token.as_deref()))
    }

    fn save(&mut self, state: &SessionState) -> Result<(), SessionError> {
        self.token = state.logged_in.then(|| DEMO_TOKEN.to_string());
        Ok(())
    }
}

/// Any non-empty token counts as logged in.
fn state_from_token(token: Option<&str>) -> SessionState {
    SessionState {
        logged_in: token.is_some_and(|t| !t.trim().is_empty()),
    }
}

/// The application-root session: read once at startup, then changed only
/// through explicit transitions.
#[derive(Debug)]
pub struct Session<S: SessionStore> {
    store: S,
    state: SessionState,
}

impl<S: SessionStore> Session<S> {
    pub fn open(store: S) -> Result<Self, SessionError> {
        let state = store.load()?;
        debug!(logged_in = state.logged_in, "session opened");
        Ok(Self { store, state })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn screen(&self) -> Screen {
        Screen::for_session(&self.state)
    }

    pub fn dispatch(&mut self, event: SessionEvent) -> Result<SessionState, SessionError> {
        let next = self.state.apply(event);
        if next != self.state {
            self.store.save(&next)?;
            info!(?event, logged_in = next.logged_in, "session changed");
        }
        self.state = next;
        Ok(next)
    }

    pub fn login(&mut self) -> Result<SessionState, SessionError> {
        self.dispatch(SessionEvent::DemoLogin)
    }

    pub fn logout(&mut self) -> Result<SessionState, SessionError> {
        self.dispatch(SessionEvent::Logout)
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

/// String key/value storage shaped like the browser's `localStorage`.
pub trait TokenBackend {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError>;
    fn remove(&mut self, key: &str) -> Result<(), SessionError>;
}

/// Keeps the login as a token under one key of a [`TokenBackend`].
#[derive(Debug)]
pub struct KeyedSessionStore<B> {
    backend: B,
    key: String,
}

impl<B: TokenBackend> KeyedSessionStore<B> {
    pub fn with_backend(backend: B, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: TokenBackend> SessionStore for KeyedSessionStore<B> {
    fn load(&self) -> Result<SessionState, SessionError> {
        let raw = self.backend.get(&self.key)?;
        Ok(state_from_token(raw.as_deref()))
    }

    fn save(&mut self, state: &SessionState) -> Result<(), SessionError> {
        if state.logged_in {
            self.backend.set(&self.key, DEMO_TOKEN)
        } else {
            self.backend.remove(&self.key)
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm_storage {
    use super::{KeyedSessionStore, SessionError, TokenBackend};

    /// `window.localStorage`, looked up on every access.
    #[derive(Debug, Default, Copy, Clone)]
    pub struct BrowserStorage;

    impl TokenBackend for BrowserStorage {
        fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
            window_local_storage()?
                .get_item(key)
                .map_err(|e| SessionError::Io(format!("get_item failed: {:?}", e)))
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
            window_local_storage()?
                .set_item(key, value)
                .map_err(|e| SessionError::Io(format!("set_item failed: {:?}", e)))
        }

        fn remove(&mut self, key: &str) -> Result<(), SessionError> {
            window_local_storage()?
                .remove_item(key)
                .map_err(|e| SessionError::Io(format!("remove_item failed: {:?}", e)))
        }
    }

    pub type LocalStorageSessionStore = KeyedSessionStore<BrowserStorage>;

    impl KeyedSessionStore<BrowserStorage> {
        pub fn new(key: impl Into<String>) -> Result<Self, SessionError> {
            // Fail early so callers can fall back to memory.
            window_local_storage()?;
            Ok(Self::with_backend(BrowserStorage, key))
        }
    }

    fn window_local_storage() -> Result<web_sys::Storage, SessionError> {
        let win = web_sys::window().ok_or(SessionError::StorageUnavailable)?;
        win.local_storage()
            .map_err(|e| SessionError::Io(format!("localStorage error: {:?}", e)))?
            .ok_or(SessionError::StorageUnavailable)
    }

}

#[cfg(target_arch = "wasm32")]
pub use wasm_storage::{BrowserStorage, LocalStorageSessionStore};

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct LocalStorageSessionStore;

#[cfg(not(target_arch = "wasm32"))]
impl LocalStorageSessionStore {
    pub fn new(_key: impl Into<String>) -> Result<Self, SessionError> {
        Err(SessionError::StorageUnavailable)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl SessionStore for LocalStorageSessionStore {
    fn load(&self) -> Result<SessionState, SessionError> {
        Err(SessionError::StorageUnavailable)
    }

    fn save(&mut self, _state: &SessionState) -> Result<(), SessionError> {
        Err(SessionError::StorageUnavailable)
    }
}

/// Browser storage when present, memory otherwise.
#[derive(Debug)]
pub enum AnySessionStore {
    Local(LocalStorageSessionStore),
    Memory(InMemorySessionStore),
}

impl AnySessionStore {
    pub fn detect() -> Self {
        match LocalStorageSessionStore::new(TOKEN_KEY) {
            Ok(s) => AnySessionStore::Local(s),
            Err(_) => AnySessionStore::Memory(InMemorySessionStore::new()),
        }
    }
}

impl SessionStore for AnySessionStore {
    fn load(&self) -> Result<SessionState, SessionError> {
        match self {
            AnySessionStore::Local(s) => s.load(),
            AnySessionStore::Memory(s) => s.load(),
        }
    }

    fn save(&mut self, state: &SessionState) -> Result<(), SessionError> {
        match self {
            AnySessionStore::Local(s) => s.save(state),
            AnySessionStore::Memory(s) => s.save(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn transitions_are_explicit() {
        let s = SessionState::default();
        assert!(!s.logged_in);
        let s = s.apply(SessionEvent::DemoLogin);
        assert!(s.logged_in);
        assert_eq!(s.apply(SessionEvent::DemoLogin), s);
        assert!(!s.apply(SessionEvent::Logout).logged_in);
    }

    #[test]
    fn screen_follows_login_flag() {
        assert_eq!(Screen::for_session(&SessionState { logged_in: false }), Screen::Login);
        assert_eq!(Screen::for_session(&SessionState { logged_in: true }), Screen::Map);
    }

    #[test]
    fn login_persists_token() {
        let mut session = Session::open(InMemorySessionStore::new()).unwrap();
        assert_eq!(session.screen(), Screen::Login);
        session.login().unwrap();
        assert_eq!(session.screen(), Screen::Map);

        let reopened = Session::open(session.into_store()).unwrap();
        assert!(reopened.state().logged_in);
    }

    #[test]
    fn logout_clears_token() {
        let mut session = Session::open(InMemorySessionStore::logged_in()).unwrap();
        assert!(session.state().logged_in);
        session.logout().unwrap();
        let store = session.into_store();
        assert_eq!(store.load().unwrap(), SessionState { logged_in: false });
    }

    #[test]
    fn blank_token_is_not_a_login() {
        assert!(!state_from_token(Some("   ")).logged_in);
        assert!(!state_from_token(None).logged_in);
        assert!(state_from_token(Some(DEMO_TOKEN)).logged_in);
    }

    #[derive(Debug, Default)]
    struct MapBackend {
        items: std::collections::BTreeMap<String, String>,
        broken: bool,
    }

    impl TokenBackend for MapBackend {
        fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
            if self.broken {
                return Err(SessionError::Io("quota exceeded".into()));
            }
            Ok(self.items.get(key).cloned())
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
            if self.broken {
                return Err(SessionError::Io("quota exceeded".into()));
            }
            self.items.insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&mut self, key: &str) -> Result<(), SessionError> {
            self.items.remove(key);
            Ok(())
        }
    }

    #[test]
    fn keyed_store_writes_and_removes_the_token() {
        let store = KeyedSessionStore::with_backend(MapBackend::default(), TOKEN_KEY);
        let mut session = Session::open(store).unwrap();
        session.login().unwrap();
        let store = session.into_store();
        assert_eq!(store.backend().items.get(TOKEN_KEY).map(String::as_str), Some(DEMO_TOKEN));

        let mut session = Session::open(store).unwrap();
        assert_eq!(session.screen(), Screen::Map);
        session.logout().unwrap();
        assert!(session.into_store().backend().items.is_empty());
    }

    #[test]
    fn keyed_store_reads_tokens_written_elsewhere() {
        let mut backend = MapBackend::default();
        backend.items.insert(TOKEN_KEY.to_string(), "someone-else".to_string());
        backend.items.insert("other".to_string(), DEMO_TOKEN.to_string());
        let store = KeyedSessionStore::with_backend(backend, TOKEN_KEY);
        assert!(store.load().unwrap().logged_in);

        let mut blank = MapBackend::default();
        blank.items.insert(TOKEN_KEY.to_string(), " ".to_string());
        let store = KeyedSessionStore::with_backend(blank, TOKEN_KEY);
        assert!(!store.load().unwrap().logged_in);
    }

    #[test]
    fn keyed_store_surfaces_backend_errors() {
        let broken = MapBackend {
            broken: true,
            ..MapBackend::default()
        };
        let store = KeyedSessionStore::with_backend(broken, TOKEN_KEY);
        assert_eq!(
            Session::open(store).unwrap_err(),
            SessionError::Io("quota exceeded".into())
        );
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn native_build_falls_back_to_memory() {
        let store = AnySessionStore::detect();
        assert!(matches!(store, AnySessionStore::Memory(_)));
        assert_eq!(store.load().unwrap(), SessionState::default());
    }
}
