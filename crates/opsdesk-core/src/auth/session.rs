use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Result};
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::store::{MemoryTokenStore, TokenStore};

/// Location of the login page in the front-end
pub const LOGIN_PAGE: &str = "/login";

/// Location of the registration page in the front-end
pub const REGISTER_PAGE: &str = "/register";

/// Location the front-end starts on
const HOME_PAGE: &str = "/";

/// Capacity of the session event channel.
/// Subscribers that fall further behind than this see `Lagged` and skip ahead.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Why a session was ended by the client rather than by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    /// 401 received while no token was stored
    NoCredential,
    /// 401 from an authentication endpoint (bad login, rejected refresh call)
    AuthEndpointRejected,
    /// The refresh call after a 401 did not produce a new token
    RefreshFailed,
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidationReason::NoCredential => write!(f, "not signed in"),
            InvalidationReason::AuthEndpointRejected => write!(f, "credentials rejected"),
            InvalidationReason::RefreshFailed => write!(f, "session expired"),
        }
    }
}

/// Notifications published to the hosting front-end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    TokenRefreshed,
    SignedOut,
    /// Token was cleared by the client. `redirect_to` is the login page, or
    /// `None` when the front-end is already on an authentication page.
    Invalidated {
        reason: InvalidationReason,
        redirect_to: Option<String>,
    },
}

/// True for pages that belong to the authentication flow
pub fn is_auth_page(location: &str) -> bool {
    let path = location.split(['?', '#']).next().unwrap_or(location);
    let path = path.trim_end_matches('/');
    path == LOGIN_PAGE || path == REGISTER_PAGE
}

/// Credential holder shared by the API client and the front-end.
///
/// Wraps a [`TokenStore`] and publishes [`SessionEvent`]s on every
/// transition. Also tracks the front-end's current location so the client
/// can decide whether a login redirect is needed.
pub struct Session {
    store: Arc<dyn TokenStore>,
    location: RwLock<String>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            location: RwLock::new(HOME_PAGE.to_string()),
            events,
        }
    }

    /// Session backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()))
    }

    /// Receive session events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Current bearer token, read from the store on every call
    pub fn token(&self) -> Result<Option<String>> {
        self.store.get()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.store.get(), Ok(Some(_)))
    }

    /// Store a token obtained from login
    pub fn sign_in(&self, token: &str) -> Result<()> {
        self.store.set(token)?;
        info!("Signed in");
        self.publish(SessionEvent::SignedIn);
        Ok(())
    }

    /// Store a token obtained from refresh
    pub fn replace_token(&self, token: &str) -> Result<()> {
        self.store.set(token)?;
        debug!("Token replaced after refresh");
        self.publish(SessionEvent::TokenRefreshed);
        Ok(())
    }

    /// User-initiated logout
    pub fn sign_out(&self) -> Result<()> {
        self.store.clear()?;
        info!("Signed out");
        self.publish(SessionEvent::SignedOut);
        Ok(())
    }

    /// Clear the token and ask the front-end to show the login page,
    /// unless it is already on an authentication page.
    pub fn invalidate(&self, reason: InvalidationReason) -> Result<()> {
        let cleared = self.store.clear();
        let redirect_to = if self.on_auth_page() {
            None
        } else {
            Some(LOGIN_PAGE.to_string())
        };
        info!(%reason, redirect = redirect_to.is_some(), "Session invalidated");
        self.publish(SessionEvent::Invalidated {
            reason,
            redirect_to,
        });
        cleared
    }

    /// Record where the front-end currently is
    pub fn set_location(&self, location: impl Into<String>) {
        if let Ok(mut guard) = self.location.write() {
            *guard = location.into();
        }
    }

    pub fn location(&self) -> Result<String> {
        self.location
            .read()
            .map(|l| l.clone())
            .map_err(|_| anyhow!("Location lock poisoned"))
    }

    pub fn on_auth_page(&self) -> bool {
        self.location.read().map(|l| is_auth_page(&l)).unwrap_or(false)
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
