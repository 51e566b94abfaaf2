//! Authentication module for managing the bearer credential.
//!
//! This module provides:
//! - `TokenStore`: persistence for the access token (memory, file, keychain)
//! - `Session`: the credential holder shared with the API client, which
//!   publishes `SessionEvent`s the front-end reacts to
//!
//! The token is stored under the fixed key `access_token`.

pub mod credentials;
pub mod session;
pub mod store;

pub use credentials::KeyringTokenStore;
pub use session::{
    is_auth_page, InvalidationReason, Session, SessionEvent, LOGIN_PAGE, REGISTER_PAGE,
};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY};
