//! Authentication module for the client-side session.
//!
//! This module provides:
//! - `Session`: the session state machine (`login`, `logout`, `check_expiry`)
//! - `KeyValueStore`: durable storage for the credential record, with file,
//!   OS keychain and in-memory backends
//! - `Clock`: time source for expiry decisions
//!
//! Sessions are granted a fixed 24 hour window at login. Expiry is only
//! enforced when `check_expiry` is called.

pub mod clock;
pub mod credentials;
pub mod session;

pub use clock::{Clock, FixedClock, SystemClock};
pub use credentials::{
    FileStore, KeyValueStore, KeyringStore, MemoryStore, StorageError, EXPIRY_KEY, TOKEN_KEY,
    USER_KEY,
};
pub use session::{Session, SessionState};
