// Authentication module
// Manages the session lifecycle, bearer renewal and credential persistence

mod exchange;
mod manager;
mod store;
mod types;

pub use exchange::{extract_session_id, SESSION_COOKIE_KEYS};
pub use manager::{CredentialRenewer, TokenManager};
pub use store::{CredentialStore, MemoryCredentialStore, SqliteCredentialStore};
pub use types::{BearerToken, Session, SessionDetails, SessionInfo, UserDetails};
