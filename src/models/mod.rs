// Data models for the listing service wire format

pub mod listing;
pub mod transaction;

pub use listing::{ListRequest, ListResponse};
pub use transaction::{Transaction, TransactionDirection};
