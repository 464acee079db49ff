// Paginated fetch engine
// Cursor-driven list retrieval with a renew-and-retry-once policy

mod engine;
mod page;
mod source;
mod state;

pub use engine::{PagedList, PAGE_SIZE};
pub(crate) use page::deserialize_count;
pub use page::{Cursor, Page, PageRequest};
pub use source::{HttpPageSource, PageSource, LIST_TRANSACTIONS_PATH};
pub use state::{FetchState, FetchStatus};
