use std::sync::{Arc, Mutex, MutexGuard};

use super::page::{Cursor, Page, PageRequest};
use super::source::PageSource;
use super::state::{FetchState, FetchStatus};
use crate::auth::CredentialRenewer;
use crate::error::Result;

/// Items requested per page
pub const PAGE_SIZE: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchKind {
    First,
    More,
}

/// A fetch admitted by the state guards
struct Ticket {
    kind: FetchKind,
    epoch: u64,
    cursor: Option<Cursor>,
}

struct Tracked<T> {
    state: FetchState<T>,
    /// Bumped by every admitted fetch; completions for an older epoch are dropped
    epoch: u64,
}

/// Paginated fetch engine for a single logical list
///
/// `Loading` and `LoadingMore` act as the lock: starting a fetch while one
/// is in flight is a silent no-op. Only `refresh` overrides an in-flight
/// fetch, and the overridden completion is discarded.
pub struct PagedList<T> {
    source: Arc<dyn PageSource<T>>,
    renewer: Arc<dyn CredentialRenewer>,
    subject_id: String,
    tracked: Mutex<Tracked<T>>,
}

impl<T: Clone> PagedList<T> {
    pub fn new(
        source: Arc<dyn PageSource<T>>,
        renewer: Arc<dyn CredentialRenewer>,
        subject_id: impl Into<String>,
    ) -> Self {
        Self {
            source,
            renewer,
            subject_id: subject_id.into(),
            tracked: Mutex::new(Tracked {
                state: FetchState::default(),
                epoch: 0,
            }),
        }
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Snapshot of the current state
    pub fn state(&self) -> FetchState<T> {
        self.lock().state.clone()
    }

    /// Fetch the first page, replacing the list on success
    pub async fn load_first(&self) {
        if let Some(ticket) = self.begin(FetchKind::First, false) {
            self.run(ticket).await;
        }
    }

    /// Fetch the next page and append it
    pub async fn load_more(&self) {
        if let Some(ticket) = self.begin(FetchKind::More, false) {
            self.run(ticket).await;
        }
    }

    /// Drop accumulated items and cursor, then fetch the first page again
    pub async fn refresh(&self) {
        if let Some(ticket) = self.begin(FetchKind::First, true) {
            self.run(ticket).await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tracked<T>> {
        self.tracked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply the guards and enter the loading status
    fn begin(&self, kind: FetchKind, reset: bool) -> Option<Ticket> {
        let mut tracked = self.lock();
        let state = &mut tracked.state;

        if reset {
            state.items.clear();
            state.next_cursor = None;
            state.has_more = true;
            state.total_count = 0;
        } else {
            let admitted = match kind {
                FetchKind::First => !state.status.is_in_flight(),
                FetchKind::More => state.can_load_more(),
            };
            if !admitted {
                tracing::debug!(?kind, status = ?state.status, "Fetch not started");
                return None;
            }
        }

        state.status = match kind {
            FetchKind::First => FetchStatus::Loading,
            FetchKind::More => FetchStatus::LoadingMore,
        };
        state.error = None;
        let cursor = match kind {
            FetchKind::First => None,
            FetchKind::More => state.next_cursor.clone(),
        };

        tracked.epoch += 1;
        Some(Ticket {
            kind,
            epoch: tracked.epoch,
            cursor,
        })
    }

    async fn run(&self, ticket: Ticket) {
        let mut pending = PendingFetch {
            list: self,
            kind: ticket.kind,
            epoch: ticket.epoch,
            settled: false,
        };

        let request = PageRequest {
            subject_id: self.subject_id.clone(),
            page_size: PAGE_SIZE,
            cursor: ticket.cursor,
        };
        let result = self.fetch_with_renewal(&request).await;

        pending.settled = true;
        self.complete(ticket.kind, ticket.epoch, result);
    }

    /// Issue the request; on an authorization failure renew once and retry once
    async fn fetch_with_renewal(&self, request: &PageRequest) -> Result<Page<T>> {
        match self.source.fetch_page(request).await {
            Err(e) if e.is_authorization_failure() => {
                tracing::warn!("Page fetch unauthorized, renewing credential and retrying once");
                if let Err(renew_err) = self.renewer.renew().await {
                    tracing::error!("Credential renewal failed: {}", renew_err);
                    return Err(renew_err);
                }
                self.source.fetch_page(request).await
            }
            other => other,
        }
    }

    fn complete(&self, kind: FetchKind, epoch: u64, result: Result<Page<T>>) {
        let mut tracked = self.lock();
        if tracked.epoch != epoch {
            tracing::debug!(?kind, "Discarding superseded page result");
            return;
        }

        let state = &mut tracked.state;
        match (kind, result) {
            (FetchKind::First, Ok(page)) => {
                state.items = page.items;
                apply_position(state, page.total_count, page.next_cursor);
            }
            (FetchKind::More, Ok(page)) => {
                state.items.extend(page.items);
                apply_position(state, page.total_count, page.next_cursor);
            }
            (FetchKind::First, Err(e)) => {
                tracing::warn!("First page failed: {}", e);
                state.status = FetchStatus::Error(e.to_string());
                state.error = Some(e.to_string());
            }
            (FetchKind::More, Err(e)) => {
                tracing::warn!(retained = state.items.len(), "Next page failed: {}", e);
                state.status = FetchStatus::Loaded;
                state.error = Some(e.to_string());
            }
        }
    }

    /// Roll back a fetch whose future was dropped before finishing
    fn abandon(&self, kind: FetchKind, epoch: u64) {
        let mut tracked = self.lock();
        if tracked.epoch != epoch || !tracked.state.status.is_in_flight() {
            return;
        }
        tracing::debug!(?kind, "Fetch abandoned");
        tracked.state.status = match kind {
            FetchKind::First => FetchStatus::Idle,
            FetchKind::More => FetchStatus::Loaded,
        };
    }
}

fn apply_position<T>(state: &mut FetchState<T>, total_count: i64, next_cursor: Option<Cursor>) {
    state.total_count = total_count;
    state.has_more = next_cursor.is_some();
    state.next_cursor = next_cursor;
    state.status = FetchStatus::Loaded;
    state.error = None;
}

/// Restores a resumable status if the fetch future is dropped mid-flight
struct PendingFetch<'a, T: Clone> {
    list: &'a PagedList<T>,
    kind: FetchKind,
    epoch: u64,
    settled: bool,
}

impl<T: Clone> Drop for PendingFetch<'_, T> {
    fn drop(&mut self) {
        if !self.settled {
            self.list.abandon(self.kind, self.epoch);
        }
    }
}
