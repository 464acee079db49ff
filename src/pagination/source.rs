// Page sources
// Where the fetch engine gets its pages from

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

use super::page::{Page, PageRequest};
use crate::error::{Result, SyncError};
use crate::http_client::AuthenticatedGateway;
use crate::models::{ListRequest, ListResponse};

/// Default Connect route of the transaction listing service
pub const LIST_TRANSACTIONS_PATH: &str = "/null.v1.TransactionService/ListTransactions";

/// A cursor-paginated endpoint
///
/// Implementations report a rejected bearer credential as
/// [`SyncError::AuthorizationExpired`] and do not retry on their own.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<T>>;
}

/// Listing endpoint reached through the authenticated gateway
pub struct HttpPageSource<T> {
    gateway: AuthenticatedGateway,
    url: String,
    _item: PhantomData<fn() -> T>,
}

impl<T> HttpPageSource<T> {
    pub fn new(gateway: AuthenticatedGateway, api_base_url: &str, path: &str) -> Self {
        Self {
            gateway,
            url: format!("{}{}", api_base_url, path),
            _item: PhantomData,
        }
    }
}

#[async_trait]
impl<T> PageSource<T> for HttpPageSource<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<T>> {
        tracing::debug!(
            subject_id = %request.subject_id,
            page_size = request.page_size,
            has_cursor = request.cursor.is_some(),
            "Fetching page"
        );

        let body = ListRequest {
            user_id: &request.subject_id,
            limit: request.page_size,
            cursor: request.cursor.as_ref(),
        };

        let builder = self
            .gateway
            .client()
            .post(&self.url)
            .header("Connect-Protocol-Version", "1")
            .json(&body);

        let response = self.gateway.send(builder).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SyncError::from_transport(&e))?;

        let parsed: ListResponse<T> = serde_json::from_slice(&bytes).map_err(|e| {
            SyncError::ProtocolViolation(format!("Failed to parse listing response: {}", e))
        })?;

        Ok(parsed.into())
    }
}
