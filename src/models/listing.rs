use serde::{Deserialize, Serialize};

use crate::pagination::{deserialize_count, Cursor, Page};

/// Listing request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest<'a> {
    pub user_id: &'a str,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<&'a Cursor>,
}

/// Listing response body
///
/// Empty repeated fields and zero counts may be omitted by the service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new", alias = "transactions")]
    pub items: Vec<T>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub total_count: i64,
    #[serde(default)]
    pub next_cursor: Option<Cursor>,
}

impl<T> From<ListResponse<T>> for Page<T> {
    fn from(response: ListResponse<T>) -> Self {
        Page {
            items: response.items,
            total_count: response.total_count,
            next_cursor: response.next_cursor,
        }
    }
}
