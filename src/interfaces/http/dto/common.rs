//! Common API DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::{PageLink, Pagination};

/// Standard API envelope, used for error bodies.
///
/// On failure: `{"success": false, "data": null, "error": "description"}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Page window of a history listing.
///
/// `previousOffset` / `nextOffset` are omitted when there is no such page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDto {
    pub total: u64,
    pub page_size: u64,
    /// Index of the first record on this page
    pub offset: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<u64>,
}

impl From<&Pagination> for PaginationDto {
    fn from(p: &Pagination) -> Self {
        Self {
            total: p.total(),
            page_size: p.page_size(),
            offset: p.offset(),
            previous_offset: p.previous_offset(),
            next_offset: p.next_offset(),
        }
    }
}

/// Entry of the page navigation strip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PageLinkDto {
    /// `previous`, `page`, `gap` or `next`
    pub kind: String,
    /// One-based page number; absent for gaps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub current: bool,
}

impl From<PageLink> for PageLinkDto {
    fn from(link: PageLink) -> Self {
        let (kind, number, current) = match link {
            PageLink::Previous(n) => ("previous", Some(n), false),
            PageLink::Page { number, current } => ("page", Some(number), current),
            PageLink::Gap => ("gap", None, false),
            PageLink::Next(n) => ("next", Some(n), false),
        };
        Self {
            kind: kind.to_string(),
            number,
            current,
        }
    }
}
