//! Shared response envelope and pagination plumbing.
//!
//! Every endpoint responds `{success, message?, <resource>, pagination?}`;
//! handlers supply the `<resource>` key through a small flattened body
//! struct.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
}

impl Pagination {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        Self {
            total,
            pages: (total + limit - 1) / limit.max(1),
            current_page: page,
        }
    }
}

/// `?page=&limit=` query parameters, clamped to sane bounds.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

/// Deserializer for update fields where an explicit `null` means "clear the
/// value": an absent field stays `None`, `null` becomes `Some(None)`.
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(de).map(Some)
}

/// Body for responses that carry no resource, only a message.
#[derive(Debug, Default, Serialize)]
pub struct Empty {}

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub body: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(body: T) -> Self {
        Self { success: true, message: None, body, pagination: None }
    }

    pub fn with_message(message: impl Into<String>, body: T) -> Self {
        Self { success: true, message: Some(message.into()), body, pagination: None }
    }

    pub fn paginated(body: T, pagination: Pagination) -> Self {
        Self { success: true, message: None, body, pagination: Some(pagination) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Body {
        widgets: Vec<i32>,
    }

    #[test]
    fn envelope_flattens_resource_key() {
        let value =
            serde_json::to_value(Envelope::ok(Body { widgets: vec![1, 2] })).unwrap();
        assert_eq!(value, json!({ "success": true, "widgets": [1, 2] }));
    }

    #[test]
    fn pagination_rounds_up() {
        let p = Pagination::new(21, 2, 10);
        assert_eq!(p.pages, 3);
        assert_eq!(p.current_page, 2);
    }

    #[test]
    fn page_params_clamped() {
        let p = PageParams { page: Some(0), limit: Some(1000) };
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), MAX_PAGE_SIZE);
        assert_eq!(p.offset(), 0);
        let d = PageParams::default();
        assert_eq!(d.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(PageParams { page: Some(3), limit: Some(10) }.offset(), 20);
    }
}
