//! Common API utilities and shared types

use serde::{Deserialize, Deserializer};

use crate::models::{ListParams, DEFAULT_PER_PAGE};

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

pub fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

/// Basic pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl PaginationQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page)
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in update bodies.
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// `{"ok": true}` body for actions without a resource to return
#[derive(Debug, serde::Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn new() -> Self {
        Self { ok: true }
    }
}

impl Default for OkResponse {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        assigned_to: Option<Option<i64>>,
    }

    #[test]
    fn test_double_option() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.assigned_to, None);

        let cleared: Patch = serde_json::from_str(r#"{"assigned_to":null}"#).unwrap();
        assert_eq!(cleared.assigned_to, Some(None));

        let set: Patch = serde_json::from_str(r#"{"assigned_to":7}"#).unwrap();
        assert_eq!(set.assigned_to, Some(Some(7)));
    }

    #[test]
    fn test_pagination_clamps() {
        let query = PaginationQuery {
            page: 0,
            per_page: 1000,
        };
        let params = query.params();
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 100);
    }
}
