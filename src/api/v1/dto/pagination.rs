use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use uuid::Uuid;

use crate::services::collaborators::model::{Page, PageRequest};

/// `?page=&limit=`; out-of-range values are clamped rather than rejected.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
}

/// List payload: `{"<key>": [...], "pagination": {"page", "limit", "total"}}`.
#[derive(Debug)]
pub struct Listed<T> {
    key: &'static str,
    items: Vec<T>,
    pagination: Pagination,
}

impl<T> Listed<T> {
    pub fn new(key: &'static str, page: Page<T>) -> Self {
        Self {
            key,
            pagination: Pagination {
                page: page.request.page,
                limit: page.request.limit,
                total: page.total,
            },
            items: page.items,
        }
    }

    /// Re-shape items (e.g. domain record -> response DTO).
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listed<U> {
        Listed {
            key: self.key,
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

impl<T: Serialize> Serialize for Listed<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.key, &self.items)?;
        map.serialize_entry("pagination", &self.pagination)?;
        map.end()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct Deleted {
    pub id: Uuid,
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_listed_uses_resource_key() {
        let page = PageRequest::new(Some(1), Some(2)).apply(vec![1, 2, 3]);
        let value = serde_json::to_value(Listed::new("alerts", page)).unwrap();

        assert_eq!(
            value,
            json!({"alerts": [1, 2], "pagination": {"page": 1, "limit": 2, "total": 3}})
        );
    }
}
