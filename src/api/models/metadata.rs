use crate::providers::{BookMetadataResult, MetadataSearchRequest};
use serde::{Deserialize, Serialize};

/// Query parameters shared by the metadata search endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct MetadataQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    /// Comma-separated provider names restricting the fan-out
    pub providers: Option<String>,
    /// Per-provider result cap
    pub limit: Option<usize>,
}

impl MetadataQuery {
    /// The search fields as a provider request, trimmed, with blank values
    /// dropped entirely.
    pub fn search_request(&self) -> MetadataSearchRequest {
        MetadataSearchRequest {
            title: clean(&self.title),
            author: clean(&self.author),
            isbn: clean(&self.isbn),
        }
    }

    /// The provider restriction as a name list, or `None` when the parameter
    /// is absent or carries no usable names.
    pub fn provider_filter(&self) -> Option<Vec<String>> {
        let raw = self.providers.as_deref()?;
        let names: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        if names.is_empty() {
            None
        } else {
            Some(names)
        }
    }
}

fn clean(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Response body for best-match lookups. `result` is always present so
/// clients can test it against `null` directly.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestMatchResponse {
    pub result: Option<BookMetadataResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
}
