//! Query DTOs for the API.

use serde::Deserialize;
use utoipa::IntoParams;

/// Interpret a query flag. Only `true` and `1` enable it.
fn flag(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("true") | Some("1"))
}

/// `GET /api/feeds` query.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeedsQuery {
    /// `true` to bypass the cache for this request only.
    #[serde(rename = "forceRefresh")]
    pub force_refresh: Option<String>,
    /// Cache buster, ignored.
    pub t: Option<String>,
    /// `array` returns the bare list without the envelope.
    pub format: Option<String>,
}

impl FeedsQuery {
    pub fn force(&self) -> bool {
        flag(self.force_refresh.as_deref())
    }

    pub fn wants_array(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|f| f.trim().eq_ignore_ascii_case("array"))
    }
}

/// `GET /api/update-cache` query.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UpdateCacheQuery {
    /// Shared secret.
    pub key: Option<String>,
    /// `true` to delete the snapshot before refreshing.
    pub clear: Option<String>,
    /// Free-form caller label, echoed in the debug block.
    pub client: Option<String>,
}

impl UpdateCacheQuery {
    pub fn clear(&self) -> bool {
        flag(self.clear.as_deref())
    }
}
