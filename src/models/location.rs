//! Location model (offices, gyms, schools, ...).

use serde::{Deserialize, Serialize};

use super::ContentBlock;

/// A serviced location type with its detail-page blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Unique key, also the detail-page URL segment
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Key into the frontend's icon map (e.g. "FaBuilding")
    pub icon_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero_image_src: Option<String>,
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
}
