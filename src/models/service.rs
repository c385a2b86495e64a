//! Service model (vending programs, restocking, maintenance, ...).

use serde::{Deserialize, Serialize};

use super::ContentBlock;

/// A service offering with its detail-page blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// Unique key, also the detail-page URL segment
    pub slug: String,
    /// Hidden services stay in the document but are not rendered
    pub display: bool,
    pub icon_src: String,
    pub title: String,
    pub excerpt: String,
    pub hero_image_src: String,
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
}
