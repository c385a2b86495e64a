//! Shared content block used by service and location detail pages.

use serde::{Deserialize, Serialize};

/// Placement of a block's text relative to its media.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockLayout {
    Left,
    Right,
    Center,
}

impl BlockLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockLayout::Left => "left",
            BlockLayout::Right => "right",
            BlockLayout::Center => "center",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "left" => Some(BlockLayout::Left),
            "right" => Some(BlockLayout::Right),
            "center" => Some(BlockLayout::Center),
            _ => None,
        }
    }
}

/// A single heading/body/media block on a detail page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    pub layout: BlockLayout,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eyebrow: Option<String>,
    pub heading: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_src: Option<String>,
}
