//! Navigation bar model.

use serde::{Deserialize, Serialize};

/// A single navigation entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavLink {
    pub label: String,
    pub href: String,
}

/// Site-wide navigation chrome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavBar {
    pub logo_src: String,
    pub logo_href: String,
    #[serde(default)]
    pub links: Vec<NavLink>,
    pub cta_label: String,
}
