//! Root content document.

use serde::{Deserialize, Serialize};

use super::{HomeContent, Location, NavBar, Service, Testimonial};

/// Toggles for generated per-item detail pages and their links.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicPages {
    pub services: bool,
    pub locations: bool,
}

impl Default for DynamicPages {
    fn default() -> Self {
        Self {
            services: true,
            locations: true,
        }
    }
}

/// The full structured record of page content. Mutated only by whole-document
/// replacement through the sync endpoint; never partially patched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDocument {
    pub nav_bar: NavBar,
    pub home: HomeContent,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub testimonials: Vec<Testimonial>,
    #[serde(default)]
    pub dynamic_pages: DynamicPages,
}
