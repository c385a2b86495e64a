//! Homepage section models.

use serde::{Deserialize, Serialize};

/// Hero banner at the top of the homepage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroSection {
    pub headline: String,
    pub body: String,
    pub cta_label: String,
    pub image_src: String,
}

/// Eyebrow/heading/body intro preceding a homepage section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionIntro {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eyebrow: Option<String>,
    pub heading: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// All homepage content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeContent {
    pub hero: HeroSection,
    pub services_intro: SectionIntro,
    pub locations_intro: SectionIntro,
    pub testimonials_intro: SectionIntro,
    pub form_intro: SectionIntro,
}
