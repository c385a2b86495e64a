//! Client testimonial model.

use serde::{Deserialize, Serialize};

/// A client quote shown in the homepage carousel.
///
/// `location_slug` loosely references `Location::slug`; the reference is
/// not enforced so quotes can outlive a retired location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub id: String,
    pub location_slug: String,
    pub quote: String,
    pub client_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_label: Option<String>,
}
