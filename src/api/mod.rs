//! REST API module.
//!
//! Contains the admin sync endpoints following the admin UI contract.

mod content;
mod diagnostics;
mod media;

pub use content::*;
pub use diagnostics::*;
pub use media::*;
