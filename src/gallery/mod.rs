//! Gallery viewer navigation

mod navigator;
mod state;

pub use navigator::{GalleryLimits, GalleryNavigator, GalleryOutcome};
pub use state::NavState;
