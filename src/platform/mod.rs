//! Platform backends for the player capabilities.

#[cfg(not(target_arch = "wasm32"))]
pub mod native;
#[cfg(target_arch = "wasm32")]
pub mod web;

#[cfg(not(target_arch = "wasm32"))]
pub use native::{capabilities, connector, launch_query, on_page_hide, page_origin, timer};
#[cfg(target_arch = "wasm32")]
pub use web::{capabilities, connector, launch_query, on_page_hide, page_origin, timer};
