//! The components module contains all shared components for the player app.

mod app;
mod icons;
mod player;

pub use app::*;
pub use icons::*;
pub use player::*;
