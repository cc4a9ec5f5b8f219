//! Terminal UI module using ratatui.
//!
//! - `render`: frame layout and card drawing
//! - `input`: key and mouse handling (including swipes)
//! - `styles`: color scheme and text styling

pub mod input;
pub mod render;
pub mod styles;
