//! Asset loading.

pub mod texture;

pub use texture::{load_binary, load_texture};
