pub mod animation;
pub mod geometry;
pub mod light;
pub mod node;
pub mod texture;
pub mod uniform;
pub mod vertex;
