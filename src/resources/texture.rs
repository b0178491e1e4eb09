use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::data_structures::texture;

/// Where assets are looked up, relative to the working directory.
pub const ASSET_DIR: &str = "assets";

/// The copy of `assets/` bundled by the build script.
const BUNDLED_ASSET_DIR: &str = concat!(env!("OUT_DIR"), "/assets");

fn asset_path(file_name: &str) -> PathBuf {
    let local = Path::new("./").join(ASSET_DIR).join(file_name);
    if local.exists() {
        local
    } else {
        Path::new(BUNDLED_ASSET_DIR).join(file_name)
    }
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = asset_path(file_name);
    let data = std::fs::read(&path).with_context(|| format!("reading asset {}", path.display()))?;
    Ok(data)
}

/// Loads `file_name` from the asset directory and uploads it as a material texture.
pub async fn load_texture(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<texture::Texture> {
    let data = load_binary(file_name).await?;
    let format = Path::new(file_name).extension().and_then(|ext| ext.to_str());
    texture::Texture::from_bytes(device, queue, &data, file_name, format)
}
