//! Image encoding: `DynamicImage` → PNG bytes → base64 data URI.
//!
//! PNG is lossless; the superscript daggers and asterisks that decide author
//! roles are a few pixels tall and do not survive JPEG artefacts.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!("Encoded {}x{} page → {} PNG bytes", img.width(), img.height(), buf.len());
    Ok(buf)
}

/// Base64 (standard alphabet, padded) of the PNG bytes.
pub fn to_base64(png: &[u8]) -> String {
    STANDARD.encode(png)
}

/// Inline `data:image/png;base64,…` URI for a chat-completions `image_url` part.
pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", to_base64(png))
}
