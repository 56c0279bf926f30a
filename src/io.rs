use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbaImage};

use crate::document::{ImageDocument, file_name_of};
use crate::error::Result;

/// Extensions offered in the open dialog.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp"];

// ============================================================================
// LOADING
// ============================================================================

/// Decode an image file into an [`ImageDocument`] keyed by its file name.
pub fn load_image_sync(path: &Path) -> Result<ImageDocument> {
    let pixels = image::open(path)?.to_rgba8();
    Ok(ImageDocument::from_file(path, pixels))
}

/// Copy `path` into the service's shared image directory unless it already
/// lives there. Returns the path inside `shared_dir`.
pub fn stage_for_service(path: &Path, shared_dir: &Path) -> Result<PathBuf> {
    let target = shared_dir.join(file_name_of(path));
    let same_file = match (path.canonicalize(), target.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if !same_file {
        std::fs::create_dir_all(shared_dir)?;
        std::fs::copy(path, &target)?;
        crate::log_info!("Staged {} → {}", path.display(), target.display());
    }
    Ok(target)
}

// ============================================================================
// PNG ENCODING
// ============================================================================

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    write_png(image, &mut Cursor::new(&mut bytes))?;
    Ok(bytes)
}

fn write_png<W: Write>(image: &RgbaImage, writer: W) -> Result<()> {
    PngEncoder::new(writer).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ColorType::Rgba8,
    )?;
    Ok(())
}

/// Encode and write a PNG. Standalone so it can run on a background thread.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_png(image, &mut writer)?;
    writer.flush()?;
    Ok(())
}
