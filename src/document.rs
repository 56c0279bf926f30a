use std::path::Path;

use image::RgbaImage;

/// The image currently open in a session.
///
/// Immutable once loaded; opening another file replaces the whole document.
#[derive(Clone, Debug)]
pub struct ImageDocument {
    /// File name the mask service knows the image by (e.g. `cat.jpg`).
    pub file_name: String,
    pub pixels: RgbaImage,
}

impl ImageDocument {
    pub fn new(file_name: impl Into<String>, pixels: RgbaImage) -> Self {
        Self { file_name: file_name.into(), pixels }
    }

    /// Keyed by the file name of `path`.
    pub fn from_file(path: &Path, pixels: RgbaImage) -> Self {
        Self::new(file_name_of(path), pixels)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Export name: the file name with its extension replaced by `.png`.
    pub fn export_file_name(&self) -> String {
        Path::new(&self.file_name)
            .with_extension("png")
            .to_string_lossy()
            .into_owned()
    }
}

pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_name_swaps_extension() {
        let doc = ImageDocument::new("street.jpg", RgbaImage::new(1, 1));
        assert_eq!(doc.export_file_name(), "street.png");
        let doc = ImageDocument::new("scan.final.tiff", RgbaImage::new(1, 1));
        assert_eq!(doc.export_file_name(), "scan.final.png");
        let doc = ImageDocument::new("noext", RgbaImage::new(1, 1));
        assert_eq!(doc.export_file_name(), "noext.png");
    }

    #[test]
    fn file_name_comes_from_path() {
        let doc = ImageDocument::from_file(Path::new("model/imgs/dog.png"), RgbaImage::new(2, 1));
        assert_eq!(doc.file_name, "dog.png");
        assert_eq!(doc.dimensions(), (2, 1));
    }
}
