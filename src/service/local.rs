//! Mask info read from JSON files saved from the service.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::MaskService;
use super::wire::MaskInfo;

/// Points at either one JSON file (used for every image) or a directory
/// holding `<image stem>.json` per image.
pub struct JsonMaskSource {
    path: PathBuf,
}

impl JsonMaskSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The file that would be read for `file_name`.
    pub fn file_for(&self, file_name: &str) -> PathBuf {
        if self.path.is_dir() {
            let stem = Path::new(file_name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| file_name.to_string());
            self.path.join(format!("{}.json", stem))
        } else {
            self.path.clone()
        }
    }
}

impl MaskService for JsonMaskSource {
    fn fetch(&self, file_name: &str) -> Result<MaskInfo> {
        let file = self.file_for(file_name);
        if !file.is_file() {
            return Err(Error::MissingMaskFile(file));
        }
        let body = std::fs::read_to_string(&file)?;
        MaskInfo::from_json(&body)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
