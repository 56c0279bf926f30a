//! JSON shapes exchanged with the mask service.

use serde::{Deserialize, Serialize};

use crate::engine::grid::{GridIndex, MaskId};
use crate::engine::raster::{MaskRecord, MaskSet, PixelCoord};
use crate::error::{Error, Result};

/// Body of `POST /get_mask_info`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MaskRequest {
    #[serde(rename = "fileName")]
    pub file_name: String,
}

/// Grid cell size in image pixels.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct GridScale {
    pub width: f64,
    pub height: f64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImgShape {
    pub width: u32,
    pub height: u32,
}

/// Response of `POST /get_mask_info`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MaskInfo {
    /// One list of `[row, col]` pairs per mask, indexed by mask id.
    pub masks_true_indices_list: Vec<Vec<[u32; 2]>>,
    #[serde(rename = "gridScale")]
    pub grid_scale: GridScale,
    /// Mask id per grid cell, `-1` for none.
    pub masks_grid: Vec<Vec<i64>>,
    #[serde(rename = "imgShape")]
    pub img_shape: ImgShape,
}

impl MaskInfo {
    /// Decode a response body. The service answers `null` when it found no masks.
    pub fn from_json(body: &str) -> Result<Self> {
        let parsed: Option<MaskInfo> = serde_json::from_str(body)?;
        parsed.ok_or(Error::NoMasks)
    }

    /// Validate and convert into the engine's representation.
    pub fn into_mask_set(self) -> Result<MaskSet> {
        let mask_count = self.masks_true_indices_list.len();
        let grid = GridIndex::new(
            self.grid_scale.width,
            self.grid_scale.height,
            &self.masks_grid,
            mask_count,
        )?;
        let masks = self
            .masks_true_indices_list
            .into_iter()
            .enumerate()
            .map(|(i, pixels)| MaskRecord {
                id: MaskId(i),
                true_pixels: pixels
                    .into_iter()
                    .map(|[row, col]| PixelCoord::new(row, col))
                    .collect(),
            })
            .collect();
        Ok(MaskSet::new(self.img_shape.width, self.img_shape.height, grid, masks))
    }
}

/// Body of `POST /configure_mask_generator`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct GeneratorConfig {
    pub points_per_side: u32,
    pub points_per_batch: u32,
    pub pred_iou_thresh: f32,
    pub stability_score_thresh: f32,
    pub crop_n_layers: u32,
    pub crop_n_points_downscale_factor: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            points_per_side: 32,
            points_per_batch: 256,
            pred_iou_thresh: 0.85,
            stability_score_thresh: 0.9,
            crop_n_layers: 1,
            crop_n_points_downscale_factor: 2,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConfigureReply {
    pub msg: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::transform::ImagePoint;

    const SAMPLE: &str = r#"{
        "masks_true_indices_list": [[[0, 0], [0, 1]], [[3, 3]]],
        "gridScale": {"width": 2.0, "height": 2.0},
        "masks_grid": [[0, -1, -1], [-1, 1, -1], [-1, -1, -1]],
        "imgShape": {"width": 4, "height": 4}
    }"#;

    #[test]
    fn decodes_service_response() {
        let info = MaskInfo::from_json(SAMPLE).unwrap();
        assert_eq!(info.img_shape, ImgShape { width: 4, height: 4 });
        assert_eq!(info.masks_true_indices_list[0], vec![[0, 0], [0, 1]]);

        let set = info.into_mask_set().unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.dimensions(), (4, 4));
        assert_eq!(set.grid().resolve(ImagePoint::new(2.5, 3.0)), Some(MaskId(1)));
        assert_eq!(set.get(MaskId(0)).unwrap().true_pixels[1], PixelCoord::new(0, 1));
    }

    #[test]
    fn null_body_means_no_masks() {
        assert!(matches!(MaskInfo::from_json("null"), Err(Error::NoMasks)));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(MaskInfo::from_json("<html>502</html>"), Err(Error::Decode(_))));
        assert!(matches!(MaskInfo::from_json(r#"{"masks_grid": []}"#), Err(Error::Decode(_))));
    }

    #[test]
    fn grid_pointing_past_the_mask_list_is_rejected() {
        let mut info = MaskInfo::from_json(SAMPLE).unwrap();
        info.masks_grid[2][2] = 5;
        assert!(matches!(info.into_mask_set(), Err(Error::InvalidMaskInfo(_))));
    }

    #[test]
    fn request_uses_camel_case_key() {
        let body = serde_json::to_string(&MaskRequest { file_name: "cat.jpg".into() }).unwrap();
        assert_eq!(body, r#"{"fileName":"cat.jpg"}"#);
    }
}
