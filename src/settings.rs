//! Persistent application settings (`key=value` lines).

use std::path::PathBuf;
use std::time::Duration;

use image::Rgba;

use crate::engine::raster::DEFAULT_OVERLAY_COLOR;
use crate::service::wire::GeneratorConfig;

pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:12307";

/// Settings that persist across sessions.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Base URL of the mask service (no trailing path)
    pub service_url: String,
    /// Total timeout for one mask-info request in seconds (0 = wait forever)
    pub request_timeout_secs: u64,
    /// Minimum time between two hover resolutions
    pub hover_interval_ms: u64,
    /// Color written into the overlay for mask pixels
    pub overlay_color: Rgba<u8>,
    /// Opacity the overlay is displayed and exported with
    pub overlay_opacity: f32,
    /// Read `<dir>/<stem>.json` instead of calling the service. Empty = HTTP.
    pub mask_info_dir: String,
    /// Copy imported images here so the service can find them. Empty = off.
    pub shared_image_dir: String,
    /// Parameters pushed to the service's mask generator
    pub generator: GeneratorConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            request_timeout_secs: 120,
            hover_interval_ms: 15,
            overlay_color: DEFAULT_OVERLAY_COLOR,
            overlay_opacity: 0.4,
            mask_info_dir: String::new(),
            shared_image_dir: String::new(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl Settings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/maskpick/maskpick_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\MaskPick\maskpick_settings.cfg
    /// On macOS:   ~/Library/Application Support/MaskPick/maskpick_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(PathBuf::from(appdata).join("MaskPick").join("maskpick_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("MaskPick")
                    .join("maskpick_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            Some(config_dir.join("maskpick").join("maskpick_settings.cfg"))
        }
    }

    pub fn hover_interval(&self) -> Duration {
        Duration::from_millis(self.hover_interval_ms)
    }

    /// `None` when the timeout is disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// Serialize a color as "r,g,b,a"
    fn color_to_str(c: Rgba<u8>) -> String {
        format!("{},{},{},{}", c[0], c[1], c[2], c[3])
    }

    /// Parse a color from "r,g,b,a"
    pub fn str_to_color(s: &str) -> Option<Rgba<u8>> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return None;
        }
        let r = parts[0].trim().parse::<u8>().ok()?;
        let g = parts[1].trim().parse::<u8>().ok()?;
        let b = parts[2].trim().parse::<u8>().ok()?;
        let a = parts[3].trim().parse::<u8>().ok()?;
        Some(Rgba([r, g, b, a]))
    }

    pub fn to_config_string(&self) -> String {
        let g = &self.generator;
        format!(
            "service_url={}\n\
             request_timeout_secs={}\n\
             hover_interval_ms={}\n\
             overlay_color={}\n\
             overlay_opacity={}\n\
             mask_info_dir={}\n\
             shared_image_dir={}\n\
             points_per_side={}\n\
             points_per_batch={}\n\
             pred_iou_thresh={}\n\
             stability_score_thresh={}\n\
             crop_n_layers={}\n\
             crop_n_points_downscale_factor={}\n",
            self.service_url,
            self.request_timeout_secs,
            self.hover_interval_ms,
            Self::color_to_str(self.overlay_color),
            self.overlay_opacity,
            self.mask_info_dir,
            self.shared_image_dir,
            g.points_per_side,
            g.points_per_batch,
            g.pred_iou_thresh,
            g.stability_score_thresh,
            g.crop_n_layers,
            g.crop_n_points_downscale_factor,
        )
    }

    /// Parse settings text. Unknown keys and unparsable values keep their defaults.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        let d = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "service_url" => {
                    if !val.is_empty() {
                        s.service_url = val.trim_end_matches('/').to_string();
                    }
                }
                "request_timeout_secs" => {
                    s.request_timeout_secs = val.parse().unwrap_or(d.request_timeout_secs);
                }
                "hover_interval_ms" => {
                    s.hover_interval_ms = val.parse().unwrap_or(d.hover_interval_ms);
                }
                "overlay_color" => {
                    if let Some(c) = Self::str_to_color(val) {
                        s.overlay_color = c;
                    }
                }
                "overlay_opacity" => {
                    s.overlay_opacity = val
                        .parse::<f32>()
                        .ok()
                        .filter(|o| o.is_finite())
                        .map(|o| o.clamp(0.0, 1.0))
                        .unwrap_or(d.overlay_opacity);
                }
                "mask_info_dir" => s.mask_info_dir = val.to_string(),
                "shared_image_dir" => s.shared_image_dir = val.to_string(),
                "points_per_side" => {
                    s.generator.points_per_side = val.parse().unwrap_or(d.generator.points_per_side);
                }
                "points_per_batch" => {
                    s.generator.points_per_batch = val.parse().unwrap_or(d.generator.points_per_batch);
                }
                "pred_iou_thresh" => {
                    s.generator.pred_iou_thresh = val.parse().unwrap_or(d.generator.pred_iou_thresh);
                }
                "stability_score_thresh" => {
                    s.generator.stability_score_thresh =
                        val.parse().unwrap_or(d.generator.stability_score_thresh);
                }
                "crop_n_layers" => {
                    s.generator.crop_n_layers = val.parse().unwrap_or(d.generator.crop_n_layers);
                }
                "crop_n_points_downscale_factor" => {
                    s.generator.crop_n_points_downscale_factor =
                        val.parse().unwrap_or(d.generator.crop_n_points_downscale_factor);
                }
                _ => {}
            }
        }
        s
    }

    /// Load settings from disk (defaults if the file is missing or unreadable).
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                crate::log_info!("Settings loaded from {}", path.display());
                Self::parse(&content)
            }
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Err(e) = std::fs::write(&path, self.to_config_string()) {
            crate::log_warn!("Could not save settings to {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_text_survives_a_save_load_cycle() {
        let mut s = Settings::default();
        s.service_url = "http://10.0.0.2:9000".to_string();
        s.overlay_color = Rgba([0, 114, 189, 255]);
        s.overlay_opacity = 0.25;
        s.mask_info_dir = "/tmp/masks".to_string();
        s.generator.points_per_side = 16;

        assert_eq!(Settings::parse(&s.to_config_string()), s);
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let s = Settings::parse(
            "hover_interval_ms=fast\n\
             overlay_color=1,2,3\n\
             overlay_opacity=7\n\
             not a setting line\n\
             mystery_key=1\n",
        );
        assert_eq!(s.hover_interval_ms, 15);
        assert_eq!(s.overlay_color, DEFAULT_OVERLAY_COLOR);
        assert_eq!(s.overlay_opacity, 1.0);
    }

    #[test]
    fn trailing_slash_is_dropped_from_service_url() {
        let s = Settings::parse("service_url=http://host:1/\n");
        assert_eq!(s.service_url, "http://host:1");
    }

    #[test]
    fn zero_timeout_disables_it() {
        let s = Settings::parse("request_timeout_secs=0\n");
        assert_eq!(s.request_timeout(), None);
        assert_eq!(Settings::default().request_timeout(), Some(Duration::from_secs(120)));
    }
}
