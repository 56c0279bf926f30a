// ============================================================================
// INTERACTION CONTROLLER — one image, its masks, and the overlay state
// ============================================================================
//
// A `Session` owns everything that belongs to the open image: the decoded
// pixels, the mask set fetched for it, the composite cache and the overlay
// currently on screen. Opening another image replaces all of it at once and
// issues a new fetch ticket; results carrying an older ticket are dropped.
//
// Pointer handling:
//   Hover  → throttled; hit = preview over the confirmed base, miss = hide
//   Click  → immediate; hit = rasterize over the confirmed base and commit
//   Leave  → show whatever the composite cache holds
//   Reset  → drop the confirmed overlay, keep image and masks

use std::fmt;
use std::time::{Duration, Instant};

use image::{Rgba, RgbaImage};

use crate::document::ImageDocument;
use crate::error::{Error, Result};
use crate::service::wire::MaskInfo;
use crate::settings::Settings;

use super::composite::CompositeCache;
use super::export::{ExportedImage, flatten};
use super::grid::{self, CellLookup, MaskId};
use super::raster::{DEFAULT_OVERLAY_COLOR, MaskSet, blank_overlay};
use super::throttle::Throttle;
use super::transform::ImagePoint;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionConfig {
    pub overlay_color: Rgba<u8>,
    /// Opacity of the overlay on screen and in exports.
    pub overlay_opacity: f32,
    pub hover_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            overlay_color: DEFAULT_OVERLAY_COLOR,
            overlay_opacity: 0.4,
            hover_interval: Duration::from_millis(15),
        }
    }
}

impl From<&Settings> for SessionConfig {
    fn from(s: &Settings) -> Self {
        Self {
            overlay_color: s.overlay_color,
            overlay_opacity: s.overlay_opacity,
            hover_interval: s.hover_interval(),
        }
    }
}

/// Identifies one mask-info request. Only the newest ticket is honored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub file_name: String,
}

#[derive(Debug)]
enum MaskState {
    NotLoaded,
    Pending,
    Ready(MaskSet),
    Unavailable(String),
}

#[derive(Debug)]
enum Overlay {
    Hidden,
    Preview(RgbaImage),
    /// Showing the composite cache contents.
    Confirmed,
}

/// User-facing summary of where the session stands.
#[derive(Clone, Debug, PartialEq)]
pub enum Status {
    NoImage,
    Analyzing { file_name: String },
    Ready { file_name: String, masks: usize },
    Unavailable { file_name: String, reason: String },
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::NoImage => write!(f, "No image loaded"),
            Status::Analyzing { file_name } => write!(f, "Analyzing {}…", file_name),
            Status::Ready { file_name, masks } => write!(f, "{}: {} masks", file_name, masks),
            Status::Unavailable { file_name, reason } => {
                write!(f, "{}: no mask data available ({})", file_name, reason)
            }
        }
    }
}

/// What a pointer interaction did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerOutcome {
    /// Grid or masks are not available; nothing happened.
    NotLoaded,
    /// Hover arrived inside the throttle interval and is waiting.
    Deferred,
    /// The point maps to no mask. For hovers the preview is hidden.
    Miss(CellLookup),
    Previewed(MaskId),
    Committed(MaskId),
    /// Pointer left; the confirmed overlay (if any) is shown again.
    Restored,
    /// Confirmed overlay dropped.
    Cleared,
}

/// What delivering mask info did.
#[derive(Clone, Debug, PartialEq)]
pub enum MasksOutcome {
    Applied { masks: usize },
    /// The ticket belongs to an image that is no longer open.
    Stale,
    Unavailable(String),
}

/// Typed inputs to [`Session::dispatch`].
#[derive(Debug)]
pub enum Action {
    LoadImage(ImageDocument),
    MasksArrived { ticket: FetchTicket, result: Result<MaskInfo> },
    Hover { point: ImagePoint, at: Instant },
    Click { point: ImagePoint },
    Leave,
    Tick { at: Instant },
    Reset,
}

/// Result of [`Session::dispatch`].
#[derive(Debug, PartialEq)]
pub enum Effect {
    /// The caller must fetch mask info for this ticket and deliver it back.
    FetchMasks(FetchTicket),
    Masks(MasksOutcome),
    Pointer(PointerOutcome),
    None,
}

pub struct Session {
    config: SessionConfig,
    image: Option<ImageDocument>,
    generation: u64,
    masks: MaskState,
    cache: CompositeCache,
    overlay: Overlay,
    /// Bumped whenever the displayed overlay changes.
    overlay_revision: u64,
    hover: Throttle<ImagePoint>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            image: None,
            generation: 0,
            masks: MaskState::NotLoaded,
            cache: CompositeCache::new(),
            overlay: Overlay::Hidden,
            overlay_revision: 0,
            hover: Throttle::new(config.hover_interval),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn image(&self) -> Option<&ImageDocument> {
        self.image.as_ref()
    }

    pub fn mask_set(&self) -> Option<&MaskSet> {
        match &self.masks {
            MaskState::Ready(set) => Some(set),
            _ => None,
        }
    }

    pub fn status(&self) -> Status {
        let Some(image) = &self.image else { return Status::NoImage };
        let file_name = image.file_name.clone();
        match &self.masks {
            MaskState::NotLoaded | MaskState::Pending => Status::Analyzing { file_name },
            MaskState::Ready(set) => Status::Ready { file_name, masks: set.len() },
            MaskState::Unavailable(reason) => Status::Unavailable { file_name, reason: reason.clone() },
        }
    }

    /// True while a fetch for the current image is outstanding.
    pub fn is_fetching(&self) -> bool {
        matches!(self.masks, MaskState::Pending)
    }

    // ------------------------------------------------------------------
    // Image lifecycle
    // ------------------------------------------------------------------

    /// Replace the open image. Discards masks, overlays and pending hovers,
    /// and returns the ticket the caller must fetch mask info with.
    pub fn load_image(&mut self, image: ImageDocument) -> FetchTicket {
        self.generation += 1;
        let ticket = FetchTicket { generation: self.generation, file_name: image.file_name.clone() };
        crate::log_info!(
            "Loaded {} ({}x{}), fetch #{}",
            image.file_name,
            image.width(),
            image.height(),
            ticket.generation
        );
        self.image = Some(image);
        self.masks = MaskState::Pending;
        self.cache.reset();
        self.hover.clear();
        self.set_overlay(Overlay::Hidden);
        ticket
    }

    /// Deliver the result of a fetch. Stale tickets are ignored.
    pub fn apply_masks(&mut self, ticket: &FetchTicket, result: Result<MaskInfo>) -> MasksOutcome {
        if ticket.generation != self.generation || self.image.is_none() {
            crate::log_info!(
                "Dropping stale mask info for {} (fetch #{}, current #{})",
                ticket.file_name,
                ticket.generation,
                self.generation
            );
            return MasksOutcome::Stale;
        }
        match result.and_then(|info| self.accept(info)) {
            Ok(set) => {
                let count = set.len();
                crate::log_info!("Mask info ready for {}: {} masks", ticket.file_name, count);
                self.masks = MaskState::Ready(set);
                MasksOutcome::Applied { masks: count }
            }
            Err(e) => {
                crate::log_warn!("Masks unavailable for {}: {}", ticket.file_name, e);
                let reason = e.to_string();
                self.masks = MaskState::Unavailable(reason.clone());
                MasksOutcome::Unavailable(reason)
            }
        }
    }

    fn accept(&self, info: MaskInfo) -> Result<MaskSet> {
        let set = info.into_mask_set()?;
        if let Some(image) = &self.image {
            let (mask_width, mask_height) = set.dimensions();
            let (image_width, image_height) = image.dimensions();
            if (mask_width, mask_height) != (image_width, image_height) {
                return Err(Error::ShapeMismatch { mask_width, mask_height, image_width, image_height });
            }
        }
        Ok(set)
    }

    // ------------------------------------------------------------------
    // Pointer interactions
    // ------------------------------------------------------------------

    /// Grid lookup for an image point, distinguishing "not loaded" from misses.
    pub fn lookup(&self, point: ImagePoint) -> CellLookup {
        grid::lookup(self.mask_set().map(MaskSet::grid), point)
    }

    /// Points left of or above the image (or non-finite) change nothing,
    /// not even the displayed overlay or the throttle.
    pub fn hover(&mut self, point: ImagePoint, now: Instant) -> PointerOutcome {
        if self.mask_set().is_none() {
            return PointerOutcome::NotLoaded;
        }
        if !point.is_on_canvas() {
            return PointerOutcome::Miss(CellLookup::OutOfBounds);
        }
        match self.hover.offer(point, now) {
            Some(point) => self.preview_at(point),
            None => PointerOutcome::Deferred,
        }
    }

    /// Run a coalesced hover whose interval has elapsed. Call once per frame.
    pub fn poll(&mut self, now: Instant) -> Option<PointerOutcome> {
        let point = self.hover.poll(now)?;
        Some(self.preview_at(point))
    }

    /// When the next deferred hover is due, for scheduling a repaint.
    pub fn next_hover_due(&self) -> Option<Instant> {
        self.hover.next_due()
    }

    fn preview_at(&mut self, point: ImagePoint) -> PointerOutcome {
        let lookup = self.lookup(point);
        let Some(id) = lookup.mask_id() else {
            if lookup == CellLookup::NotLoaded {
                return PointerOutcome::NotLoaded;
            }
            self.set_overlay(Overlay::Hidden);
            return PointerOutcome::Miss(lookup);
        };
        match self.rasterize_over_base(id) {
            Some(raster) => {
                self.set_overlay(Overlay::Preview(raster));
                PointerOutcome::Previewed(id)
            }
            None => PointerOutcome::NotLoaded,
        }
    }

    pub fn click(&mut self, point: ImagePoint) -> PointerOutcome {
        let lookup = self.lookup(point);
        let Some(id) = lookup.mask_id() else {
            return match lookup {
                CellLookup::NotLoaded => PointerOutcome::NotLoaded,
                miss => PointerOutcome::Miss(miss),
            };
        };
        let Some(raster) = self.rasterize_over_base(id) else {
            return PointerOutcome::NotLoaded;
        };
        // A trailing hover would immediately replace the confirmed overlay
        self.hover.clear();
        self.cache.commit(raster);
        self.set_overlay(Overlay::Confirmed);
        crate::log_info!("Confirmed mask {}", id.0);
        PointerOutcome::Committed(id)
    }

    /// Pointer left the image: show the confirmed overlay, drop pending hovers.
    pub fn leave(&mut self) -> PointerOutcome {
        self.hover.clear();
        let next = if self.cache.is_empty() { Overlay::Hidden } else { Overlay::Confirmed };
        self.set_overlay(next);
        PointerOutcome::Restored
    }

    /// Forget the confirmed overlay without reloading anything.
    pub fn reset_overlay(&mut self) -> PointerOutcome {
        self.hover.clear();
        self.cache.reset();
        self.set_overlay(Overlay::Hidden);
        PointerOutcome::Cleared
    }

    fn rasterize_over_base(&self, id: MaskId) -> Option<RgbaImage> {
        let set = self.mask_set()?;
        let color = self.config.overlay_color;
        match self.cache.base() {
            Some(base) => set.rasterize(id, base, color),
            None => {
                let (w, h) = set.dimensions();
                set.rasterize(id, &blank_overlay(w, h), color)
            }
        }
    }

    fn set_overlay(&mut self, overlay: Overlay) {
        let unchanged = matches!(
            (&self.overlay, &overlay),
            (Overlay::Hidden, Overlay::Hidden)
        );
        self.overlay = overlay;
        if !unchanged {
            self.overlay_revision += 1;
        }
    }

    // ------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------

    /// The overlay currently on screen.
    pub fn overlay(&self) -> Option<&RgbaImage> {
        match &self.overlay {
            Overlay::Hidden => None,
            Overlay::Preview(raster) => Some(raster),
            Overlay::Confirmed => self.cache.base(),
        }
    }

    pub fn is_previewing(&self) -> bool {
        matches!(self.overlay, Overlay::Preview(_))
    }

    /// The confirmed overlay, if any mask has been clicked.
    pub fn confirmed(&self) -> Option<&RgbaImage> {
        self.cache.base()
    }

    pub fn overlay_revision(&self) -> u64 {
        self.overlay_revision
    }

    /// Flatten the image with the displayed overlay (or the confirmed one
    /// when nothing is displayed).
    pub fn export(&self) -> Result<ExportedImage> {
        let image = self.image.as_ref().ok_or(Error::NoImage)?;
        let overlay = self.overlay().or(self.cache.base()).ok_or(Error::NoOverlay)?;
        let raster = flatten(&image.pixels, overlay, self.config.overlay_opacity)?;
        Ok(ExportedImage { file_name: image.export_file_name(), raster })
    }

    // ------------------------------------------------------------------
    // Reducer entry point
    // ------------------------------------------------------------------

    pub fn dispatch(&mut self, action: Action) -> Effect {
        match action {
            Action::LoadImage(image) => Effect::FetchMasks(self.load_image(image)),
            Action::MasksArrived { ticket, result } => Effect::Masks(self.apply_masks(&ticket, result)),
            Action::Hover { point, at } => Effect::Pointer(self.hover(point, at)),
            Action::Click { point } => Effect::Pointer(self.click(point)),
            Action::Leave => Effect::Pointer(self.leave()),
            Action::Tick { at } => self.poll(at).map_or(Effect::None, Effect::Pointer),
            Action::Reset => Effect::Pointer(self.reset_overlay()),
        }
    }
}
