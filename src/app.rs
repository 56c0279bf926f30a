use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use eframe::egui;
use egui::{Color32, ColorImage, Pos2, Rect, Sense, TextureHandle, TextureOptions, Vec2};

use maskpick::engine::transform::{fit_to, screen_to_image};
use maskpick::engine::{Action, Effect, MasksOutcome, ScreenPoint, Session, SessionConfig, Size};
use maskpick::service::{self, FetchResult, MaskService};
use maskpick::settings::Settings;
use maskpick::{ImageDocument, io, log_err, log_info, log_warn};

/// How often the UI wakes up to drain background channels.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Results of background file jobs (decode, export).
enum IoResult {
    ImageLoaded { token: u64, document: ImageDocument },
    LoadFailed { token: u64, error: String },
    ExportComplete(PathBuf),
    ExportFailed(String),
}

/// What the pointer did over the image since the previous frame.
#[derive(Clone, Copy, Debug, PartialEq)]
enum PointerStep {
    Hover(Pos2),
    /// Just left; the leave is applied on the next frame.
    LeaveNextFrame,
    Leave,
    Idle,
}

#[derive(Default)]
struct PointerTracker {
    last: Option<Pos2>,
    leave_pending: bool,
    /// Re-resolve the resting position even though it did not move.
    stale: bool,
}

impl PointerTracker {
    /// `inside` is the pointer position if it is over the image.
    fn step(&mut self, inside: Option<Pos2>) -> PointerStep {
        match inside {
            Some(pos) => {
                self.leave_pending = false;
                let stale = std::mem::take(&mut self.stale);
                let moved = self.last.replace(pos) != Some(pos);
                if moved || stale { PointerStep::Hover(pos) } else { PointerStep::Idle }
            }
            None if self.last.take().is_some() => {
                self.leave_pending = true;
                PointerStep::LeaveNextFrame
            }
            None if self.leave_pending => {
                self.leave_pending = false;
                PointerStep::Leave
            }
            None => PointerStep::Idle,
        }
    }

    fn resolve_again(&mut self) {
        self.stale = true;
    }
}

pub struct MaskPickApp {
    session: Session,
    service: Arc<dyn MaskService>,
    shared_image_dir: String,

    fetch_sender: Sender<FetchResult>,
    fetch_receiver: Receiver<FetchResult>,
    io_sender: Sender<IoResult>,
    io_receiver: Receiver<IoResult>,
    /// Bumped on every import; older decode results are discarded.
    load_token: u64,
    loading: bool,
    pending_exports: usize,

    image_texture: Option<TextureHandle>,
    overlay_texture: Option<TextureHandle>,
    /// Session overlay revision currently uploaded to `overlay_texture`.
    uploaded_revision: Option<u64>,

    pointer: PointerTracker,
    message: Option<String>,
}

impl MaskPickApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, settings: Settings) -> Self {
        let (fetch_sender, fetch_receiver) = mpsc::channel();
        let (io_sender, io_receiver) = mpsc::channel();
        let service = service::from_settings(&settings);
        log_info!("Mask source: {}", service.describe());

        Self {
            session: Session::new(SessionConfig::from(&settings)),
            service,
            shared_image_dir: settings.shared_image_dir.clone(),
            fetch_sender,
            fetch_receiver,
            io_sender,
            io_receiver,
            load_token: 0,
            loading: false,
            pending_exports: 0,
            image_texture: None,
            overlay_texture: None,
            uploaded_revision: None,
            pointer: PointerTracker::default(),
            message: None,
        }
    }

    // ========================================================================
    // IMPORT / EXPORT
    // ========================================================================

    fn pick_and_load(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", io::IMAGE_EXTENSIONS)
            .pick_file()
        else {
            return;
        };

        self.load_token += 1;
        self.loading = true;
        self.message = None;
        let token = self.load_token;
        let sender = self.io_sender.clone();
        let shared_dir = self.shared_image_dir.clone();

        rayon::spawn(move || {
            if !shared_dir.is_empty()
                && let Err(e) = io::stage_for_service(&path, std::path::Path::new(&shared_dir))
            {
                let _ = sender.send(IoResult::LoadFailed {
                    token,
                    error: format!("Could not stage image for the mask service: {}", e),
                });
                return;
            }
            let msg = match io::load_image_sync(&path) {
                Ok(document) => IoResult::ImageLoaded { token, document },
                Err(e) => IoResult::LoadFailed {
                    token,
                    error: format!("Could not open {}: {}", path.display(), e),
                },
            };
            let _ = sender.send(msg);
        });
    }

    fn export(&mut self) {
        let exported = match self.session.export() {
            Ok(exported) => exported,
            Err(e) if e.is_export_precondition() => {
                log_warn!("Export ignored: {}", e);
                return;
            }
            Err(e) => {
                log_err!("Export failed: {}", e);
                self.message = Some(format!("Export failed: {}", e));
                return;
            }
        };

        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .set_file_name(&exported.file_name)
            .save_file()
        else {
            return;
        };

        self.pending_exports += 1;
        let sender = self.io_sender.clone();
        rayon::spawn(move || {
            let msg = match io::save_png(&exported.raster, &path) {
                Ok(()) => IoResult::ExportComplete(path),
                Err(e) => IoResult::ExportFailed(format!("{}: {}", path.display(), e)),
            };
            let _ = sender.send(msg);
        });
    }

    // ========================================================================
    // CHANNELS
    // ========================================================================

    fn drain_channels(&mut self, ctx: &egui::Context) {
        while let Ok(msg) = self.io_receiver.try_recv() {
            match msg {
                IoResult::ImageLoaded { token, document } if token == self.load_token => {
                    self.loading = false;
                    self.on_image_loaded(ctx, document);
                }
                IoResult::LoadFailed { token, error } if token == self.load_token => {
                    self.loading = false;
                    log_err!("{}", error);
                    self.message = Some(error);
                }
                IoResult::ImageLoaded { .. } | IoResult::LoadFailed { .. } => {}
                IoResult::ExportComplete(path) => {
                    self.pending_exports = self.pending_exports.saturating_sub(1);
                    log_info!("Exported {}", path.display());
                    self.message = Some(format!("Saved {}", path.display()));
                }
                IoResult::ExportFailed(error) => {
                    self.pending_exports = self.pending_exports.saturating_sub(1);
                    log_err!("Export failed: {}", error);
                    self.message = Some(format!("Export failed: {}", error));
                }
            }
        }

        while let Ok(FetchResult { ticket, result }) = self.fetch_receiver.try_recv() {
            match self.session.dispatch(Action::MasksArrived { ticket, result }) {
                // A pointer resting on the image gets its preview without moving
                Effect::Masks(MasksOutcome::Applied { .. }) => self.pointer.resolve_again(),
                Effect::Masks(MasksOutcome::Unavailable(reason)) => {
                    self.message = Some(format!("Masks unavailable: {}", reason));
                }
                Effect::Masks(MasksOutcome::Stale) => log_info!("Dropped stale mask info"),
                _ => {}
            }
        }
    }

    fn on_image_loaded(&mut self, ctx: &egui::Context, document: ImageDocument) {
        let size = [document.width() as usize, document.height() as usize];
        let color = ColorImage::from_rgba_unmultiplied(size, document.pixels.as_raw());
        match &mut self.image_texture {
            Some(tex) => tex.set(color, TextureOptions::LINEAR),
            None => {
                self.image_texture = Some(ctx.load_texture("image", color, TextureOptions::LINEAR))
            }
        }
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(format!(
            "MaskPick - {}",
            document.file_name
        )));
        log_info!(
            "Loaded {} ({}x{})",
            document.file_name,
            document.width(),
            document.height()
        );

        self.pointer = PointerTracker::default();
        if let Effect::FetchMasks(ticket) = self.session.dispatch(Action::LoadImage(document)) {
            service::spawn_fetch(self.service.clone(), ticket, self.fetch_sender.clone());
        }
    }

    /// Re-upload the overlay texture when the session's overlay changed.
    fn sync_overlay_texture(&mut self, ctx: &egui::Context) {
        let revision = self.session.overlay_revision();
        if self.uploaded_revision == Some(revision) {
            return;
        }
        self.uploaded_revision = Some(revision);

        let Some(overlay) = self.session.overlay() else {
            self.overlay_texture = None;
            return;
        };
        let size = [overlay.width() as usize, overlay.height() as usize];
        let color = ColorImage::from_rgba_unmultiplied(size, overlay.as_raw());
        match &mut self.overlay_texture {
            Some(tex) => tex.set(color, TextureOptions::NEAREST),
            None => {
                self.overlay_texture =
                    Some(ctx.load_texture("overlay", color, TextureOptions::NEAREST))
            }
        }
    }

    // ========================================================================
    // PANELS
    // ========================================================================

    fn show_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Import Image").clicked() {
                    self.pick_and_load();
                }

                let can_export = self.session.overlay().is_some() || self.session.confirmed().is_some();
                if ui
                    .add_enabled(can_export, egui::Button::new("Export Image"))
                    .on_hover_text("Save the image with the selected masks as PNG")
                    .clicked()
                {
                    self.export();
                }

                if ui
                    .add_enabled(self.session.confirmed().is_some(), egui::Button::new("Clear"))
                    .on_hover_text("Drop all selected masks (Esc)")
                    .clicked()
                {
                    self.session.dispatch(Action::Reset);
                }

                ui.separator();
                if self.loading || self.session.is_fetching() || self.pending_exports > 0 {
                    ui.spinner();
                }
                ui.label(self.session.status().to_string());
                if let Some(message) = &self.message {
                    ui.separator();
                    ui.label(message);
                }
            });
        });
    }

    fn show_canvas(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some((width, height)) = self.session.image().map(|doc| doc.dimensions()) else {
                ui.centered_and_justified(|ui| {
                    ui.label("Import an image to start selecting masks");
                });
                return;
            };

            let available = ui.available_size();
            let natural = Size::from_pixels(width, height);
            let shown = fit_to(natural, Size::new(available.x as f64, available.y as f64));
            let (response, painter) = ui.allocate_painter(available, Sense::click());
            let image_rect = Rect::from_center_size(
                response.rect.center(),
                Vec2::new(shown.width as f32, shown.height as f32),
            );
            let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));

            if let Some(tex) = &self.image_texture {
                painter.image(tex.id(), image_rect, uv, Color32::WHITE);
            }
            let to_image = |pos: Pos2| {
                screen_to_image(
                    ScreenPoint::new((pos.x - image_rect.min.x) as f64, (pos.y - image_rect.min.y) as f64),
                    shown,
                    natural,
                )
            };
            let now = Instant::now();

            match self.pointer.step(response.hover_pos().filter(|p| image_rect.contains(*p))) {
                PointerStep::Hover(pos) => {
                    if let Some(point) = to_image(pos) {
                        self.session.dispatch(Action::Hover { point, at: now });
                    }
                }
                PointerStep::LeaveNextFrame => ctx.request_repaint(),
                PointerStep::Leave => {
                    self.session.dispatch(Action::Leave);
                }
                PointerStep::Idle => {}
            }

            if response.clicked()
                && let Some(point) = response
                    .interact_pointer_pos()
                    .filter(|p| image_rect.contains(*p))
                    .and_then(to_image)
            {
                self.session.dispatch(Action::Click { point });
            }

            self.session.dispatch(Action::Tick { at: now });
            self.sync_overlay_texture(ctx);
            if let Some(tex) = &self.overlay_texture {
                let alpha = (self.session.config().overlay_opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
                painter.image(tex.id(), image_rect, uv, Color32::from_white_alpha(alpha));
            }
        });
    }
}

impl eframe::App for MaskPickApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_channels(ctx);

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.session.dispatch(Action::Reset);
        }

        self.show_toolbar(ctx);
        self.show_canvas(ctx);

        let now = Instant::now();
        if let Some(due) = self.session.next_hover_due() {
            ctx.request_repaint_after(due.saturating_duration_since(now));
        }
        if self.loading || self.session.is_fetching() || self.pending_exports > 0 {
            ctx.request_repaint_after(POLL_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resting_pointer_is_resolved_once() {
        let mut pointer = PointerTracker::default();
        let pos = Pos2::new(40.0, 20.0);
        assert_eq!(pointer.step(Some(pos)), PointerStep::Hover(pos));
        assert_eq!(pointer.step(Some(pos)), PointerStep::Idle);
        assert_eq!(pointer.step(Some(Pos2::new(41.0, 20.0))), PointerStep::Hover(Pos2::new(41.0, 20.0)));
    }

    #[test]
    fn arriving_masks_resolve_the_resting_pointer() {
        let mut pointer = PointerTracker::default();
        let pos = Pos2::new(40.0, 20.0);
        pointer.step(Some(pos));
        pointer.resolve_again();
        assert_eq!(pointer.step(Some(pos)), PointerStep::Hover(pos));
        assert_eq!(pointer.step(Some(pos)), PointerStep::Idle);
    }

    #[test]
    fn leave_lands_one_frame_late() {
        let mut pointer = PointerTracker::default();
        pointer.step(Some(Pos2::new(1.0, 1.0)));
        assert_eq!(pointer.step(None), PointerStep::LeaveNextFrame);
        assert_eq!(pointer.step(None), PointerStep::Leave);
        assert_eq!(pointer.step(None), PointerStep::Idle);
    }

    #[test]
    fn coming_back_cancels_a_pending_leave() {
        let mut pointer = PointerTracker::default();
        pointer.step(Some(Pos2::new(1.0, 1.0)));
        pointer.step(None);
        assert_eq!(pointer.step(Some(Pos2::new(2.0, 2.0))), PointerStep::Hover(Pos2::new(2.0, 2.0)));
        pointer.step(Some(Pos2::new(2.0, 2.0)));
        assert_eq!(pointer.step(Some(Pos2::new(2.0, 2.0))), PointerStep::Idle);
    }
}
