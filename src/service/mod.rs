// ============================================================================
// MASK SERVICE — where grid + mask data for an image comes from
// ============================================================================
//
// Two sources implement `MaskService`:
//   http.rs   — the remote service (`POST /get_mask_info`)
//   local.rs  — JSON files on disk with the same shape (offline / tests)
//
// Fetches run on the rayon pool and report back over a channel together with
// the ticket they were started for; the session drops results whose ticket
// is no longer current.

pub mod http;
pub mod local;
pub mod wire;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Instant;

use crate::engine::FetchTicket;
use crate::error::Result;
use crate::settings::Settings;

pub use http::HttpMaskService;
pub use local::JsonMaskSource;
pub use wire::{GeneratorConfig, MaskInfo};

/// Anything that can produce mask info for an image file name.
pub trait MaskService: Send + Sync {
    fn fetch(&self, file_name: &str) -> Result<MaskInfo>;

    /// Short description for logs and status lines.
    fn describe(&self) -> String;
}

/// Result delivered from a background fetch.
#[derive(Debug)]
pub struct FetchResult {
    pub ticket: FetchTicket,
    pub result: Result<MaskInfo>,
}

/// Run `service.fetch` on the rayon pool and send the result to `sender`.
pub fn spawn_fetch(service: Arc<dyn MaskService>, ticket: FetchTicket, sender: Sender<FetchResult>) {
    crate::log_info!(
        "Fetching mask info for {} from {} (fetch #{})",
        ticket.file_name,
        service.describe(),
        ticket.generation
    );
    rayon::spawn(move || {
        let start = Instant::now();
        let result = service.fetch(&ticket.file_name);
        match &result {
            Ok(info) => crate::log_info!(
                "Mask info for {} arrived in {:.0}ms ({} masks)",
                ticket.file_name,
                start.elapsed().as_secs_f64() * 1000.0,
                info.masks_true_indices_list.len()
            ),
            Err(e) => crate::log_err!("Mask info fetch for {} failed: {}", ticket.file_name, e),
        }
        // Receiver gone means the viewer closed; nothing left to update
        let _ = sender.send(FetchResult { ticket, result });
    });
}

/// Pick the configured source: local JSON when `mask_info_dir` is set,
/// the HTTP service otherwise.
pub fn from_settings(settings: &Settings) -> Arc<dyn MaskService> {
    if settings.mask_info_dir.is_empty() {
        Arc::new(HttpMaskService::new(&settings.service_url, settings.request_timeout()))
    } else {
        Arc::new(JsonMaskSource::new(PathBuf::from(&settings.mask_info_dir)))
    }
}
