// ============================================================================
// ENGINE — click-to-mask resolution and overlay compositing
// ============================================================================
//
// Architecture:
//   grid.rs       — coarse cell index: image point → mask id
//   raster.rs     — mask records, sparse → dense overlay rasterization
//   composite.rs  — confirmed overlay cache
//   transform.rs  — displayed-space → image-space coordinates
//   throttle.rs   — hover rate limiting with caller-supplied time
//   session.rs    — interaction controller tying the above together
//   export.rs     — image + overlay flattening for PNG export
// ============================================================================

pub mod composite;
pub mod export;
pub mod grid;
pub mod raster;
pub mod session;
pub mod throttle;
pub mod transform;

pub use grid::{CellLookup, GridIndex, MaskId};
pub use raster::{MaskRecord, MaskSet, PixelCoord};
pub use session::{Action, Effect, FetchTicket, MasksOutcome, PointerOutcome, Session, SessionConfig, Status};
pub use transform::{ImagePoint, ScreenPoint, Size};
