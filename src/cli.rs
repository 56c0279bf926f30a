// ============================================================================
// MaskPick CLI — headless mask selection and export
// ============================================================================
//
// Usage examples:
//   maskpick -i street.jpg --click 120,80 --click 300,210 -o street.png
//   maskpick -i shots/*.jpg --mask-info masks/ --click 10,10 --output-dir out/
//   maskpick -i cat.png --service http://10.0.0.5:12307 --configure-generator -v
//
// Each input goes through the same session as the viewer: load, fetch mask
// info, replay the clicks (image coordinates), export the composite.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;

use maskpick::engine::{ImagePoint, MasksOutcome, PointerOutcome, Session, SessionConfig};
use maskpick::io::{load_image_sync, save_png, stage_for_service};
use maskpick::service::{HttpMaskService, JsonMaskSource, MaskService};
use maskpick::settings::Settings;
use maskpick::{log_info, log_warn};

/// MaskPick headless mask exporter.
///
/// Selects precomputed masks by clicking at image coordinates and writes the
/// image with the selected masks highlighted as PNG.
#[derive(Parser, Debug)]
#[command(
    name = "maskpick",
    about = "MaskPick headless mask selection and export",
    long_about = "Fetch precomputed masks for each input image, select masks at the\n\
                  given image coordinates and export the highlighted result as PNG.\n\n\
                  Example:\n  \
                  maskpick --input street.jpg --click 120,80 --output street_masked.png\n  \
                  maskpick -i *.jpg --mask-info masks/ --click 10,10 --output-dir out/"
)]
pub struct CliArgs {
    /// Input image(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Click position in image pixels, "X,Y". Repeat to select several masks.
    #[arg(short, long, value_name = "X,Y", value_parser = parse_point)]
    pub click: Vec<ImagePoint>,

    /// Read mask info from a JSON file, or from `<stem>.json` in a directory,
    /// instead of calling the mask service.
    #[arg(long, value_name = "PATH")]
    pub mask_info: Option<PathBuf>,

    /// Mask service base URL (overrides the settings file).
    #[arg(long, value_name = "URL")]
    pub service: Option<String>,

    /// Request timeout in seconds, 0 = none (overrides the settings file).
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Push the generator parameters from the settings file to the service first.
    #[arg(long)]
    pub configure_generator: bool,

    /// Overlay opacity in the exported image (0.0–1.0).
    #[arg(long, value_name = "0-1")]
    pub opacity: Option<f32>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing; files are named `<stem>.png`.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print per-click outcomes and timing.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when CLI-mode flags are present in the real process arguments.
    /// Used by `main()` to route before creating a window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--input" || a == "-i")
    }
}

fn parse_point(s: &str) -> Result<ImagePoint, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{}'", s))?;
    let x: f64 = x.trim().parse().map_err(|_| format!("bad X in '{}'", s))?;
    let y: f64 = y.trim().parse().map_err(|_| format!("bad Y in '{}'", s))?;
    Ok(ImagePoint::new(x, y))
}

// ============================================================================
// Public entry point
// ============================================================================

/// Process every input and return an OS exit code.
/// `0` = all files succeeded (or were skipped), `1` = one or more failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let mut settings = Settings::load();
    if let Some(url) = &args.service {
        settings.service_url = url.trim_end_matches('/').to_string();
    }
    if let Some(secs) = args.timeout {
        settings.request_timeout_secs = secs;
    }
    if let Some(opacity) = args.opacity {
        settings.overlay_opacity = opacity.clamp(0.0, 1.0);
    }

    let service: Arc<dyn MaskService> = match &args.mask_info {
        Some(path) => Arc::new(JsonMaskSource::new(path.clone())),
        None => {
            let http = HttpMaskService::new(&settings.service_url, settings.request_timeout());
            if args.configure_generator
                && let Err(e) = http.configure(&settings.generator)
            {
                eprintln!("error: could not configure mask generator: {}", e);
                return ExitCode::FAILURE;
            }
            Arc::new(http)
        }
    };
    if args.configure_generator && args.mask_info.is_some() {
        eprintln!("warning: --configure-generator has no effect with --mask-info.");
    }

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;
    let mut session = Session::new(SessionConfig::from(&settings));

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let file_start = Instant::now();

        match run_one(&mut session, service.as_ref(), &settings, input_path, &args) {
            Ok(Some(written)) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        written.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Ok(None) => {
                println!("  skipped: no mask selected, nothing to export");
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file pipeline
// ============================================================================

/// `Ok(None)` when the export precondition is not met.
fn run_one(
    session: &mut Session,
    service: &dyn MaskService,
    settings: &Settings,
    input: &Path,
    args: &CliArgs,
) -> Result<Option<PathBuf>, String> {
    if !settings.shared_image_dir.is_empty() {
        stage_for_service(input, Path::new(&settings.shared_image_dir))
            .map_err(|e| format!("staging failed: {}", e))?;
    }

    let document = load_image_sync(input).map_err(|e| format!("load failed: {}", e))?;
    let ticket = session.load_image(document);
    let fetched = service.fetch(&ticket.file_name);
    match session.apply_masks(&ticket, fetched) {
        MasksOutcome::Applied { masks } => {
            if args.verbose {
                println!("  {} masks", masks);
            }
        }
        MasksOutcome::Unavailable(reason) => return Err(format!("masks unavailable: {}", reason)),
        MasksOutcome::Stale => return Err("mask info arrived for a different image".to_string()),
    }

    for point in &args.click {
        let outcome = session.click(*point);
        if args.verbose {
            println!("  click ({}, {}): {}", point.x, point.y, describe(outcome));
        }
        if !matches!(outcome, PointerOutcome::Committed(_)) {
            log_warn!("Click at ({}, {}) selected nothing: {:?}", point.x, point.y, outcome);
        }
    }

    let exported = match session.export() {
        Ok(exported) => exported,
        Err(e) if e.is_export_precondition() => return Ok(None),
        Err(e) => return Err(format!("export failed: {}", e)),
    };
    let output_path = build_output_path(
        input,
        &exported.file_name,
        args.output.as_deref(),
        args.output_dir.as_deref(),
    );
    save_png(&exported.raster, &output_path).map_err(|e| format!("save failed: {}", e))?;
    log_info!("Exported {}", output_path.display());
    Ok(Some(output_path))
}

fn describe(outcome: PointerOutcome) -> String {
    match outcome {
        PointerOutcome::Committed(id) => format!("selected mask {}", id.0),
        PointerOutcome::Miss(lookup) => format!("no mask ({:?})", lookup),
        PointerOutcome::NotLoaded => "no mask data".to_string(),
        other => format!("{:?}", other),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);
        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Output path for one input.
///
/// Priority:
/// 1. `--output` (explicit path, single-file input)
/// 2. `--output-dir` joined with the export name
/// 3. Next to the input, with `_masked` appended if it would overwrite the input
fn build_output_path(
    input: &Path,
    export_name: &str,
    output: Option<&Path>,
    output_dir: Option<&Path>,
) -> PathBuf {
    if let Some(out) = output {
        return out.to_path_buf();
    }
    if let Some(dir) = output_dir {
        return dir.join(export_name);
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(export_name);
    if candidate == input {
        let stem = Path::new(export_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        parent.join(format!("{}_masked.png", stem))
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_parse_from_x_comma_y() {
        assert_eq!(parse_point("12.5, 7"), Ok(ImagePoint::new(12.5, 7.0)));
        assert!(parse_point("12").is_err());
        assert!(parse_point("a,b").is_err());
    }

    #[test]
    fn output_never_overwrites_a_png_input() {
        let p = build_output_path(Path::new("shots/a.png"), "a.png", None, None);
        assert_eq!(p, Path::new("shots/a_masked.png"));
        let p = build_output_path(Path::new("shots/a.jpg"), "a.png", None, None);
        assert_eq!(p, Path::new("shots/a.png"));
        let p = build_output_path(Path::new("shots/a.jpg"), "a.png", None, Some(Path::new("out")));
        assert_eq!(p, Path::new("out/a.png"));
    }

    #[test]
    fn args_parse() {
        let args = CliArgs::try_parse_from([
            "maskpick", "-i", "a.png", "--click", "1,2", "--click", "3,4", "--opacity", "0.5",
        ])
        .unwrap();
        assert_eq!(args.click, vec![ImagePoint::new(1.0, 2.0), ImagePoint::new(3.0, 4.0)]);
        assert_eq!(args.opacity, Some(0.5));
    }
}
