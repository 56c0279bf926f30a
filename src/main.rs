// Release builds on Windows are GUI-subsystem; CLI mode still prints because
// `cargo run`/terminal launches inherit the parent's handles on other OSes.
#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

mod app;
mod cli;

use app::MaskPickApp;
use eframe::egui;
use maskpick::settings::Settings;
use maskpick::{log_info, logger};

fn main() -> Result<(), eframe::Error> {
    // -- CLI / headless mode ---------------------------------------------
    if cli::CliArgs::is_cli_mode() {
        use clap::Parser;
        let args = cli::CliArgs::parse();
        logger::init();
        let code = cli::run(args);
        std::process::exit(if code == std::process::ExitCode::SUCCESS {
            0
        } else {
            1
        });
    }

    // -- GUI mode -----------------------------------------------------

    // Initialize session log (overwrites previous session log)
    logger::init();

    let settings = Settings::load();
    // Write defaults on first run so the file can be edited by hand
    if Settings::settings_path().is_some_and(|p| !p.exists()) {
        settings.save();
    }
    log_info!("Service: {}", settings.service_url);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([480.0, 360.0])
            .with_title("MaskPick"),
        ..Default::default()
    };

    eframe::run_native(
        "MaskPick",
        options,
        Box::new(move |cc| Box::new(MaskPickApp::new(cc, settings))),
    )
}
