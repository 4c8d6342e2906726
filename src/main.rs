// refpin - A pinnable reference-image canvas
// Places images on a pannable, zoomable canvas and reloads them when their files change

mod app;
mod canvas;
mod cli;
mod config;
mod geometry;
mod image_loader;
mod input;
mod reload;
#[cfg(test)]
mod test_support;
mod transform;
mod watch;

use anyhow::Result;
use app::App;
use config::Settings;
use image_loader::DiskLoader;
use log::info;
use std::sync::Arc;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let args = cli::parse_args()?;
    let settings = Settings::from(&args);

    info!(
        "Starting refpin with {} image(s), live reload: {}, pinned: {}",
        args.image_paths.len(),
        settings.watch_files,
        settings.start_pinned
    );

    let mut app = App::new(&settings, Arc::new(DiskLoader));
    app.open_startup_images(&args.image_paths);

    // Commands arrive on stdin in place of window input
    input::spawn_stdin_reader(app.sender(), args.interactive)?;

    app.run();
    info!("Closing canvas with {} image(s)", app.canvas().images().len());
    Ok(())
}
