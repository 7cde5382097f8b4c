use attendance_client::{
    camera,
    cli::App,
    ApiGateway,
    Config,
    ReqwestTransport,
    SessionStore,
};

use clap::{Parser, Subcommand};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(name = "attendance-client")]
#[command(about = "Terminal client for the facial recognition attendance service")]
struct Cli {
    /// Config file (defaults to the per-user config dir, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overrides config and ATTENDANCE_API_BASE_URL
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Video device index (/dev/videoN)
    #[arg(long, global = true)]
    camera_device: Option<u32>,

    /// Enable development logging
    #[arg(long, global = true)]
    dev: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive client (default)
    Shell,
    /// List video capture devices
    Cameras,
    /// Print the effective configuration
    ShowConfig,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.dev);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(base) = cli.api_base {
        config.api.base_url = base;
    }
    if let Some(index) = cli.camera_device {
        config.camera.device_index = index;
    }
    config.validate()?;

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => {
            let transport = Arc::new(ReqwestTransport::new()?);
            let gateway = ApiGateway::new(config.api_base()?, transport);
            let session = SessionStore::new(gateway);
            let device = camera::default_device(&config.camera);

            let mut app = App::new(&config, session, device);
            app.run().await?;
        }
        Commands::Cameras => list_cameras()?,
        Commands::ShowConfig => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

#[cfg(feature = "camera-v4l")]
fn list_cameras() -> Result<()> {
    let cameras = camera::V4lCamera::list_devices()?;
    if cameras.is_empty() {
        println!("No cameras found");
        println!("Check that a camera is connected and that you may access /dev/video*");
        return Ok(());
    }
    for (index, name) in cameras {
        println!("/dev/video{}: {}", index, name);
    }
    println!("\nSelect one with --camera-device <N> or [camera] device_index in the config file");
    Ok(())
}

#[cfg(not(feature = "camera-v4l"))]
fn list_cameras() -> Result<()> {
    println!("Built without camera support (feature `camera-v4l`)");
    Ok(())
}

/// Outside dev mode only warnings reach stderr, so info lines do not
/// interleave with the interactive prompt.
fn log_level(dev_mode: bool) -> Level {
    if dev_mode { Level::DEBUG } else { Level::WARN }
}

fn setup_logging(dev_mode: bool) {
    if dev_mode {
        tracing_subscriber::fmt()
            .with_max_level(log_level(dev_mode))
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(log_level(dev_mode))
            .with_writer(std::io::stderr)
            .init();
    }
}
