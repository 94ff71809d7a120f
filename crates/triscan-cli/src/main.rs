use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use triscan_core::{capture_still, CaptureStep, ScanConfig};
use triscan_hw::Camera;

mod scan;

#[derive(Parser)]
#[command(name = "triscan", about = "Guided three-angle face capture")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a guided scan: replay a landmark trace against the live camera
    Scan {
        /// JSON-lines landmark trace ("-" for stdin); one object per
        /// frame: {"t_ms": 0, "landmarks": {...}} or {"t_ms": 0} for
        /// a no-face frame
        #[arg(short, long)]
        trace: PathBuf,
        /// V4L2 device path
        #[arg(short, long, default_value = "/dev/video0")]
        device: String,
        /// Directory the captured stills are written into
        #[arg(short, long, default_value = "captures")]
        out: PathBuf,
        /// TOML file overriding the scan tuning
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List V4L2 capture devices
    Cameras,
    /// Capture a single diagnostic still through the full pipeline
    Test {
        #[arg(short, long, default_value = "/dev/video0")]
        device: String,
        #[arg(short, long, default_value = "test.jpg")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            trace,
            device,
            out,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            scan::run(&trace, &device, &out, config).await
        }
        Commands::Cameras => {
            let devices = Camera::list_devices();
            if devices.is_empty() {
                println!("no V4L2 capture devices found");
            }
            for dev in devices {
                println!("{}\t{} ({}, {})", dev.path, dev.name, dev.driver, dev.bus);
            }
            Ok(())
        }
        Commands::Test { device, output } => {
            let camera = Camera::open(&device)?;
            let frame = camera.capture_frame()?;
            let still = capture_still(
                &frame.data,
                frame.width,
                frame.height,
                CaptureStep::Front,
                &ScanConfig::default().output,
            )?;
            std::fs::write(&output, &still.jpeg)
                .with_context(|| format!("writing {}", output.display()))?;
            println!(
                "captured {}x{} still to {}",
                still.width,
                still.height,
                output.display()
            );
            Ok(())
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<ScanConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
        }
        None => Ok(ScanConfig::default()),
    }
}
