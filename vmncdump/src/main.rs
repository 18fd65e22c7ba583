mod args;
mod input;
mod output;

use anyhow::{bail, Context, Result};
use args::Args;
use clap::Parser;
use input::ChunkReader;
use output::FrameWriter;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, trace};
use vmnc_decoder::{DecoderConfig, Event, VmncDecoder};

fn init_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "vmncdump={},vmnc_decoder={},rfb_encodings=info",
                    log_level, log_level
                )
                .into()
            }),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    Ok(())
}

/// `config.toml` in the user's configuration directory.
fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "vmncdump")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Loads the configuration file, then applies command-line overrides.
fn load_config(args: &Args) -> Result<DecoderConfig> {
    let mut config = match &args.config {
        Some(path) => DecoderConfig::load(path)?,
        None => match default_config_path().filter(|path| path.exists()) {
            Some(path) => {
                info!("Using config file {}", path.display());
                DecoderConfig::load(path)?
            }
            None => DecoderConfig::default(),
        },
    };

    if let Some(framerate) = args.framerate {
        config.framerate = Some(framerate);
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Totals reported when the input has been fully decoded.
#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    bytes_read: u64,
    records: u64,
    frames: u64,
    frames_written: u64,
    format_changes: u64,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "bytes read:     {}", self.bytes_read)?;
        writeln!(f, "records:        {}", self.records)?;
        writeln!(f, "frames:         {}", self.frames)?;
        writeln!(f, "frames written: {}", self.frames_written)?;
        write!(f, "format changes: {}", self.format_changes)
    }
}

async fn run(args: &Args) -> Result<Summary> {
    let config = load_config(args)?;
    let mut decoder = VmncDecoder::new(config);
    let mut writer = args
        .output
        .as_deref()
        .map(|dir| FrameWriter::create(dir, args.every))
        .transpose()?;

    let chunk_size = usize::try_from(args.chunk_size).context("Chunk size too large")?;
    let mut reader = ChunkReader::open(&args.input, chunk_size).await?;

    while let Some(chunk) = reader.next_chunk().await? {
        for event in decoder.feed(chunk) {
            match event {
                Event::NeedMoreBytes(missing) => {
                    trace!("Waiting for at least {} more bytes", missing);
                }
                Event::FormatChanged {
                    width,
                    height,
                    pixel_format,
                } => {
                    info!(
                        "Format: {}x{} bpp={} depth={}",
                        width, height, pixel_format.bits_per_pixel, pixel_format.depth
                    );
                }
                Event::FrameReady(frame) => {
                    if let Some(writer) = writer.as_mut() {
                        writer.write(&frame)?;
                    }
                }
                Event::Error(error) => {
                    let offset = decoder.stats().bytes;
                    return Err(error)
                        .with_context(|| format!("Invalid record at stream offset {}", offset));
                }
            }
        }
    }

    if decoder.buffered() > 0 {
        bail!(
            "Input ends inside a record: {} bytes left undecoded at stream offset {}",
            decoder.buffered(),
            decoder.stats().bytes
        );
    }

    let stats = decoder.stats();
    Ok(Summary {
        bytes_read: reader.total(),
        records: stats.records,
        frames: stats.frames,
        frames_written: writer.as_ref().map_or(0, FrameWriter::written),
        format_changes: stats.format_changes,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    info!("Starting vmncdump {}", env!("CARGO_PKG_VERSION"));
    let summary = run(&args).await?;
    println!("{summary}");
    Ok(())
}
