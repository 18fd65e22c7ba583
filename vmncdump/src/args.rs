use clap::Parser;
use std::path::PathBuf;
use vmnc_decoder::Framerate;

#[derive(Parser, Debug)]
#[command(name = "vmncdump")]
#[command(about = "Decode a VMnc capture stream into PNG frames")]
#[command(version)]
pub struct Args {
    /// Input stream file, or "-" for stdin
    pub input: PathBuf,

    /// Directory to write frame-NNNNNN.png files into (frames are only counted if omitted)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Bytes handed to the decoder per read
    #[arg(long, default_value_t = 64 * 1024, value_parser = clap::value_parser!(u64).range(1..))]
    pub chunk_size: u64,

    /// Output frame rate as N or N/D, used for frame timestamps
    #[arg(long, value_name = "N/D")]
    pub framerate: Option<Framerate>,

    /// Configuration file path
    #[arg(short, long, env = "VMNCDUMP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write only every N-th frame
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub every: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Whether the input is standard input.
    pub fn reads_stdin(&self) -> bool {
        self.input.as_os_str() == "-"
    }
}
