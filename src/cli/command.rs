use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};
use coreaudio_ext::format::CommonPcmFormat;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")\ncoreaudio-ext ",
    env!("COREAUDIO_EXT_VERSION"),
);

#[derive(Debug, ClapParser)]
#[command(
    name         = env!("CARGO_PKG_NAME"),
    version      = env!("CARGO_PKG_VERSION"),
    long_version = LONG_VERSION,
    author       = env!("CARGO_PKG_AUTHORS"),
    about        = "Tools for inspecting Core Audio stream formats, channel layouts, CAF headers and devices",
    long_about   = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors (fail on first warning).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Describe a common PCM stream format.
    Format(FormatArgs),

    /// Describe a channel layout, optionally mapping it onto another.
    Layout(LayoutArgs),

    /// Print the header of a Core Audio Format file.
    Caf(CafArgs),

    /// List the audio devices of the host.
    Devices(DevicesArgs),
}

#[derive(Debug, Args)]
pub struct FormatArgs {
    /// Sample format.
    #[arg(long, value_enum, default_value_t = CommonFormatArg::Float32)]
    pub common: CommonFormatArg,

    /// Sample rate in Hz.
    #[arg(long, value_name = "HZ", default_value_t = 48000.0)]
    pub rate: f64,

    /// Channel count.
    #[arg(long, value_name = "N", default_value_t = 2)]
    pub channels: u32,

    /// Store each channel in its own buffer.
    #[arg(long)]
    pub non_interleaved: bool,

    /// Also print an equivalent format.
    #[arg(long, value_enum)]
    pub equivalent: Option<Equivalent>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct LayoutArgs {
    /// Channel labels ("L R C LFE Ls Rs") or a layout tag name ("MPEG_5_1_A").
    #[arg(value_name = "LAYOUT")]
    pub layout: String,

    /// Target layout for a channel map.
    #[arg(long, value_name = "LAYOUT")]
    pub map_to: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct CafArgs {
    /// Input CAF file.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum OutputFormat {
    /// Human-readable report.
    Text,
    /// YAML document.
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CommonFormatArg {
    Float32,
    Float64,
    Int16,
    Int32,
}

impl From<CommonFormatArg> for CommonPcmFormat {
    fn from(arg: CommonFormatArg) -> Self {
        match arg {
            CommonFormatArg::Float32 => CommonPcmFormat::Float32,
            CommonFormatArg::Float64 => CommonPcmFormat::Float64,
            CommonFormatArg::Int16 => CommonPcmFormat::Int16,
            CommonFormatArg::Int32 => CommonPcmFormat::Int32,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Equivalent {
    Interleaved,
    NonInterleaved,
    /// Native float32, non-interleaved.
    Standard,
}
