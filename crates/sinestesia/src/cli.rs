use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sceneconfig::Preset;

#[derive(Parser, Debug)]
#[command(
    name = "sinestesia",
    author,
    version,
    about = "Fullscreen shader wall driven by six analog sensor channels",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Scene configuration file (TOML).
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Built-in scene to use instead of a configuration file.
    #[arg(long, value_name = "NAME", value_parser = parse_preset, global = true)]
    pub preset: Option<Preset>,

    /// Serial device the sensor board is attached to.
    #[arg(
        long,
        value_name = "PATH",
        env = "SINESTESIA_SERIAL_DEVICE",
        global = true
    )]
    pub device: Option<String>,

    /// Serial baud rate (9600 for the classic board, 115200 for the triptych).
    #[arg(long, value_name = "RATE", global = true)]
    pub baud: Option<u32>,

    /// Render in a desktop window instead of borderless fullscreen.
    #[arg(long, global = true)]
    pub window: bool,

    /// Window size (e.g. `1280x720`); implies nothing about fullscreen.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size, global = true)]
    pub size: Option<(u32, u32)>,

    /// Do not open the serial port; every region renders at rest.
    #[arg(long, global = true)]
    pub no_sensor: bool,

    /// Replace the configured regions with these shaders, left to right.
    #[arg(long = "shader", value_name = "PATH", global = true)]
    pub shaders: Vec<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect configuration discovery and the resolved scene.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration directory, file and shader root.
    Where,
    /// Print the resolved scene, after overrides, as TOML.
    Dump,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_preset(value: &str) -> Result<Preset, String> {
    value.parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WxH format, e.g. 1920x1080".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{}' in size", width.trim()))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{}' in size", height.trim()))?;

    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".to_string());
    }

    Ok((width, height))
}
