use anyhow::{Context, Result};
use modulation::{ModulationMode, RegionBinding};
use renderer::{FrameSource, FrameTarget, Renderer, TimeSample};
use sceneconfig::{Preset, SerialSettings};
use sensor::{ChannelState, PollOutcome, SerialSampler};
use tracing::{info, trace, warn};
use tracing_subscriber::EnvFilter;

use crate::bootstrap::{resolve_scene, ResolvedScene};
use crate::cli::{Cli, Command, ConfigAction, ConfigCommand, RunArgs};
use crate::paths::AppPaths;

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let paths = AppPaths::discover()?;
    tracing::debug!(
        config = %paths.config_dir().display(),
        share = %paths.share_dir().display(),
        "resolved sinestesia paths"
    );

    match cli.command {
        Some(Command::Config(ConfigCommand { action })) => run_config(action, &cli.run, &paths),
        None => run_scene(&cli.run, &paths),
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_config(action: ConfigAction, args: &RunArgs, paths: &AppPaths) -> Result<()> {
    match action {
        ConfigAction::Where => {
            let config_file = paths.config_file();
            println!("config dir: {}", paths.config_dir().display());
            println!(
                "config file: {} ({})",
                config_file.display(),
                if config_file.is_file() {
                    "present"
                } else {
                    "missing"
                }
            );
            println!("share dir: {}", paths.share_dir().display());
            println!("presets:");
            for preset in Preset::ALL {
                println!("  {:<9} {}", preset.name(), preset.describe());
            }
        }
        ConfigAction::Dump => {
            let scene = resolve_scene(args, paths)?;
            let rendered = scene
                .config
                .to_toml_string()
                .context("failed to render scene as TOML")?;
            println!("# source: {}", scene.source);
            print!("{rendered}");
        }
    }
    Ok(())
}

fn run_scene(args: &RunArgs, paths: &AppPaths) -> Result<()> {
    let scene = resolve_scene(args, paths)?;
    let frames = SensorFrames::from_scene(&scene);
    let mut renderer = Renderer::new(scene.renderer_config());
    renderer.run(frames)
}

/// Polls the sensor once per frame and forwards channels to the dispatcher.
struct SensorFrames {
    sampler: Option<SerialSampler>,
    channels: ChannelState,
    bindings: Vec<RegionBinding>,
    mode: ModulationMode,
}

impl SensorFrames {
    fn from_scene(scene: &ResolvedScene) -> Self {
        Self {
            sampler: open_sensor(&scene.config.serial),
            channels: ChannelState::new(),
            bindings: scene.bindings(),
            mode: scene.config.mode,
        }
    }
}

/// Serial problems never stop the show; regions fall back to rest values.
fn open_sensor(settings: &SerialSettings) -> Option<SerialSampler> {
    if !settings.enabled {
        info!("sensor disabled; regions render at rest");
        return None;
    }
    match sensor::open_serial(&settings.device, settings.baud, settings.timeout) {
        Ok(sampler) => Some(sampler),
        Err(err) => {
            warn!(error = %err, "continuing without sensor input");
            None
        }
    }
}

impl FrameSource for SensorFrames {
    fn render_frame(
        &mut self,
        time: TimeSample,
        frame_size: (u32, u32),
        target: &mut dyn FrameTarget,
    ) {
        if let Some(sampler) = self.sampler.as_mut() {
            if let PollOutcome::Incomplete { bytes: 0 } = sampler.poll(&mut self.channels) {
                trace!("no sensor bytes this frame");
            }
        }

        let applied = modulation::dispatch(
            frame_size.0,
            frame_size.1,
            time.seconds,
            self.mode,
            &self.channels,
            &self.bindings,
            target,
        );
        trace!(frame = time.frame_index, ?applied, "dispatched regions");
    }
}
