use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use vaist::bridge::{self, BridgeHandle, StatusMessage};
use vaist::effect::EffectFamily;
use vaist::host::render::{self, RenderJob, default_output_path, parse_param};
use vaist::params::Descriptor;
use vaist::settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "vaist")]
#[command(version)]
#[command(about = "Real-time effect engine: describe, build, render and simulate effects.")]
struct Cli {
    #[arg(
        long,
        env = "VAIST_SETTINGS",
        help = "Settings file (defaults to the XDG config location)"
    )]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the available effect families
    Families,
    /// Print a family's parameter descriptor
    Describe {
        family: EffectFamily,
        #[arg(long, help = "Print the descriptor as JSON")]
        json: bool,
    },
    /// Write a module image for a family
    BuildModule {
        family: EffectFamily,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, help = "Also write the descriptor JSON to this path")]
        descriptor: Option<PathBuf>,
    },
    /// Render a WAV file through an effect
    Render {
        family: EffectFamily,
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long = "param", value_parser = parse_param, help = "Parameter as id=value")]
        params: Vec<(String, f32)>,
    },
    /// Run a bridge session against a test tone and report the output peak
    Simulate {
        family: EffectFamily,
        #[arg(long, default_value_t = 375)]
        quanta: usize,
        #[arg(long = "param", value_parser = parse_param, help = "Parameter as id=value")]
        params: Vec<(String, f32)>,
    },
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    info!("vaist v{}", env!("CARGO_PKG_VERSION"));

    let settings = match &cli.settings {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => Settings::load().context("failed to load settings")?,
    };
    info!("Settings:\n{settings}");

    match cli.command {
        Command::Families => {
            for family in EffectFamily::ALL {
                println!("{:<12}{} parameters", family.name(), family.params().len());
            }
        }
        Command::Describe { family, json } => describe(family, json)?,
        Command::BuildModule {
            family,
            output,
            descriptor,
        } => {
            let image = settings.engine.module_image(family);
            let bytes = image.encode()?;
            std::fs::write(&output, &bytes)
                .with_context(|| format!("failed to write module to {}", output.display()))?;
            info!("Wrote {} byte {family} module to {}", bytes.len(), output.display());

            if let Some(path) = descriptor {
                std::fs::write(&path, Descriptor::for_family(family).to_json()?)
                    .with_context(|| format!("failed to write descriptor to {}", path.display()))?;
                info!("Wrote {family} descriptor to {}", path.display());
            }
        }
        Command::Render {
            family,
            input,
            output,
            params,
        } => {
            let output = output.unwrap_or_else(|| {
                default_output_path(Path::new(&settings.render_dir), &input, family)
            });
            let report = render::render(&RenderJob {
                family,
                input,
                output: output.clone(),
                params,
                block_size: settings.engine.max_block,
            })?;
            println!(
                "{}: {} frames, {} channels, peak {:.3}",
                output.display(),
                report.frames,
                report.channels,
                report.peak
            );
        }
        Command::Simulate {
            family,
            quanta,
            params,
        } => {
            let peak = simulate(&settings, family, quanta, &params)?;
            println!("{family}: {quanta} quanta, output peak {peak:.3}");
        }
    }

    Ok(())
}

fn describe(family: EffectFamily, json: bool) -> Result<()> {
    let descriptor = Descriptor::for_family(family);
    if json {
        println!("{}", descriptor.to_json()?);
        return Ok(());
    }

    println!("{family}");
    for (index, param) in descriptor.params.iter().enumerate() {
        println!(
            "  {index:>2} {:<16}{:>10} .. {:<10} default {:<10}{}",
            param.id, param.min, param.max, param.default, param.unit
        );
    }
    Ok(())
}

/// Drive a bridge the way a browser host would: the control side initializes
/// and sends parameters, a separate thread pulls quanta of a 220 Hz tone.
fn simulate(
    settings: &Settings,
    family: EffectFamily,
    quanta: usize,
    params: &[(String, f32)],
) -> Result<f32> {
    let config = settings.engine.bridge_config();
    let (mut handle, mut processor) = bridge::bridge(config);

    let bytes = settings.engine.module_image(family).encode()?;
    handle.init(bytes, Descriptor::for_family(family))?;
    for (id, value) in params {
        handle.set_parameter(id, *value)?;
    }

    let audio = thread::spawn(move || {
        let quantum = processor.quantum();
        let step = std::f32::consts::TAU * 220.0 / config.sample_rate;
        let mut phase = 0.0_f32;
        let mut in_left = vec![0.0; quantum];
        let mut out_left = vec![0.0; quantum];
        let mut out_right = vec![0.0; quantum];
        let mut peak = 0.0_f32;

        for _ in 0..quanta {
            for sample in &mut in_left {
                *sample = 0.5 * phase.sin();
                phase = (phase + step) % std::f32::consts::TAU;
            }
            processor.process(&in_left, &in_left, &mut out_left, &mut out_right);
            peak = out_left
                .iter()
                .chain(&out_right)
                .fold(peak, |p, s| p.max(s.abs()));
        }
        peak
    });

    let peak = audio
        .join()
        .map_err(|e| anyhow::anyhow!("Audio thread panicked (join failed): {:?}", e))?;

    report_status(&handle)?;
    info!("Released {} retired objects", handle.collect_retired());
    Ok(peak)
}

fn report_status(handle: &BridgeHandle) -> Result<()> {
    while let Ok(status) = handle.wait_status(Duration::from_millis(10)) {
        match status {
            status @ (StatusMessage::Error { .. } | StatusMessage::DestroyFailed) => {
                anyhow::bail!("bridge reported {status}")
            }
            other => info!("Bridge status: {other}"),
        }
    }
    let info = handle.info();
    if info.state != bridge::BridgeState::Ready {
        warn!("Bridge ended in state: {}", info.state);
    }
    Ok(())
}
