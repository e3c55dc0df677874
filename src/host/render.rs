use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

use crate::effect::EffectFamily;
use crate::host::DesktopProcessor;

/// Offline render of a WAV file through one effect.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub family: EffectFamily,
    pub input: PathBuf,
    pub output: PathBuf,
    pub params: Vec<(String, f32)>,
    pub block_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderReport {
    pub frames: usize,
    pub channels: usize,
    pub sample_rate: u32,
    pub peak: f32,
}

/// Parse a `id=value` pair as given on the command line.
pub fn parse_param(arg: &str) -> Result<(String, f32)> {
    let (id, value) = arg
        .split_once('=')
        .with_context(|| format!("expected id=value, got '{arg}'"))?;
    let value: f32 = value
        .trim()
        .parse()
        .with_context(|| format!("invalid value for '{id}'"))?;
    Ok((id.trim().to_string(), value))
}

/// `<dir>/<stem>-<family>-<timestamp>.wav`
pub fn default_output_path(dir: &Path, input: &Path, family: EffectFamily) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("render");
    dir.join(format!(
        "{stem}-{family}-{}.wav",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ))
}

/// Read a WAV file into one buffer per channel, scaled to [-1, 1].
pub fn read_wav(path: &Path) -> Result<(Vec<Vec<f32>>, u32)> {
    let reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file {}", path.display()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = if spec.sample_format == SampleFormat::Float {
        reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read float samples")?
    } else {
        let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
        reader
            .into_samples::<i32>()
            .map(|s| s.map(|v| v as f32 / max_val))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read integer samples")?
    };

    let channel_count = usize::from(spec.channels.max(1));
    let mut channels = vec![Vec::with_capacity(samples.len() / channel_count); channel_count];
    for frame in samples.chunks(channel_count) {
        for (channel, &sample) in channels.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }

    debug!(
        "Read {} frames x {} channels at {} Hz from {}",
        channels[0].len(),
        channel_count,
        spec.sample_rate,
        path.display()
    );
    Ok((channels, spec.sample_rate))
}

/// Write channel buffers as interleaved 32-bit float WAV.
pub fn write_wav(path: &Path, channels: &[Vec<f32>], sample_rate: u32) -> Result<()> {
    if channels.is_empty() {
        anyhow::bail!("nothing to write to {}", path.display());
    }

    let spec = WavSpec {
        channels: u16::try_from(channels.len()).context("too many channels")?,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file {}", path.display()))?;

    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    for i in 0..frames {
        for channel in channels {
            writer
                .write_sample(channel[i])
                .context("Failed to write sample")?;
        }
    }
    writer.finalize().context("Failed to finalize WAV file")?;
    Ok(())
}

/// Run `channels` through a freshly prepared effect, `block_size` frames per
/// host call. Unknown parameter ids are an error.
pub fn render_channels(
    family: EffectFamily,
    sample_rate: u32,
    channels: &mut [Vec<f32>],
    params: &[(String, f32)],
    block_size: usize,
) -> Result<()> {
    let mut host = DesktopProcessor::new(family)?;
    let controls = host.parameters();
    for (id, value) in params {
        let applied = controls.set(id, *value)?;
        debug!("{family}.{id} = {applied}");
    }
    host.prepare(sample_rate as f32, block_size)?;

    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    let mut start = 0;
    while start < frames {
        let end = (start + block_size).min(frames);
        let mut block: Vec<&mut [f32]> = channels
            .iter_mut()
            .map(|channel| &mut channel[start..end])
            .collect();
        host.process_block(&mut block);
        start = end;
    }
    Ok(())
}

pub fn render(job: &RenderJob) -> Result<RenderReport> {
    let (mut channels, sample_rate) = read_wav(&job.input)?;

    info!(
        "Rendering {} through {} ({} channels, {} Hz)",
        job.input.display(),
        job.family,
        channels.len(),
        sample_rate
    );
    render_channels(
        job.family,
        sample_rate,
        &mut channels,
        &job.params,
        job.block_size,
    )?;

    if let Some(parent) = job.output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    write_wav(&job.output, &channels, sample_rate)?;

    let peak = channels
        .iter()
        .flatten()
        .fold(0.0_f32, |peak, s| peak.max(s.abs()));
    info!("Render saved: {} (peak {peak:.3})", job.output.display());

    Ok(RenderReport {
        frames: channels.first().map_or(0, Vec::len),
        channels: channels.len(),
        sample_rate,
        peak,
    })
}
