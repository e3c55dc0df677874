use anyhow::Result;
use vaist::bridge::{
    self, BridgeConfig, BridgeHandle, BridgeProcessor, BridgeState, DeliveryMode, StatusMessage,
};
use vaist::effect::EffectFamily;
use vaist::module::ModuleImage;
use vaist::params::Descriptor;

const QUANTUM: usize = 128;

struct Buffers {
    in_left: Vec<f32>,
    in_right: Vec<f32>,
    out_left: Vec<f32>,
    out_right: Vec<f32>,
}

impl Buffers {
    fn constant(value: f32) -> Self {
        Self {
            in_left: vec![value; QUANTUM],
            in_right: vec![value; QUANTUM],
            out_left: vec![9.0; QUANTUM],
            out_right: vec![9.0; QUANTUM],
        }
    }

    fn pull(&mut self, processor: &mut BridgeProcessor) {
        processor.process(
            &self.in_left,
            &self.in_right,
            &mut self.out_left,
            &mut self.out_right,
        );
    }
}

fn session(delivery: DeliveryMode, family: EffectFamily) -> Result<(BridgeHandle, BridgeProcessor)> {
    let (mut handle, processor) = bridge::bridge(BridgeConfig {
        delivery,
        ..BridgeConfig::default()
    });
    let bytes = ModuleImage::new(family, QUANTUM).encode()?;
    handle.init(bytes, Descriptor::for_family(family))?;
    Ok((handle, processor))
}

/// A session whose `init` has already been handled.
fn ready(delivery: DeliveryMode, family: EffectFamily) -> Result<(BridgeHandle, BridgeProcessor)> {
    let (handle, mut processor) = session(delivery, family)?;
    Buffers::constant(0.0).pull(&mut processor);
    Ok((handle, processor))
}

#[test]
fn init_reports_ready_then_initialized() -> Result<()> {
    let (handle, processor) = ready(DeliveryMode::Queued, EffectFamily::Chorus)?;

    assert_eq!(handle.try_status(), Some(StatusMessage::Ready));
    assert_eq!(
        handle.try_status(),
        Some(StatusMessage::Initialized {
            sample_rate: 48_000.0,
            quantum: QUANTUM,
        })
    );
    assert_eq!(processor.state(), BridgeState::Ready);

    let info = handle.info();
    assert_eq!(info.state, BridgeState::Ready);
    assert_eq!(info.family, Some(EffectFamily::Chorus));
    Ok(())
}

#[test]
fn parameters_converge_within_one_quantum() -> Result<()> {
    for delivery in [DeliveryMode::Queued, DeliveryMode::Shared] {
        let (mut handle, mut processor) = ready(delivery, EffectFamily::Saturator)?;
        let mut buffers = Buffers::constant(0.1);

        handle.set_parameter("drive", 0.8)?;
        handle.set_parameter("asymmetry", 2.0)?;
        buffers.pull(&mut processor);

        assert_eq!(processor.parameter(0), Some(0.8), "{delivery}");
        assert_eq!(processor.parameter(2), Some(1.0), "{delivery} should clamp");
    }
    Ok(())
}

#[test]
fn queued_updates_apply_in_order() -> Result<()> {
    let (mut handle, mut processor) = ready(DeliveryMode::Queued, EffectFamily::Gain)?;
    for value in [-12.0, 3.0, -6.0] {
        handle.set_parameter("gain", value)?;
    }
    Buffers::constant(0.0).pull(&mut processor);
    assert_eq!(processor.parameter(0), Some(-6.0));
    Ok(())
}

#[test]
fn unknown_parameter_is_rejected_on_the_control_side() -> Result<()> {
    let (mut handle, _processor) = session(DeliveryMode::Queued, EffectFamily::Gain)?;
    assert!(handle.set_parameter("volume", 1.0).is_err());
    Ok(())
}

#[test]
fn malformed_module_leaves_the_engine_unavailable() -> Result<()> {
    let (mut handle, mut processor) = bridge::bridge(BridgeConfig::default());
    handle.init(vec![0, 1, 2, 3], Descriptor::for_family(EffectFamily::Gain))?;

    let mut buffers = Buffers::constant(0.5);
    buffers.pull(&mut processor);

    assert_eq!(handle.try_status(), Some(StatusMessage::Ready));
    assert!(matches!(
        handle.try_status(),
        Some(StatusMessage::Error { .. })
    ));
    assert_eq!(handle.try_status(), None);

    let info = handle.info();
    assert_eq!(info.state, BridgeState::Failed);
    assert_eq!(info.state.to_string(), "engine unavailable");
    assert!(buffers.out_left.iter().all(|&s| s == 0.0));
    assert!(buffers.out_right.iter().all(|&s| s == 0.0));
    Ok(())
}

#[test]
fn descriptor_mismatch_fails_init() -> Result<()> {
    let (mut handle, mut processor) = bridge::bridge(BridgeConfig::default());
    let bytes = ModuleImage::new(EffectFamily::Phaser, QUANTUM).encode()?;
    handle.init(bytes, Descriptor::for_family(EffectFamily::Flanger))?;
    Buffers::constant(0.0).pull(&mut processor);

    assert_eq!(processor.state(), BridgeState::Failed);
    Ok(())
}

#[test]
fn module_quantum_must_cover_the_render_quantum() -> Result<()> {
    let (mut handle, mut processor) = bridge::bridge(BridgeConfig::default());
    let bytes = ModuleImage::new(EffectFamily::Gain, QUANTUM / 2).encode()?;
    handle.init(bytes, Descriptor::for_family(EffectFamily::Gain))?;
    Buffers::constant(0.0).pull(&mut processor);

    assert_eq!(processor.state(), BridgeState::Failed);
    Ok(())
}

#[test]
fn silence_before_init_and_bypass_copies_input() -> Result<()> {
    let (handle, mut processor) = bridge::bridge(BridgeConfig::default());
    let mut buffers = Buffers::constant(0.25);

    buffers.pull(&mut processor);
    assert!(buffers.out_left.iter().all(|&s| s == 0.0));

    handle.bypass(true)?;
    buffers.pull(&mut processor);
    assert_eq!(buffers.out_left, buffers.in_left);
    assert!(handle.info().bypassed);
    Ok(())
}

#[test]
fn bypass_passes_input_untouched_while_ready() -> Result<()> {
    let (mut handle, mut processor) = session(DeliveryMode::Queued, EffectFamily::Gain)?;
    handle.set_parameter("gain", -24.0)?;

    let mut buffers = Buffers::constant(0.5);
    buffers.pull(&mut processor);
    assert!(buffers.out_left[QUANTUM - 1] < 0.1);

    handle.bypass(true)?;
    buffers.pull(&mut processor);
    assert_eq!(buffers.out_left, buffers.in_left);
    assert_eq!(buffers.out_right, buffers.in_right);

    handle.bypass(false)?;
    buffers.pull(&mut processor);
    assert!(buffers.out_left[QUANTUM - 1] < 0.1);
    Ok(())
}

#[test]
fn oversized_host_buffers_are_processed_up_to_the_quantum() -> Result<()> {
    let (_handle, mut processor) = ready(DeliveryMode::Queued, EffectFamily::Gain)?;
    let input = vec![0.5; QUANTUM * 2];
    let mut out_left = vec![9.0; QUANTUM * 2];
    let mut out_right = vec![9.0; QUANTUM * 2];
    processor.process(&input, &input, &mut out_left, &mut out_right);

    assert!(out_left[..QUANTUM].iter().all(|&s| (s - 0.5).abs() < 1e-6));
    assert!(out_left[QUANTUM..].iter().all(|&s| s == 0.0));
    Ok(())
}

#[test]
fn destroy_restores_defaults_for_queued_delivery() -> Result<()> {
    let (mut handle, mut processor) = ready(DeliveryMode::Queued, EffectFamily::Compressor)?;
    handle.set_parameter("sustain", 0.9)?;
    Buffers::constant(0.0).pull(&mut processor);
    assert_eq!(processor.parameter(0), Some(0.9));

    handle.destroy()?;
    Buffers::constant(0.0).pull(&mut processor);
    assert_eq!(processor.parameter(0), Some(0.5));
    assert_eq!(processor.state(), BridgeState::Ready);
    Ok(())
}

#[test]
fn destroy_replays_the_shared_buffer() -> Result<()> {
    let (mut handle, mut processor) = ready(DeliveryMode::Shared, EffectFamily::Compressor)?;
    handle.set_parameter("sustain", 0.9)?;
    Buffers::constant(0.0).pull(&mut processor);

    handle.destroy()?;
    Buffers::constant(0.0).pull(&mut processor);
    assert_eq!(processor.parameter(0), Some(0.9));
    Ok(())
}

#[test]
fn parameter_buffer_can_be_swapped_in() -> Result<()> {
    let (mut handle, mut processor) = ready(DeliveryMode::Queued, EffectFamily::Phaser)?;
    handle.set_parameter_buffer(&["stages".to_string(), "mix".to_string()])?;
    Buffers::constant(0.0).pull(&mut processor);
    assert_eq!(handle.delivery(), DeliveryMode::Shared);

    handle.set_parameter("stages", 10.0)?;
    handle.set_parameter("mix", 0.2)?;
    Buffers::constant(0.0).pull(&mut processor);

    let descriptor = Descriptor::for_family(EffectFamily::Phaser);
    let stages = descriptor.index_of("stages").unwrap();
    let mix = descriptor.index_of("mix").unwrap();
    assert_eq!(processor.parameter(stages), Some(10.0));
    assert_eq!(processor.parameter(mix), Some(0.2));

    // Ids outside the buffer order have no slot.
    assert!(handle.set_parameter("rate", 1.0).is_err());
    assert_eq!(handle.collect_retired(), 1);
    Ok(())
}

#[test]
fn destroy_applies_only_the_updates_sent_before_it() -> Result<()> {
    let (mut handle, mut processor) = ready(DeliveryMode::Queued, EffectFamily::Compressor)?;
    handle.set_parameter("sustain", 0.9)?;
    handle.destroy()?;
    handle.set_parameter("sensitivity", 0.2)?;
    Buffers::constant(0.0).pull(&mut processor);

    assert_eq!(processor.parameter(0), Some(0.5));
    assert_eq!(processor.parameter(1), Some(0.2));
    assert_eq!(handle.values(), &[0.5, 0.2]);
    Ok(())
}

#[test]
fn buffer_swap_keeps_the_values_in_effect() -> Result<()> {
    let descriptor = Descriptor::for_family(EffectFamily::Phaser);
    let stages = descriptor.index_of("stages").unwrap();
    let rate = descriptor.index_of("rate").unwrap();
    let order = ["stages".to_string(), "mix".to_string()];

    let (mut handle, mut processor) = ready(DeliveryMode::Queued, EffectFamily::Phaser)?;
    handle.set_parameter("stages", 10.0)?;
    Buffers::constant(0.0).pull(&mut processor);
    assert_eq!(processor.parameter(stages), Some(10.0));

    // Still queued when the swap arrives.
    handle.set_parameter("rate", 7.0)?;
    handle.set_parameter_buffer(&order)?;
    Buffers::constant(0.0).pull(&mut processor);

    assert_eq!(processor.parameter(stages), Some(10.0));
    assert_eq!(processor.parameter(rate), Some(7.0));

    // A second swap seeds from the shared buffer's values.
    handle.set_parameter("stages", 6.0)?;
    handle.set_parameter_buffer(&order)?;
    Buffers::constant(0.0).pull(&mut processor);
    assert_eq!(processor.parameter(stages), Some(6.0));
    assert_eq!(processor.parameter(rate), Some(7.0));
    Ok(())
}

#[test]
fn info_follows_bypass_and_destroy() -> Result<()> {
    let (mut handle, mut processor) = ready(DeliveryMode::Queued, EffectFamily::Gain)?;
    let before = handle.info();

    handle.bypass(true)?;
    Buffers::constant(0.0).pull(&mut processor);
    let bypassed = handle.info();
    assert!(bypassed.bypassed);
    assert!(!before.bypassed);

    handle.destroy()?;
    Buffers::constant(0.0).pull(&mut processor);
    let info = handle.info();
    assert_eq!(info.state, BridgeState::Ready);
    assert_eq!(info.family, Some(EffectFamily::Gain));
    Ok(())
}

#[test]
fn reinit_retires_the_previous_module() -> Result<()> {
    let (mut handle, mut processor) = ready(DeliveryMode::Queued, EffectFamily::Gain)?;

    let bytes = ModuleImage::new(EffectFamily::Equalizer, QUANTUM).encode()?;
    handle.init(bytes, Descriptor::for_family(EffectFamily::Equalizer))?;
    Buffers::constant(0.0).pull(&mut processor);

    assert_eq!(handle.info().family, Some(EffectFamily::Equalizer));
    // Old module and its parameter channel.
    assert_eq!(handle.collect_retired(), 2);
    Ok(())
}

#[test]
fn audio_thread_ownership() -> Result<()> {
    let (mut handle, mut processor) = session(DeliveryMode::Shared, EffectFamily::Flanger)?;
    handle.set_parameter("mix", 0.0)?;

    let audio = std::thread::spawn(move || {
        let mut buffers = Buffers::constant(0.3);
        for _ in 0..100 {
            buffers.pull(&mut processor);
        }
        buffers.out_left
    });

    let out = audio.join().unwrap();
    assert!(out.iter().all(|&s| (s - 0.3).abs() < 1e-5));
    Ok(())
}
