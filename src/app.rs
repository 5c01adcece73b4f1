use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, Stream, StreamConfig, SupportedBufferSize, SupportedStreamConfigRange};
use log::{error, info, warn};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use crate::config::Settings;
use crate::core::instrument::InstrumentBank;
use crate::core::synth::Synth;
use crate::error::SynthError;
use crate::input;
use crate::messaging::MessageBus;

/// Output is mono.
pub const CHANNELS: u16 = 1;

/// Picks a device configuration delivering exactly mono i16 at the configured
/// rate. There is no fallback: anything else is `UnsupportedFormat`.
pub fn negotiate(
    ranges: impl IntoIterator<Item = SupportedStreamConfigRange>,
    settings: &Settings,
) -> Result<StreamConfig, SynthError> {
    let rate = SampleRate(settings.sample_rate);
    let range = ranges
        .into_iter()
        .find(|r| {
            r.channels() == CHANNELS
                && r.sample_format() == SampleFormat::I16
                && r.min_sample_rate() <= rate
                && rate <= r.max_sample_rate()
        })
        .ok_or(SynthError::UnsupportedFormat {
            channels: CHANNELS,
            sample_rate: settings.sample_rate,
        })?;

    let buffer_size = match *range.buffer_size() {
        SupportedBufferSize::Range { min, max } if (min..=max).contains(&settings.buffer_size) => {
            BufferSize::Fixed(settings.buffer_size)
        },
        _ => {
            warn!("device cannot use {} frame buffers, using its default", settings.buffer_size);
            BufferSize::Default
        },
    };

    Ok(StreamConfig {
        channels: CHANNELS,
        sample_rate: rate,
        buffer_size,
    })
}

// Main app state
pub struct SynthApp {
    synth: Arc<Mutex<Synth>>,
    message_bus: MessageBus,
    _stream: Stream,
    poll_interval: Duration,
}

impl SynthApp {
    pub fn new(settings: &Settings) -> Result<Self> {
        settings.validate()?;

        let host = cpal::default_host();
        info!("Using audio host: {}", host.id().name());

        let device = host.default_output_device().ok_or(SynthError::NoOutputDevice)?;
        info!("Using output device: {}", device.name().unwrap_or_else(|_| "<unnamed>".to_string()));

        let supported = device.supported_output_configs().map_err(SynthError::from)?;
        let config = negotiate(supported, settings)?;
        info!("Stream config: {:?}", config);

        let synth = Arc::new(Mutex::new(Synth::from_settings(settings)?));
        let bank = InstrumentBank::with_patches(settings.patches.iter().cloned());
        info!("Instruments: {:?}", bank);
        let message_bus = MessageBus::new(Arc::clone(&synth), bank, &settings.instrument)?;

        let stream = create_stream(&device, &config, Arc::clone(&synth))?;
        stream.play().map_err(SynthError::from)?;
        info!("Audio stream started successfully");

        Ok(SynthApp {
            synth,
            message_bus,
            _stream: stream,
            poll_interval: Duration::from_secs_f64(1.0 / settings.poll_rate_hz as f64),
        })
    }

    /// Control loop: applies note events and compacts voices once per tick
    /// until asked to quit.
    pub fn run(mut self) -> Result<()> {
        input::spawn_stdin_reader(self.message_bus.sender())
            .context("Failed to start input thread")?;
        info!("Keys z s x c f v g b n j m k , play A3..A4: +key press, -key release, :name instrument, q quit");

        while self.message_bus.poll() {
            thread::sleep(self.poll_interval);
        }

        if let Ok(synth) = self.synth.lock() {
            info!("Stopping after {:.1}s of audio", synth.now());
        }
        Ok(())
    }
}

fn create_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    synth: Arc<Mutex<Synth>>,
) -> Result<Stream, SynthError> {
    let err_fn = |err| error!("an error occurred on the audio stream: {}", err);

    let stream = device.build_output_stream(
        config,
        move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
            // held for the whole buffer; the control side waits
            match synth.lock() {
                Ok(mut guard) => guard.render_buffer(data),
                Err(_) => data.fill(0),
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
