//! echoflux-live - run the effect engine against the default audio output.
//!
//! Generates a repeating synthetic pluck, feeds it through the signal path
//! and cycles through the processing modes every few seconds so each effect
//! can be heard in turn.
//!
//! Run with: cargo run --bin echoflux-live

use std::f32::consts::TAU;
use std::thread;
use std::time::Duration;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use echoflux::engine::message::ControlMessage;
use echoflux::engine::params::ProcessingMode;
use echoflux::fx::looper::LooperCommand;
use echoflux::{ProcessSpec, SignalPath, MAX_BLOCK_SIZE};

/// Seconds between pluck onsets.
const PLUCK_PERIOD: f32 = 1.0;
/// Seconds each mode stays active before the demo moves on.
const MODE_DWELL: u64 = 6;

/// Exponentially decaying sine, retriggered once per period.
struct Pluck {
    phase: f32,
    phase_inc: f32,
    envelope: f32,
    decay: f32,
    countdown: usize,
    period_samples: usize,
}

impl Pluck {
    fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: 220.0 * TAU / sample_rate,
            envelope: 0.0,
            decay: (-8.0 / sample_rate).exp(),
            countdown: 0,
            period_samples: (PLUCK_PERIOD * sample_rate) as usize,
        }
    }

    fn next_sample(&mut self) -> f32 {
        if self.countdown == 0 {
            self.envelope = 0.8;
            self.countdown = self.period_samples;
        }
        self.countdown -= 1;

        self.phase = (self.phase + self.phase_inc) % TAU;
        self.envelope *= self.decay;
        self.phase.sin() * self.envelope
    }
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;

    println!("=== echoflux ===");
    println!("Sample rate: {} Hz", sample_rate);
    println!("Channels: {}", channels);
    println!();

    let (mut tx, rx) = rtrb::RingBuffer::<ControlMessage>::new(64);

    let mut path = SignalPath::new();
    path.prepare(&ProcessSpec::new(sample_rate, MAX_BLOCK_SIZE, 2))
        .wrap_err("signal path rejected the stream configuration")?;
    path.set_control_receiver(rx);

    let mut pluck = Pluck::new(sample_rate);
    let mut left = vec![0.0f32; MAX_BLOCK_SIZE];
    let mut right = vec![0.0f32; MAX_BLOCK_SIZE];

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _| {
            let total_frames = data.len() / channels;
            let mut frames_written = 0;

            while frames_written < total_frames {
                let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);

                for i in 0..frames {
                    let sample = pluck.next_sample();
                    left[i] = sample;
                    right[i] = sample;
                }

                path.process_block(&mut [&mut left[..frames], &mut right[..frames]]);

                for i in 0..frames {
                    let frame = &mut data
                        [(frames_written + i) * channels..(frames_written + i + 1) * channels];
                    frame[0] = left[i];
                    if channels > 1 {
                        frame[1] = right[i];
                    }
                    for extra in frame.iter_mut().skip(2) {
                        *extra = 0.0;
                    }
                }

                frames_written += frames;
            }
        },
        |err| tracing::error!(%err, "audio stream error"),
        None,
    )?;
    stream.play().wrap_err("failed to start audio stream")?;

    let modes = [
        ProcessingMode::DelayOnly,
        ProcessingMode::ReverbOnly,
        ProcessingMode::GranularOnly,
        ProcessingMode::LooperOnly,
        ProcessingMode::Serial,
    ];

    println!("Cycling modes every {MODE_DWELL}s. Press Ctrl+C to stop.");
    loop {
        for mode in modes {
            println!("  mode: {mode:?}");
            tx.push(ControlMessage::SetMode(mode))
                .map_err(|_| eyre!("control ring full"))?;

            if mode == ProcessingMode::LooperOnly {
                // Record half the dwell, then play the captured phrase back.
                tx.push(ControlMessage::Looper(LooperCommand::StartRecording))
                    .map_err(|_| eyre!("control ring full"))?;
                thread::sleep(Duration::from_secs(MODE_DWELL / 2));
                tx.push(ControlMessage::Looper(LooperCommand::StartPlayback))
                    .map_err(|_| eyre!("control ring full"))?;
                thread::sleep(Duration::from_secs(MODE_DWELL - MODE_DWELL / 2));
                tx.push(ControlMessage::Looper(LooperCommand::Clear))
                    .map_err(|_| eyre!("control ring full"))?;
            } else {
                thread::sleep(Duration::from_secs(MODE_DWELL));
            }
        }
    }
}
