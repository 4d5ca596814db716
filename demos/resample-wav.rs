//! A demo showcasing how to convert a WAV file to a new sample rate in fixed size blocks,
//! the way a real-time audio engine would render a sample.

use std::{path::PathBuf, str::FromStr, time::Instant};

use arg::{parse_args, Args};
use strum::VariantNames;

use stream_resampler::{Error, Quality, StreamResampler};

// -------------------------------------------------------------------------------------------------

#[cfg(all(debug_assertions, feature = "assert-allocs"))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

// -------------------------------------------------------------------------------------------------

const DEFAULT_LOG_LEVEL: log::Level = if cfg!(debug_assertions) {
    log::Level::Debug
} else {
    log::Level::Warn
};

const DEFAULT_OUTPUT_RATE: u32 = 48000;
const DEFAULT_BLOCK_FRAMES: usize = 512;

// -------------------------------------------------------------------------------------------------

/// Program arguments.
#[derive(Args, Debug, Default)]
struct Arguments {
    #[arg(short = "i", long = "input")]
    /// The WAV file to convert.
    input_path: Option<PathBuf>,
    #[arg(short = "o", long = "output")]
    /// Path of the converted WAV file.
    output_path: Option<PathBuf>,
    #[arg(short = "r", long = "rate")]
    /// Target sample rate. 48000 by default.
    rate: Option<u32>,
    #[arg(short = "q", long = "quality")]
    /// Resampling quality: \"best\", \"medium\", \"fastest\", \"zero-order-hold\" or \"linear\".
    quality: Option<String>,
    #[arg(short = "b", long = "block-size")]
    /// Number of frames rendered per process call. 512 by default.
    block_size: Option<usize>,
    #[arg(short = "l", long = "log-level")]
    /// Set logging level to \"debug\", \"info\", \"warn\" or \"error\".
    /// By default \"debug\" in dev builds and \"warn\" in release builds.
    log_level: Option<log::Level>,
}

// -------------------------------------------------------------------------------------------------

fn main() -> Result<(), Error> {
    // Parse arguments and init logger
    let args = parse_args::<Arguments>();

    simple_logger::SimpleLogger::new()
        .with_level(args.log_level.unwrap_or(DEFAULT_LOG_LEVEL).to_level_filter())
        .init()
        .map_err(|err| Error::ParameterError(err.to_string()))?;

    let input_path = args
        .input_path
        .ok_or_else(|| Error::ParameterError("missing --input path".to_owned()))?;
    let output_path = args
        .output_path
        .ok_or_else(|| Error::ParameterError("missing --output path".to_owned()))?;
    let output_rate = args.rate.unwrap_or(DEFAULT_OUTPUT_RATE);
    let quality = match args.quality {
        Some(name) => Quality::from_str(&name).map_err(|_| {
            Error::ParameterError(format!(
                "invalid quality '{name}', must be one of: {}",
                Quality::VARIANTS.join(", ")
            ))
        })?,
        None => Quality::default(),
    };
    let block_frames = args.block_size.unwrap_or(DEFAULT_BLOCK_FRAMES).max(1);

    // Read the whole file into an interleaved f32 buffer
    let mut reader = hound::WavReader::open(&input_path)?;
    let input_spec = reader.spec();
    let channel_count = input_spec.channels as usize;
    let input: Vec<f32> = match input_spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (input_spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };
    let input_frames = input.len() / channel_count;
    log::info!(
        "Converting {} frames from {} Hz to {} Hz with quality '{}'",
        input_frames,
        input_spec.sample_rate,
        output_rate,
        quality
    );

    // Convert in fixed size blocks
    let mut resampler = StreamResampler::with_specs(quality, channel_count)?;
    let ratio = output_rate as f64 / input_spec.sample_rate as f64;

    let output_spec = hound::WavSpec {
        channels: input_spec.channels,
        sample_rate: output_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&output_path, output_spec)?;

    let start_time = Instant::now();
    let mut block = vec![0.0; block_frames * channel_count];
    let mut input_pos = 0;
    let mut output_frames = 0;
    loop {
        let result = resampler.process(&input, input_pos, input_frames, &mut block, ratio);
        input_pos += result.frames_used;
        output_frames += result.frames_generated;
        for sample in &block[..result.frames_generated * channel_count] {
            writer.write_sample(*sample)?;
        }
        if result.frames_generated < block_frames {
            break;
        }
    }
    writer.finalize()?;

    log::info!(
        "Wrote {} frames to '{}' in {:.2} ms",
        output_frames,
        output_path.display(),
        start_time.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}
