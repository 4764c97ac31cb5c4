//! In-process media backend built on the FFmpeg libraries.
//!
//! Available with the `native` feature. [`NativeBackend`] opens the container
//! with `ffmpeg-next`, seeks to the nearest keyframe before the requested
//! offset and decodes forward to the first frame at or after it. Library
//! calls cannot be killed, so each one runs under
//! [`with_deadline`](crate::with_deadline) and is abandoned on timeout.

use std::path::Path;
use std::time::Duration;

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    format::Pixel,
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    util::log::Level,
};
use image::{DynamicImage, RgbImage};
use log::debug;

use crate::backend::{MediaBackend, with_deadline};
use crate::error::BackendError;

/// Media backend that decodes through the linked FFmpeg libraries.
#[derive(Debug, Clone)]
pub struct NativeBackend {
    probe_timeout: Duration,
    decode_timeout: Duration,
}

impl NativeBackend {
    /// Initialise FFmpeg and silence its console output below errors.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Decode`] if the libraries fail to initialise.
    pub fn new() -> Result<Self, BackendError> {
        ffmpeg_next::init()?;
        ffmpeg_next::util::log::set_level(Level::Error);
        Ok(Self {
            probe_timeout: Duration::from_secs(30),
            decode_timeout: Duration::from_secs(60),
        })
    }

    /// Abandon a duration probe after `timeout`.
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Abandon a single-frame decode after `timeout`.
    #[must_use]
    pub fn with_decode_timeout(mut self, timeout: Duration) -> Self {
        self.decode_timeout = timeout;
        self
    }
}

impl MediaBackend for NativeBackend {
    fn probe(&self, path: &Path) -> Result<Duration, BackendError> {
        let path = path.to_path_buf();
        with_deadline("probe", self.probe_timeout, move || container_duration(&path))
    }

    fn decode(&self, path: &Path, timestamp: Duration) -> Result<DynamicImage, BackendError> {
        let path = path.to_path_buf();
        with_deadline("decode", self.decode_timeout, move || {
            decode_frame_at(&path, timestamp)
        })
    }
}

fn container_duration(path: &Path) -> Result<Duration, BackendError> {
    let input = ffmpeg_next::format::input(path)?;
    // Container duration is expressed in AV_TIME_BASE (microseconds).
    let microseconds = input.duration();
    if microseconds <= 0 {
        return Err(BackendError::InvalidOutput(format!(
            "container reports no duration ({microseconds})"
        )));
    }
    Ok(Duration::from_micros(microseconds as u64))
}

fn decode_frame_at(path: &Path, timestamp: Duration) -> Result<DynamicImage, BackendError> {
    let mut input = ffmpeg_next::format::input(path)?;

    let (stream_index, time_base, parameters) = {
        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or_else(|| BackendError::Decode("no video stream".to_string()))?;
        (stream.index(), stream.time_base(), stream.parameters())
    };

    let mut decoder = CodecContext::from_parameters(parameters)?.decoder().video()?;
    let (width, height) = (decoder.width(), decoder.height());
    let mut scaler = ScalingContext::get(
        decoder.format(),
        width,
        height,
        Pixel::RGB24,
        width,
        height,
        ScalingFlags::BILINEAR,
    )?;

    // Container-level seek (stream index -1) takes AV_TIME_BASE units.
    let seek_target = timestamp.as_micros() as i64;
    input.seek(seek_target, ..seek_target)?;
    let target_pts = to_stream_timestamp(timestamp, time_base);

    let mut decoded_frame = VideoFrame::empty();
    let mut rgb_frame = VideoFrame::empty();

    for (stream, packet) in input.packets() {
        if stream.index() != stream_index {
            continue;
        }
        decoder.send_packet(&packet)?;
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            if decoded_frame.pts().unwrap_or(0) >= target_pts {
                scaler.run(&decoded_frame, &mut rgb_frame)?;
                return to_image(&rgb_frame, width, height);
            }
        }
    }

    // Flush the decoder.
    decoder.send_eof()?;
    while decoder.receive_frame(&mut decoded_frame).is_ok() {
        if decoded_frame.pts().unwrap_or(0) >= target_pts {
            scaler.run(&decoded_frame, &mut rgb_frame)?;
            return to_image(&rgb_frame, width, height);
        }
    }

    debug!("No frame at or after {timestamp:?} in {}", path.display());
    Err(BackendError::Decode(format!(
        "no frame at or after {timestamp:?}"
    )))
}

fn to_stream_timestamp(timestamp: Duration, time_base: Rational) -> i64 {
    let numerator = time_base.numerator() as f64;
    let denominator = time_base.denominator() as f64;
    if numerator == 0.0 {
        return 0;
    }
    (timestamp.as_secs_f64() * denominator / numerator) as i64
}

/// Copy a packed RGB24 frame into an image, skipping any row padding.
fn to_image(rgb_frame: &VideoFrame, width: u32, height: u32) -> Result<DynamicImage, BackendError> {
    let stride = rgb_frame.stride(0);
    let row_bytes = width as usize * 3;
    let data = rgb_frame.data(0);

    let buffer = if stride == row_bytes {
        data[..row_bytes * height as usize].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            buffer.extend_from_slice(&data[start..start + row_bytes]);
        }
        buffer
    };

    let image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        BackendError::Decode("decoded frame does not match its dimensions".to_string())
    })?;
    Ok(DynamicImage::ImageRgb8(image))
}
