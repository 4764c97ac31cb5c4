//! Shared helpers for integration tests: an in-memory media backend and
//! synthetic frame generators.

#![allow(dead_code)]

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use framesift::{BackendError, MediaBackend};
use image::{DynamicImage, GrayImage, Luma};

pub const FRAME_WIDTH: u32 = 144;
pub const FRAME_HEIGHT: u32 = 128;

type SceneFn = dyn Fn(Duration) -> DynamicImage + Send + Sync;

/// A backend that synthesises frames from a function of the timestamp.
pub struct SyntheticBackend {
    duration: Result<Duration, String>,
    scene: Box<SceneFn>,
    failing: HashSet<u128>,
    fail_all: bool,
    decode_calls: AtomicUsize,
    on_decode: Mutex<Option<Box<dyn FnMut(usize) + Send>>>,
}

impl SyntheticBackend {
    pub fn new<F>(duration: Duration, scene: F) -> Self
    where
        F: Fn(Duration) -> DynamicImage + Send + Sync + 'static,
    {
        Self {
            duration: Ok(duration),
            scene: Box::new(scene),
            failing: HashSet::new(),
            fail_all: false,
            decode_calls: AtomicUsize::new(0),
            on_decode: Mutex::new(None),
        }
    }

    /// A backend whose probe always fails.
    pub fn unprobeable(reason: &str) -> Self {
        let mut backend = Self::new(Duration::from_secs(1), |_| textured_scene(0, 20));
        backend.duration = Err(reason.to_string());
        backend
    }

    /// Make decoding fail at these timestamps.
    pub fn failing_at(mut self, timestamps: &[Duration]) -> Self {
        self.failing = timestamps.iter().map(Duration::as_millis).collect();
        self
    }

    /// Make every decode fail.
    pub fn failing_everywhere(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Run `hook` with the running call count on every decode.
    pub fn with_hook<H>(self, hook: H) -> Self
    where
        H: FnMut(usize) + Send + 'static,
    {
        *self.on_decode.lock().unwrap() = Some(Box::new(hook));
        self
    }

    pub fn decode_calls(&self) -> usize {
        self.decode_calls.load(Ordering::SeqCst)
    }
}

impl MediaBackend for SyntheticBackend {
    fn probe(&self, _path: &Path) -> Result<Duration, BackendError> {
        self.duration
            .clone()
            .map_err(BackendError::InvalidOutput)
    }

    fn decode(&self, _path: &Path, timestamp: Duration) -> Result<DynamicImage, BackendError> {
        let calls = self.decode_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(hook) = self.on_decode.lock().unwrap().as_mut() {
            hook(calls);
        }
        if self.fail_all || self.failing.contains(&timestamp.as_millis()) {
            return Err(BackendError::Decode(format!("synthetic failure at {timestamp:?}")));
        }
        Ok((self.scene)(timestamp))
    }
}

/// Create an empty stand-in video file.
pub fn video_file(directory: &Path, name: &str) -> PathBuf {
    let path = directory.join(name);
    fs::write(&path, b"not really a video").unwrap();
    path
}

/// Names of all entries in a directory, sorted.
pub fn entries(directory: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(directory)
        .map(|entries| {
            entries
                .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

fn xorshift(state: &mut u64) -> u64 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    *state
}

/// A bright frame made of a random 9×8 block layout unique to `scene`,
/// overlaid with a one-pixel checker of the given amplitude for sharpness.
///
/// Different scene ids produce fingerprints far apart; the same id always
/// produces the same image.
pub fn textured_scene(scene: u64, detail: u8) -> DynamicImage {
    let mut state = scene.wrapping_mul(0x9e37_79b9_7f4a_7c15) | 1;
    let blocks: Vec<u8> = (0..72).map(|_| 50 + (xorshift(&mut state) % 150) as u8).collect();
    let block_width = FRAME_WIDTH / 9;
    let block_height = FRAME_HEIGHT / 8;

    DynamicImage::ImageLuma8(GrayImage::from_fn(FRAME_WIDTH, FRAME_HEIGHT, |x, y| {
        let base = blocks[((y / block_height) * 9 + x / block_width) as usize];
        let value = if (x + y) % 2 == 0 {
            base.saturating_add(detail)
        } else {
            base.saturating_sub(detail)
        };
        Luma([value])
    }))
}

/// A nearly black frame with some fine texture.
pub fn dark_frame() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(FRAME_WIDTH, FRAME_HEIGHT, |x, y| {
        Luma([if (x + y) % 2 == 0 { 2 } else { 14 }])
    }))
}
