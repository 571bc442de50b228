//! Continuous decoding over a stream of frames.
//!
//! The loop runs on a blocking thread, checks its control channel before each
//! frame and stops at the first detection. Whatever way it ends, the frame
//! source is released before the loop returns.

use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, ImageFormat};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use super::{config::DecodeConfig, decode::BarcodeError};
use crate::{
    api::traits::{BarcodeDecoder, FrameSource},
    core::task_manager::spawn_blocking_task,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamControl {
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Detected(String),
    Stopped,
    /// The source ran out of frames without a detection
    Exhausted,
}

struct ReleaseOnExit<'a> {
    source: &'a mut dyn FrameSource,
}

impl Drop for ReleaseOnExit<'_> {
    fn drop(&mut self) {
        if !self.source.is_released() {
            self.source.release();
        }
    }
}

pub fn scan_stream(
    source: &mut dyn FrameSource,
    decoder: &dyn BarcodeDecoder,
    config: &DecodeConfig,
    control: Option<&flume::Receiver<StreamControl>>,
    frame_interval: Duration,
) -> Result<StreamOutcome, BarcodeError> {
    let mut guard = ReleaseOnExit { source };
    let mut frames = 0u64;

    loop {
        if let Some(rx) = control {
            match rx.try_recv() {
                Ok(StreamControl::Stop) | Err(flume::TryRecvError::Disconnected) => {
                    log::info!("Barcode stream stopped after {frames} frames");
                    return Ok(StreamOutcome::Stopped);
                }
                Err(flume::TryRecvError::Empty) => {}
            }
        }

        let frame = match guard.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                log::info!("Frame source exhausted after {frames} frames");
                return Ok(StreamOutcome::Exhausted);
            }
            Err(err) => {
                log::warn!("Frame source failed: {err:#}");
                return Err(BarcodeError::Source {
                    message: format!("{err:#}"),
                });
            }
        };
        frames += 1;

        match decoder.decode(&frame, config) {
            Ok(Some(code)) if !code.trim().is_empty() => {
                let code = code.trim().to_string();
                log::info!("Barcode {code} detected in frame {frames}");
                return Ok(StreamOutcome::Detected(code));
            }
            Ok(_) => {}
            // most frames hold no barcode yet
            Err(err) => log::debug!("Frame {frames} not decoded: {err:#}"),
        }

        if !frame_interval.is_zero() {
            match control {
                Some(rx) => match rx.recv_timeout(frame_interval) {
                    Ok(StreamControl::Stop) | Err(flume::RecvTimeoutError::Disconnected) => {
                        log::info!("Barcode stream stopped after {frames} frames");
                        return Ok(StreamOutcome::Stopped);
                    }
                    Err(flume::RecvTimeoutError::Timeout) => {}
                },
                None => std::thread::sleep(frame_interval),
            }
        }
    }
}

/// Handle to a stream decode running on a blocking thread
pub struct StreamHandle {
    control: flume::Sender<StreamControl>,
    handle: tokio::task::JoinHandle<Result<StreamOutcome, BarcodeError>>,
}

impl StreamHandle {
    pub fn spawn(
        mut source: Box<dyn FrameSource>,
        decoder: Arc<dyn BarcodeDecoder>,
        config: DecodeConfig,
        frame_interval: Duration,
    ) -> Self {
        let (control_tx, control_rx) = flume::unbounded();
        let handle = spawn_blocking_task("barcode-stream", move || {
            scan_stream(
                source.as_mut(),
                decoder.as_ref(),
                &config,
                Some(&control_rx),
                frame_interval,
            )
        });
        Self {
            control: control_tx,
            handle,
        }
    }

    pub fn stop(&self) {
        let _ = self.control.send(StreamControl::Stop);
    }

    pub fn stopper(&self) -> flume::Sender<StreamControl> {
        self.control.clone()
    }

    pub async fn wait(self) -> Result<Result<StreamOutcome, BarcodeError>> {
        self.handle.await.context("Barcode stream task failed")
    }
}

/// Frames read from image files in a directory, in file-name order
pub struct DirectoryFrameSource {
    pending: Vec<PathBuf>,
    released: bool,
}

impl DirectoryFrameSource {
    pub fn open(dir: &Path) -> Result<Self> {
        let mut frames = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Cannot read frame directory {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && ImageFormat::from_path(&path).is_ok() {
                frames.push(path);
            }
        }
        frames.sort();
        // popped from the back
        frames.reverse();

        log::debug!("{} frames queued from {}", frames.len(), dir.display());
        Ok(Self {
            pending: frames,
            released: false,
        })
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl FrameSource for DirectoryFrameSource {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>> {
        if self.released {
            return Err(anyhow!("Frame source already released"));
        }
        match self.pending.pop() {
            Some(path) => image::open(&path)
                .map(Some)
                .with_context(|| format!("Cannot decode frame {}", path.display())),
            None => Ok(None),
        }
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.pending.clear();
        self.released = true;
        log::debug!("Frame source released");
    }

    fn is_released(&self) -> bool {
        self.released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedFrames {
        frames: Vec<Result<u8, &'static str>>,
        releases: Arc<AtomicUsize>,
        released: bool,
    }

    impl ScriptedFrames {
        fn new(frames: Vec<Result<u8, &'static str>>) -> (Self, Arc<AtomicUsize>) {
            let releases = Arc::new(AtomicUsize::new(0));
            let mut frames = frames;
            frames.reverse();
            (
                Self {
                    frames,
                    releases: releases.clone(),
                    released: false,
                },
                releases,
            )
        }
    }

    impl FrameSource for ScriptedFrames {
        fn next_frame(&mut self) -> Result<Option<DynamicImage>> {
            match self.frames.pop() {
                Some(Ok(marker)) => {
                    let mut image = image::GrayImage::new(2, 2);
                    image.put_pixel(0, 0, image::Luma([marker]));
                    Ok(Some(DynamicImage::ImageLuma8(image)))
                }
                Some(Err(msg)) => Err(anyhow!(msg)),
                None => Ok(None),
            }
        }

        fn release(&mut self) {
            self.released = true;
            self.releases.fetch_add(1, Ordering::SeqCst);
        }

        fn is_released(&self) -> bool {
            self.released
        }
    }

    /// Decodes frames whose first pixel equals `hit`
    struct PixelDecoder {
        hit: u8,
        seen: Mutex<usize>,
    }

    impl BarcodeDecoder for PixelDecoder {
        fn decode(&self, image: &DynamicImage, _config: &DecodeConfig) -> Result<Option<String>> {
            *self.seen.lock() += 1;
            let pixel = image.to_luma8().get_pixel(0, 0).0[0];
            Ok((pixel == self.hit).then(|| format!("code-{pixel}")))
        }
    }

    fn decoder(hit: u8) -> PixelDecoder {
        PixelDecoder {
            hit,
            seen: Mutex::new(0),
        }
    }

    #[test]
    fn test_stops_at_first_detection_and_releases() {
        let (mut source, releases) = ScriptedFrames::new(vec![Ok(1), Ok(2), Ok(7), Ok(7)]);
        let decoder = decoder(7);

        let outcome = scan_stream(
            &mut source,
            &decoder,
            &DecodeConfig::default(),
            None,
            Duration::ZERO,
        )
        .unwrap();

        assert_eq!(outcome, StreamOutcome::Detected("code-7".to_string()));
        assert_eq!(*decoder.seen.lock(), 3);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_source_error_releases() {
        let (mut source, releases) = ScriptedFrames::new(vec![Ok(1), Err("camera unplugged")]);
        let err = scan_stream(
            &mut source,
            &decoder(9),
            &DecodeConfig::default(),
            None,
            Duration::ZERO,
        )
        .unwrap_err();

        assert!(matches!(err, BarcodeError::Source { .. }));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_command_releases() {
        let (mut source, releases) = ScriptedFrames::new(vec![Ok(1), Ok(2), Ok(3)]);
        let (tx, rx) = flume::unbounded();
        tx.send(StreamControl::Stop).unwrap();

        let outcome = scan_stream(
            &mut source,
            &decoder(3),
            &DecodeConfig::default(),
            Some(&rx),
            Duration::ZERO,
        )
        .unwrap();

        assert_eq!(outcome, StreamOutcome::Stopped);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_exhaustion_releases() {
        let (mut source, releases) = ScriptedFrames::new(vec![Ok(1)]);
        let outcome = scan_stream(
            &mut source,
            &decoder(9),
            &DecodeConfig::default(),
            None,
            Duration::ZERO,
        )
        .unwrap();

        assert_eq!(outcome, StreamOutcome::Exhausted);
        assert!(source.is_released());
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_directory_source_reads_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for (name, value) in [("frame_002.png", 2u8), ("frame_001.png", 1u8)] {
            let image = image::GrayImage::from_pixel(2, 2, image::Luma([value]));
            image.save(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let mut source = DirectoryFrameSource::open(dir.path()).unwrap();
        assert_eq!(source.remaining(), 2);

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.to_luma8().get_pixel(0, 0).0[0], 1);

        source.release();
        source.release();
        assert!(source.is_released());
        assert!(source.next_frame().is_err());
    }

    #[tokio::test]
    async fn test_handle_stop_ends_stream() {
        let (source, releases) = ScriptedFrames::new((0..1000).map(|_| Ok(1)).collect());
        let handle = StreamHandle::spawn(
            Box::new(source),
            Arc::new(decoder(9)),
            DecodeConfig::default(),
            Duration::from_millis(5),
        );
        handle.stop();

        let outcome = handle.wait().await.unwrap().unwrap();
        assert_eq!(outcome, StreamOutcome::Stopped);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
