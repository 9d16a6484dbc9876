//! V4L2 camera frame source.
//!
//! Captures frames from a local V4L2 device (e.g., /dev/video0) in-memory and
//! converts them to RGB. This is the deployment counterpart of
//! `DirectorySource`.
//!
//! The mmap stream borrows the device and cannot move between threads, so the
//! device lives on a dedicated capture thread. `next_frame` sends a request
//! and blocks until that thread answers with one frame.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use ouroboros::self_referencing;

use super::normalize::{normalize_to_rgb, PixelFormat};
use super::FrameSource;

/// Configuration for a V4L2 source.
#[derive(Clone, Debug)]
pub struct V4l2Config {
    /// Device path (e.g., "/dev/video0")
    pub device: String,
    /// Requested frame rate. Zero leaves the driver default.
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for V4l2Config {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

pub struct V4l2Source {
    config: V4l2Config,
    link: Option<CaptureLink>,
    frame_count: u64,
}

struct CaptureLink {
    requests: Sender<()>,
    frames: Receiver<Result<RgbImage>>,
    worker: JoinHandle<()>,
}

impl V4l2Source {
    pub fn new(config: V4l2Config) -> Result<Self> {
        Ok(Self {
            config,
            link: None,
            frame_count: 0,
        })
    }

    /// Start the capture thread and wait until the device is streaming.
    pub fn connect(&mut self) -> Result<()> {
        if self.link.is_some() {
            return Ok(());
        }
        let (ready_tx, ready_rx) = mpsc::channel();
        let (request_tx, request_rx) = mpsc::channel::<()>();
        let (frame_tx, frame_rx) = mpsc::channel();
        let config = self.config.clone();

        let worker = std::thread::Builder::new()
            .name("v4l2-capture".to_string())
            .spawn(move || {
                let mut camera = match Camera::open(&config) {
                    Ok(camera) => {
                        let _ = ready_tx.send(Ok(()));
                        camera
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                while request_rx.recv().is_ok() {
                    if frame_tx.send(camera.capture()).is_err() {
                        break;
                    }
                }
                log::debug!("V4l2Source: capture thread for {} exiting", config.device);
            })
            .context("spawn v4l2 capture thread")?;

        ready_rx
            .recv()
            .map_err(|_| anyhow!("v4l2 capture thread exited during setup"))??;
        self.link = Some(CaptureLink {
            requests: request_tx,
            frames: frame_rx,
            worker,
        });
        Ok(())
    }

    pub fn frames_captured(&self) -> u64 {
        self.frame_count
    }
}

impl FrameSource for V4l2Source {
    fn describe(&self) -> String {
        format!("camera {}", self.config.device)
    }

    fn next_frame(&mut self) -> Result<RgbImage> {
        let link = self.link.as_ref().context("v4l2 device not connected")?;
        link.requests
            .send(())
            .map_err(|_| anyhow!("v4l2 capture thread for {} is gone", self.config.device))?;
        let frame = link
            .frames
            .recv()
            .map_err(|_| anyhow!("v4l2 capture thread for {} is gone", self.config.device))??;
        self.frame_count += 1;
        Ok(frame)
    }
}

impl Drop for V4l2Source {
    fn drop(&mut self) {
        if let Some(link) = self.link.take() {
            // Closing the request channel ends the capture loop.
            drop(link.requests);
            if link.worker.join().is_err() {
                log::error!("V4l2Source: capture thread for {} panicked", self.config.device);
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Capture-thread side
// ----------------------------------------------------------------------------

#[self_referencing]
struct CameraStream {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

struct Camera {
    stream: CameraStream,
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
}

impl Camera {
    fn open(config: &V4l2Config) -> Result<Self> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&config.device)
            .with_context(|| format!("open v4l2 device {}", config.device))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = config.width;
        format.height = config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "V4l2Source: failed to set format on {}: {}",
                    config.device,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        let pixel_format = match &format.fourcc.repr {
            b"RGB3" => PixelFormat::Rgb24,
            b"NV12" => PixelFormat::Nv12,
            other => {
                return Err(anyhow!(
                    "v4l2 device {} negotiated unsupported pixel format {}",
                    config.device,
                    String::from_utf8_lossy(other)
                ))
            }
        };

        if config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "V4l2Source: failed to set fps on {}: {}",
                    config.device,
                    err
                );
            }
        }

        let stream = CameraStreamTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;

        log::info!(
            "V4l2Source: connected to {} ({}x{}, {:?})",
            config.device,
            format.width,
            format.height,
            pixel_format
        );
        Ok(Self {
            stream,
            width: format.width,
            height: format.height,
            pixel_format,
        })
    }

    fn capture(&mut self) -> Result<RgbImage> {
        use v4l::io::traits::CaptureStream;

        let pixels = self
            .stream
            .with_mut(|fields| fields.stream.next().map(|(buf, _meta)| buf.to_vec()))
            .map_err(|err| anyhow::Error::new(err).context("capture v4l2 frame"))?;
        let rgb = normalize_to_rgb(&pixels, self.width, self.height, self.pixel_format)?;
        RgbImage::from_raw(self.width, self.height, rgb)
            .ok_or_else(|| anyhow!("v4l2 frame does not fill {}x{}", self.width, self.height))
    }
}
