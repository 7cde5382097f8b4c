use crate::camera::{CameraDevice, FrameSource};
use crate::common::config::CameraConfig;
use crate::common::{AttendanceError, Result};
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Rgb, RgbImage};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};
use std::fs;

/// Video4Linux capture device, opened on demand.
pub struct V4lCamera {
    config: CameraConfig,
}

impl V4lCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self { config }
    }

    /// Index and card name of every /dev/video* node that reports video
    /// capture.
    pub fn list_devices() -> Result<Vec<(u32, String)>> {
        let mut cameras = Vec::new();

        for entry in fs::read_dir("/dev")? {
            let entry = entry?;
            let index = entry.file_name()
                .to_str()
                .and_then(|name| name.strip_prefix("video"))
                .and_then(|index| index.parse::<u32>().ok());

            if let Some(index) = index {
                if let Ok(device) = Device::new(index as usize) {
                    if let Ok(caps) = device.query_caps() {
                        if caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
                            cameras.push((index, caps.card.clone()));
                        }
                    }
                }
            }
        }

        cameras.sort_by_key(|c| c.0);
        Ok(cameras)
    }
}

impl CameraDevice for V4lCamera {
    fn open(&self) -> Result<Box<dyn FrameSource>> {
        Ok(Box::new(V4lSource::open(&self.config)?))
    }

    fn describe(&self) -> String {
        format!("/dev/video{}", self.config.device_index)
    }
}

pub struct V4lSource {
    device: Device,
    format: v4l::Format,
    warmup_frames: u32,
    warmup_delay_ms: u64,
}

impl V4lSource {
    fn open(config: &CameraConfig) -> Result<Self> {
        let index = config.device_index;
        tracing::debug!("Opening camera device {}", index);

        let device = Device::new(index as usize)
            .map_err(|e| AttendanceError::Camera(format!("Failed to open camera {}: {}", index, e)))?;

        let caps = device.query_caps()
            .map_err(|e| AttendanceError::Camera(format!("Failed to query capabilities: {}", e)))?;
        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            tracing::warn!("Device {} may not support standard video capture", index);
        }

        let mut fmt = device.format()
            .map_err(|e| AttendanceError::Camera(format!("Failed to get format: {}", e)))?;
        fmt.width = config.width;
        fmt.height = config.height;
        fmt.fourcc = FourCC::new(b"MJPG");

        // Drivers may refuse the request; whatever they settle on is the
        // native resolution we capture at.
        if let Err(e) = device.set_format(&fmt) {
            tracing::warn!("Could not set {}x{} MJPG: {}. Using device defaults.", config.width, config.height, e);
        }

        let format = device.format()
            .map_err(|e| AttendanceError::Camera(format!("Failed to get final format: {}", e)))?;
        tracing::debug!(
            "Camera format: {}x{} {}",
            format.width, format.height, String::from_utf8_lossy(&format.fourcc.repr)
        );

        Ok(Self {
            device,
            format,
            warmup_frames: config.warmup_frames,
            warmup_delay_ms: config.warmup_delay_ms,
        })
    }
}

impl FrameSource for V4lSource {
    fn resolution(&self) -> (u32, u32) {
        (self.format.width, self.format.height)
    }

    fn grab_frame(&mut self) -> Result<DynamicImage> {
        let (width, height, fourcc) = (self.format.width, self.format.height, self.format.fourcc.repr);

        let mut stream = v4l::io::mmap::Stream::with_buffers(&mut self.device, Type::VideoCapture, 4)
            .map_err(|e| AttendanceError::Camera(format!("Failed to create stream: {}", e)))?;

        // Auto exposure settles over the first few frames
        for _ in 0..self.warmup_frames {
            stream.next()
                .map_err(|e| AttendanceError::Camera(format!("Failed to capture warmup frame: {}", e)))?;
            std::thread::sleep(std::time::Duration::from_millis(self.warmup_delay_ms));
        }

        let (buf, meta) = stream.next()
            .map_err(|e| AttendanceError::Camera(format!("Failed to capture: {}", e)))?;
        let used = (meta.bytesused as usize).min(buf.len());
        let data = if used > 0 { &buf[..used] } else { buf };

        match &fourcc {
            b"MJPG" => Ok(image::load_from_memory_with_format(data, ImageFormat::Jpeg)?),
            b"YUYV" => yuyv_to_image(data, width, height),
            b"GREY" => grey_to_image(data, width, height),
            other => Err(AttendanceError::Camera(format!(
                "Unsupported pixel format {}", String::from_utf8_lossy(other)
            ))),
        }
    }
}

fn grey_to_image(data: &[u8], width: u32, height: u32) -> Result<DynamicImage> {
    let needed = (width * height) as usize;
    let pixels = data.get(..needed)
        .ok_or_else(|| AttendanceError::Camera("Short grayscale frame".into()))?;
    let img_buffer = ImageBuffer::<Luma<u8>, _>::from_raw(width, height, pixels.to_vec())
        .ok_or_else(|| AttendanceError::Camera("Failed to create grayscale image buffer".into()))?;

    Ok(DynamicImage::ImageLuma8(img_buffer))
}

fn yuyv_to_image(data: &[u8], width: u32, height: u32) -> Result<DynamicImage> {
    let needed = (width * height * 2) as usize;
    if data.len() < needed {
        return Err(AttendanceError::Camera("Short YUYV frame".into()));
    }

    let mut img = RgbImage::new(width, height);
    for (i, chunk) in data[..needed].chunks_exact(4).enumerate() {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        let pixel = (i * 2) as u32;
        let (x, y) = (pixel % width, pixel / width);
        img.put_pixel(x, y, yuv_to_rgb(y0, u, v));
        if x + 1 < width {
            img.put_pixel(x + 1, y, yuv_to_rgb(y1, u, v));
        }
    }

    Ok(DynamicImage::ImageRgb8(img))
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> Rgb<u8> {
    let c = y as f32 - 16.0;
    let d = u as f32 - 128.0;
    let e = v as f32 - 128.0;
    let clamp = |x: f32| x.round().clamp(0.0, 255.0) as u8;

    Rgb([
        clamp(1.164 * c + 1.596 * e),
        clamp(1.164 * c - 0.392 * d - 0.813 * e),
        clamp(1.164 * c + 2.017 * d),
    ])
}
