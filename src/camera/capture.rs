use std::path::Path;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageFormat};
use crate::common::{AttendanceError, Result};
use crate::service::FilePart;

pub const FRAME_FILE_NAME: &str = "face.jpg";

/// One image sample waiting to be uploaded. Lives in memory only.
#[derive(Clone)]
pub struct CaptureBuffer {
    file_name: String,
    mime: &'static str,
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

impl std::fmt::Debug for CaptureBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureBuffer")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("size", &format_args!("{}x{}", self.width, self.height))
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl CaptureBuffer {
    /// JPEG-encodes a camera frame at its own resolution.
    pub fn from_frame(frame: &DynamicImage, quality: u8) -> Result<Self> {
        let rgb = frame.to_rgb8();
        let (width, height) = rgb.dimensions();

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality)
            .encode(rgb.as_raw(), width, height, ColorType::Rgb8)?;

        Ok(Self {
            file_name: FRAME_FILE_NAME.to_string(),
            mime: "image/jpeg",
            width,
            height,
            bytes,
        })
    }

    /// Loads an image file picked by the operator. The file has to decode as
    /// an image; its MIME type comes from the detected format, not the name.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        if bytes.is_empty() {
            return Err(AttendanceError::Validation(format!("{} is empty", path.display())));
        }

        let format = image::guess_format(&bytes).map_err(|_| {
            AttendanceError::Validation(format!("{} is not a recognised image", path.display()))
        })?;
        let mime = mime_for(format).ok_or_else(|| {
            AttendanceError::Validation(format!("Unsupported image format: {:?}", format))
        })?;
        let decoded = image::load_from_memory_with_format(&bytes, format)?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        Ok(Self {
            file_name,
            mime,
            width: decoded.width(),
            height: decoded.height(),
            bytes,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime(&self) -> &str {
        self.mime
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn to_part(&self, field: &str) -> FilePart {
        FilePart {
            field: field.to_string(),
            file_name: self.file_name.clone(),
            mime: self.mime.to_string(),
            bytes: self.bytes.clone(),
        }
    }
}

fn mime_for(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Bmp => Some("image/bmp"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::Tiff => Some("image/tiff"),
        _ => None,
    }
}
