use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// A rendered QR image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QrImage {
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl QrImage {
    /// `data:<mime>;base64,<payload>`
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("cannot encode payload: {0}")]
    Encode(String),

    #[error("cannot write image: {0}")]
    Image(String),
}

/// Renders a URL into a scannable image.
pub trait QrRenderer: Send + Sync {
    fn render(&self, url: &str) -> Result<QrImage, QrError>;
}

/// Black-on-white PNG QR codes.
#[derive(Clone, Debug)]
pub struct PngQrRenderer {
    min_size: u32,
}

impl PngQrRenderer {
    pub const DEFAULT_MIN_SIZE: u32 = 200;

    pub fn new(min_size: u32) -> Self {
        Self { min_size }
    }
}

impl Default for PngQrRenderer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_SIZE)
    }
}

impl QrRenderer for PngQrRenderer {
    fn render(&self, url: &str) -> Result<QrImage, QrError> {
        let code = qrcode::QrCode::new(url.as_bytes()).map_err(|e| QrError::Encode(e.to_string()))?;
        let img = code
            .render::<image::Luma<u8>>()
            .min_dimensions(self.min_size, self.min_size)
            .build();

        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| QrError::Image(e.to_string()))?;

        Ok(QrImage {
            mime: "image/png",
            bytes,
        })
    }
}
