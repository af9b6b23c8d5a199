//! Label encoding
//!
//! Turns a payload into two PNG images: a QR matrix code and a Code 128
//! linear barcode. Rendering is a pure function of the payload and the
//! encoder settings.

use std::io::Cursor;

use barcoders::sym::code128::Code128;
use image::{DynamicImage, GrayImage, ImageFormat};
use qrcode::types::{Color, QrError};
use qrcode::{EcLevel, QrCode, Version};
use serde::Serialize;

use crate::error::{Symbology, WeighingError, WeighingResult};

/// Byte-mode capacity at error correction level M, versions 1 through 10
const MATRIX_BYTE_CAPACITY: [usize; 10] = [14, 26, 42, 62, 84, 106, 122, 152, 180, 213];

/// Largest QR version the capacity table covers
pub const MATRIX_VERSION_LIMIT: i16 = MATRIX_BYTE_CAPACITY.len() as i16;

/// barcoders selects Code 128 character set B with this leading character
const CODE128_SET_B: char = 'Ɓ';

const DARK: u8 = 0;
const LIGHT: u8 = 255;

/// Physical label constraints and rendering scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EncoderSettings {
    /// Largest QR version that fits the label's matrix region
    pub matrix_max_version: i16,
    pub module_px: u32,
    /// Quiet zone around the QR symbol, in modules
    pub matrix_quiet_modules: u32,
    /// Longest payload that fits the label's barcode region
    pub linear_max_chars: usize,
    pub bar_px: u32,
    pub bar_height_px: u32,
    /// Quiet zone on each side of the barcode, in modules
    pub linear_quiet_modules: u32,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            matrix_max_version: 6,
            module_px: 4,
            matrix_quiet_modules: 4,
            linear_max_chars: 24,
            bar_px: 2,
            bar_height_px: 60,
            linear_quiet_modules: 10,
        }
    }
}

/// The two images for one payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedLabel {
    pub matrix_png: Vec<u8>,
    pub linear_png: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct LabelEncoder {
    settings: EncoderSettings,
}

impl LabelEncoder {
    pub fn new(settings: EncoderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// Byte capacity of the matrix region
    pub fn matrix_capacity(&self) -> usize {
        capacity_for_version(self.settings.matrix_max_version)
    }

    /// Encode `payload` as both a QR code and a Code 128 barcode
    pub fn encode(&self, payload: &str) -> WeighingResult<EncodedLabel> {
        if payload.is_empty() {
            return Err(WeighingError::UnencodablePayload {
                symbology: Symbology::Linear,
                reason: "payload is empty".to_string(),
            });
        }
        Ok(EncodedLabel {
            matrix_png: self.encode_matrix(payload)?,
            linear_png: self.encode_linear(payload)?,
        })
    }

    /// QR code at error correction level M, rendered to PNG
    pub fn encode_matrix(&self, payload: &str) -> WeighingResult<Vec<u8>> {
        let too_long = || WeighingError::PayloadTooLong {
            symbology: Symbology::Matrix,
            length: payload.len(),
            capacity: self.matrix_capacity(),
        };

        let code = match QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M) {
            Ok(code) => code,
            Err(QrError::DataTooLong) => return Err(too_long()),
            Err(e) => {
                return Err(WeighingError::UnencodablePayload {
                    symbology: Symbology::Matrix,
                    reason: e.to_string(),
                })
            }
        };
        match code.version() {
            Version::Normal(v) if v <= self.settings.matrix_max_version => {}
            _ => return Err(too_long()),
        }

        let image = render_matrix(
            &code.to_colors(),
            code.width() as u32,
            self.settings.module_px,
            self.settings.matrix_quiet_modules,
        );
        write_png(image, Symbology::Matrix)
    }

    /// Code 128 (set B) barcode rendered to PNG
    pub fn encode_linear(&self, payload: &str) -> WeighingResult<Vec<u8>> {
        if let Some(c) = payload.chars().find(|c| !(' '..='~').contains(c)) {
            return Err(WeighingError::UnencodablePayload {
                symbology: Symbology::Linear,
                reason: format!("character {:?} is outside printable ASCII", c),
            });
        }
        if payload.len() > self.settings.linear_max_chars {
            return Err(WeighingError::PayloadTooLong {
                symbology: Symbology::Linear,
                length: payload.len(),
                capacity: self.settings.linear_max_chars,
            });
        }

        let modules = Code128::new(format!("{}{}", CODE128_SET_B, payload))
            .map(|barcode| barcode.encode())
            .map_err(|e| WeighingError::UnencodablePayload {
                symbology: Symbology::Linear,
                reason: format!("{:?}", e),
            })?;

        let image = render_bars(
            &modules,
            self.settings.bar_px,
            self.settings.bar_height_px,
            self.settings.linear_quiet_modules,
        );
        write_png(image, Symbology::Linear)
    }
}

/// Byte capacity for a QR version; versions past the table report the last entry
pub fn capacity_for_version(version: i16) -> usize {
    let index = version.clamp(1, MATRIX_VERSION_LIMIT) as usize - 1;
    MATRIX_BYTE_CAPACITY[index]
}

fn render_matrix(colors: &[Color], width: u32, module_px: u32, quiet: u32) -> GrayImage {
    let side = (width + 2 * quiet) * module_px;
    GrayImage::from_fn(side, side, |x, y| {
        let (mx, my) = (x / module_px, y / module_px);
        let inside = (quiet..quiet + width).contains(&mx) && (quiet..quiet + width).contains(&my);
        let dark = inside && colors[((my - quiet) * width + (mx - quiet)) as usize] == Color::Dark;
        image::Luma([if dark { DARK } else { LIGHT }])
    })
}

fn render_bars(modules: &[u8], bar_px: u32, height: u32, quiet: u32) -> GrayImage {
    let count = modules.len() as u32;
    let width = (count + 2 * quiet) * bar_px;
    GrayImage::from_fn(width, height, |x, _| {
        let m = x / bar_px;
        let dark = (quiet..quiet + count).contains(&m) && modules[(m - quiet) as usize] == 1;
        image::Luma([if dark { DARK } else { LIGHT }])
    })
}

fn write_png(image: GrayImage, symbology: Symbology) -> WeighingResult<Vec<u8>> {
    let mut png_bytes = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| WeighingError::UnencodablePayload {
            symbology,
            reason: e.to_string(),
        })?;
    Ok(png_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODE: &str = "L261019-00000042";

    fn decode(png: &[u8]) -> GrayImage {
        image::load_from_memory_with_format(png, ImageFormat::Png)
            .unwrap()
            .to_luma8()
    }

    #[test]
    fn test_encode_is_deterministic() {
        let encoder = LabelEncoder::default();
        let first = encoder.encode(CODE).unwrap();
        let second = encoder.encode(CODE).unwrap();
        assert_eq!(first, second);
        assert!(first.matrix_png.starts_with(b"\x89PNG"));
        assert!(first.linear_png.starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_different_payloads_differ() {
        let encoder = LabelEncoder::default();
        let a = encoder.encode("L261019-00000001").unwrap();
        let b = encoder.encode("L261019-00000002").unwrap();
        assert_ne!(a.matrix_png, b.matrix_png);
        assert_ne!(a.linear_png, b.linear_png);
    }

    #[test]
    fn test_matrix_dimensions() {
        let encoder = LabelEncoder::default();
        let image = decode(&encoder.encode_matrix(CODE).unwrap());
        assert_eq!(image.width(), image.height());
        // Version 1 or 2: 21 or 25 modules plus 8 quiet modules, 4 px each
        assert!([(21 + 8) * 4, (25 + 8) * 4].contains(&image.width()));
        // Quiet zone corner is light, finder pattern corner is dark
        assert_eq!(image.get_pixel(0, 0).0[0], LIGHT);
        assert_eq!(image.get_pixel(16, 16).0[0], DARK);
    }

    #[test]
    fn test_linear_quiet_zone_and_height() {
        let encoder = LabelEncoder::default();
        let image = decode(&encoder.encode_linear(CODE).unwrap());
        assert_eq!(image.height(), 60);
        assert_eq!(image.get_pixel(0, 0).0[0], LIGHT);
        assert_eq!(image.get_pixel(image.width() - 1, 30).0[0], LIGHT);
        assert!((0..image.width()).any(|x| image.get_pixel(x, 30).0[0] == DARK));
    }

    #[test]
    fn test_linear_payload_limits() {
        let encoder = LabelEncoder::default();
        let long = "X".repeat(25);
        assert!(matches!(
            encoder.encode_linear(&long),
            Err(WeighingError::PayloadTooLong { symbology: Symbology::Linear, length: 25, capacity: 24 })
        ));
        assert!(matches!(
            encoder.encode_linear("µg"),
            Err(WeighingError::UnencodablePayload { symbology: Symbology::Linear, .. })
        ));
        assert!(matches!(
            encoder.encode(""),
            Err(WeighingError::UnencodablePayload { .. })
        ));
    }

    #[test]
    fn test_matrix_payload_limits() {
        let encoder = LabelEncoder::new(EncoderSettings {
            matrix_max_version: 2,
            ..EncoderSettings::default()
        });
        let long = "caffeine|58-08-2|1.250 mg/mL|2026-10-19|jdoe".to_string();
        assert!(matches!(
            encoder.encode_matrix(&long),
            Err(WeighingError::PayloadTooLong { symbology: Symbology::Matrix, capacity: 26, .. })
        ));

        let default = LabelEncoder::default();
        assert_eq!(default.matrix_capacity(), 106);
        assert!(default.encode_matrix(&long).is_ok());
        assert!(matches!(
            default.encode_matrix(&"x".repeat(5000)),
            Err(WeighingError::PayloadTooLong { .. })
        ));
    }
}
