use derive_more::{Display, Error};
use image::DynamicImage;
use std::path::Path;

use super::config::DecodeConfig;
use crate::api::traits::BarcodeDecoder;

pub const NOT_FOUND_MESSAGE: &str =
    "Could not detect barcode in image. Try a clearer photo or enter manually.";

#[derive(Debug, Display, Error)]
pub enum BarcodeError {
    #[display("Could not detect barcode in image. Try a clearer photo or enter manually.")]
    NotFound { attempts: usize },

    #[display("Cannot open image {path}: {source}")]
    Image {
        path: String,
        source: image::ImageError,
    },

    #[display("Frame source failed: {message}")]
    Source { message: String },
}

/// Try each configuration in order. The first decoded value wins; a decoder
/// error on one configuration only moves on to the next.
pub fn decode_with_fallbacks(
    decoder: &dyn BarcodeDecoder,
    image: &DynamicImage,
    ladder: &[DecodeConfig],
) -> Result<String, BarcodeError> {
    for (index, config) in ladder.iter().enumerate() {
        log::debug!(
            "Barcode attempt {}/{}: size={} patch={} half_sample={}",
            index + 1,
            ladder.len(),
            config.input_size,
            config.patch_size,
            config.half_sample
        );
        match decoder.decode(image, config) {
            Ok(Some(code)) if !code.trim().is_empty() => {
                let code = code.trim().to_string();
                log::info!("Barcode {code} detected on attempt {}", index + 1);
                return Ok(code);
            }
            Ok(_) => {}
            Err(err) => log::debug!("Decoder failed on attempt {}: {err:#}", index + 1),
        }
    }

    Err(BarcodeError::NotFound {
        attempts: ladder.len(),
    })
}

pub fn decode_file(
    decoder: &dyn BarcodeDecoder,
    path: &Path,
    ladder: &[DecodeConfig],
) -> Result<String, BarcodeError> {
    let image = image::open(path).map_err(|source| BarcodeError::Image {
        path: path.display().to_string(),
        source,
    })?;
    decode_with_fallbacks(decoder, &image, ladder)
}
