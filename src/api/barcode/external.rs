use anyhow::{anyhow, Context, Result};
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat};
use std::process::{Command, Stdio};

use super::config::DecodeConfig;
use crate::api::traits::BarcodeDecoder;

/// zbarimg exits with 4 when the image was read but held no symbol
const EXIT_NO_SYMBOL: i32 = 4;

/// Decoder backed by a zbar-compatible command-line program
pub struct ExternalDecoder {
    program: String,
}

impl ExternalDecoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Check the program can be started. Returns its version line.
    pub fn probe(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Barcode decoder '{}' not found in PATH", self.program))?;
        if !output.status.success() {
            return Err(anyhow!(
                "Barcode decoder '{}' exited with {}",
                self.program,
                output.status
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub fn args(config: &DecodeConfig, image_path: &str) -> Vec<String> {
        let density = config.patch_size.density();
        vec![
            "--raw".to_string(),
            "-q".to_string(),
            format!("-Sx-density={density}"),
            format!("-Sy-density={density}"),
            image_path.to_string(),
        ]
    }
}

/// Scale, optionally half-sample, and greyscale an image for one attempt.
pub fn preprocess(image: &DynamicImage, config: &DecodeConfig) -> DynamicImage {
    let (width, height) = image.dimensions();
    let mut prepared = if width.max(height) > config.input_size {
        image.resize(config.input_size, config.input_size, FilterType::Triangle)
    } else {
        image.clone()
    };

    if config.half_sample {
        let (width, height) = prepared.dimensions();
        prepared = prepared.resize_exact(
            (width / 2).max(1),
            (height / 2).max(1),
            FilterType::Triangle,
        );
    }

    DynamicImage::ImageLuma8(prepared.to_luma8())
}

impl BarcodeDecoder for ExternalDecoder {
    fn decode(&self, image: &DynamicImage, config: &DecodeConfig) -> Result<Option<String>> {
        let prepared = preprocess(image, config);
        let frame = tempfile::Builder::new()
            .prefix("nutriscan-frame-")
            .suffix(".png")
            .tempfile()
            .context("Failed to create temporary frame file")?;
        prepared
            .save_with_format(frame.path(), ImageFormat::Png)
            .context("Failed to write temporary frame")?;

        let path = frame.path().to_string_lossy().into_owned();
        let output = Command::new(&self.program)
            .args(Self::args(config, &path))
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run barcode decoder '{}'", self.program))?;

        match output.status.code() {
            Some(0) => Ok(String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(str::to_string)),
            Some(EXIT_NO_SYMBOL) => Ok(None),
            _ => Err(anyhow!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::barcode::PatchSize;

    #[test]
    fn test_preprocess_scales_and_half_samples() {
        let image = DynamicImage::new_rgb8(2000, 1000);

        let prepared = preprocess(&image, &DecodeConfig::new(800, PatchSize::Medium, false));
        assert_eq!(prepared.dimensions(), (800, 400));
        assert!(matches!(prepared, DynamicImage::ImageLuma8(_)));

        let prepared = preprocess(&image, &DecodeConfig::new(800, PatchSize::Medium, true));
        assert_eq!(prepared.dimensions(), (400, 200));
    }

    #[test]
    fn test_preprocess_keeps_small_images() {
        let image = DynamicImage::new_rgb8(300, 200);
        let prepared = preprocess(&image, &DecodeConfig::new(1280, PatchSize::Large, false));
        assert_eq!(prepared.dimensions(), (300, 200));
    }

    #[test]
    fn test_patch_size_maps_to_density() {
        let args = ExternalDecoder::args(&DecodeConfig::new(640, PatchSize::Small, true), "/tmp/f.png");
        assert_eq!(
            args,
            vec!["--raw", "-q", "-Sx-density=2", "-Sy-density=2", "/tmp/f.png"]
        );
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let decoder = ExternalDecoder::new("nutriscan-no-such-decoder");
        assert!(decoder.probe().is_err());
        let image = DynamicImage::new_luma8(8, 8);
        assert!(decoder.decode(&image, &DecodeConfig::default()).is_err());
    }
}
