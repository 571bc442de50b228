use strum::{Display, EnumIter};

/// Localisation granularity. Smaller patches scan more densely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum PatchSize {
    XSmall,
    Small,
    Medium,
    Large,
    XLarge,
}

impl PatchSize {
    /// Scan-line stride handed to a zbar-compatible decoder.
    pub fn density(self) -> u32 {
        match self {
            PatchSize::XSmall => 1,
            PatchSize::Small => 2,
            PatchSize::Medium => 3,
            PatchSize::Large => 4,
            PatchSize::XLarge => 5,
        }
    }
}

/// One decoder attempt: input resolution, patch size, pre-downsampling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Longest side in pixels the image is scaled down to
    pub input_size: u32,
    pub patch_size: PatchSize,
    pub half_sample: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            input_size: 800,
            patch_size: PatchSize::Medium,
            half_sample: true,
        }
    }
}

impl DecodeConfig {
    pub const fn new(input_size: u32, patch_size: PatchSize, half_sample: bool) -> Self {
        Self {
            input_size,
            patch_size,
            half_sample,
        }
    }
}

/// Configurations tried in order for a still image.
pub const DEFAULT_LADDER: [DecodeConfig; 4] = [
    DecodeConfig::new(800, PatchSize::Medium, true),
    DecodeConfig::new(1280, PatchSize::Large, false),
    DecodeConfig::new(640, PatchSize::Small, true),
    DecodeConfig::new(1600, PatchSize::XSmall, false),
];

pub fn default_ladder() -> Vec<DecodeConfig> {
    DEFAULT_LADDER.to_vec()
}
