//! Decoder configuration.

use crate::paint::GradientMode;
use crate::units::DEFAULT_DPI;

/// Options controlling how a presentation is decoded.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Pixels per logical inch.
    pub dpi: u32,

    /// Keep gradients, or collapse them to their first stop.
    pub gradient_mode: GradientMode,

    /// Extension used for extracted images whose part name has none.
    pub default_image_ext: String,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            gradient_mode: GradientMode::Full,
            default_image_ext: "png".to_string(),
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi.max(1);
        self
    }

    pub fn with_gradient_mode(mut self, mode: GradientMode) -> Self {
        self.gradient_mode = mode;
        self
    }

    pub fn with_default_image_ext(mut self, ext: impl Into<String>) -> Self {
        let ext = ext.into();
        self.default_image_ext = ext.trim_start_matches('.').to_string();
        self
    }
}
