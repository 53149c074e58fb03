//! Encoder settings.

/// JPEG quality, 1-100. PNG output ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    /// Out-of-range values are clamped rather than rejected.
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// The value in the form `JpegEncoder` takes.
    pub fn as_jpeg(self) -> u8 {
        self.0 as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_into_jpeg_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(72).as_jpeg(), 72);
        assert_eq!(Quality::new(400).as_jpeg(), 100);
    }

    #[test]
    fn defaults_to_high_quality() {
        assert_eq!(Quality::default(), Quality::new(95));
    }
}
