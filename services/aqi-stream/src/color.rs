//! Series color generation for multi-series mode
//!
//! Colors are cosmetic: no uniqueness or spread guarantee. The RNG is
//! supplied by the caller, so a seeded generator gives repeatable colors.

use rand::Rng;

/// Scale applied to the random fraction before taking hex digits.
const COLOR_SCALE: f64 = 0xFFFFF as f64 * 1_000_000.0;

/// Number of hex digits in a color.
const COLOR_DIGITS: usize = 6;

/// Draws `#rrggbb` strings from an injected random source.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorAssigner;

impl ColorAssigner {
    pub fn new() -> Self {
        Self
    }

    /// Next color from `rng`.
    pub fn next_color<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        Self::color_for(rng.gen::<f64>())
    }

    /// Color for a fraction in `[0, 1)`: the leading six hex digits of
    /// `floor(fraction * 0xFFFFF * 1e6)`, left-padded with zeros when the
    /// scaled value has fewer digits.
    ///
    /// Unlike a plain float-to-hex slice, which yields short or `.`-containing
    /// strings for tiny fractions, this always returns a valid `#rrggbb`.
    pub fn color_for(fraction: f64) -> String {
        let scaled = (fraction.clamp(0.0, 1.0) * COLOR_SCALE).floor() as u64;
        let hex = format!("{:0width$x}", scaled, width = COLOR_DIGITS);
        format!("#{}", &hex[..COLOR_DIGITS])
    }
}
