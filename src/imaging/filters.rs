//! Composite colour filters.
//!
//! Every filter primitive the presets need (grayscale, sepia, saturate,
//! hue-rotate, contrast, brightness, invert) is an affine map on normalized
//! RGB, using the coefficients from the CSS Filter Effects specification.
//! Affine maps compose, so a preset chain like
//! `sepia(40%) contrast(120%) brightness(90%)` collapses into one
//! [`ColorMatrix`] and the backend touches each pixel exactly once.
//!
//! Unlike a browser, which clamps after every primitive, intermediate values
//! are not clamped; only the final result is. For the fixed presets the
//! difference is at most a few levels on saturated highlights.

/// Affine colour transform on normalized (0.0–1.0) RGB:
/// `out = matrix · rgb + offset`. Alpha is never touched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix {
    pub matrix: [[f32; 3]; 3],
    pub offset: [f32; 3],
}

const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

impl ColorMatrix {
    pub fn identity() -> Self {
        Self {
            matrix: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            offset: [0.0; 3],
        }
    }

    fn linear(matrix: [[f32; 3]; 3]) -> Self {
        Self {
            matrix,
            offset: [0.0; 3],
        }
    }

    /// Desaturate by `amount` (1.0 = fully gray).
    pub fn grayscale(amount: f32) -> Self {
        let a = 1.0 - amount.clamp(0.0, 1.0);
        let [r, g, b] = LUMA;
        Self::linear([
            [r + (1.0 - r) * a, g - g * a, b - b * a],
            [r - r * a, g + (1.0 - g) * a, b - b * a],
            [r - r * a, g - g * a, b + (1.0 - b) * a],
        ])
    }

    /// Sepia tone by `amount` (1.0 = full sepia).
    pub fn sepia(amount: f32) -> Self {
        let a = 1.0 - amount.clamp(0.0, 1.0);
        Self::linear([
            [0.393 + 0.607 * a, 0.769 - 0.769 * a, 0.189 - 0.189 * a],
            [0.349 - 0.349 * a, 0.686 + 0.314 * a, 0.168 - 0.168 * a],
            [0.272 - 0.272 * a, 0.534 - 0.534 * a, 0.131 + 0.869 * a],
        ])
    }

    /// Scale saturation by `s` (1.0 = unchanged, 0.0 = gray).
    pub fn saturate(s: f32) -> Self {
        let s = s.max(0.0);
        Self::linear([
            [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
            [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
            [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
        ])
    }

    /// Rotate hue by `degrees`.
    pub fn hue_rotate(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::linear([
            [
                0.213 + cos * 0.787 - sin * 0.213,
                0.715 - cos * 0.715 - sin * 0.715,
                0.072 - cos * 0.072 + sin * 0.928,
            ],
            [
                0.213 - cos * 0.213 + sin * 0.143,
                0.715 + cos * 0.285 + sin * 0.140,
                0.072 - cos * 0.072 - sin * 0.283,
            ],
            [
                0.213 - cos * 0.213 - sin * 0.787,
                0.715 - cos * 0.715 + sin * 0.715,
                0.072 + cos * 0.928 + sin * 0.072,
            ],
        ])
    }

    /// Scale contrast around mid-gray by `c` (1.0 = unchanged).
    pub fn contrast(c: f32) -> Self {
        let c = c.max(0.0);
        let o = 0.5 - 0.5 * c;
        Self {
            matrix: [[c, 0.0, 0.0], [0.0, c, 0.0], [0.0, 0.0, c]],
            offset: [o; 3],
        }
    }

    /// Multiply brightness by `b` (1.0 = unchanged).
    pub fn brightness(b: f32) -> Self {
        let b = b.max(0.0);
        Self::linear([[b, 0.0, 0.0], [0.0, b, 0.0], [0.0, 0.0, b]])
    }

    /// Invert by `amount` (1.0 = full negative).
    pub fn invert(amount: f32) -> Self {
        let a = amount.clamp(0.0, 1.0);
        let k = 1.0 - 2.0 * a;
        Self {
            matrix: [[k, 0.0, 0.0], [0.0, k, 0.0], [0.0, 0.0, k]],
            offset: [a; 3],
        }
    }

    /// Compose: apply `self` first, then `next`.
    pub fn then(&self, next: &ColorMatrix) -> ColorMatrix {
        let mut matrix = [[0.0f32; 3]; 3];
        let mut offset = [0.0f32; 3];
        for row in 0..3 {
            for col in 0..3 {
                matrix[row][col] = (0..3)
                    .map(|k| next.matrix[row][k] * self.matrix[k][col])
                    .sum();
            }
            offset[row] = (0..3)
                .map(|k| next.matrix[row][k] * self.offset[k])
                .sum::<f32>()
                + next.offset[row];
        }
        ColorMatrix { matrix, offset }
    }

    /// Apply to one normalized RGB triple. Not clamped.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let mut out = self.offset;
        for (row, value) in out.iter_mut().enumerate() {
            *value += (0..3).map(|k| self.matrix[row][k] * rgb[k]).sum::<f32>();
        }
        out
    }

    /// Apply in place to one 8-bit RGBA pixel, clamping the result.
    #[inline]
    pub fn apply_rgba8(&self, pixel: &mut [u8]) {
        let rgb = [
            pixel[0] as f32 / 255.0,
            pixel[1] as f32 / 255.0,
            pixel[2] as f32 / 255.0,
        ];
        let out = self.apply(rgb);
        for (channel, value) in pixel.iter_mut().zip(out) {
            *channel = (value * 255.0).round().clamp(0.0, 255.0) as u8;
        }
    }
}
