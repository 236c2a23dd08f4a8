//! Transformation matrices for content fragments
//!
//! A `Matrix` is the standard six-value affine transform (a b c d e f).
//! [`Matrix::encode`] renders it as a `cm` operator fragment, ready to be
//! wrapped around a page's content via
//! [`ObjectHandle::append_content`](crate::ObjectHandle::append_content).

/// 2D affine transformation matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// This matrix rotated counterclockwise by `degrees`.
    pub fn rotated(&self, degrees: f64) -> Self {
        let radians = degrees.to_radians();
        let (sin, cos) = radians.sin_cos();
        self.multiply(&Matrix::new(cos, sin, -sin, cos, 0.0, 0.0))
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        self.multiply(&Matrix::new(1.0, 0.0, 0.0, 1.0, dx, dy))
    }

    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        self.multiply(&Matrix::new(sx, 0.0, 0.0, sy, 0.0, 0.0))
    }

    /// Matrix product applying `self` first, then `other` (row-vector
    /// convention).
    pub fn multiply(&self, other: &Matrix) -> Self {
        Self {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// The `cm` operator fragment for this matrix, e.g. `1 0 0 1 0 0 cm`.
    pub fn encode(&self) -> Vec<u8> {
        format!(
            "{} {} {} {} {} {} cm",
            format_number(self.a),
            format_number(self.b),
            format_number(self.c),
            format_number(self.d),
            format_number(self.e),
            format_number(self.f)
        )
        .into_bytes()
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

fn format_number(value: f64) -> String {
    let formatted = format!("{value:.6}");
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
