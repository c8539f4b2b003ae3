//! Elementary numeric helpers and constants shared by the parser, the
//! plotter and the contour tracer.

pub const PI: f64 = std::f64::consts::PI;
pub const E: f64 = std::f64::consts::E;
pub const LN2: f64 = std::f64::consts::LN_2;
pub const LN10: f64 = std::f64::consts::LN_10;
pub const PHI: f64 = 1.618_033_988_749_895;
pub const LNPI: f64 = 1.144_729_885_849_400_2;
pub const LNSQRT2PI: f64 = 0.918_938_533_204_672_8;
pub const SQRT2PI: f64 = 2.506_628_274_631_000_7;

pub const MAXGAM: f64 = 34.648;
pub const MAXFACT: f64 = 170.0;
pub const MACHEP: f64 = 1.084_202_172_485_504_4e-19;

/// Sentinel for an unbounded upper interval endpoint.
pub const POSITIVE_INFINITY: f64 = f64::INFINITY;
/// Sentinel for an unbounded lower interval endpoint.
pub const NEGATIVE_INFINITY: f64 = f64::NEG_INFINITY;

/// Round `x` to `places` decimals, halves away from zero.
pub fn round(x: f64, places: i32) -> f64 {
  let scale = 10_f64.powi(places);
  (x * scale).round() / scale
}

/// Fractional part of |x|.
pub fn frac(x: f64) -> f64 {
  let x = x.abs();
  x - x.floor()
}

/// Map `x` linearly from `domain` onto `range`. Values outside the domain
/// are extrapolated, and a reversed range flips the direction.
pub fn scalemap(x: f64, domain: (f64, f64), range: (f64, f64)) -> f64 {
  (x - domain.0) / (domain.1 - domain.0) * (range.1 - range.0) + range.0
}

/// `a / |a|`, so zero has no sign.
pub fn sgn(a: f64) -> f64 {
  a / a.abs()
}

pub fn odd(x: f64) -> bool {
  x.rem_euclid(2.0) == 1.0
}

pub fn even(x: f64) -> bool {
  x.rem_euclid(2.0) == 0.0
}

pub fn ln(x: f64) -> f64 {
  x.ln()
}

/// Base-10 logarithm.
pub fn log(x: f64) -> f64 {
  x.ln() / LN10
}

pub fn sqr(x: f64) -> f64 {
  x * x
}

pub fn cbrt(x: f64) -> f64 {
  x.cbrt()
}

/// Quadrant (1 to 4) of a point. The positive x axis belongs to quadrant 4,
/// the positive y axis to quadrant 2, and the rest of the axes to 3.
pub fn quadrant(x: f64, y: f64) -> u8 {
  if x > 0.0 {
    if y > 0.0 { 1 } else { 4 }
  } else if y > 0.0 {
    2
  } else {
    3
  }
}

/// True for an ordinary number, false for the infinity sentinels and NaN.
pub fn is_finite_bound(x: f64) -> bool {
  x.is_finite()
}
