pub mod intersect_2d;
pub mod plane_3d;
pub mod polygon_2d;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Global geometric tolerance for floating-point comparisons.
///
/// Equal to the point pool's rounding granularity, so two positions the pool
/// would merge also compare equal here.
pub const TOLERANCE: f64 = 1e-4;

/// Decimal places the point pool rounds coordinates to when keying.
pub const ROUND_PLACES: i32 = 4;
