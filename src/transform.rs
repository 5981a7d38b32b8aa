//! Placement of library geometry on the sheet.
//!
//! Library symbols are drawn in a local frame whose y axis points up. A
//! placed symbol rotates that geometry by its angle, mirrors it and moves
//! it to its position on the sheet, where the y axis points down. The
//! y flip is part of the mirror matrices.

use std::fmt::Display;

use crate::schema::{Pin, Unit};

/// Number of decimals kept when coordinates are compared.
pub const PRECISION: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The key under which this point is matched against other points.
    pub fn key(&self) -> PointKey {
        let scale = 10f64.powi(PRECISION);
        PointKey(
            (self.x * scale).round() as i64,
            (self.y * scale).round() as i64,
        )
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A point rounded to [`PRECISION`] decimals, used for connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointKey(i64, i64);

impl From<Point> for PointKey {
    fn from(point: Point) -> Self {
        point.key()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mirror {
    #[default]
    None,
    X,
    Y,
}

impl Mirror {
    /// Row-vector matrix applied after rotation.
    pub fn matrix(&self) -> [[f64; 2]; 2] {
        match self {
            Mirror::None => [[1.0, 0.0], [0.0, -1.0]],
            Mirror::X => [[1.0, 0.0], [0.0, 1.0]],
            Mirror::Y => [[-1.0, 0.0], [0.0, -1.0]],
        }
    }
}

/// Anything placed on the sheet with a position, rotation and mirror.
pub trait Placement {
    fn position(&self) -> Point;
    fn angle(&self) -> f64;
    fn mirror(&self) -> Mirror;
}

/// Maps points from the owner's local frame to sheet coordinates.
///
/// Rotation by `-angle` comes first, then the mirror matrix, then the
/// translation. Swapping rotation and mirror gives wrong results for
/// mirrored and rotated symbols.
pub fn transform<P: Placement + ?Sized>(owner: &P, points: &[Point]) -> Vec<Point> {
    let theta = -owner.angle().to_radians();
    let (sin, cos) = theta.sin_cos();
    let rot = [[cos, -sin], [sin, cos]];
    let mirror = owner.mirror().matrix();
    let at = owner.position();
    points
        .iter()
        .map(|p| {
            let rotated = mul(*p, &rot);
            let mirrored = mul(rotated, &mirror);
            Point::new(at.x + mirrored.x, at.y + mirrored.y)
        })
        .collect()
}

fn mul(p: Point, m: &[[f64; 2]; 2]) -> Point {
    Point::new(p.x * m[0][0] + p.y * m[1][0], p.x * m[0][1] + p.y * m[1][1])
}

/// The far end of a pin in the unit's local frame.
pub fn pin_end(pin: &Pin) -> Point {
    let theta = pin.angle.to_radians();
    Point::new(
        pin.at.x + pin.length * theta.cos(),
        pin.at.y + pin.length * theta.sin(),
    )
}

/// The connection point of `pin` on the sheet.
pub fn pin_position<P: Placement + ?Sized>(owner: &P, pin: &Pin) -> Point {
    transform(owner, &[pin.at])[0]
}

/// The pin as a line segment on the sheet, from its connection point to
/// its end at the symbol body.
pub fn pin_line<P: Placement + ?Sized>(owner: &P, pin: &Pin) -> [Point; 2] {
    let points = transform(owner, &[pin.at, pin_end(pin)]);
    [points[0], points[1]]
}

/// True when `unit` belongs to the geometry of a symbol placed as
/// `requested`. Unit 0 is shared by all units.
pub fn is_unit(unit: &Unit, requested: u32) -> bool {
    unit.unit == 0 || unit.unit == requested
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    struct Placed {
        at: Point,
        angle: f64,
        mirror: Mirror,
    }

    impl Placement for Placed {
        fn position(&self) -> Point {
            self.at
        }
        fn angle(&self) -> f64 {
            self.angle
        }
        fn mirror(&self) -> Mirror {
            self.mirror
        }
    }

    fn pin(x: f64, y: f64, angle: f64, length: f64) -> Pin {
        Pin {
            number: "1".into(),
            name: "~".into(),
            electrical: "passive".into(),
            at: Point::new(x, y),
            angle,
            length,
            hidden: false,
        }
    }

    #[rstest]
    #[case(0.0, Mirror::None, Point::new(80.01, 43.18))]
    #[case(90.0, Mirror::None, Point::new(76.2, 46.99))]
    #[case(180.0, Mirror::None, Point::new(80.01, 50.8))]
    #[case(270.0, Mirror::None, Point::new(83.82, 46.99))]
    #[case(0.0, Mirror::X, Point::new(80.01, 50.8))]
    #[case(0.0, Mirror::Y, Point::new(80.01, 43.18))]
    #[case(90.0, Mirror::X, Point::new(76.2, 46.99))]
    #[case(90.0, Mirror::Y, Point::new(83.82, 46.99))]
    fn places_the_upper_pin(#[case] angle: f64, #[case] mirror: Mirror, #[case] expected: Point) {
        let owner = Placed {
            at: Point::new(80.01, 46.99),
            angle,
            mirror,
        };
        let placed = pin_position(&owner, &pin(0.0, 3.81, 270.0, 1.27));
        assert_eq!(placed.key(), expected.key());
    }

    #[test]
    fn transform_is_deterministic() {
        let owner = Placed {
            at: Point::new(110.49, 48.26),
            angle: 90.0,
            mirror: Mirror::Y,
        };
        let points = [Point::new(-5.08, 2.54), Point::new(-1.27, 2.54)];
        let first = transform(&owner, &points);
        let second = transform(&owner, &points);
        assert_eq!(first, second);
        assert_eq!(points, [Point::new(-5.08, 2.54), Point::new(-1.27, 2.54)]);
    }

    #[test]
    fn pin_line_runs_towards_the_body() {
        let owner = Placed {
            at: Point::new(88.9, 45.72),
            angle: 90.0,
            mirror: Mirror::None,
        };
        let [start, end] = pin_line(&owner, &pin(0.0, 3.81, 270.0, 1.27));
        assert_eq!(start.key(), Point::new(85.09, 45.72).key());
        assert_eq!(end.key(), Point::new(86.36, 45.72).key());
    }

    #[rstest]
    #[case(Point::new(96.52, 45.72), Point::new(96.5200000001, 45.7199999999), true)]
    #[case(Point::new(96.52, 45.72), Point::new(96.53, 45.72), false)]
    #[case(Point::new(-0.004, 0.0), Point::new(0.0, 0.0), true)]
    fn keys_absorb_float_drift(#[case] a: Point, #[case] b: Point, #[case] same: bool) {
        assert_eq!(a.key() == b.key(), same);
    }

    #[test]
    fn shared_unit_belongs_to_every_unit() {
        let unit = |n: u32| Unit {
            name: format!("LM358_{n}_1"),
            unit: n,
            style: 1,
            graphics: vec![],
            pins: vec![],
        };
        assert!(is_unit(&unit(0), 2));
        assert!(is_unit(&unit(2), 2));
        assert!(!is_unit(&unit(1), 2));
    }
}
