//! Plane geometry shared by the layout pass and both output backends.
//!
//! Coordinates are local continuous units with Y growing downwards (screen
//! space). Angles are radians measured counter-clockwise with Y pointing up,
//! so `angle_between` negates the screen-space `atan2`.

use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::ops::{Add, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        (other - self).length()
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn midpoint(self, other: Point) -> Point {
        (self + other) / 2.0
    }

    /// Unit vector from `self` towards `other`, or `None` when they coincide.
    pub fn unit_towards(self, other: Point) -> Option<Point> {
        let delta = other - self;
        let len = delta.length();
        if len <= f32::EPSILON || !len.is_finite() {
            return None;
        }
        Some(delta / len)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;
    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Point {
    type Output = Point;
    fn div(self, rhs: f32) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl Add<Size> for Point {
    type Output = Point;
    fn add(self, rhs: Size) -> Point {
        Point::new(self.x + rhs.width, self.y + rhs.height)
    }
}

impl Sub<Size> for Point {
    type Output = Point;
    fn sub(self, rhs: Size) -> Point {
        Point::new(self.x - rhs.width, self.y - rhs.height)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn half(self) -> Size {
        Size::new(self.width / 2.0, self.height / 2.0)
    }
}

impl Mul<f32> for Size {
    type Output = Size;
    fn mul(self, rhs: f32) -> Size {
        Size::new(self.width * rhs, self.height * rhs)
    }
}

/// Axis-aligned rectangle stored as its north-west and south-east corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    pub fn from_center(center: Point, size: Size) -> Self {
        let half = size.half();
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    pub fn center(&self) -> Point {
        self.min.midpoint(self.max)
    }

    /// Strict interior test; points on the border are outside.
    pub fn contains(&self, p: Point) -> bool {
        p.x > self.min.x && p.x < self.max.x && p.y > self.min.y && p.y < self.max.y
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            self.min,
            Point::new(self.max.x, self.min.y),
            self.max,
            Point::new(self.min.x, self.max.y),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point,
    pub radius: f32,
}

impl Circle {
    pub fn point_at(&self, angle: f64) -> Point {
        move_along_angle(self.center, angle, self.radius)
    }
}

/// Wrap an angle into `[0, 2π)`.
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return angle;
    }
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Direction from `a` to `b`, counter-clockwise from +x with Y up.
pub fn angle_between(a: Point, b: Point) -> f64 {
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    normalize_angle(-dy.atan2(dx))
}

pub fn move_along_angle(p: Point, angle: f64, distance: f32) -> Point {
    let d = distance as f64;
    Point::new(
        (p.x as f64 + d * angle.cos()) as f32,
        (p.y as f64 - d * angle.sin()) as f32,
    )
}

/// Control point of a quadratic curve from `a` to `b`: the midpoint pushed
/// sideways by `curvature` times the segment vector rotated 90°.
pub fn control_point(a: Point, b: Point, curvature: f32) -> Point {
    let mid = a.midpoint(b);
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    Point::new(mid.x - dy * curvature, mid.y + dx * curvature)
}

pub fn quad_bezier(a: Point, ctrl: Point, b: Point, t: f32) -> Point {
    let u = 1.0 - t;
    a * (u * u) + ctrl * (2.0 * u * t) + b * (t * t)
}

/// Closest point to `p` on segment `ab` and its parameter in `[0, 1]`.
pub fn project_onto_segment(a: Point, b: Point, p: Point) -> (Point, f32) {
    let ab = b - a;
    let ap = p - a;
    let len_sq = ab.x * ab.x + ab.y * ab.y;
    if len_sq <= f32::EPSILON {
        return (a, 0.0);
    }
    let t = ((ap.x * ab.x + ap.y * ab.y) / len_sq).clamp(0.0, 1.0);
    (a + ab * t, t)
}

fn orient(a: Point, b: Point, c: Point) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn within_bounds(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Segment intersection; touching and collinear overlap count.
pub fn segments_intersect(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let o1 = orient(p1, p2, q1);
    let o2 = orient(p1, p2, q2);
    let o3 = orient(q1, q2, p1);
    let o4 = orient(q1, q2, p2);

    let straddles = |a: f32, b: f32| (a > 0.0 && b < 0.0) || (a < 0.0 && b > 0.0);
    if straddles(o1, o2) && straddles(o3, o4) {
        return true;
    }

    (o1 == 0.0 && within_bounds(p1, p2, q1))
        || (o2 == 0.0 && within_bounds(p1, p2, q2))
        || (o3 == 0.0 && within_bounds(q1, q2, p1))
        || (o4 == 0.0 && within_bounds(q1, q2, p2))
}

/// True when segment `ab` crosses or touches any side of `rect`.
pub fn segment_intersects_rect(a: Point, b: Point, rect: &Rect) -> bool {
    let [tl, tr, br, bl] = rect.corners();
    segments_intersect(a, b, tl, tr)
        || segments_intersect(a, b, tr, br)
        || segments_intersect(a, b, br, bl)
        || segments_intersect(a, b, bl, tl)
}

pub fn within_ellipse(p: Point, bounds: &Rect) -> bool {
    let c = bounds.center();
    let rx = bounds.width() / 2.0;
    let ry = bounds.height() / 2.0;
    if rx <= 0.0 || ry <= 0.0 {
        return false;
    }
    let dx = (p.x - c.x) / rx;
    let dy = (p.y - c.y) / ry;
    dx * dx + dy * dy <= 1.0
}

/// Circle through three points; `None` when they are collinear.
pub fn circle_from_points(p1: Point, p2: Point, p3: Point) -> Option<Circle> {
    let (x1, y1) = (p1.x as f64, p1.y as f64);
    let (x2, y2) = (p2.x as f64, p2.y as f64);
    let (x3, y3) = (p3.x as f64, p3.y as f64);

    let off = x2 * x2 + y2 * y2;
    let bc = (x1 * x1 + y1 * y1 - off) / 2.0;
    let cd = (off - x3 * x3 - y3 * y3) / 2.0;
    let det = (x1 - x2) * (y2 - y3) - (x2 - x3) * (y1 - y2);
    if det.abs() < 1e-9 {
        return None;
    }

    let idet = 1.0 / det;
    let cx = (bc * (y2 - y3) - cd * (y1 - y2)) * idet;
    let cy = (cd * (x1 - x2) - bc * (x2 - x3)) * idet;
    let r = ((x2 - cx).powi(2) + (y2 - cy).powi(2)).sqrt();
    Some(Circle {
        center: Point::new(cx as f32, cy as f32),
        radius: r as f32,
    })
}

/// Where a ray from the centre of `rect` at `angle` leaves the rectangle.
pub fn rect_boundary_point(rect: &Rect, angle: f64) -> Point {
    let c = rect.center();
    let hw = (rect.width() / 2.0) as f64;
    let hh = (rect.height() / 2.0) as f64;
    let (sin, cos) = angle.sin_cos();
    let tx = if cos.abs() > 1e-12 { hw / cos.abs() } else { f64::INFINITY };
    let ty = if sin.abs() > 1e-12 { hh / sin.abs() } else { f64::INFINITY };
    let t = tx.min(ty);
    if !t.is_finite() {
        return c;
    }
    move_along_angle(c, angle, t as f32)
}

pub fn snap_value(value: f32, grid: f32) -> f32 {
    if grid <= 0.0 {
        return value;
    }
    (value / grid).round() * grid
}

pub fn snap_to_grid(p: Point, grid: f32) -> Point {
    Point::new(snap_value(p.x, grid), snap_value(p.y, grid))
}

/// True when `angle` lies within `tolerance` of a cardinal direction.
pub fn sufficiently_aligned(angle: f64, tolerance: f64) -> bool {
    [0.0, FRAC_PI_2, PI, 3.0 * FRAC_PI_2, TAU]
        .iter()
        .any(|cardinal| (angle - cardinal).abs() <= tolerance)
}
