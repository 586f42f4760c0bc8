//! Geometric zones used for spawning, containment tests and border
//! crossing tests.
//!
//! A [`Zone`] wraps one concrete [`Shape`] together with its world
//! [`Transform`]. Every shape keeps a cache of its transformed geometry
//! which is refreshed by [`Zone::update_transform`] (and when the shape is
//! edited), so the predicates below only ever read it.
//!
//! Conventions shared by all shapes:
//! - [`Zone::intersects`] reports the first crossing of the segment
//!   `v0 → v1` with the border. The returned point is moved
//!   [`APPROXIMATION_VALUE`] toward the side of `v0` and the normal faces
//!   that side, so a particle put back at the intersection does not cross
//!   again on its next step.
//! - [`Zone::move_at_border`] takes the side the point currently lies on
//!   and moves it just across the border to the other side.
//! - Zero-volume shapes (point, line, ring) never contain anything.

mod aabox;
mod cylinder;
mod line;
mod plane;
mod point;
mod ring;
mod sphere;

pub use aabox::AaBox;
pub use cylinder::Cylinder;
pub use line::Line;
pub use plane::Plane;
pub use point::Point;
pub use ring::Ring;
pub use sphere::Sphere;

use glam::{Affine3A, Vec3};
use rand::RngCore;

use crate::transform::Transform;
use crate::types::APPROXIMATION_VALUE;

/// First crossing of a segment with a zone border.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    /// Crossing point, moved slightly toward the segment start.
    pub point: Vec3,
    /// Unit normal of the border, facing the segment start.
    pub normal: Vec3,
}

impl Intersection {
    /// Builds an intersection from the exact crossing point and a normal
    /// already oriented toward the segment start.
    pub(crate) fn nudged(point: Vec3, normal: Vec3) -> Self {
        Self {
            point: point + normal * APPROXIMATION_VALUE,
            normal,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Shape {
    Point(Point),
    Sphere(Sphere),
    AaBox(AaBox),
    Plane(Plane),
    Line(Line),
    Ring(Ring),
    Cylinder(Cylinder),
}

macro_rules! dispatch {
    ($shape:expr, $s:ident => $e:expr) => {
        match $shape {
            Shape::Point($s) => $e,
            Shape::Sphere($s) => $e,
            Shape::AaBox($s) => $e,
            Shape::Plane($s) => $e,
            Shape::Line($s) => $e,
            Shape::Ring($s) => $e,
            Shape::Cylinder($s) => $e,
        }
    };
}

macro_rules! impl_from_shape {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Shape {
                fn from(s: $variant) -> Self {
                    Shape::$variant(s)
                }
            }
        )*
    };
}

impl_from_shape!(Point, Sphere, AaBox, Plane, Line, Ring, Cylinder);

#[derive(Clone, Debug)]
pub struct Zone {
    shape: Shape,
    transform: Transform,
}

impl Default for Zone {
    fn default() -> Self {
        Zone::point(Vec3::ZERO)
    }
}

impl Zone {
    pub fn new(shape: impl Into<Shape>) -> Self {
        let mut zone = Self {
            shape: shape.into(),
            transform: Transform::default(),
        };
        zone.refresh();
        zone
    }

    pub fn point(position: Vec3) -> Self {
        Self::new(Point::new(position))
    }

    pub fn sphere(center: Vec3, radius: f32) -> Self {
        Self::new(Sphere::new(center, radius))
    }

    pub fn aabox(center: Vec3, dimension: Vec3) -> Self {
        Self::new(AaBox::new(center, dimension))
    }

    pub fn plane(position: Vec3, normal: Vec3) -> Self {
        Self::new(Plane::new(position, normal))
    }

    pub fn line(p0: Vec3, p1: Vec3) -> Self {
        Self::new(Line::new(p0, p1))
    }

    pub fn ring(position: Vec3, normal: Vec3, min_radius: f32, max_radius: f32) -> Self {
        Self::new(Ring::new(position, normal, min_radius, max_radius))
    }

    pub fn cylinder(position: Vec3, direction: Vec3, radius: f32, length: f32) -> Self {
        Self::new(Cylinder::new(position, direction, radius, length))
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Edits the shape and refreshes its transformed cache.
    pub fn modify_shape(&mut self, f: impl FnOnce(&mut Shape)) {
        f(&mut self.shape);
        self.refresh();
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Sets the local transform. It takes effect on the next
    /// [`Zone::update_transform`].
    pub fn set_local_transform(&mut self, local: Affine3A) {
        self.transform.local = local;
    }

    /// Recomputes the world transform from the parent's and refreshes the
    /// transformed geometry.
    pub fn update_transform(&mut self, parent: &Affine3A) {
        self.transform.update(parent);
        self.refresh();
    }

    fn refresh(&mut self) {
        let t = &self.transform;
        dispatch!(&mut self.shape, s => s.refresh(t))
    }

    /// Transformed reference position of the zone.
    pub fn position(&self) -> Vec3 {
        dispatch!(&self.shape, s => s.transformed_position())
    }

    pub fn contains(&self, p: Vec3) -> bool {
        dispatch!(&self.shape, s => s.contains(p))
    }

    pub fn intersects(&self, v0: Vec3, v1: Vec3) -> Option<Intersection> {
        dispatch!(&self.shape, s => s.intersects(v0, v1))
    }

    /// Samples a position inside the volume (`full`) or on its border.
    pub fn generate_position(&self, full: bool, rng: &mut dyn RngCore) -> Vec3 {
        dispatch!(&self.shape, s => s.generate_position(full, rng))
    }

    pub fn move_at_border(&self, p: Vec3, inside: bool) -> Vec3 {
        dispatch!(&self.shape, s => s.move_at_border(p, inside))
    }

    pub fn compute_normal(&self, p: Vec3, rng: &mut dyn RngCore) -> Vec3 {
        dispatch!(&self.shape, s => s.compute_normal(p, rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_transform_moves_predicates_with_the_zone() {
        let mut zone = Zone::sphere(Vec3::ZERO, 1.0);
        zone.update_transform(&Affine3A::from_translation(Vec3::new(10.0, 0.0, 0.0)));

        assert_eq!(zone.position(), Vec3::new(10.0, 0.0, 0.0));
        assert!(zone.contains(Vec3::new(10.5, 0.0, 0.0)));
        assert!(!zone.contains(Vec3::ZERO));
    }

    #[test]
    fn modify_shape_refreshes_cache() {
        let mut zone = Zone::sphere(Vec3::ZERO, 1.0);
        zone.modify_shape(|shape| {
            if let Shape::Sphere(s) = shape {
                s.center = Vec3::Y * 5.0;
            }
        });
        assert!(zone.contains(Vec3::Y * 5.5));
    }

    #[test]
    fn default_zone_is_a_point_at_origin() {
        let zone = Zone::default();
        assert!(matches!(zone.shape(), Shape::Point(_)));
        assert_eq!(zone.position(), Vec3::ZERO);
    }
}
