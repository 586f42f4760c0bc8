use glam::{Affine3A, Vec3};

/// Local and world matrices of a transformable object.
///
/// The world matrix is only recomputed by [`Transform::update`], which the
/// owner calls during a transform-propagation pass. Geometry caches derived
/// from it are refreshed at the same moment, never while a simulation step
/// queries them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub local: Affine3A,
    world: Affine3A,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            local: Affine3A::IDENTITY,
            world: Affine3A::IDENTITY,
        }
    }
}

impl Transform {
    pub fn new(local: Affine3A) -> Self {
        Self {
            local,
            world: local,
        }
    }

    /// Recomputes the world matrix from the parent's world matrix.
    pub fn update(&mut self, parent: &Affine3A) {
        self.world = *parent * self.local;
    }

    #[inline]
    pub fn world(&self) -> &Affine3A {
        &self.world
    }

    #[inline]
    pub fn transform_pos(&self, p: Vec3) -> Vec3 {
        self.world.transform_point3(p)
    }

    #[inline]
    pub fn transform_dir(&self, d: Vec3) -> Vec3 {
        self.world.transform_vector3(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_composes_parent_and_local() {
        let mut t = Transform::new(Affine3A::from_translation(Vec3::X));
        t.update(&Affine3A::from_translation(Vec3::Y));

        assert_eq!(t.transform_pos(Vec3::ZERO), Vec3::new(1.0, 1.0, 0.0));
        // Directions ignore translation.
        assert_eq!(t.transform_dir(Vec3::Z), Vec3::Z);
    }
}
