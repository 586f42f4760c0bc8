//! Demo scenes and the renderer that reports on them.

use std::cell::RefCell;
use std::f32::consts::PI;
use std::rc::Rc;

use anyhow::Result;
use clap::ValueEnum;
use glam::Vec3;
use log::{debug, info};

use particle_core::buffer::BufferHandler;
use particle_core::emitter::{Emitter, VelocityStrategy};
use particle_core::interpolator::InterpolationSource;
use particle_core::modifier::{
    Collision, Destroyer, ForceFactor, LinearForce, Modifier, ModifierGroup, Obstacle, PointMass, Rotator, Trigger,
    Vortex,
};
use particle_core::renderer::Renderer;
use particle_core::{Config, Group, Handle, Model, ModelFlags, ModelParam, Zone};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SceneKind {
    /// Particles shot upward, falling back on a bouncy floor
    Fountain,
    /// A ring of particles sucked into a vortex
    Vortex,
    /// A single burst pulled back by a point mass
    Explosion,
}

/// What the renderer saw on its last frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameStats {
    pub particles: usize,
    pub mean_position: Vec3,
    pub mean_alpha: f32,
    pub mean_size: f32,
}

/// Renderer that only averages what it is given.
#[derive(Debug, Default)]
pub struct StatsRenderer {
    last: Rc<RefCell<FrameStats>>,
}

impl BufferHandler for StatsRenderer {}

impl Renderer for StatsRenderer {
    fn render(&mut self, group: &Group) {
        let data = group.particle_data();
        let params = group.current_params();
        let stride = group.param_stride();
        let mean_of = |param: ModelParam| match group.param_offset(param) {
            Some(offset) if !data.is_empty() => {
                params.chunks(stride).map(|p| p[offset]).sum::<f32>() / data.len() as f32
            }
            _ => param.default_value(),
        };

        let mut stats = self.last.borrow_mut();
        stats.particles = data.len();
        stats.mean_position = if data.is_empty() {
            Vec3::ZERO
        } else {
            data.iter().map(|d| d.position).sum::<Vec3>() / data.len() as f32
        };
        stats.mean_alpha = mean_of(ModelParam::Alpha);
        stats.mean_size = mean_of(ModelParam::Size);
    }
}

pub struct Scene {
    kind: SceneKind,
    group: Group,
    stats: Rc<RefCell<FrameStats>>,
    time: f32,
}

impl Scene {
    pub fn new(kind: SceneKind, seed: Option<u64>) -> Result<Self> {
        let mut group = match kind {
            SceneKind::Fountain => fountain(seed)?,
            SceneKind::Vortex => vortex(seed)?,
            SceneKind::Explosion => explosion(seed)?,
        };

        let stats = Rc::new(RefCell::new(FrameStats::default()));
        let renderer: Box<dyn Renderer> = Box::new(StatsRenderer {
            last: Rc::clone(&stats),
        });
        group.set_renderer(Some(Handle::Owned(renderer)));

        info!(
            "Scene {:?}: {} emitters, {} modifiers, capacity {}",
            kind,
            group.emitters().len(),
            group.modifiers().len(),
            group.capacity()
        );
        Ok(Self {
            kind,
            group,
            stats,
            time: 0.0,
        })
    }

    /// Advances the scene by one frame and renders it. Returns `false` once
    /// nothing is left to simulate.
    pub fn step_once(&mut self, dt: f32) -> bool {
        self.time += dt;
        let alive = self.group.update(dt);
        self.group.render();
        alive
    }

    pub fn report(&self, frame: u32) {
        let stats = *self.stats.borrow();
        info!(
            "[{:?}] frame {frame} t={:.2}s: {} particles, mean position {:.2}, alpha {:.2}, size {:.2}",
            self.kind, self.time, stats.particles, stats.mean_position, stats.mean_alpha, stats.mean_size
        );
        debug!(
            "[{:?}] bounds {:.2} .. {:.2}, {} pending",
            self.kind,
            self.group.aabb_min(),
            self.group.aabb_max(),
            self.group.nb_buffered_particles()
        );
    }
}

/// Colored particles fading out and growing over their life.
fn fading_model(life_min: f32, life_max: f32) -> Result<Model> {
    let mut model = Model::new(
        ModelFlags::RED | ModelFlags::GREEN | ModelFlags::BLUE | ModelFlags::ALPHA | ModelFlags::SIZE,
        ModelFlags::RED | ModelFlags::GREEN | ModelFlags::ALPHA,
        ModelFlags::RED | ModelFlags::GREEN,
        ModelFlags::SIZE,
    );
    model.set_life_time(life_min, life_max);
    model.set_param(ModelParam::Red, &[0.8, 1.0, 0.2, 0.4])?;
    model.set_param(ModelParam::Green, &[0.4, 0.6, 0.0, 0.1])?;
    model.set_param(ModelParam::Blue, &[0.2])?;
    model.set_param(ModelParam::Alpha, &[1.0, 0.0])?;
    if let Some(size) = model.interpolator_mut(ModelParam::Size) {
        size.source = InterpolationSource::LifeRatio;
        size.add_entry(0.0, 0.1, 0.2).add_entry(1.0, 0.4, 0.8);
    }
    Ok(model)
}

fn config(capacity: usize, seed: Option<u64>) -> Config {
    Config {
        capacity,
        seed,
        aabb_computation: true,
        ..Config::default()
    }
}

fn fountain(seed: Option<u64>) -> Result<Group> {
    let mut group = Group::new(Rc::new(fading_model(2.0, 3.0)?), config(2000, seed));
    group.set_gravity(Vec3::new(0.0, -9.81, 0.0));
    group.set_friction(0.2);
    group.enable_sorting(true);
    group.set_camera_position(Vec3::new(0.0, 2.0, 8.0));

    let nozzle = Emitter::new(VelocityStrategy::spheric(Vec3::Y, 0.0, PI / 12.0))
        .with_zone(Handle::owned(Zone::sphere(Vec3::ZERO, 0.1)), true)
        .with_flow(400.0)
        .with_force(6.0, 8.0);
    group.add_emitter(Handle::owned(nozzle));

    let floor = Modifier::new(Obstacle::new(0.6, 0.8))
        .with_zone(Handle::owned(Zone::plane(Vec3::new(0.0, -0.5, 0.0), Vec3::Y)), true)
        .with_trigger(Trigger::IntersectZone)?;
    group.add_modifier(Handle::owned(floor));
    group.add_modifier(Handle::owned(Modifier::new(Collision::new(0.5, 0.8))));

    let wind = Modifier::new(LinearForce::new(Vec3::new(1.5, 0.0, 0.0)).with_factor(ForceFactor::Linear(ModelParam::Size)))
        .with_zone(Handle::owned(Zone::aabox(Vec3::new(0.0, 4.0, 0.0), Vec3::new(20.0, 4.0, 20.0))), true);
    group.add_modifier(Handle::owned(wind));
    Ok(group)
}

fn vortex(seed: Option<u64>) -> Result<Group> {
    let mut group = Group::new(Rc::new(fading_model(4.0, 6.0)?), config(3000, seed));

    let ring = Emitter::new(VelocityStrategy::normal(true))
        .with_zone(Handle::owned(Zone::ring(Vec3::ZERO, Vec3::Y, 3.0, 3.5)), true)
        .with_flow(300.0)
        .with_force(0.2, 0.5);
    group.add_emitter(Handle::owned(ring));

    let mut spin = Vortex::new(Vec3::ZERO, Vec3::Y, 2.0, 0.3).with_eye(0.2, true);
    spin.angular_speed = true;
    group.add_modifier(Handle::owned(Modifier::new(spin)));

    let lift = Modifier::new(LinearForce::new(Vec3::new(0.0, 0.8, 0.0)))
        .with_zone(Handle::owned(Zone::cylinder(Vec3::ZERO, Vec3::Y, 1.5, 10.0)), true);
    group.add_modifier(Handle::owned(lift));
    Ok(group)
}

fn explosion(seed: Option<u64>) -> Result<Group> {
    let mut model = Model::new(
        ModelFlags::RED | ModelFlags::ALPHA | ModelFlags::SIZE | ModelFlags::ANGLE | ModelFlags::ROTATION_SPEED,
        ModelFlags::ALPHA,
        ModelFlags::RED | ModelFlags::ROTATION_SPEED,
        ModelFlags::empty(),
    );
    model.set_life_time(3.0, 5.0);
    model.set_param(ModelParam::Red, &[0.6, 1.0])?;
    model.set_param(ModelParam::Alpha, &[1.0, 0.0])?;
    model.set_param(ModelParam::Size, &[0.3])?;
    model.set_param(ModelParam::RotationSpeed, &[-PI, PI])?;
    let mut group = Group::new(Rc::new(model), config(1000, seed));

    let burst = Emitter::new(VelocityStrategy::Random)
        .with_zone(Handle::owned(Zone::sphere(Vec3::ZERO, 0.2)), true)
        .with_flow(-1.0)
        .with_tank(800)
        .with_force(4.0, 10.0);
    group.add_emitter(Handle::owned(burst));

    // One shared zone bounds the scene for the whole modifier group.
    let bounds = Handle::shared(Zone::sphere(Vec3::ZERO, 12.0));
    let mut inside = ModifierGroup::new(false);
    inside.add_modifier(Handle::owned(Modifier::new(PointMass::new(Vec3::ZERO, 6.0, 0.5))));
    inside.add_modifier(Handle::owned(Modifier::new(Rotator)));
    group.add_modifier(Handle::owned(Modifier::new(inside).with_zone(bounds.clone(), true)));

    let escape = Modifier::new(Destroyer)
        .with_zone(bounds, true)
        .with_trigger(Trigger::ExitZone)?;
    group.add_modifier(Handle::owned(escape));
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_scene_builds_and_runs() {
        for kind in SceneKind::value_variants() {
            let mut scene = Scene::new(*kind, Some(7)).unwrap();
            for _ in 0..30 {
                scene.step_once(1.0 / 60.0);
            }
            assert!(scene.stats.borrow().particles > 0, "{kind:?}");
        }
    }

    #[test]
    fn explosion_goes_idle_once_everything_died() {
        let mut scene = Scene::new(SceneKind::Explosion, Some(7)).unwrap();
        let mut frames = 0;
        while scene.step_once(0.1) {
            frames += 1;
            assert!(frames < 100);
        }
        assert_eq!(scene.group.nb_particles(), 0);
    }
}
