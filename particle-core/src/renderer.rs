use crate::buffer::BufferHandler;
use crate::group::Group;

/// Consumer of the particle arrays of a group.
///
/// Drawing happens outside this crate. A renderer reads
/// [`Group::particle_data`] and [`Group::current_params`] (with
/// [`Group::param_stride`] and [`Group::param_offset`]) and may keep
/// per-particle buffers on the group's pool through [`BufferHandler`].
pub trait Renderer: BufferHandler {
    fn is_active(&self) -> bool {
        true
    }

    fn render(&mut self, group: &Group);
}
