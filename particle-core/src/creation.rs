//! FIFO of particles requested through the `add_particles` family of
//! [`crate::group::Group`], launched before automatic emission on the next
//! update.

use std::collections::VecDeque;

use glam::Vec3;

use crate::emitter::Emitter;
use crate::handle::Handle;
use crate::zone::Zone;

/// `count` particles to create the same way.
///
/// The position comes from `zone` if set, otherwise it is `position`. The
/// velocity comes from `emitter` if set, otherwise it is `velocity`.
#[derive(Clone, Debug)]
pub struct CreationRequest {
    pub count: u32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub zone: Option<Handle<Zone>>,
    pub emitter: Option<Handle<Emitter>>,
    pub full: bool,
}

#[derive(Clone, Debug, Default)]
pub struct CreationQueue {
    requests: VecDeque<CreationRequest>,
    total: u32,
}

impl CreationQueue {
    /// Queues a request. Empty requests are ignored.
    pub fn push(&mut self, request: CreationRequest) {
        if request.count == 0 {
            return;
        }
        self.total = self.total.saturating_add(request.count);
        self.requests.push_back(request);
    }

    pub fn front(&self) -> Option<&CreationRequest> {
        self.requests.front()
    }

    /// Consumes one particle of the oldest request.
    pub fn pop_one(&mut self) {
        let Some(front) = self.requests.front_mut() else {
            return;
        };
        front.count -= 1;
        self.total = self.total.saturating_sub(1);
        if front.count == 0 {
            self.requests.pop_front();
        }
    }

    /// Number of particles still to create, over all requests.
    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn clear(&mut self) {
        self.requests.clear();
        self.total = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(count: u32, x: f32) -> CreationRequest {
        CreationRequest {
            count,
            position: Vec3::new(x, 0.0, 0.0),
            velocity: Vec3::ZERO,
            zone: None,
            emitter: None,
            full: false,
        }
    }

    #[test]
    fn total_tracks_the_sum_of_counts() {
        let mut queue = CreationQueue::default();
        queue.push(request(2, 1.0));
        queue.push(request(0, 2.0));
        queue.push(request(1, 3.0));
        assert_eq!(queue.total(), 3);
        assert_eq!(queue.len(), 2);

        queue.pop_one();
        assert_eq!(queue.total(), 2);
        assert_eq!(queue.front().map(|r| r.count), Some(1));

        queue.pop_one();
        assert_eq!(queue.front().map(|r| r.position.x), Some(3.0));

        queue.pop_one();
        queue.pop_one();
        assert!(queue.is_empty());
        assert_eq!(queue.total(), 0);
    }

    #[test]
    fn total_saturates() {
        let mut queue = CreationQueue::default();
        queue.push(request(u32::MAX, 0.0));
        queue.push(request(5, 1.0));
        assert_eq!(queue.total(), u32::MAX);
        queue.pop_one();
        assert_eq!(queue.total(), u32::MAX - 1);
    }
}
