// synlidar_core/src/hits.rs

use tracing::trace;

use crate::types::{EntityHitMap, EntityId, Vec3};
use crate::world::EntityKinematics;

/// Per-entity statistics gathered over one scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityHitStats {
    pub hits: u32,
    /// Forward axis of the entity when it was first struck.
    pub forward: Vec3,
    /// Entity centre relative to the camera when it was first struck.
    pub position: Vec3,
    /// Largest projection of a ray hit onto `forward`, relative to the centre.
    pub max_front: f64,
    /// Smallest projection of a ray hit onto `forward`, relative to the centre.
    pub max_back: f64,
}

impl EntityHitStats {
    pub fn new(forward: Vec3, position: Vec3) -> Self {
        Self {
            hits: 0,
            forward,
            position,
            max_front: f64::NEG_INFINITY,
            max_back: f64::INFINITY,
        }
    }

    /// Widens the longitudinal extent with a camera-relative hit point.
    pub fn widen(&mut self, hit_offset: &Vec3) {
        let along = (hit_offset - self.position).dot(&self.forward);
        self.max_front = self.max_front.max(along);
        self.max_back = self.max_back.min(along);
    }

    /// `(back, front)` extent along the forward axis, once a ray has widened it.
    pub fn longitudinal_extent(&self) -> Option<(f64, f64)> {
        (self.max_back <= self.max_front).then_some((self.max_back, self.max_front))
    }
}

/// Accumulates hits into a caller-owned [`EntityHitMap`] for one scan.
/// World geometry and the ego vehicle are never tracked.
pub struct HitTracker<'a, W: EntityKinematics + ?Sized> {
    map: &'a mut EntityHitMap,
    world: &'a W,
    camera_position: Vec3,
    ego: EntityId,
}

impl<'a, W: EntityKinematics + ?Sized> HitTracker<'a, W> {
    pub fn new(map: &'a mut EntityHitMap, world: &'a W, camera_position: Vec3, ego: EntityId) -> Self {
        Self {
            map,
            world,
            camera_position,
            ego,
        }
    }

    /// Counts a depth-map point that landed on `entity`.
    pub fn record_depth_hit(&mut self, entity: EntityId) {
        if let Some(stats) = self.stats_for(entity) {
            stats.hits += 1;
        }
    }

    /// Counts a ray hit on `entity` and widens its extent.
    /// `hit_offset` is the hit point relative to the camera.
    pub fn record_ray_hit(&mut self, entity: EntityId, hit_offset: &Vec3) {
        if let Some(stats) = self.stats_for(entity) {
            stats.hits += 1;
            stats.widen(hit_offset);
        }
    }

    fn stats_for(&mut self, entity: EntityId) -> Option<&mut EntityHitStats> {
        if entity.is_none() || entity == self.ego {
            return None;
        }
        if !self.map.contains_key(&entity) {
            let Some(state) = self.world.entity_state(entity) else {
                trace!(entity = entity.0, "Struck entity has no kinematic state, not tracked");
                return None;
            };
            let stats = EntityHitStats::new(state.forward, state.position - self.camera_position);
            self.map.insert(entity, stats);
        }
        self.map.get_mut(&entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::EntityState;
    use approx::assert_relative_eq;
    use nalgebra::Quaternion;

    struct OneCar;

    impl EntityKinematics for OneCar {
        fn entity_state(&self, id: EntityId) -> Option<EntityState> {
            (id == EntityId(7)).then(|| EntityState {
                position: Vec3::new(10.0, 20.0, 0.0),
                velocity: Vec3::zeros(),
                speed: 0.0,
                forward: Vec3::y(),
                orientation: Quaternion::identity(),
                is_ped: false,
                is_vehicle: true,
                is_stationary: true,
            })
        }

        fn model_name(&self, _id: EntityId) -> Option<String> {
            None
        }
    }

    #[test]
    fn first_hit_creates_entry_relative_to_camera() {
        let mut map = EntityHitMap::new();
        let mut tracker = HitTracker::new(&mut map, &OneCar, Vec3::new(10.0, 0.0, 0.0), EntityId(1));
        tracker.record_depth_hit(EntityId(7));
        tracker.record_depth_hit(EntityId(7));
        let stats = map[&EntityId(7)];
        assert_eq!(stats.hits, 2);
        assert_relative_eq!(stats.position, Vec3::new(0.0, 20.0, 0.0));
        assert_eq!(stats.longitudinal_extent(), None);
    }

    #[test]
    fn ray_hits_widen_the_extent() {
        let mut map = EntityHitMap::new();
        let mut tracker = HitTracker::new(&mut map, &OneCar, Vec3::new(10.0, 0.0, 0.0), EntityId(1));
        tracker.record_ray_hit(EntityId(7), &Vec3::new(0.5, 22.0, 0.3));
        tracker.record_ray_hit(EntityId(7), &Vec3::new(-0.5, 18.5, 0.3));
        tracker.record_ray_hit(EntityId(7), &Vec3::new(0.0, 21.0, 1.0));
        let stats = map[&EntityId(7)];
        assert_eq!(stats.hits, 3);
        let (back, front) = stats.longitudinal_extent().unwrap();
        assert_relative_eq!(back, -1.5, epsilon = 1e-12);
        assert_relative_eq!(front, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn world_geometry_ego_and_unknown_entities_are_skipped() {
        let mut map = EntityHitMap::new();
        let mut tracker = HitTracker::new(&mut map, &OneCar, Vec3::zeros(), EntityId(7));
        tracker.record_depth_hit(EntityId::NONE);
        tracker.record_depth_hit(EntityId(7));
        tracker.record_ray_hit(EntityId(9), &Vec3::zeros());
        assert!(map.is_empty());
    }
}
