//! Entity lifecycle manager
//!
//! One `Spawner` per entity kind. Each owns a capacity-bounded collection and
//! runs move → expire → spawn every active tick. The session decides when a
//! spawner is ticked at all: outside `Playing` it is simply not called, so its
//! spawn timer and entities stay frozen.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::entity::{Entity, EntityKind, Motion};
use crate::random_in_disk;
use crate::tuning::{MotionStyle, Span, SpawnerConfig, TunnelGeometry, TuningError};

/// Spawner readiness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Waiting for the initial spawn delay
    NotReady,
    Ready,
}

/// Bounded spawn/move/expire engine for one entity kind
#[derive(Debug, Clone)]
pub struct Spawner {
    config: SpawnerConfig,
    tunnel: TunnelGeometry,
    entities: Vec<Entity>,
    readiness: Readiness,
    spawn_timer: f32,
    next_id: u64,
    session_id: u32,
    seed: u64,
    rng: Pcg32,
}

impl Spawner {
    /// Rejects configs that would stall or panic the spawn loop
    pub fn new(
        config: SpawnerConfig,
        tunnel: TunnelGeometry,
        seed: u64,
        session_id: u32,
    ) -> Result<Self, TuningError> {
        config.validate()?;
        let seed = seed_for(seed, config.kind);
        Ok(Self {
            entities: Vec::with_capacity(config.capacity),
            config,
            tunnel,
            readiness: Readiness::NotReady,
            spawn_timer: 0.0,
            next_id: 0,
            session_id,
            seed,
            rng: Pcg32::seed_from_u64(seed ^ session_id as u64),
        })
    }

    pub fn kind(&self) -> EntityKind {
        self.config.kind
    }

    pub fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    /// Current collection, oldest first
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }

    pub fn spawn_timer(&self) -> f32 {
        self.spawn_timer
    }

    /// Called when the session's readiness task fires
    pub fn mark_ready(&mut self) {
        if self.readiness == Readiness::NotReady {
            log::info!("{:?} spawner ready", self.config.kind);
        }
        self.readiness = Readiness::Ready;
    }

    /// Clear everything for a new session
    pub fn reset(&mut self, session_id: u32) {
        self.entities.clear();
        self.readiness = Readiness::NotReady;
        self.spawn_timer = 0.0;
        self.next_id = 0;
        self.session_id = session_id;
        self.rng = Pcg32::seed_from_u64(self.seed ^ session_id as u64);
    }

    /// Remove an entity by id (after a reported collision)
    pub fn remove(&mut self, id: &str) -> Option<Entity> {
        let index = self.entities.iter().position(|e| e.id == id)?;
        Some(self.entities.remove(index))
    }

    #[cfg(test)]
    pub(crate) fn inject(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    /// Advance one tick: move, expire, spawn. Returns how many entities spawned.
    ///
    /// Does nothing until the spawner is ready.
    pub fn update(&mut self, dt: f32) -> usize {
        if self.readiness != Readiness::Ready {
            return 0;
        }
        if !(dt.is_finite() && dt >= 0.0) {
            log::warn!("{:?} spawner skipped tick with bad dt {}", self.config.kind, dt);
            return 0;
        }

        // Move
        for entity in &mut self.entities {
            entity.advance(dt);
        }

        // Expire
        let out_of_bounds_z = self.tunnel.out_of_bounds_z;
        let kind = self.config.kind;
        self.entities.retain(|e| {
            if !e.is_well_formed() {
                log::warn!("Dropping malformed {:?} entity {}", kind, e.id);
                return false;
            }
            let keep = e.position.z < out_of_bounds_z && !e.is_expired();
            if !keep {
                log::debug!("{} expired at z={:.2} age={:.2}", e.id, e.position.z, e.time_alive);
            }
            keep
        });

        // Spawn, catching up on several intervals after a stall
        self.spawn_timer += dt;
        let mut spawned = 0;
        while self.entities.len() < self.config.capacity
            && self.spawn_timer >= self.config.spawn_interval
        {
            match self.build_entity() {
                Ok(entity) => {
                    log::debug!("Spawned {} at {:?}", entity.id, entity.position);
                    self.entities.push(entity);
                    spawned += 1;
                }
                Err(err) => log::warn!("{:?} spawn rejected: {}", self.config.kind, err),
            }
            self.spawn_timer -= self.config.spawn_interval;
        }
        spawned
    }

    fn build_entity(&mut self) -> Result<Entity, super::entity::EntityError> {
        let spawn_radius = self.tunnel.spawn_radius();
        let (x, y) = random_in_disk(&mut self.rng, spawn_radius);
        let position = Vec3::new(x, y, self.tunnel.spawn_z);

        let speed = sample(&mut self.rng, self.config.speed);
        let size = sample(&mut self.rng, self.config.size);
        let lifetime = sample(&mut self.rng, self.config.lifetime);

        let motion = match self.config.motion {
            MotionStyle::Axis => Motion::Axis { speed },
            MotionStyle::Seek => {
                let (tx, ty) = random_in_disk(&mut self.rng, spawn_radius);
                Motion::Seek {
                    target: Vec3::new(tx, ty, self.tunnel.out_of_bounds_z),
                    speed,
                }
            }
        };

        let id = format!(
            "{}-s{}-{}",
            self.config.kind.prefix(),
            self.session_id,
            self.next_id
        );
        self.next_id += 1;

        Entity::new(id, self.config.kind, position, motion, size, lifetime)
    }
}

fn sample(rng: &mut Pcg32, span: Span) -> f32 {
    if span.max > span.min {
        rng.random_range(span.min..=span.max)
    } else {
        span.min
    }
}

/// Per-kind seed so spawners don't mirror each other
fn seed_for(seed: u64, kind: EntityKind) -> u64 {
    let salt: u64 = match kind {
        EntityKind::Germ => 0x9E37_79B9_7F4A_7C15,
        EntityKind::Dust => 0xC2B2_AE3D_27D4_EB4F,
        EntityKind::Knowledge => 0x1656_67B1_9E37_79F9,
    };
    seed.wrapping_mul(6364136223846793005).wrapping_add(salt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn spawner(kind: EntityKind) -> Spawner {
        let mut s = Spawner::new(
            SpawnerConfig::for_kind(kind),
            TunnelGeometry::default(),
            42,
            1,
        )
        .unwrap();
        s.mark_ready();
        s
    }

    #[test]
    fn test_not_ready_does_nothing() {
        let mut s = Spawner::new(
            SpawnerConfig::for_kind(EntityKind::Germ),
            TunnelGeometry::default(),
            42,
            1,
        )
        .unwrap();
        assert_eq!(s.update(10.0), 0);
        assert!(s.is_empty());
        assert_eq!(s.spawn_timer(), 0.0);
    }

    #[test]
    fn test_spawns_on_interval() {
        let mut s = spawner(EntityKind::Germ);
        assert_eq!(s.update(1.0), 0);
        assert_eq!(s.update(1.0), 1);
        assert_eq!(s.len(), 1);
        assert!(s.spawn_timer().abs() < 1e-6);
    }

    #[test]
    fn test_catch_up_spawns_several_after_stall() {
        let mut s = spawner(EntityKind::Germ);
        // Three intervals in one tick
        assert_eq!(s.update(6.5), 3);
        assert!((s.spawn_timer() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_capacity_caps_catch_up() {
        let mut s = spawner(EntityKind::Dust);
        s.update(100.0);
        assert_eq!(s.len(), s.capacity());
        // Timer keeps the surplus
        assert!(s.spawn_timer() >= 3.0);
    }

    #[test]
    fn test_spawned_entities_respect_config() {
        let mut s = spawner(EntityKind::Germ);
        s.update(16.0);
        let tunnel = TunnelGeometry::default();
        let config = SpawnerConfig::for_kind(EntityKind::Germ);
        for e in s.entities() {
            assert!(config.size.contains(e.size));
            assert!(config.lifetime.contains(e.max_lifetime));
            assert!(config.speed.contains(e.motion.speed()));
            let r = Vec3::new(e.position.x, e.position.y, 0.0).length();
            assert!(r <= tunnel.spawn_radius() + 1e-4);
            assert!(matches!(
                e.motion,
                Motion::Seek { target, .. } if target.z == tunnel.out_of_bounds_z
            ));
        }
    }

    #[test]
    fn test_ids_are_unique_and_tagged() {
        let mut s = spawner(EntityKind::Knowledge);
        s.update(5.0);
        s.update(5.0);
        let ids: Vec<_> = s.entities().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["ko-s1-0", "ko-s1-1"]);
    }

    #[test]
    fn test_out_of_bounds_entities_removed_next_tick() {
        let mut s = spawner(EntityKind::Knowledge);
        s.update(5.0);
        assert_eq!(s.len(), 1);
        // 300 units at 13 u/s is ~23 s; step past it in one go
        s.update(4.9);
        s.update(20.0);
        assert!(s.entities().iter().all(|e| e.position.z < OUT_OF_BOUNDS));
        assert!(s.entities().iter().all(|e| e.id != "ko-s1-0"));
    }

    const OUT_OF_BOUNDS: f32 = crate::consts::OUT_OF_BOUNDS_Z;

    #[test]
    fn test_expired_entities_removed() {
        let mut config = SpawnerConfig::for_kind(EntityKind::Germ);
        config.lifetime = Span::fixed(1.0);
        config.spawn_interval = 100.0;
        let mut s = Spawner::new(config, TunnelGeometry::default(), 1, 1).unwrap();
        s.mark_ready();
        s.update(100.0);
        assert_eq!(s.len(), 1);
        s.update(0.5);
        assert_eq!(s.len(), 1);
        s.update(0.5);
        assert!(s.is_empty());
    }

    #[test]
    fn test_remove_by_id() {
        let mut s = spawner(EntityKind::Germ);
        s.update(4.0);
        let id = s.entities()[0].id.clone();
        assert_eq!(s.remove(&id).map(|e| e.id), Some(id.clone()));
        assert!(s.remove(&id).is_none());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_reset_clears_and_restarts_ids() {
        let mut s = spawner(EntityKind::Knowledge);
        s.update(5.0);
        s.reset(2);
        assert!(s.is_empty());
        assert!(!s.is_ready());
        assert_eq!(s.spawn_timer(), 0.0);
        s.mark_ready();
        s.update(5.0);
        assert_eq!(s.entities()[0].id, "ko-s2-0");
    }

    #[test]
    fn test_same_seed_replays() {
        let mut a = spawner(EntityKind::Dust);
        let mut b = spawner(EntityKind::Dust);
        for _ in 0..20 {
            a.update(0.7);
            b.update(0.7);
        }
        let pa: Vec<_> = a.entities().iter().map(|e| e.position).collect();
        let pb: Vec<_> = b.entities().iter().map(|e| e.position).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_rejects_non_finite_span() {
        let mut config = SpawnerConfig::for_kind(EntityKind::Germ);
        config.speed = Span::new(0.0, f32::INFINITY);
        assert!(matches!(
            Spawner::new(config, TunnelGeometry::default(), 1, 1),
            Err(TuningError::Spawner {
                kind: EntityKind::Germ,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_zero_interval_with_unbuildable_entities() {
        // Would otherwise spin forever: every spawn fails and the timer never drains
        let mut config = SpawnerConfig::for_kind(EntityKind::Dust);
        config.spawn_interval = 0.0;
        config.size = Span::fixed(0.0);
        assert!(Spawner::new(config.clone(), TunnelGeometry::default(), 1, 1).is_err());

        config.size = Span::fixed(1.0);
        assert!(Spawner::new(config, TunnelGeometry::default(), 1, 1).is_err());
    }

    #[test]
    fn test_bad_dt_is_ignored() {
        let mut s = spawner(EntityKind::Germ);
        assert_eq!(s.update(f32::NAN), 0);
        assert_eq!(s.spawn_timer(), 0.0);
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_capacity(
            kind in prop_oneof![
                Just(EntityKind::Germ),
                Just(EntityKind::Dust),
                Just(EntityKind::Knowledge)
            ],
            steps in prop::collection::vec(0.0f32..12.0, 1..80),
            seed in any::<u64>(),
        ) {
            let mut s = Spawner::new(
                SpawnerConfig::for_kind(kind),
                TunnelGeometry::default(),
                seed,
                1,
            )
            .unwrap();
            s.mark_ready();
            for dt in steps {
                s.update(dt);
                prop_assert!(s.len() <= s.capacity());
                for e in s.entities() {
                    prop_assert!(e.time_alive < e.max_lifetime);
                    prop_assert!(e.position.z < OUT_OF_BOUNDS);
                }
            }
        }
    }
}
