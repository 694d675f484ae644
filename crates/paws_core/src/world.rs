//! Entity collections and the read-only rules the systems consult.

use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::components::{Enemy, EntityId, Hero, Tower, Troop};
use crate::config::SimConfig;
use crate::data::DataTables;
use crate::economy::Wallet;
use crate::math::Millis;
use crate::path::PathNetwork;
use crate::projectile::Projectile;

/// Storage for one kind of entity.
///
/// Uses a `HashMap` for O(1) lookup by id, with deterministic iteration via
/// sorted keys when systems process entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStorage<T> {
    entities: HashMap<EntityId, T>,
}

impl<T> Default for EntityStorage<T> {
    fn default() -> Self {
        Self {
            entities: HashMap::new(),
        }
    }
}

impl<T> EntityStorage<T> {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity under an id allocated by the [`World`].
    pub fn insert(&mut self, id: EntityId, entity: T) {
        self.entities.insert(id, entity);
    }

    /// Remove an entity by id.
    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        self.entities.remove(&id)
    }

    /// Get an entity by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by id.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.entities.get_mut(&id)
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Sorted entity ids for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Entities in ascending id order.
    pub fn sorted(&self) -> impl Iterator<Item = &T> {
        self.sorted_ids()
            .into_iter()
            .filter_map(move |id| self.entities.get(&id))
    }

    /// Iterate over all entities (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &T)> {
        self.entities.iter()
    }

    /// Keep only entities matching the predicate.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.entities.retain(|_, e| keep(e));
    }
}

/// All mutable match state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    /// Simulation time.
    pub now: Millis,
    /// Milliseconds advanced by the current tick.
    pub dt: Millis,
    /// Towers.
    pub towers: EntityStorage<Tower>,
    /// Enemies.
    pub enemies: EntityStorage<Enemy>,
    /// Heroes.
    pub heroes: EntityStorage<Hero>,
    /// Troops.
    pub troops: EntityStorage<Troop>,
    /// Projectiles in flight.
    pub projectiles: EntityStorage<Projectile>,
    /// Paw Points.
    pub wallet: Wallet,
    /// Seeded generator for stun rolls and lane jitter.
    pub rng: ChaCha8Rng,
    next_id: EntityId,
}

impl World {
    /// Empty world with a seeded generator.
    #[must_use]
    pub fn new(seed: u64, starting_resources: u32) -> Self {
        Self {
            now: 0,
            dt: 0,
            towers: EntityStorage::new(),
            enemies: EntityStorage::new(),
            heroes: EntityStorage::new(),
            troops: EntityStorage::new(),
            projectiles: EntityStorage::new(),
            wallet: Wallet::new(starting_resources),
            rng: ChaCha8Rng::seed_from_u64(seed),
            next_id: 1,
        }
    }

    /// Allocate a fresh entity id, unique across all collections.
    pub fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Id the next allocation will return.
    #[must_use]
    pub const fn peek_next_id(&self) -> EntityId {
        self.next_id
    }
}

/// Read-only context for systems.
#[derive(Debug, Clone, Copy)]
pub struct Rules<'a> {
    /// Static definitions.
    pub tables: &'a DataTables,
    /// Gameplay constants.
    pub config: &'a SimConfig,
    /// Level paths.
    pub paths: &'a PathNetwork,
}
