//! # Iteration Order
//!
//! Comparators used by ordered iteration containers. A container only needs
//! a consistent total order; how absent values rank is the comparator's call.

use super::source::ComponentSource;
use crate::ecs::{ComponentTypeId, EntityId};
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

/// Total order over entity ids.
pub trait EntityComparator: fmt::Debug + Send + Sync {
    /// Compares two entities. Must be a consistent total order for the
    /// duration of one read.
    fn compare(&self, a: EntityId, b: EntityId, source: &dyn ComponentSource) -> Ordering;

    /// Returns `true` if value changes of `type_id` may reorder entities.
    fn depends_on(&self, type_id: ComponentTypeId) -> bool {
        let _ = type_id;
        false
    }
}

/// Where entities lacking the sort component go.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AbsentPlacement {
    /// Absent values sort before every present value.
    First,
    /// Absent values sort after every present value.
    #[default]
    Last,
}

/// Sort direction for present values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Smallest value first.
    #[default]
    Ascending,
    /// Largest value first.
    Descending,
}

/// Orders entities by the value of one component type.
///
/// Ties (equal values, or both absent) are broken by entity id, so the order
/// is total and iteration is deterministic.
///
/// # Example
///
/// ```rust
/// use cohort_core::{AbsentPlacement, ComponentOrder, ComponentTypeId, Direction};
///
/// let by_depth = ComponentOrder::<i32>::new(ComponentTypeId::new(0))
///     .direction(Direction::Descending)
///     .absent(AbsentPlacement::First);
/// ```
pub struct ComponentOrder<C> {
    type_id: ComponentTypeId,
    absent: AbsentPlacement,
    direction: Direction,
    _component: PhantomData<fn() -> C>,
}

impl<C: Ord + 'static> ComponentOrder<C> {
    /// Ascending by `type_id`'s value, absent values last.
    #[must_use]
    pub fn new(type_id: ComponentTypeId) -> Self {
        Self {
            type_id,
            absent: AbsentPlacement::default(),
            direction: Direction::default(),
            _component: PhantomData,
        }
    }

    /// Sets the placement of entities lacking the component.
    #[must_use]
    pub fn absent(mut self, absent: AbsentPlacement) -> Self {
        self.absent = absent;
        self
    }

    /// Sets the direction for present values.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }
}

impl<C> fmt::Debug for ComponentOrder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentOrder")
            .field("type_id", &self.type_id)
            .field("absent", &self.absent)
            .field("direction", &self.direction)
            .finish()
    }
}

impl<C: Ord + 'static> EntityComparator for ComponentOrder<C> {
    fn compare(&self, a: EntityId, b: EntityId, source: &dyn ComponentSource) -> Ordering {
        let lhs = source.get::<C>(a, self.type_id);
        let rhs = source.get::<C>(b, self.type_id);

        let by_value = match (lhs, rhs) {
            (Some(x), Some(y)) => match self.direction {
                Direction::Ascending => x.cmp(y),
                Direction::Descending => y.cmp(x),
            },
            (None, None) => Ordering::Equal,
            (None, Some(_)) => match self.absent {
                AbsentPlacement::First => Ordering::Less,
                AbsentPlacement::Last => Ordering::Greater,
            },
            (Some(_), None) => match self.absent {
                AbsentPlacement::First => Ordering::Greater,
                AbsentPlacement::Last => Ordering::Less,
            },
        };

        by_value.then_with(|| a.cmp(&b))
    }

    fn depends_on(&self, type_id: ComponentTypeId) -> bool {
        type_id == self.type_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::collections::HashMap;

    const DEPTH: ComponentTypeId = ComponentTypeId::new(0);

    struct Depths(HashMap<EntityId, i32>);

    impl ComponentSource for Depths {
        fn has_component(&self, entity: EntityId, type_id: ComponentTypeId) -> bool {
            type_id == DEPTH && self.0.contains_key(&entity)
        }

        fn component(&self, entity: EntityId, type_id: ComponentTypeId) -> Option<&dyn Any> {
            if type_id != DEPTH {
                return None;
            }
            self.0.get(&entity).map(|v| v as &dyn Any)
        }

        fn type_count(&self) -> usize {
            1
        }

        fn for_each_entity(&self, f: &mut dyn FnMut(EntityId)) {
            self.0.keys().copied().for_each(f);
        }
    }

    fn sorted(order: &ComponentOrder<i32>, source: &Depths) -> Vec<u32> {
        let mut ids: Vec<EntityId> = (1..=5).map(EntityId::new).collect();
        ids.sort_by(|a, b| order.compare(*a, *b, source));
        ids.iter().map(|id| id.index()).collect()
    }

    fn source() -> Depths {
        // 2 and 4 have no depth
        Depths(HashMap::from([
            (EntityId::new(1), 30),
            (EntityId::new(3), 10),
            (EntityId::new(5), 10),
        ]))
    }

    #[test]
    fn test_absent_last() {
        let order = ComponentOrder::<i32>::new(DEPTH);
        assert_eq!(sorted(&order, &source()), vec![3, 5, 1, 2, 4]);
    }

    #[test]
    fn test_absent_first_descending() {
        let order = ComponentOrder::<i32>::new(DEPTH)
            .absent(AbsentPlacement::First)
            .direction(Direction::Descending);
        assert_eq!(sorted(&order, &source()), vec![2, 4, 1, 3, 5]);
    }

    #[test]
    fn test_depends_on() {
        let order = ComponentOrder::<i32>::new(DEPTH);
        assert!(order.depends_on(DEPTH));
        assert!(!order.depends_on(ComponentTypeId::new(1)));
    }
}
