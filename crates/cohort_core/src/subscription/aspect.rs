//! # Aspects
//!
//! An [`Aspect`] is an immutable interest predicate built from three
//! categories:
//!
//! - `all_of`: every element must hold
//! - `any_of`: at least one element must hold
//! - `exclude`: no element may hold
//!
//! Each element is a component type, an immutable singleton value, or a
//! condition over observable state. Aspects are values: two aspects built
//! from the same elements in any order are equal and hash the same, which is
//! what lets the manager share one subscription between them.

use super::source::ComponentSource;
use crate::ecs::{ComponentTypeId, EntityId};
use crate::error::AspectError;
use crate::memory::BitVector;
use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Predicate over observable entity state.
///
/// Conditions are compared by identity: reuse the same `Arc` to make two
/// aspects equal.
pub trait Condition: fmt::Debug + Send + Sync {
    /// Component types whose changes may flip the result.
    fn watched_types(&self) -> &[ComponentTypeId];

    /// Evaluates the condition. Must be free of side effects.
    fn evaluate(&self, entity: EntityId, source: &dyn ComponentSource) -> bool;
}

/// Closure-backed [`Condition`].
pub struct Predicate<F> {
    label: &'static str,
    watched: Vec<ComponentTypeId>,
    predicate: F,
}

impl<F> Predicate<F>
where
    F: Fn(EntityId, &dyn ComponentSource) -> bool + Send + Sync,
{
    /// Creates a condition named `label` re-evaluated when any of `watched`
    /// changes.
    pub fn new(label: &'static str, watched: &[ComponentTypeId], predicate: F) -> Self {
        Self {
            label,
            watched: watched.to_vec(),
            predicate,
        }
    }
}

impl<F> fmt::Debug for Predicate<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("label", &self.label)
            .field("watched", &self.watched)
            .finish_non_exhaustive()
    }
}

impl<F> Condition for Predicate<F>
where
    F: Fn(EntityId, &dyn ComponentSource) -> bool + Send + Sync,
{
    fn watched_types(&self) -> &[ComponentTypeId] {
        &self.watched
    }

    fn evaluate(&self, entity: EntityId, source: &dyn ComponentSource) -> bool {
        (self.predicate)(entity, source)
    }
}

/// Immutable singleton value an entity can hold ("has exactly this value").
///
/// Implemented for every `PartialEq + Hash + Debug` type.
pub trait InstanceValue: fmt::Debug + Send + Sync {
    /// The value as `Any`, for cross-instance comparison.
    fn as_any(&self) -> &dyn Any;

    /// Returns `true` if `value` is of the same type and equal.
    fn matches(&self, value: &dyn Any) -> bool;

    /// Hash of the value, consistent with [`InstanceValue::matches`].
    fn value_hash(&self) -> u64;
}

impl<T> InstanceValue for T
where
    T: Any + PartialEq + Hash + fmt::Debug + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn matches(&self, value: &dyn Any) -> bool {
        value.downcast_ref::<T>().is_some_and(|v| v == self)
    }

    fn value_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// One entry of an aspect category.
#[derive(Clone, Debug)]
pub enum AspectElement {
    /// Entity has a component of this type.
    Type(ComponentTypeId),
    /// Entity holds exactly this value for the component type.
    Instance {
        /// Component type holding the value.
        type_id: ComponentTypeId,
        /// The singleton value.
        value: Arc<dyn InstanceValue>,
    },
    /// Condition over observable state.
    Condition(Arc<dyn Condition>),
}

/// Identity used for duplicate detection and canonical ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum ElementKey {
    Component(u32),
    Condition(usize),
}

impl AspectElement {
    /// Singleton-value element.
    pub fn instance<T: InstanceValue + 'static>(type_id: ComponentTypeId, value: T) -> Self {
        Self::Instance {
            type_id,
            value: Arc::new(value),
        }
    }

    /// Condition element.
    pub fn condition<C: Condition + 'static>(condition: C) -> Self {
        Self::Condition(Arc::new(condition))
    }

    /// Evaluates this element for `entity`. Pure.
    #[inline]
    pub fn evaluate(&self, entity: EntityId, source: &dyn ComponentSource) -> bool {
        match self {
            Self::Type(type_id) => source.has_component(entity, *type_id),
            Self::Instance { type_id, value } => source
                .component(entity, *type_id)
                .is_some_and(|held| value.matches(held)),
            Self::Condition(condition) => condition.evaluate(entity, source),
        }
    }

    /// Component types whose changes may flip this element.
    pub fn types(&self) -> &[ComponentTypeId] {
        match self {
            Self::Type(type_id) | Self::Instance { type_id, .. } => std::slice::from_ref(type_id),
            Self::Condition(condition) => condition.watched_types(),
        }
    }

    fn key(&self) -> ElementKey {
        match self {
            Self::Type(type_id) | Self::Instance { type_id, .. } => {
                ElementKey::Component(type_id.index())
            }
            Self::Condition(condition) => {
                ElementKey::Condition(Arc::as_ptr(condition).cast::<()>() as usize)
            }
        }
    }
}

impl From<ComponentTypeId> for AspectElement {
    fn from(type_id: ComponentTypeId) -> Self {
        Self::Type(type_id)
    }
}

impl PartialEq for AspectElement {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Type(a), Self::Type(b)) => a == b,
            (
                Self::Instance { type_id: a, value: va },
                Self::Instance { type_id: b, value: vb },
            ) => a == b && va.matches(vb.as_any()),
            (Self::Condition(_), Self::Condition(_)) => self.key() == other.key(),
            _ => false,
        }
    }
}

impl Eq for AspectElement {}

impl Hash for AspectElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Type(type_id) => type_id.hash(state),
            Self::Instance { type_id, value } => {
                type_id.hash(state);
                value.value_hash().hash(state);
            }
            Self::Condition(_) => self.key().hash(state),
        }
    }
}

/// The three aspect categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AspectCategory {
    /// Every element must hold.
    AllOf,
    /// At least one element must hold.
    AnyOf,
    /// No element may hold.
    Exclude,
}

impl fmt::Display for AspectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AllOf => "allOf",
            Self::AnyOf => "anyOf",
            Self::Exclude => "exclude",
        })
    }
}

/// Immutable interest predicate.
///
/// # Example
///
/// ```rust
/// use cohort_core::{Aspect, ComponentTypeId};
///
/// let c1 = ComponentTypeId::new(0);
/// let c2 = ComponentTypeId::new(1);
/// let c3 = ComponentTypeId::new(2);
///
/// let aspect = Aspect::from_types(&[c1, c2], &[], &[c3]).unwrap();
/// assert!(!aspect.is_simple());
///
/// // A type may not appear twice.
/// assert!(Aspect::from_types(&[c1], &[], &[c1]).is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Aspect {
    all_of: Vec<AspectElement>,
    any_of: Vec<AspectElement>,
    exclude: Vec<AspectElement>,
}

impl Aspect {
    /// Builds an aspect, rejecting repeated types or conditions.
    ///
    /// # Errors
    ///
    /// Returns [`AspectError`] naming the first repeated type or condition.
    pub fn new(
        all_of: Vec<AspectElement>,
        any_of: Vec<AspectElement>,
        exclude: Vec<AspectElement>,
    ) -> Result<Self, AspectError> {
        let mut seen: HashMap<ElementKey, AspectCategory> = HashMap::new();
        let categories = [
            (AspectCategory::AllOf, &all_of),
            (AspectCategory::AnyOf, &any_of),
            (AspectCategory::Exclude, &exclude),
        ];

        for (category, elements) in categories {
            for element in elements {
                if let Some(first) = seen.insert(element.key(), category) {
                    return Err(match element {
                        AspectElement::Condition(condition) => AspectError::DuplicateCondition {
                            condition: format!("{condition:?}"),
                            first,
                            second: category,
                        },
                        AspectElement::Type(type_id) | AspectElement::Instance { type_id, .. } => {
                            AspectError::DuplicateType {
                                type_id: type_id.index(),
                                first,
                                second: category,
                            }
                        }
                    });
                }
            }
        }

        let mut aspect = Self {
            all_of,
            any_of,
            exclude,
        };
        aspect.all_of.sort_by_key(AspectElement::key);
        aspect.any_of.sort_by_key(AspectElement::key);
        aspect.exclude.sort_by_key(AspectElement::key);
        Ok(aspect)
    }

    /// Builds an aspect from plain component types.
    ///
    /// # Errors
    ///
    /// Returns [`AspectError::DuplicateType`] if a type repeats.
    pub fn from_types(
        all_of: &[ComponentTypeId],
        any_of: &[ComponentTypeId],
        exclude: &[ComponentTypeId],
    ) -> Result<Self, AspectError> {
        let elements = |types: &[ComponentTypeId]| -> Vec<AspectElement> {
            types.iter().copied().map(AspectElement::Type).collect()
        };
        Self::new(elements(all_of), elements(any_of), elements(exclude))
    }

    /// Aspect with no per-entity interest. Matches only the sentinel id.
    #[must_use]
    pub fn simple() -> Self {
        Self {
            all_of: Vec::new(),
            any_of: Vec::new(),
            exclude: Vec::new(),
        }
    }

    /// `true` if both `all_of` and `any_of` are empty.
    #[inline]
    #[must_use]
    pub fn is_simple(&self) -> bool {
        self.all_of.is_empty() && self.any_of.is_empty()
    }

    /// Evaluates the aspect for `entity`. Pure; short-circuits
    /// exclude, then any-of, then all-of.
    pub fn matches(&self, entity: EntityId, source: &dyn ComponentSource) -> bool {
        if self.exclude.iter().any(|e| e.evaluate(entity, source)) {
            return false;
        }
        if self.is_simple() {
            return entity.is_sentinel();
        }
        if !self.any_of.is_empty() && !self.any_of.iter().any(|e| e.evaluate(entity, source)) {
            return false;
        }
        self.all_of.iter().all(|e| e.evaluate(entity, source))
    }

    /// Component types whose changes may flip this aspect.
    #[must_use]
    pub fn relevant_types(&self) -> BitVector {
        self.elements()
            .flat_map(|(_, element)| element.types().iter().map(|t| t.slot()))
            .collect()
    }

    /// Every element with its category.
    pub fn elements(&self) -> impl Iterator<Item = (AspectCategory, &AspectElement)> + '_ {
        let all = self.all_of.iter().map(|e| (AspectCategory::AllOf, e));
        let any = self.any_of.iter().map(|e| (AspectCategory::AnyOf, e));
        let exclude = self.exclude.iter().map(|e| (AspectCategory::Exclude, e));
        all.chain(any).chain(exclude)
    }

    /// Elements that must all hold.
    #[must_use]
    pub fn all_of(&self) -> &[AspectElement] {
        &self.all_of
    }

    /// Elements of which one must hold.
    #[must_use]
    pub fn any_of(&self) -> &[AspectElement] {
        &self.any_of
    }

    /// Elements of which none may hold.
    #[must_use]
    pub fn exclude(&self) -> &[AspectElement] {
        &self.exclude
    }
}
