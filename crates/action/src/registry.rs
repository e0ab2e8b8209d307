//! Ordered, keyed action collection with surface-filtered queries.

use std::sync::Arc;

use indexmap::IndexMap;
use manifold_error::DispatchError;

use crate::binding::Surface;
use crate::spec::ActionSpec;

/// The process-wide collection of declared actions.
///
/// Constructed explicitly and passed into adapters (never a module-level
/// singleton), so test harnesses build isolated registries. The lifecycle
/// discipline is "register before serving": populate at startup, then
/// treat as read-only once any surface starts accepting requests.
///
/// `add` fails loudly on an id collision by default. Test harnesses that
/// need to shadow an action opt into last-write-wins via
/// [`with_override`](Self::with_override).
///
/// # Example
///
/// ```rust
/// use manifold_action::{ActionOutput, ActionRegistry, ActionSpec, Surface, handler};
/// use manifold_schema::Schema;
///
/// let mut registry = ActionRegistry::new();
/// registry
///     .add(ActionSpec::new(
///         "docs.list",
///         Schema::object::<_, &str>([]),
///         handler(|input, _ctx| async move { Ok(ActionOutput::value(input)) }),
///     ))
///     .unwrap();
///
/// assert_eq!(registry.for_surface(Surface::Cli).len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: IndexMap<String, Arc<ActionSpec>>,
    allow_override: bool,
}

impl ActionRegistry {
    /// An empty registry that rejects id collisions.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty registry where a colliding `add` replaces the existing
    /// spec. Intended for test harnesses that shadow production actions.
    pub fn with_override() -> Self {
        Self {
            actions: IndexMap::new(),
            allow_override: true,
        }
    }

    /// Register an action.
    ///
    /// # Errors
    ///
    /// Returns a `validation` error when the id is already registered and
    /// override mode is off.
    pub fn add(&mut self, spec: ActionSpec) -> Result<(), DispatchError> {
        if !self.allow_override && self.actions.contains_key(&spec.id) {
            return Err(DispatchError::validation(format!(
                "action id `{}` is already registered",
                spec.id
            )));
        }
        // IndexMap keeps the original insertion position on overwrite, so
        // listing order stays stable across overrides.
        self.actions.insert(spec.id.clone(), Arc::new(spec));
        Ok(())
    }

    /// Look up an action by id.
    pub fn get(&self, id: &str) -> Option<&Arc<ActionSpec>> {
        self.actions.get(id)
    }

    /// All actions, in insertion order.
    pub fn list(&self) -> Vec<&Arc<ActionSpec>> {
        self.actions.values().collect()
    }

    /// Actions visible on `surface`, in insertion order.
    pub fn for_surface(&self, surface: Surface) -> Vec<Arc<ActionSpec>> {
        self.actions
            .values()
            .filter(|spec| spec.exposes(surface))
            .cloned()
            .collect()
    }

    /// Number of registered actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
