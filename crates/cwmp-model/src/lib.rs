//! Data model tree types for the cwmpwalk ACS.
//!
//! A CWMP device exposes a hierarchical, dot-separated namespace of objects
//! and parameters. This crate provides the in-memory representation that the
//! walk accumulates: [`Object`] (a container path ending in `.`),
//! [`Parameter`] (a leaf with an optional value), and [`DataModel`] (the flat,
//! append-only collection of discovered objects).
//!
//! Sub-objects are not nested inside their parents: every object is a
//! top-level entry in the [`DataModel`], related to its ancestors only by
//! path prefix. All types are serializable for reporting output.

use serde::Serialize;

/// Whether a device-reported name refers to a container object or a leaf
/// parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Object,
    Parameter,
}

impl ItemKind {
    /// Classify a reported name: object paths carry a trailing dot.
    #[must_use]
    pub fn of(name: &str) -> Self {
        if name.ends_with('.') {
            ItemKind::Object
        } else {
            ItemKind::Parameter
        }
    }
}

/// Errors raised by model tree lookups.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A value was reported for a parameter that was never discovered by name.
    #[error("no parameter named {0} on this object")]
    UnknownParameter(String),
}

/// A leaf parameter: full dotted path, leaf name, device-reported writable
/// flag, and a value that stays absent until a value-discovery response
/// supplies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    full_path: String,
    name: String,
    writable: bool,
    value: Option<String>,
}

impl Parameter {
    #[must_use]
    pub fn new(full_path: impl Into<String>, writable: bool) -> Self {
        let full_path = full_path.into();
        let name = full_path
            .rsplit('.')
            .next()
            .unwrap_or(full_path.as_str())
            .to_string();
        Self {
            full_path,
            name,
            writable,
            value: None,
        }
    }

    /// The last path segment, e.g. `Uptime` for `Device.Uptime`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full dotted path, no trailing dot.
    #[must_use]
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    #[must_use]
    pub fn writable(&self) -> bool {
        self.writable
    }

    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Set the parameter's value, overwriting any previous one.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = Some(value.into());
    }
}

/// A container object: full dotted path with a trailing dot, plus the leaf
/// parameters discovered directly beneath it. Child objects are separate
/// [`DataModel`] entries, not nested here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Object {
    path: String,
    writable: bool,
    parameters: Vec<Parameter>,
}

impl Object {
    #[must_use]
    pub fn new(path: impl Into<String>, writable: bool) -> Self {
        Self {
            path: path.into(),
            writable,
            parameters: Vec::new(),
        }
    }

    /// The full dotted path, trailing dot included.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn writable(&self) -> bool {
        self.writable
    }

    /// Attach a parameter, keyed by full path. A parameter reported twice
    /// under the same path replaces the earlier entry; insertion order is
    /// preserved for reporting.
    pub fn add_parameter(&mut self, parameter: Parameter) {
        if let Some(existing) = self
            .parameters
            .iter_mut()
            .find(|p| p.full_path() == parameter.full_path())
        {
            *existing = parameter;
        } else {
            self.parameters.push(parameter);
        }
    }

    /// The parameters attached to this object, in discovery order.
    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }

    #[must_use]
    pub fn parameter(&self, full_path: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.full_path() == full_path)
    }

    /// Look up a parameter by full path for mutation.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownParameter`] if no parameter with that
    /// path was attached to this object.
    pub fn parameter_mut(&mut self, full_path: &str) -> Result<&mut Parameter, ModelError> {
        self.parameters
            .iter_mut()
            .find(|p| p.full_path() == full_path)
            .ok_or_else(|| ModelError::UnknownParameter(full_path.to_string()))
    }
}

/// The accumulated result of a walk: discovered objects in visit order.
/// Objects are only ever added, never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataModel {
    objects: Vec<Object>,
}

impl DataModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a discovered object and return its index.
    pub fn push(&mut self, object: Object) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    #[must_use]
    pub fn contains_path(&self, path: &str) -> bool {
        self.objects.iter().any(|o| o.path() == path)
    }

    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.iter()
    }

    #[must_use]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Object> {
        self.objects.get_mut(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
