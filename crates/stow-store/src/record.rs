//! Capabilities records provide to the store.
//!
//! The store knows nothing about record shapes. It needs two things from the
//! caller:
//!
//! - [`Identified`]: how to get the unique ID out of an object.
//! - [`Factory`]: how to make a fresh, empty instance to decode into.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An object that carries its own unique identifier.
pub trait Identified {
    /// Returns the object's identifier within its collection.
    fn id(&self) -> &str;
}

impl<T: Identified + ?Sized> Identified for &T {
    fn id(&self) -> &str {
        (**self).id()
    }
}

impl<T: Identified + ?Sized> Identified for Box<T> {
    fn id(&self) -> &str {
        (**self).id()
    }
}

/// Produces empty instances of `T` for decoding.
///
/// Implemented for every `Fn() -> T`, so `Widget::default` or
/// `|| Widget::new("draft")` can be passed directly.
pub trait Factory<T> {
    /// Creates a fresh instance.
    fn create(&self) -> T;
}

impl<T, F> Factory<T> for F
where
    F: Fn() -> T,
{
    fn create(&self) -> T {
        self()
    }
}

/// Common metadata embedded in record types.
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use stow_store::{Identified, Metadata};
///
/// #[derive(Default, Serialize, Deserialize)]
/// struct Widget {
///     #[serde(flatten)]
///     metadata: Metadata,
///     color: String,
/// }
///
/// impl Identified for Widget {
///     fn id(&self) -> &str {
///         self.metadata.id()
///     }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metadata {
    /// Identifier, unique within a collection.
    pub id: String,
}

impl Metadata {
    /// Creates metadata with the given identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Identified for Metadata {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A schemaless record: an `id` plus arbitrary JSON fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier, unique within a collection.
    pub id: String,
    /// Every other field of the object.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    /// Creates a document with no fields.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Sets a field, returning the document.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Returns a field value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

impl Identified for Document {
    fn id(&self) -> &str {
        &self.id
    }
}
