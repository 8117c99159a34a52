use serde_json::Value;

use crate::{SchemaError, WireValue};

/// Value held by one declared resource field.
///
/// `Missing` is the "not supplied" marker: it is omitted from every payload,
/// while `Null` is sent as an explicit JSON `null`. Collapsing the two would
/// make "leave this alone" indistinguishable from "clear this".
#[derive(Clone, Debug, PartialEq)]
pub enum Field<T> {
    /// The field was not supplied.
    Missing,
    /// The field was explicitly set to null.
    Null,
    /// The field holds a value.
    Present(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::Missing
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Self::Present(value)
    }
}

impl<T> Field<T> {
    /// Builds a present field from anything convertible into `T`.
    pub fn present(value: impl Into<T>) -> Self {
        Self::Present(value.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Returns the value when present.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Missing | Self::Null => None,
        }
    }

    /// `None` when missing, `Some(None)` when null.
    pub fn into_option(self) -> Option<Option<T>> {
        match self {
            Self::Missing => None,
            Self::Null => Some(None),
            Self::Present(value) => Some(Some(value)),
        }
    }
}

impl<T: WireValue> Field<T> {
    /// Decodes a wire value; JSON `null` becomes [`Field::Null`].
    pub fn decode(wire_key: &str, value: &Value) -> Result<Self, SchemaError> {
        if value.is_null() {
            Ok(Self::Null)
        } else {
            T::from_wire(wire_key, value).map(Self::Present)
        }
    }

    /// Encodes the field; `None` means the key must be left out.
    pub fn encode(&self, wire_key: &str) -> Result<Option<Value>, SchemaError> {
        match self {
            Self::Missing => Ok(None),
            Self::Null => Ok(Some(Value::Null)),
            Self::Present(value) => value.to_wire(wire_key).map(Some),
        }
    }
}

/// Which way a field travels between client and server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    ReadWrite,
    /// Server-computed; loaded but never sent back.
    ReadOnly,
    /// Client-supplied secret or input; sent but never read back.
    WriteOnly,
}

/// Static metadata for one declared field.
///
/// Descriptors are built in const context by the [`crate::resource!`] macro,
/// so the whole mapping table of a resource lives in a `static` slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Attribute name on the Rust struct.
    pub logical_name: &'static str,
    /// Key used in JSON payloads.
    pub wire_key: &'static str,
    pub direction: Direction,
    pub nullable: bool,
    /// Whether the resource seeds a default instead of [`Field::Missing`].
    pub has_default: bool,
}

impl FieldDescriptor {
    /// Read-write, non-nullable field whose wire key equals its name.
    pub const fn new(logical_name: &'static str) -> Self {
        Self {
            logical_name,
            wire_key: logical_name,
            direction: Direction::ReadWrite,
            nullable: false,
            has_default: false,
        }
    }

    #[must_use]
    pub const fn wire(mut self, wire_key: &'static str) -> Self {
        self.wire_key = wire_key;
        self
    }

    #[must_use]
    pub const fn read_only(mut self) -> Self {
        self.direction = Direction::ReadOnly;
        self
    }

    #[must_use]
    pub const fn write_only(mut self) -> Self {
        self.direction = Direction::WriteOnly;
        self
    }

    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub const fn defaulted(mut self, has_default: bool) -> Self {
        self.has_default = has_default;
        self
    }

    /// Whether `load` reads this field from a payload.
    pub const fn is_loadable(&self) -> bool {
        !matches!(self.direction, Direction::WriteOnly)
    }

    /// Whether `dump` writes this field into a request payload.
    pub const fn is_dumpable(&self) -> bool {
        !matches!(self.direction, Direction::ReadOnly)
    }
}
