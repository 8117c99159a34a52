use serde_json::{Map, Value};

use crate::SchemaError;

/// Bidirectional transform between a wire payload and an in-memory shape.
///
/// Generated per resource by [`crate::resource!`] and per tagged union by
/// [`crate::one_of!`].
pub trait Schema: Sized {
    /// Builds the in-memory shape from a JSON payload.
    fn load(payload: &Value) -> Result<Self, SchemaError>;

    /// Renders a request payload.
    fn dump(&self) -> Result<Map<String, Value>, SchemaError>;

    /// Loads every element of a JSON array, preserving order.
    fn load_many(payload: &Value) -> Result<Vec<Self>, SchemaError> {
        payload
            .as_array()
            .ok_or_else(|| SchemaError::validation("<root>", "expected an array"))?
            .iter()
            .map(Self::load)
            .collect()
    }

    /// Dumps every item into a JSON array, preserving order.
    fn dump_many(items: &[Self]) -> Result<Value, SchemaError> {
        items
            .iter()
            .map(|item| item.dump().map(Value::Object))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

/// Reads the discriminator tag of a tagged payload.
pub fn discriminator_tag<'a>(payload: &'a Value, field: &str) -> Result<&'a str, SchemaError> {
    let object = payload.as_object().ok_or_else(|| SchemaError::NotAnObject {
        kind: format!("'{field}'-tagged payload"),
    })?;
    object
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| SchemaError::MissingDiscriminator {
            field: field.to_owned(),
        })
}

/// Copy of `payload` without the discriminator key.
///
/// The tag belongs to the dispatcher, so concrete schemas never see it.
pub fn without_discriminator(payload: &Value, field: &str) -> Value {
    match payload {
        Value::Object(object) => Value::Object(
            object
                .iter()
                .filter(|(key, _)| key.as_str() != field)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Declares a tagged union of resources selected by a discriminator field.
///
/// `load` reads the discriminator and delegates to the schema registered for
/// that tag; `dump` takes the tag from the variant and writes it back next to
/// the concrete payload. Tags live in this one table, so a variant without a
/// tag does not compile.
///
/// ```ignore
/// one_of! {
///     pub enum ParameterDefinition("type") {
///         String(StringParameter) = "string",
///         Integer(IntegerParameter) = "integer",
///     }
/// }
/// ```
#[macro_export]
macro_rules! one_of {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident ($discriminator:literal) {
            $( $(#[$variant_meta:meta])* $variant:ident ( $ty:ty ) = $tag:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        $vis enum $name {
            $( $(#[$variant_meta])* $variant($ty), )+
        }

        impl $name {
            /// Wire key holding the tag.
            pub const DISCRIMINATOR: &'static str = $discriminator;

            /// Registered tags, in declaration order.
            pub const TAGS: &'static [&'static str] = &[$($tag),+];

            /// Tag written for this variant.
            pub fn tag(&self) -> &'static str {
                match self {
                    $( Self::$variant(_) => $tag, )+
                }
            }

            /// Concrete resource type name of this variant.
            pub fn kind(&self) -> &'static str {
                match self {
                    $( Self::$variant(inner) => $crate::Resource::kind(inner), )+
                }
            }
        }

        $(
            impl ::core::convert::From<$ty> for $name {
                fn from(inner: $ty) -> Self {
                    Self::$variant(inner)
                }
            }
        )+

        impl $crate::Schema for $name {
            fn load(
                payload: &$crate::__private::Value,
            ) -> ::core::result::Result<Self, $crate::SchemaError> {
                let tag = $crate::__private::discriminator_tag(payload, $discriminator)?;
                let body = $crate::__private::without_discriminator(payload, $discriminator);
                match tag {
                    $( $tag => <$ty as $crate::Schema>::load(&body).map(Self::$variant), )+
                    other => ::core::result::Result::Err($crate::SchemaError::UnknownDiscriminator {
                        field: $discriminator.to_owned(),
                        tag: other.to_owned(),
                    }),
                }
            }

            fn dump(
                &self,
            ) -> ::core::result::Result<
                $crate::__private::Map<::std::string::String, $crate::__private::Value>,
                $crate::SchemaError,
            > {
                let mut payload = match self {
                    $( Self::$variant(inner) => $crate::Schema::dump(inner)?, )+
                };
                payload.insert(
                    $discriminator.to_owned(),
                    $crate::__private::Value::from(self.tag()),
                );
                ::core::result::Result::Ok(payload)
            }
        }

        $crate::__schema_serde!($name);

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                match self {
                    $( Self::$variant(inner) => ::core::fmt::Display::fmt(inner, f), )+
                }
            }
        }
    };
}

/// Serde impls for a [`Schema`] type, so it nests inside other fields.
///
/// Serialization writes [`Schema::dump`]; deserialization buffers a JSON
/// value and runs [`Schema::load`].
#[doc(hidden)]
#[macro_export]
macro_rules! __schema_serde {
    ($name:ident) => {
        impl $crate::__private::serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::core::result::Result<S::Ok, S::Error>
            where
                S: $crate::__private::serde::Serializer,
            {
                let payload = $crate::Schema::dump(self)
                    .map_err(<S::Error as $crate::__private::serde::ser::Error>::custom)?;
                $crate::__private::serde::Serialize::serialize(&payload, serializer)
            }
        }

        impl<'de> $crate::__private::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: $crate::__private::serde::Deserializer<'de>,
            {
                let payload = <$crate::__private::Value as $crate::__private::serde::Deserialize>::deserialize(
                    deserializer,
                )?;
                <Self as $crate::Schema>::load(&payload)
                    .map_err(<D::Error as $crate::__private::serde::de::Error>::custom)
            }
        }
    };
}
