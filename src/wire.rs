use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::SchemaError;

/// Conversion between one field value and its JSON wire form.
///
/// Every serde type converts through `serde_json`. Resources and tagged
/// unions get their serde impls from the declaration macros, so they can be
/// field, list element and map value types. `wire_key` names the field being
/// converted and is only used in errors.
pub trait WireValue: Sized {
    fn from_wire(wire_key: &str, value: &Value) -> Result<Self, SchemaError>;

    fn to_wire(&self, wire_key: &str) -> Result<Value, SchemaError>;
}

impl<T: Serialize + DeserializeOwned> WireValue for T {
    fn from_wire(wire_key: &str, value: &Value) -> Result<Self, SchemaError> {
        T::deserialize(value).map_err(|error| SchemaError::validation(wire_key, error.to_string()))
    }

    /// A present value must not collapse to `null`; serde_json writes
    /// non-finite floats that way.
    fn to_wire(&self, wire_key: &str) -> Result<Value, SchemaError> {
        match serde_json::to_value(self) {
            Ok(Value::Null) => Err(SchemaError::validation(wire_key, "value has no JSON representation")),
            Ok(value) => Ok(value),
            Err(error) => Err(SchemaError::validation(wire_key, error.to_string())),
        }
    }
}

/// Declares an enumeration carried on the wire as one of a fixed set of
/// string tags.
///
/// The enum derives serde's `Serialize` and `Deserialize`, so the declaring
/// crate needs `serde` with the `derive` feature. Loading any other string
/// fails with [`SchemaError::Validation`].
///
/// ```ignore
/// wire_enum! {
///     pub enum JobStatus {
///         Pending = "pending",
///         Running = "running",
///     }
/// }
/// ```
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$variant_meta:meta])* $variant:ident = $tag:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        $vis enum $name {
            $( $(#[$variant_meta])* #[serde(rename = $tag)] $variant, )+
        }

        impl $name {
            /// Wire tag of this variant.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $tag, )+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::WireValue;
    use crate::SchemaError;

    crate::wire_enum! {
        enum Color {
            Red = "red",
            Green = "green",
        }
    }

    fn reason(error: SchemaError) -> String {
        match error {
            SchemaError::Validation { reason, .. } => reason,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn enumeration_rejects_unknown_tags() {
        assert_eq!(Color::from_wire("color", &json!("green")), Ok(Color::Green));
        let error = Color::from_wire("color", &json!("blue")).expect_err("blue is not declared");
        assert!(matches!(&error, SchemaError::Validation { field, .. } if field == "color"));
        let reason = reason(error);
        assert!(reason.contains("blue"), "{reason}");
        assert!(reason.contains("red"), "{reason}");
        assert_eq!(Color::Red.to_wire("color"), Ok(json!("red")));
        assert_eq!(Color::Green.to_string(), "green");
    }

    #[test]
    fn integers_reject_out_of_range_values() {
        assert_eq!(i32::from_wire("n", &json!(42)), Ok(42));
        assert!(i32::from_wire("n", &json!(i64::MAX)).is_err());
        assert!(u32::from_wire("n", &json!(-1)).is_err());
        assert!(i64::from_wire("n", &json!("42")).is_err());
    }

    #[test]
    fn non_finite_floats_fail_to_serialize() {
        let error = f64::NAN.to_wire("ratio").expect_err("NaN is not JSON");
        assert!(matches!(error, SchemaError::Validation { field, .. } if field == "ratio"));
        assert_eq!(f64::from_wire("ratio", &json!(3)), Ok(3.0));
    }

    #[test]
    fn list_errors_name_the_field() {
        let error = Vec::<String>::from_wire("tags", &json!(["a", 1])).expect_err("1 is no string");
        assert!(matches!(&error, SchemaError::Validation { field, .. } if field == "tags"));
        assert!(reason(error).contains("expected a string"));
    }

    #[test]
    fn maps_round_trip_in_key_order() {
        let labels = BTreeMap::<String, String>::from_wire("labels", &json!({"b": "2", "a": "1"}))
            .expect("labels load");
        assert_eq!(labels.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(labels.to_wire("labels"), Ok(json!({"a": "1", "b": "2"})));
    }
}
