use serde_json::{Map, Value};
use tracing::debug;

use crate::{FieldDescriptor, SchemaError, fieldset};

/// A mutable record bound to a static field mapping table.
///
/// Implementations are generated by [`crate::resource!`]; the generated
/// struct keeps one [`crate::Field`] per declared field plus the wire keys
/// the schema did not declare.
pub trait Resource: Default + Clone + PartialEq {
    /// Concrete type name, carried for diagnostics and polymorphic dumps.
    const KIND: &'static str;

    /// Mapping table, in declaration order.
    const FIELDS: &'static [FieldDescriptor];

    /// Decodes `value` into the field described by `field`.
    fn assign(&mut self, field: &FieldDescriptor, value: &Value) -> Result<(), SchemaError>;

    /// Encodes the field described by `field`; `None` when it is missing.
    fn encode(&self, field: &FieldDescriptor) -> Result<Option<Value>, SchemaError>;

    /// Wire keys received on load that no field declares.
    fn unknown_fields(&self) -> &Map<String, Value>;

    fn unknown_fields_mut(&mut self) -> &mut Map<String, Value>;

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    /// Builds a resource from attribute-name keyed arguments.
    ///
    /// Unsupplied fields keep their declared default or stay missing.
    /// Arguments matching no declared attribute are ignored.
    fn construct(kwargs: &Map<String, Value>) -> Result<Self, SchemaError> {
        let mut resource = Self::default();
        for field in Self::FIELDS {
            if let Some(value) = kwargs.get(field.logical_name) {
                resource.assign(field, value)?;
            }
        }
        Ok(resource)
    }

    /// Dumps every field that has a value, read-only ones included.
    ///
    /// A field that fails to serialize is left out instead of failing the
    /// whole dump, so partially built objects still render what they have.
    fn to_dict(&self) -> Map<String, Value> {
        let mut dict = Map::new();
        for field in Self::FIELDS {
            match self.encode(field) {
                Ok(Some(value)) => {
                    dict.insert(field.wire_key.to_owned(), value);
                }
                Ok(None) => {}
                Err(error) => {
                    debug!(kind = Self::KIND, field = field.wire_key, %error, "omitting field that failed to serialize");
                }
            }
        }
        dict
    }

    /// `Kind(field=value,...)` in declaration order, for logs and diffs.
    fn repr(&self) -> String {
        let rendered: Vec<String> = Self::FIELDS
            .iter()
            .map(|field| {
                let value = match self.encode(field) {
                    Ok(Some(value)) => value.to_string(),
                    Ok(None) => "<missing>".to_owned(),
                    Err(_) => "<unserializable>".to_owned(),
                };
                format!("{}={value}", field.logical_name)
            })
            .collect();
        format!("{}({})", Self::KIND, rendered.join(","))
    }
}

/// Loads a resource from a wire payload.
///
/// Write-only fields are never read back. Keys no field declares are kept in
/// [`Resource::unknown_fields`] so newer servers stay readable.
pub fn load_resource<R: Resource>(payload: &Value) -> Result<R, SchemaError> {
    let object = payload.as_object().ok_or_else(|| SchemaError::NotAnObject {
        kind: R::KIND.to_owned(),
    })?;

    let mut resource = R::default();
    for field in R::FIELDS.iter().filter(|field| field.is_loadable()) {
        let Some(value) = object.get(field.wire_key) else {
            continue;
        };
        if value.is_null() && !field.nullable {
            return Err(SchemaError::validation(field.wire_key, "field may not be null"));
        }
        resource.assign(field, value)?;
    }

    let unknown = resource.unknown_fields_mut();
    for (key, value) in object {
        if fieldset::find_by_wire_key(R::FIELDS, key).is_none() {
            unknown.insert(key.clone(), value.clone());
        }
    }
    Ok(resource)
}

/// Dumps a resource into a request payload.
///
/// Read-only and missing fields are left out; a null in a non-nullable field
/// or a value that cannot be encoded fails the dump.
pub fn dump_resource<R: Resource>(resource: &R) -> Result<Map<String, Value>, SchemaError> {
    let mut payload = Map::new();
    for field in R::FIELDS.iter().filter(|field| field.is_dumpable()) {
        match resource.encode(field)? {
            None => {}
            Some(Value::Null) if !field.nullable => {
                return Err(SchemaError::validation(field.wire_key, "field may not be null"));
            }
            Some(value) => {
                payload.insert(field.wire_key.to_owned(), value);
            }
        }
    }
    Ok(payload)
}

/// Declares a resource struct together with its field mapping table,
/// [`crate::Schema`] and serde implementations.
///
/// Each field is `name: Type`, optionally followed by `= default` and by
/// `=> modifier().modifier()` using the [`crate::FieldDescriptor`] builders
/// (`wire("key")`, `read_only()`, `write_only()`, `nullable()`).
///
/// ```ignore
/// resource! {
///     pub struct User {
///         id: String => read_only(),
///         display_name: String => wire("displayName").nullable(),
///         enabled: bool = true,
///     }
/// }
/// ```
#[macro_export]
macro_rules! resource {
    (@has_default) => { false };
    (@has_default $default:expr) => { true };
    (@init) => { $crate::Field::Missing };
    (@init $default:expr) => {
        $crate::Field::Present(::core::convert::Into::into($default))
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field:ident : $ty:ty
                $(= $default:expr)?
                $(=> $($modifier:ident ( $($arg:expr),* )).+)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field: $crate::Field<$ty>,
            )*
            /// Wire keys received on load that this resource does not declare.
            pub unknown_fields: $crate::__private::Map<::std::string::String, $crate::__private::Value>,
        }

        impl ::core::default::Default for $name {
            fn default() -> Self {
                Self {
                    $( $field: $crate::resource!(@init $($default)?), )*
                    unknown_fields: $crate::__private::Map::new(),
                }
            }
        }

        impl ::core::cmp::PartialEq for $name {
            #[allow(unused_variables)]
            fn eq(&self, other: &Self) -> bool {
                true $( && self.$field == other.$field )*
            }
        }

        impl $crate::Resource for $name {
            const KIND: &'static str = stringify!($name);

            const FIELDS: &'static [$crate::FieldDescriptor] = &[
                $(
                    $crate::FieldDescriptor::new(stringify!($field))
                        $( $( .$modifier($($arg),*) )+ )?
                        .defaulted($crate::resource!(@has_default $($default)?)),
                )*
            ];

            #[allow(unused_variables)]
            fn assign(
                &mut self,
                field: &$crate::FieldDescriptor,
                value: &$crate::__private::Value,
            ) -> ::core::result::Result<(), $crate::SchemaError> {
                match field.logical_name {
                    $(
                        stringify!($field) => {
                            self.$field = $crate::Field::decode(field.wire_key, value)?;
                        }
                    )*
                    _ => {}
                }
                ::core::result::Result::Ok(())
            }

            fn encode(
                &self,
                field: &$crate::FieldDescriptor,
            ) -> ::core::result::Result<
                ::core::option::Option<$crate::__private::Value>,
                $crate::SchemaError,
            > {
                match field.logical_name {
                    $( stringify!($field) => self.$field.encode(field.wire_key), )*
                    _ => ::core::result::Result::Ok(::core::option::Option::None),
                }
            }

            fn unknown_fields(
                &self,
            ) -> &$crate::__private::Map<::std::string::String, $crate::__private::Value> {
                &self.unknown_fields
            }

            fn unknown_fields_mut(
                &mut self,
            ) -> &mut $crate::__private::Map<::std::string::String, $crate::__private::Value> {
                &mut self.unknown_fields
            }
        }

        impl $crate::Schema for $name {
            fn load(
                payload: &$crate::__private::Value,
            ) -> ::core::result::Result<Self, $crate::SchemaError> {
                $crate::__private::load_resource(payload)
            }

            fn dump(
                &self,
            ) -> ::core::result::Result<
                $crate::__private::Map<::std::string::String, $crate::__private::Value>,
                $crate::SchemaError,
            > {
                $crate::__private::dump_resource(self)
            }
        }

        $crate::__schema_serde!($name);

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&$crate::Resource::repr(self))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{Map, Value, json};

    use crate::{Field, Resource, Schema, SchemaError, fieldset};

    crate::resource! {
        /// Scratch resource covering every field flavor.
        struct Widget {
            id: String => read_only(),
            name: String,
            label: String => wire("displayLabel").nullable(),
            secret: String => write_only(),
            size: i64 = 3,
            ratio: f64,
        }
    }

    crate::resource! {
        struct Gadget {
            id: String => read_only(),
            name: String,
            label: String => wire("displayLabel").nullable(),
            secret: String => write_only(),
            size: i64 = 3,
            ratio: f64,
        }
    }

    crate::resource! {
        struct Empty {}
    }

    fn kwargs(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn construct_seeds_defaults_and_missing() {
        let widget = Widget::construct(&kwargs(json!({"name": "w", "undeclared": 1})))
            .expect("construct succeeds");
        assert_eq!(widget.name, Field::Present("w".to_owned()));
        assert_eq!(widget.size, Field::Present(3));
        assert!(widget.ratio.is_missing());
        assert!(widget.unknown_fields.is_empty());
        assert_eq!(widget.kind(), "Widget");
    }

    #[test]
    fn construct_uses_attribute_names_not_wire_keys() {
        let widget = Widget::construct(&kwargs(json!({"label": "by attribute", "displayLabel": "by key"})))
            .expect("construct succeeds");
        assert_eq!(widget.label, Field::Present("by attribute".to_owned()));
    }

    #[test]
    fn descriptors_follow_declaration_order() {
        assert_eq!(
            fieldset::declared_fields::<Widget>(),
            ["id", "name", "label", "secret", "size", "ratio"]
        );
        assert_eq!(fieldset::duplicate_wire_key(Widget::FIELDS), None);
        assert!(Widget::FIELDS[4].has_default);
        assert!(!Widget::FIELDS[5].has_default);
        assert!(fieldset::declared_fields::<Empty>().is_empty());
    }

    #[test]
    fn equality_is_structural_over_declared_fields() {
        let a = Widget::default();
        let mut b = Widget::default();
        assert_eq!(a, b);

        b.unknown_fields.insert("extra".to_owned(), json!(true));
        assert_eq!(a, b, "undeclared keys do not take part in equality");

        b.ratio = Field::Present(0.5);
        assert_ne!(a, b);

        let mut c = Widget::default();
        c.ratio = Field::Null;
        assert_ne!(a, c, "missing differs from null");
    }

    #[test]
    fn repr_lists_fields_in_order() {
        let widget = Widget {
            name: Field::present("w"),
            label: Field::Null,
            ..Widget::default()
        };
        assert_eq!(
            widget.to_string(),
            r#"Widget(id=<missing>,name="w",label=null,secret=<missing>,size=3,ratio=<missing>)"#
        );
        assert_eq!(Empty::default().to_string(), "Empty()");
    }

    #[test]
    fn load_reads_wire_keys_and_keeps_unknown_ones() {
        let widget = Widget::load(&json!({
            "id": "w-1",
            "name": "w",
            "displayLabel": null,
            "secret": "ignored on load",
            "servedBy": "node-7"
        }))
        .expect("payload loads");

        assert_eq!(widget.id, Field::Present("w-1".to_owned()));
        assert!(widget.label.is_null());
        assert!(widget.secret.is_missing());
        assert_eq!(widget.size, Field::Present(3));
        assert!(widget.ratio.is_missing());
        assert_eq!(widget.unknown_fields.get("servedBy"), Some(&json!("node-7")));
        assert!(!widget.unknown_fields.contains_key("secret"));
    }

    #[test]
    fn load_rejects_null_in_non_nullable_field() {
        let error = Widget::load(&json!({"name": null})).expect_err("name is not nullable");
        assert_eq!(
            error,
            SchemaError::Validation {
                field: "name".to_owned(),
                reason: "field may not be null".to_owned(),
            }
        );
    }

    #[test]
    fn load_rejects_non_objects() {
        let error = Widget::load(&json!([1, 2])).expect_err("arrays are not resources");
        assert_eq!(
            error,
            SchemaError::NotAnObject {
                kind: "Widget".to_owned()
            }
        );
    }

    #[test]
    fn dump_skips_read_only_and_missing_fields() {
        let widget = Widget {
            id: Field::present("w-1"),
            name: Field::present("w"),
            label: Field::Null,
            secret: Field::present("hunter2"),
            ..Widget::default()
        };
        let payload = widget.dump().expect("dump succeeds");
        assert_eq!(
            Value::Object(payload),
            json!({"name": "w", "displayLabel": null, "secret": "hunter2", "size": 3})
        );
    }

    #[test]
    fn dump_fails_on_unencodable_value() {
        let widget = Widget {
            ratio: Field::Present(f64::INFINITY),
            ..Widget::default()
        };
        let error = widget.dump().expect_err("infinity is not JSON");
        assert!(matches!(error, SchemaError::Validation { field, .. } if field == "ratio"));
    }

    #[test]
    fn to_dict_keeps_read_only_fields_and_swallows_failures() {
        let widget = Widget {
            id: Field::present("w-1"),
            name: Field::present("w"),
            ratio: Field::Present(f64::NAN),
            ..Widget::default()
        };
        assert_eq!(
            Value::Object(widget.to_dict()),
            json!({"id": "w-1", "name": "w", "size": 3})
        );
    }

    #[test]
    fn write_only_fields_do_not_survive_a_round_trip() {
        let widget = Widget {
            name: Field::present("w"),
            label: Field::present("shown"),
            secret: Field::present("hunter2"),
            size: Field::Present(9),
            ratio: Field::Present(0.25),
            ..Widget::default()
        };
        let payload = Value::Object(widget.dump().expect("dump succeeds"));
        assert_eq!(payload["secret"], json!("hunter2"));

        let reloaded = Widget::load(&payload).expect("payload loads");
        assert!(reloaded.secret.is_missing());
        assert_eq!(
            Widget {
                secret: Field::Missing,
                ..widget
            },
            reloaded
        );
    }

    #[test]
    fn same_shape_different_kind() {
        let widget = Widget::default();
        let gadget = Gadget::default();
        assert_eq!(widget.to_dict(), gadget.to_dict());
        assert_ne!(widget.kind(), gadget.kind());
    }
}
