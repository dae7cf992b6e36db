use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A type the oracle can be asked to produce.
///
/// Implemented for anything that is `JsonSchema + DeserializeOwned`. The
/// generated schema is closed (`additionalProperties: false`), lists every
/// property as required, and has all `$ref`s inlined so it can be handed to a
/// tool definition as-is.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    fn output_schema() -> Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        close_objects(&mut value);
        inline_definitions(&mut value);

        if let Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
        }

        value
    }

    /// Name the oracle (and test doubles) use to tell output shapes apart.
    fn shape_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn close_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                if let Some(Value::Object(props)) = map.get("properties") {
                    let required = props.keys().cloned().map(Value::String).collect();
                    map.insert("required".to_string(), Value::Array(required));
                }
            }
            for (_, v) in map.iter_mut() {
                close_objects(v);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(close_objects),
        _ => {}
    }
}

fn inline_definitions(value: &mut Value) {
    let definitions = match value {
        Value::Object(map) => map.get("definitions").cloned(),
        _ => None,
    };
    if let Some(Value::Object(defs)) = definitions {
        inline_recursive(value, &defs);
    }
}

fn inline_recursive(value: &mut Value, definitions: &Map<String, Value>) {
    match value {
        Value::Object(map) => {
            if let Some(target) = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name))
            {
                *value = target.clone();
                inline_recursive(value, definitions);
                return;
            }

            if let Some(Value::Array(all_of)) = map.get("allOf") {
                if let [single] = all_of.as_slice() {
                    *value = single.clone();
                    inline_recursive(value, definitions);
                    return;
                }
            }

            for (_, v) in map.iter_mut() {
                inline_recursive(v, definitions);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                inline_recursive(item, definitions);
            }
        }
        _ => {}
    }
}
