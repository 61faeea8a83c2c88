use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use jsonschema::Validator;
use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Compiled validators keyed by the Rust type name they were generated from.
static VALIDATORS: Lazy<Mutex<HashMap<&'static str, Arc<Validator>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("failed to compile schema for {type_name}: {message}")]
    Schema {
        type_name: &'static str,
        message: String,
    },

    #[error("value does not match schema for {type_name}: {}", errors.join("; "))]
    Invalid {
        type_name: &'static str,
        errors: Vec<String>,
    },

    #[error("failed to deserialize {type_name}: {source}")]
    Deserialize {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Returns the JSON Schema validator generated from `T`, compiling it on
/// first use.
pub fn validator_for<T: JsonSchema>() -> Result<Arc<Validator>, ConvertError> {
    let type_name = std::any::type_name::<T>();

    let mut cache = VALIDATORS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(validator) = cache.get(type_name) {
        return Ok(Arc::clone(validator));
    }

    let schema = schemars::schema_for!(T);
    let schema = serde_json::to_value(&schema).map_err(|err| ConvertError::Schema {
        type_name,
        message: err.to_string(),
    })?;
    let validator = jsonschema::validator_for(&schema).map_err(|err| ConvertError::Schema {
        type_name,
        message: err.to_string(),
    })?;

    let validator = Arc::new(validator);
    cache.insert(type_name, Arc::clone(&validator));

    Ok(validator)
}

/// Validate `value` against the schema generated from `T` and, if it passes,
/// deserialize it.
///
/// Validation runs first so that a mismatch is reported with every offending
/// path instead of serde's first error only.
pub fn assert_type<T>(value: Value) -> Result<T, ConvertError>
where
    T: DeserializeOwned + JsonSchema,
{
    let type_name = std::any::type_name::<T>();
    let validator = validator_for::<T>()?;

    let errors: Vec<String> = validator
        .iter_errors(&value)
        .map(|err| format!("{}: {}", err.instance_path, err))
        .collect();
    if !errors.is_empty() {
        return Err(ConvertError::Invalid { type_name, errors });
    }

    serde_json::from_value(value).map_err(|source| ConvertError::Deserialize { type_name, source })
}
