//! ABI serializer (C9): converts between the wire binary encoding
//! (`bincode`) and JSON (`serde_json::Value`, standing in for the
//! original "variant" type) for every registered action/table payload
//! type.
//!
//! The registry is populated at construction time from a static table
//! rather than a dynamically loaded schema file; `jmzk-contracts` is the
//! only crate that knows the concrete payload types, so it populates an
//! `AbiSerializer` it owns rather than this crate depending on it.

use std::collections::HashMap;

use jmzk_chain_core::{JmzkError, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// One registered type's binary<->JSON conversion pair. Stored as bare
/// `fn` pointers: `register`'s closures capture nothing beyond the
/// monomorphized type `T`, so they coerce to function pointers with no
/// heap allocation per registration.
#[derive(Clone, Copy)]
pub struct AbiTypeDescriptor {
    pub type_name: &'static str,
    to_variant: fn(&[u8]) -> Result<Value>,
    from_variant: fn(&Value) -> Result<Vec<u8>>,
}

#[derive(Default)]
pub struct AbiSerializer {
    types: HashMap<&'static str, AbiTypeDescriptor>,
}

impl AbiSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T>(&mut self, type_name: &'static str)
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        let descriptor = AbiTypeDescriptor {
            type_name,
            to_variant: |bin| {
                let value: T = bincode::deserialize(bin)?;
                serde_json::to_value(&value).map_err(|e| JmzkError::InvalidJson(e.to_string()))
            },
            from_variant: |json| {
                let value: T =
                    serde_json::from_value(json.clone()).map_err(|e| JmzkError::InvalidJson(e.to_string()))?;
                Ok(bincode::serialize(&value)?)
            },
        };
        self.types.insert(type_name, descriptor);
    }

    fn descriptor(&self, type_name: &str) -> Result<&AbiTypeDescriptor> {
        self.types
            .get(type_name)
            .ok_or_else(|| JmzkError::InvalidArgument(format!("unknown abi type: {type_name}")))
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn binary_to_variant(&self, type_name: &str, bin: &[u8]) -> Result<Value> {
        (self.descriptor(type_name)?.to_variant)(bin)
    }

    pub fn variant_to_binary(&self, type_name: &str, variant: &Value) -> Result<Vec<u8>> {
        (self.descriptor(type_name)?.from_variant)(variant)
    }
}

/// Converts an already-typed value to its JSON form, independent of the
/// registry — used where the caller knows `T` at compile time.
pub fn to_variant<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| JmzkError::InvalidJson(e.to_string()))
}

/// The inverse of [`to_variant`].
pub fn from_variant<T: DeserializeOwned>(variant: &Value) -> Result<T> {
    serde_json::from_value(variant.clone()).map_err(|e| JmzkError::InvalidJson(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, serde::Deserialize, PartialEq, Debug, Clone)]
    struct Transfer {
        from: String,
        to: String,
        amount: u64,
    }

    #[test]
    fn round_trips_registered_type_through_binary_and_json() {
        let mut abi = AbiSerializer::new();
        abi.register::<Transfer>("transfer");

        let t = Transfer { from: "alice".into(), to: "bob".into(), amount: 100 };
        let bin = bincode::serialize(&t).unwrap();

        let variant = abi.binary_to_variant("transfer", &bin).unwrap();
        assert_eq!(variant["amount"], 100);

        let bin2 = abi.variant_to_binary("transfer", &variant).unwrap();
        assert_eq!(bin, bin2);
    }

    #[test]
    fn unknown_type_errors() {
        let abi = AbiSerializer::new();
        assert!(abi.binary_to_variant("nope", &[]).is_err());
    }

    #[test]
    fn generic_to_variant_from_variant_roundtrip() {
        let t = Transfer { from: "a".into(), to: "b".into(), amount: 1 };
        let v = to_variant(&t).unwrap();
        let back: Transfer = from_variant(&v).unwrap();
        assert_eq!(t, back);
    }
}
