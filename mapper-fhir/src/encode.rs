//! Serialization boundary: typed resources in, JSON documents out.

use mapper_core::{Bundle, MapperError, MapperResult, Resource};

/// Turns a resource graph into a document string.
pub trait DocumentEncoder {
    fn encode_bundle(&self, bundle: &Bundle) -> MapperResult<String>;

    fn encode_resource(&self, resource: &Resource) -> MapperResult<String>;
}

/// FHIR JSON via `serde_json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonEncoder {
    pretty: bool,
}

impl JsonEncoder {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    pub fn pretty() -> Self {
        Self::new(true)
    }

    pub fn compact() -> Self {
        Self::new(false)
    }

    fn encode<T: serde::Serialize>(&self, value: &T) -> MapperResult<String> {
        let encoded = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        encoded.map_err(|err| MapperError::Encode(err.to_string()))
    }
}

impl Default for JsonEncoder {
    fn default() -> Self {
        Self::pretty()
    }
}

impl DocumentEncoder for JsonEncoder {
    fn encode_bundle(&self, bundle: &Bundle) -> MapperResult<String> {
        self.encode(bundle)
    }

    fn encode_resource(&self, resource: &Resource) -> MapperResult<String> {
        self.encode(resource)
    }
}
