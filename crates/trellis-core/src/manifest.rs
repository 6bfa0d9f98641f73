//! Configuration manifests for snapshot export/import
//!
//! A manifest is an ordered JSON object keyed by an entity's path, name or
//! identifier. Keys are written once; later inserts for the same key are
//! refused so a single export pass produces deterministic output.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::Result;
use crate::model::properties::keys;
use crate::model::{Entity, PropertyMap};

/// Keys exported for pages, components and templates
pub const DOM_CONFIG_KEYS: &[&str] = &[
    keys::VISIBLE_TO_PUBLIC_USERS,
    keys::VISIBLE_TO_AUTHENTICATED_USERS,
    keys::CONTENT_TYPE,
    keys::POSITION,
    keys::SHOW_ON_ERROR_CODES,
    keys::SHOW_CONDITIONS,
    keys::HIDE_CONDITIONS,
    keys::DONT_CACHE,
    keys::CACHE_FOR_SECONDS,
    keys::PAGE_CREATES_RAW_DATA,
];

/// Keys exported for files and folders
pub const FILE_CONFIG_KEYS: &[&str] = &[
    keys::VISIBLE_TO_PUBLIC_USERS,
    keys::VISIBLE_TO_AUTHENTICATED_USERS,
    keys::CONTENT_TYPE,
    keys::DONT_CACHE,
    keys::CACHE_FOR_SECONDS,
];

/// Manifest-only key carrying the real name of a renamed-on-disk file
pub const NAME_KEY: &str = "name";

/// Manifest-only key listing components a page includes
pub const SHARED_COMPONENTS_KEY: &str = "sharedComponents";

/// Append-only ordered manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigManifest {
    entries: Map<String, Value>,
}

impl ConfigManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a configuration under `key`; returns false if the key exists
    pub fn insert(&mut self, key: impl Into<String>, config: Map<String, Value>) -> bool {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, Value::Object(config));
        true
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Configuration stored under `key`; non-object values read as absent
    pub fn get(&self, key: &str) -> Option<&Map<String, Value>> {
        self.entries.get(key).and_then(Value::as_object)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a manifest document
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the document is not a JSON object.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Pretty-printed JSON in insertion order
    ///
    /// # Errors
    ///
    /// Returns a serialization error if encoding fails.
    pub fn to_pretty_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// One access grant in `security/grants.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRecord {
    pub signature: String,
    pub flags: i64,
}

impl GrantRecord {
    /// Build a record from a stored grant; None when the signature is missing
    pub fn from_entity(entity: &Entity) -> Option<Self> {
        let signature = entity.properties.get_str(keys::SIGNATURE)?.to_string();
        let flags = entity.properties.get_i64(keys::FLAGS).unwrap_or(0);
        Some(Self { signature, flags })
    }
}

/// Parse a grants document as raw objects so float flags survive until conversion
///
/// # Errors
///
/// Returns a serialization error if the document is not a list of objects.
pub fn grants_from_slice(bytes: &[u8]) -> Result<Vec<Map<String, Value>>> {
    Ok(serde_json::from_slice(bytes)?)
}

/// # Errors
///
/// Returns a serialization error if encoding fails.
pub fn grants_to_pretty_bytes(grants: &[GrantRecord]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(grants)?)
}

fn put_if(config: &mut Map<String, Value>, props: &PropertyMap, key: &str) {
    if let Some(value) = props.get(key) {
        if !value.is_null() {
            config.insert(key.to_string(), value.clone());
        }
    }
}

fn select(entity: &Entity, keys: &[&str]) -> Map<String, Value> {
    let mut config = Map::new();
    for key in keys {
        put_if(&mut config, &entity.properties, key);
    }
    config
}

/// Exportable configuration of a page, component or template
pub fn dom_configuration(entity: &Entity) -> Map<String, Value> {
    select(entity, DOM_CONFIG_KEYS)
}

/// Exportable configuration of a file or folder
pub fn file_configuration(entity: &Entity) -> Map<String, Value> {
    select(entity, FILE_CONFIG_KEYS)
}
