use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use trellis_core_types::Sensitive;

use super::kind::EntityKind;
use crate::errors::{Result, TrellisError};

/// Property keys with a fixed internal representation
pub mod keys {
    pub const VISIBLE_TO_PUBLIC_USERS: &str = "visibleToPublicUsers";
    pub const VISIBLE_TO_AUTHENTICATED_USERS: &str = "visibleToAuthenticatedUsers";
    pub const CONTENT_TYPE: &str = "contentType";
    pub const POSITION: &str = "position";
    pub const SHOW_ON_ERROR_CODES: &str = "showOnErrorCodes";
    pub const SHOW_CONDITIONS: &str = "showConditions";
    pub const HIDE_CONDITIONS: &str = "hideConditions";
    pub const DONT_CACHE: &str = "dontCache";
    pub const CACHE_FOR_SECONDS: &str = "cacheForSeconds";
    pub const PAGE_CREATES_RAW_DATA: &str = "pageCreatesRawData";
    pub const TYPE: &str = "type";

    pub const PASSWORD: &str = "password";
    pub const PASSWORD_HASH: &str = "passwordHash";
    pub const IS_ADMIN: &str = "isAdmin";

    pub const SIGNATURE: &str = "signature";
    pub const FLAGS: &str = "flags";
}

const BOOLEAN_KEYS: &[&str] = &[
    keys::VISIBLE_TO_PUBLIC_USERS,
    keys::VISIBLE_TO_AUTHENTICATED_USERS,
    keys::DONT_CACHE,
    keys::PAGE_CREATES_RAW_DATA,
    keys::IS_ADMIN,
];

const INTEGER_KEYS: &[&str] = &[keys::POSITION, keys::CACHE_FOR_SECONDS, keys::FLAGS];

/// Ordered property storage for an entity
///
/// Values are JSON so property sets can grow without schema changes. Key
/// order is insertion order, which keeps exported manifests stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct PropertyMap {
    data: Map<String, Value>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self { data: Map::new() }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Set a value; `null` removes the key instead of storing it
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if value.is_null() {
            self.data.remove(&key);
        } else {
            self.data.insert(key, value);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(Value::as_i64)
    }

    /// Copy every entry of `other` over this map
    pub fn merge(&mut self, other: &PropertyMap) {
        for (k, v) in other.iter() {
            self.set(k.clone(), v.clone());
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Convert externally supplied values into their stored representation
    ///
    /// Known boolean and integer keys are coerced, a user `password` is
    /// replaced by an Argon2id hash, and grants must carry a string signature.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::InvalidProperty`] when a value cannot be coerced.
    pub fn from_input(kind: EntityKind, input: &Map<String, Value>) -> Result<Self> {
        let mut props = PropertyMap::new();
        for (key, value) in input {
            if value.is_null() {
                continue;
            }
            if kind == EntityKind::User && key == keys::PASSWORD {
                let raw = value.as_str().ok_or_else(|| invalid(key, "expected a string"))?;
                let hash = hash_password(&Sensitive::new(raw.to_string()))?;
                props.set(keys::PASSWORD_HASH, Value::String(hash));
                continue;
            }
            props.set(key.clone(), coerce(key, value)?);
        }

        if kind == EntityKind::ResourceAccess && props.get_str(keys::SIGNATURE).is_none() {
            return Err(invalid(keys::SIGNATURE, "grant requires a string signature"));
        }
        Ok(props)
    }
}

impl From<Map<String, Value>> for PropertyMap {
    fn from(data: Map<String, Value>) -> Self {
        let mut props = PropertyMap::new();
        for (k, v) in data {
            props.set(k, v);
        }
        props
    }
}

impl From<PropertyMap> for Map<String, Value> {
    fn from(props: PropertyMap) -> Self {
        props.data
    }
}

fn invalid(key: &str, reason: &str) -> TrellisError {
    TrellisError::InvalidProperty {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn coerce(key: &str, value: &Value) -> Result<Value> {
    if BOOLEAN_KEYS.contains(&key) {
        return match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(invalid(key, "expected a boolean")),
        };
    }
    if INTEGER_KEYS.contains(&key) {
        return match value {
            Value::Number(n) if n.is_i64() => Ok(value.clone()),
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(&f) => {
                    Ok(Value::from(f as i64))
                }
                _ => Err(invalid(key, "expected an integer")),
            },
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| invalid(key, "expected an integer")),
            _ => Err(invalid(key, "expected an integer")),
        };
    }
    Ok(value.clone())
}

/// Argon2id hash of a password as a PHC string; the salt is embedded in it
pub fn hash_password(password: &Sensitive<String>) -> Result<String> {
    let salt = SaltString::encode_b64(uuid::Uuid::new_v4().as_bytes())
        .map_err(|e| invalid(keys::PASSWORD, &e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.expose().as_bytes(), &salt)
        .map_err(|e| invalid(keys::PASSWORD, &e.to_string()))?;
    Ok(hash.to_string())
}
