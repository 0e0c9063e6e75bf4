//! Field schemas describing a collection.
//!
//! A schema names the collection, lists its fields in order, designates the
//! key field whose value must be unique, and selects the identity scheme.

use crate::types::{IdScheme, Record, RecordState, ID_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Field types supported in schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Email,
    /// Path or URL of an asset managed by the lifecycle hooks.
    Asset,
    /// Arbitrary nested JSON.
    Object,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Email => "email",
            FieldType::Asset => "asset",
            FieldType::Object => "object",
        };
        f.write_str(name)
    }
}

impl FieldType {
    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldType::String | FieldType::Asset => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Float => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Email => value.as_str().map_or(false, looks_like_email),
            FieldType::Object => true,
        }
    }
}

fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !s.chars().any(char::is_whitespace)
        && domain
            .rsplit_once('.')
            .map_or(false, |(host, tld)| !host.is_empty() && !tld.is_empty())
}

/// Definition of a field in a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Static description of a collection's records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    class_name: String,
    fields: Vec<FieldDef>,
    key: Option<String>,
    secured_id: bool,
}

impl FieldSchema {
    /// Create a schema with only the implicit `Id` field.
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            fields: Vec::new(),
            key: None,
            secured_id: false,
        }
    }

    /// Append a field definition.
    pub fn with_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldDef::new(name, field_type));
        self
    }

    /// Designate the field whose value must be unique across records.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Switch to opaque string identities.
    pub fn secured(mut self) -> Self {
        self.secured_id = true;
        self
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Name of the collection holding these records (the pluralized class).
    pub fn collection_name(&self) -> String {
        format!("{}s", self.class_name)
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn secured_id(&self) -> bool {
        self.secured_id
    }

    pub fn id_scheme(&self) -> IdScheme {
        if self.secured_id {
            IdScheme::Secured
        } else {
            IdScheme::Sequential
        }
    }

    /// Look up a declared field.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether `name` is `Id` or a declared field.
    pub fn is_member(&self, name: &str) -> bool {
        name == ID_FIELD || self.field(name).is_some()
    }

    /// Check every declared field is present with a compatible value.
    pub fn validate_record(&self, record: &Record, state: &mut RecordState) {
        for field in &self.fields {
            match record.get(&field.name) {
                None => state.invalidate(format!("The {} field is missing", field.name)),
                Some(value) if !field.field_type.accepts(value) => state.invalidate(format!(
                    "The {} field must be of type {}",
                    field.name, field.field_type
                )),
                Some(_) => {}
            }
        }
    }
}
