use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Checks the identifier grammar shared by ids, names and namespaces:
/// a leading ASCII letter, ASCII letters, digits or `-` in between, and no
/// trailing `-`.
pub fn is_valid_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    if value.ends_with('-') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

pub(crate) fn validate_identifier(value: &str, field: &'static str) -> Result<()> {
    if is_valid_identifier(value) {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier {
            field,
            value: value.to_string(),
        })
    }
}

/// How the secret payload is interpreted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SecretType {
    /// Stored and returned verbatim as text.
    #[default]
    Plain,
}

impl SecretType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretType::Plain => "plain",
        }
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecretType {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "plain" => Ok(SecretType::Plain),
            other => Err(format!("unknown secret type {other:?}")),
        }
    }
}

/// A named secret living in a namespace.
///
/// `Debug` and `Display` never include the value.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Secret {
    pub id: String,
    pub name: String,
    pub namespace: String,
    #[serde(rename = "type")]
    pub secret_type: SecretType,
    pub value: String,
}

impl Secret {
    pub fn plain(
        id: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            namespace: namespace.into(),
            secret_type: SecretType::Plain,
            value: value.into(),
        }
    }

    /// Applies the identifier grammar to `id`, `name` and `namespace`, in that order.
    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.id, "id")?;
        validate_identifier(&self.name, "name")?;
        validate_identifier(&self.namespace, "namespace")?;
        Ok(())
    }

    /// Copy of the secret with the value cleared, for listings that may
    /// enumerate but not disclose.
    pub fn redacted(mut self) -> Self {
        self.value.clear();
        self
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("secret_type", &self.secret_type)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
