//! Mapping between [`Secret`] and Kubernetes `v1/Secret` resources.
//!
//! Each secret becomes one immutable resource named
//! `secret-manager--{namespace}--{name}`. The secret's id, name and type are
//! carried as labels under the `secret-manager.comame.dev/` prefix and the
//! value is stored base64 encoded under the `value` data key.

use crate::errors::{Error, Result};
use crate::types::{Secret, SecretType};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const APP_LABEL: &str = "app";
pub const APP_LABEL_VALUE: &str = "secret-manager.comame.dev";
pub const ID_LABEL: &str = "secret-manager.comame.dev/id";
pub const NAME_LABEL: &str = "secret-manager.comame.dev/name";
pub const TYPE_LABEL: &str = "secret-manager.comame.dev/type";
pub const VALUE_KEY: &str = "value";

const RESOURCE_PREFIX: &str = "secret-manager";

/// `labelSelector` matching every resource written by this crate.
pub fn label_selector() -> String {
    format!("{APP_LABEL}={APP_LABEL_VALUE}")
}

/// Collection path for secrets in one namespace.
pub fn namespaced_secrets_path(namespace: &str) -> String {
    format!("/api/v1/namespaces/{namespace}/secrets")
}

/// Collection path for secrets across the whole cluster.
pub fn cluster_secrets_path() -> &'static str {
    "/api/v1/secrets"
}

pub fn resource_name(namespace: &str, name: &str) -> String {
    format!("{RESOURCE_PREFIX}--{namespace}--{name}")
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KubeSecret {
    #[serde(default)]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    #[serde(default)]
    pub immutable: bool,
    #[serde(default)]
    pub metadata: KubeMetadata,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub secret_type: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KubeMetadata {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KubeSecretList {
    #[serde(default)]
    pub items: Vec<KubeSecret>,
}

/// The labels a managed resource must carry, checked once at decode time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretLabels {
    pub id: String,
    pub name: String,
    pub secret_type: SecretType,
}

impl SecretLabels {
    fn from_resource(resource: &KubeSecret) -> Result<Self> {
        let labels = &resource.metadata.labels;
        let required = |key: &str| {
            labels.get(key).cloned().ok_or_else(|| {
                Error::integrity(&resource.metadata.name, format!("missing label {key}"))
            })
        };
        let id = required(ID_LABEL)?;
        let name = required(NAME_LABEL)?;
        let raw_type = required(TYPE_LABEL)?;
        let secret_type = raw_type
            .parse::<SecretType>()
            .map_err(|reason| Error::integrity(&resource.metadata.name, reason))?;
        Ok(Self {
            id,
            name,
            secret_type,
        })
    }

    fn into_map(self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (APP_LABEL.to_string(), APP_LABEL_VALUE.to_string()),
            (ID_LABEL.to_string(), self.id),
            (NAME_LABEL.to_string(), self.name),
            (TYPE_LABEL.to_string(), self.secret_type.to_string()),
        ])
    }
}

impl From<&Secret> for KubeSecret {
    fn from(secret: &Secret) -> Self {
        let labels = SecretLabels {
            id: secret.id.clone(),
            name: secret.name.clone(),
            secret_type: secret.secret_type,
        };
        KubeSecret {
            api_version: "v1".into(),
            kind: None,
            data: BTreeMap::from([(VALUE_KEY.to_string(), STANDARD.encode(&secret.value))]),
            immutable: true,
            metadata: KubeMetadata {
                labels: labels.into_map(),
                name: resource_name(&secret.namespace, &secret.name),
                namespace: secret.namespace.clone(),
            },
            secret_type: None,
        }
    }
}

impl TryFrom<KubeSecret> for Secret {
    type Error = Error;

    fn try_from(resource: KubeSecret) -> Result<Self> {
        let labels = SecretLabels::from_resource(&resource)?;
        let encoded = resource.data.get(VALUE_KEY).ok_or_else(|| {
            Error::integrity(&resource.metadata.name, format!("missing data key {VALUE_KEY}"))
        })?;
        let bytes = STANDARD.decode(encoded.as_bytes()).map_err(|err| {
            Error::integrity(&resource.metadata.name, format!("invalid base64 value: {err}"))
        })?;
        let value = String::from_utf8_lossy(&bytes).into_owned();
        Ok(Secret {
            id: labels.id,
            name: labels.name,
            namespace: resource.metadata.namespace,
            secret_type: labels.secret_type,
            value,
        })
    }
}

/// Decodes every item, failing on the first malformed resource.
pub fn decode_list(list: KubeSecretList) -> Result<Vec<Secret>> {
    list.items.into_iter().map(Secret::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Secret {
        Secret::plain("x", "db-pass", "team-a", "hunter2")
    }

    #[test]
    fn encodes_resource_layout() {
        let resource = KubeSecret::from(&sample());
        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(
            json,
            json!({
                "apiVersion": "v1",
                "data": { "value": "aHVudGVyMg==" },
                "immutable": true,
                "metadata": {
                    "labels": {
                        "app": "secret-manager.comame.dev",
                        "secret-manager.comame.dev/id": "x",
                        "secret-manager.comame.dev/name": "db-pass",
                        "secret-manager.comame.dev/type": "plain"
                    },
                    "name": "secret-manager--team-a--db-pass",
                    "namespace": "team-a"
                }
            })
        );
    }

    #[test]
    fn decode_inverts_encode() {
        let secret = Secret::plain("id-1", "multi-line", "ns", "line one\nline two ✓");
        let decoded = Secret::try_from(KubeSecret::from(&secret)).unwrap();
        assert_eq!(decoded, secret);
    }

    #[test]
    fn decodes_api_server_payload() {
        let list: KubeSecretList = serde_json::from_value(json!({
            "kind": "SecretList",
            "apiVersion": "v1",
            "metadata": { "resourceVersion": "42" },
            "items": [{
                "kind": "Secret",
                "apiVersion": "v1",
                "metadata": {
                    "name": "secret-manager--team-a--db-pass",
                    "namespace": "team-a",
                    "uid": "4b1f",
                    "labels": {
                        "app": "secret-manager.comame.dev",
                        "secret-manager.comame.dev/id": "x",
                        "secret-manager.comame.dev/name": "db-pass",
                        "secret-manager.comame.dev/type": "plain"
                    }
                },
                "data": { "value": "aHVudGVyMg==" },
                "immutable": true,
                "type": "Opaque"
            }]
        }))
        .unwrap();
        let secrets = decode_list(list).unwrap();
        assert_eq!(secrets, vec![sample()]);
    }

    #[test]
    fn missing_label_is_integrity_error() {
        for label in [ID_LABEL, NAME_LABEL, TYPE_LABEL] {
            let mut resource = KubeSecret::from(&sample());
            resource.metadata.labels.remove(label);
            let err = Secret::try_from(resource).unwrap_err();
            match err {
                Error::Integrity { resource, reason } => {
                    assert_eq!(resource, "secret-manager--team-a--db-pass");
                    assert!(reason.contains(label), "{reason}");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut resource = KubeSecret::from(&sample());
        resource
            .metadata
            .labels
            .insert(TYPE_LABEL.into(), "json".into());
        assert!(matches!(
            Secret::try_from(resource),
            Err(Error::Integrity { .. })
        ));
    }

    #[test]
    fn missing_or_corrupt_value_is_rejected() {
        let mut resource = KubeSecret::from(&sample());
        resource.data.clear();
        assert!(matches!(
            Secret::try_from(resource),
            Err(Error::Integrity { .. })
        ));

        let mut resource = KubeSecret::from(&sample());
        resource.data.insert(VALUE_KEY.into(), "%%%".into());
        assert!(matches!(
            Secret::try_from(resource),
            Err(Error::Integrity { .. })
        ));
    }

    #[test]
    fn binary_value_decodes_lossily() {
        let mut resource = KubeSecret::from(&sample());
        resource.data.insert(VALUE_KEY.into(), "//4=".into());
        let secret = Secret::try_from(resource).unwrap();
        assert_eq!(secret.value, "\u{FFFD}\u{FFFD}");
        assert_eq!(secret.name, "db-pass");
    }

    #[test]
    fn paths_and_selector() {
        assert_eq!(namespaced_secrets_path("team-a"), "/api/v1/namespaces/team-a/secrets");
        assert_eq!(cluster_secrets_path(), "/api/v1/secrets");
        assert_eq!(label_selector(), "app=secret-manager.comame.dev");
    }
}
