//! Remote contract registry
//!
//! Looks up ABI, bytecode and devdoc for a contract from a REST service.
//! Factories (deployable contracts) are found by id, instances by address.
//! A 404 is "not found", not an error.

use std::collections::HashMap;
use std::time::Duration;

use alloy_primitives::{hex, Address, Bytes};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::error::RegistryError;

pub const DEFAULT_ABI_PROP: &str = "abi";
pub const DEFAULT_BYTECODE_PROP: &str = "bytecode";
pub const DEFAULT_DEVDOC_PROP: &str = "devdoc";

/// Registry endpoints and response mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRegistryConf {
    #[serde(rename = "factoryURLPrefix", default)]
    pub factory_url_prefix: String,
    #[serde(rename = "instanceURLPrefix", default)]
    pub instance_url_prefix: String,
    #[serde(default)]
    pub headers: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub prop_names: RemoteRegistryPropNames,
}

/// JSON property names to read from a registry response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteRegistryPropNames {
    #[serde(default)]
    pub abi: String,
    #[serde(default)]
    pub bytecode: String,
    #[serde(default)]
    pub devdoc: String,
}

/// Artifacts resolved for a contract
#[derive(Debug, Clone, PartialEq)]
pub struct ContractArtifact {
    pub abi: Value,
    pub bytecode: Bytes,
    pub devdoc: String,
}

pub struct RemoteRegistry {
    conf: RemoteRegistryConf,
    headers: HeaderMap,
    client: reqwest::Client,
}

impl RemoteRegistry {
    pub fn new(mut conf: RemoteRegistryConf) -> Result<Self, RegistryError> {
        let props = &mut conf.prop_names;
        for (prop, default) in [
            (&mut props.abi, DEFAULT_ABI_PROP),
            (&mut props.bytecode, DEFAULT_BYTECODE_PROP),
            (&mut props.devdoc, DEFAULT_DEVDOC_PROP),
        ] {
            if prop.is_empty() {
                *prop = default.to_string();
            }
        }

        let mut headers = HeaderMap::new();
        for (name, values) in &conf.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| RegistryError::Config(format!("header '{}': {}", name, e)))?;
            for value in values {
                let value = HeaderValue::from_str(value)
                    .map_err(|e| RegistryError::Config(format!("header '{}': {}", name, e)))?;
                headers.append(name.clone(), value);
            }
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(1)
            .build()
            .map_err(|e| RegistryError::Config(e.to_string()))?;

        Ok(Self {
            conf,
            headers,
            client,
        })
    }

    pub fn conf(&self) -> &RemoteRegistryConf {
        &self.conf
    }

    /// Resolve a deployable contract by its registry id
    pub async fn load_factory_by_id(&self, id: &str) -> Result<Option<ContractArtifact>, RegistryError> {
        if self.conf.factory_url_prefix.is_empty() {
            return Ok(None);
        }
        let url = join_url(&self.conf.factory_url_prefix, id)?;
        self.load_artifact(url).await
    }

    /// Resolve a deployed contract instance by its address
    pub async fn load_factory_by_address(
        &self,
        address: &Address,
    ) -> Result<Option<ContractArtifact>, RegistryError> {
        if self.conf.instance_url_prefix.is_empty() {
            return Ok(None);
        }
        let url = join_url(&self.conf.instance_url_prefix, &format!("{:#x}", address))?;
        self.load_artifact(url).await
    }

    async fn load_artifact(&self, url: Url) -> Result<Option<ContractArtifact>, RegistryError> {
        let json = match self.get_json(&url).await? {
            Some(json) => json,
            None => return Ok(None),
        };
        let props = &self.conf.prop_names;

        let abi_str = response_string(&json, &props.abi, false)?;
        let abi: Value = serde_json::from_str(abi_str).map_err(|e| {
            error!("[Registry] GET {} <-- !Failed to decode ABI: {}", url, e);
            RegistryError::Response
        })?;

        let devdoc = response_string(&json, &props.devdoc, true)?.to_string();

        let bytecode_str = response_string(&json, &props.bytecode, false)?;
        let bytecode = hex::decode(bytecode_str).map_err(|e| {
            error!("[Registry] GET {} <-- !Failed to parse bytecode: {}", url, e);
            RegistryError::Response
        })?;

        Ok(Some(ContractArtifact {
            abi,
            bytecode: Bytes::from(bytecode),
            devdoc,
        }))
    }

    async fn get_json(&self, url: &Url) -> Result<Option<Map<String, Value>>, RegistryError> {
        info!("[Registry] GET {} -->", url);
        let response = self
            .client
            .get(url.clone())
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|e| {
                error!("[Registry] GET {} <-- !Failed: {}", url, e);
                RegistryError::Request
            })?;

        let status = response.status();
        info!("[Registry] GET {} <-- [{}]", url, status.as_u16());
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RegistryError::Request);
        }

        let body = response.bytes().await.map_err(|e| {
            error!("[Registry] GET {} <-- !Failed to read body: {}", url, e);
            RegistryError::Request
        })?;
        serde_json::from_slice(&body).map(Some).map_err(|e| {
            error!("[Registry] GET {} <-- !Failed to parse body: {}", url, e);
            RegistryError::Response
        })
    }
}

/// Append one escaped path segment to a prefix, tolerating a trailing slash
fn join_url(prefix: &str, segment: &str) -> Result<Url, RegistryError> {
    let mut url = Url::parse(prefix).map_err(|e| RegistryError::Config(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| RegistryError::Config(prefix.to_string()))?
        .pop_if_empty()
        .push(segment);
    Ok(url)
}

fn response_string<'a>(
    json: &'a Map<String, Value>,
    prop: &str,
    empty_ok: bool,
) -> Result<&'a str, RegistryError> {
    let value = json
        .get(prop)
        .ok_or_else(|| RegistryError::MissingProperty(prop.to_string()))?;
    let s = value
        .as_str()
        .ok_or_else(|| RegistryError::NotAString(prop.to_string()))?;
    if !empty_ok && s.is_empty() {
        return Err(RegistryError::EmptyProperty(prop.to_string()));
    }
    Ok(s)
}
