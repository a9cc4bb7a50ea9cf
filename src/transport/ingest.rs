// Copyright 2016 Claus Matzinger
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashMap;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use sha2::Sha256;

use crate::datasink::{TelemetryClient, TelemetryMessage};
use crate::error::{ConfigError, PublishError};

const API_VERSION: &str = "2020-03-13";

type HmacSha256 = Hmac<Sha256>;

/// `Key=value;Key=value` device connection string of an IoT hub.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionString {
    parts: HashMap<String, String>,
    raw: String,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> ConnectionString {
        let parts = raw
            .split(';')
            .filter_map(|part| {
                let mut kv = part.splitn(2, '=');
                match (kv.next(), kv.next()) {
                    (Some(k), Some(v)) if !k.trim().is_empty() => Some((k.trim().to_owned(), v.trim().to_owned())),
                    _ => None,
                }
            })
            .collect();
        ConnectionString {
            parts,
            raw: raw.to_owned(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.parts.get(key).map(String::as_str)
    }

    fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::ConnectionString(format!("missing {}", key)))
    }

    /// `HostName/devices/DeviceId`, the resource a device signs for.
    pub fn resource(&self) -> Result<String, ConfigError> {
        Ok(format!("{}/devices/{}", self.require("HostName")?, self.require("DeviceId")?))
    }

    /// Device-to-cloud events URL for `HostName` and `DeviceId`.
    pub fn events_endpoint(&self) -> Result<String, ConfigError> {
        Ok(format!(
            "https://{}/messages/events?api-version={}",
            self.resource()?,
            API_VERSION
        ))
    }

    /// How requests are authorized. A pre-issued `SharedAccessSignature` is
    /// sent as is. A `SharedAccessKey` signs a fresh token for every request.
    /// Anything else is passed through untouched.
    pub fn credential(&self) -> Result<Credential, ConfigError> {
        if let Some(signature) = self.get("SharedAccessSignature") {
            return Ok(Credential::Token(signature.to_owned()));
        }
        match self.get("SharedAccessKey") {
            Some(key) => Ok(Credential::DeviceKey {
                resource: self.resource()?,
                key: STANDARD
                    .decode(key)
                    .map_err(|e| ConfigError::ConnectionString(format!("SharedAccessKey is not base64: {}", e)))?,
                key_name: self.get("SharedAccessKeyName").map(str::to_owned),
            }),
            None => Ok(Credential::Token(self.raw.clone())),
        }
    }
}

#[derive(Clone, PartialEq)]
pub enum Credential {
    Token(String),
    DeviceKey {
        resource: String,
        key: Vec<u8>,
        key_name: Option<String>,
    },
}

// keeps key material out of the logs
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Credential::Token(_) => f.write_str("Token(..)"),
            Credential::DeviceKey { ref resource, .. } => write!(f, "DeviceKey {{ resource: {:?}, .. }}", resource),
        }
    }
}

impl Credential {
    /// `Authorization` header value for a request, valid until `expiry`
    /// (seconds since the epoch).
    pub fn header(&self, expiry: i64) -> Result<String, PublishError> {
        match *self {
            Credential::Token(ref token) => Ok(token.clone()),
            Credential::DeviceKey {
                ref resource,
                ref key,
                ref key_name,
            } => sas_token(resource, key, key_name.as_deref(), expiry),
        }
    }
}

/// `SharedAccessSignature sr=<resource>&sig=<signature>&se=<expiry>`, the
/// signature being the HMAC-SHA256 of `"<resource>\n<expiry>"` under `key`.
pub fn sas_token(resource: &str, key: &[u8], key_name: Option<&str>, expiry: i64) -> Result<String, PublishError> {
    let resource = url_encode(resource);
    let mut mac = HmacSha256::new_from_slice(key)?;
    mac.update(format!("{}\n{}", resource, expiry).as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());
    let mut token = format!(
        "SharedAccessSignature sr={}&sig={}&se={}",
        resource,
        url_encode(&signature),
        expiry
    );
    if let Some(name) = key_name {
        token.push_str("&skn=");
        token.push_str(&url_encode(name));
    }
    Ok(token)
}

/// Percent-encodes everything but the RFC 3986 unreserved characters.
fn url_encode(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Posts telemetry frames to an HTTP ingestion endpoint.
pub struct HttpTelemetryClient {
    client: Client,
    endpoint: String,
    credential: Credential,
    token_ttl: Duration,
}

impl HttpTelemetryClient {
    pub fn new(
        endpoint: String,
        credential: Credential,
        timeout: Duration,
        token_ttl: Duration,
    ) -> Result<HttpTelemetryClient, PublishError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpTelemetryClient {
            client,
            endpoint,
            credential,
            token_ttl,
        })
    }
}

impl TelemetryClient for HttpTelemetryClient {
    fn send_message(&self, message: &TelemetryMessage) -> Result<(), PublishError> {
        let expiry = Utc::now().timestamp().saturating_add(self.token_ttl.as_secs() as i64);
        let authorization = self.credential.header(expiry)?;
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, format!("{}; charset={}", message.content_type, message.content_encoding))
            .header("iothub-contenttype", message.content_type)
            .header("iothub-contentencoding", message.content_encoding)
            .header(AUTHORIZATION, authorization)
            .body(message.body.clone())
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Rejected {
                status: status.as_u16(),
            });
        }
        debug!("Ingestion endpoint answered {}", status);
        Ok(())
    }
}
