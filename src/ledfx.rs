//! Client for the LedFx REST API.
//!
//! Every operation is best-effort: a missing base URL, transport error,
//! non-2xx response or a body whose `status` is not `"success"` comes back as
//! `None` (queries) or `false` (updates), never as an error.

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::color::Palette;
use crate::pipeline::resolve::{resolve, ColorData};

/// Effect parameters that take a canonical slot's color under another name.
pub const EFFECT_COLOR_ALIASES: [(&str, &str); 6] = [
    ("lows_color", "color_lows"),
    ("mids_color", "color_mids"),
    ("high_color", "color_high"),
    ("color_low", "color_lows"),
    ("color_mid", "color_mids"),
    ("color_peak", "color_high"),
];

const GRADIENT_MARKER: &str = "linear-gradient(90deg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
        }
    }
}

/// A raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

/// Sends one JSON request. Errors mean the request never completed; HTTP
/// error statuses are returned as responses.
pub trait Transport {
    fn send(&self, method: Method, url: &str, body: Option<&str>) -> Result<Response>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, method: Method, url: &str, body: Option<&str>) -> Result<Response> {
        (**self).send(method, url, body)
    }
}

/// [`Transport`] over a blocking `ureq` agent with default timeouts.
#[derive(Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn send(&self, method: Method, url: &str, body: Option<&str>) -> Result<Response> {
        let request = self
            .agent
            .request(method.as_str(), url)
            .set("Content-Type", "application/json");
        let result = match body {
            Some(body) => request.send_string(body),
            None => request.call(),
        };

        match result {
            Ok(response) => {
                let status = response.status();
                let body = response
                    .into_string()
                    .with_context(|| format!("failed to read response from {url}"))?;
                Ok(Response { status, body })
            }
            Err(ureq::Error::Status(status, response)) => Ok(Response {
                status,
                body: response.into_string().unwrap_or_default(),
            }),
            Err(err) => bail!("{} {url} failed: {err}", method.as_str()),
        }
    }
}

/// A physical LedFx device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: String,
    pub name: String,
}

/// The effect currently running on a virtual.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Effect {
    #[serde(rename = "type")]
    pub effect_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl Effect {
    /// Config keys whose current value looks like a color or gradient.
    ///
    /// LedFx does not publish which parameters take colors, so they are
    /// inferred from what each one holds right now.
    pub fn color_keys(&self) -> Vec<&str> {
        self.config
            .iter()
            .filter(|(_, value)| {
                value
                    .as_str()
                    .is_some_and(|s| s.contains('#') || s.contains(GRADIENT_MARKER))
            })
            .map(|(key, _)| key.as_str())
            .collect()
    }
}

/// Body of `PUT virtuals/{id}/effects`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectUpdate {
    pub config: IndexMap<String, String>,
    #[serde(rename = "type")]
    pub effect_type: String,
}

/// Stage the colors of `color_data` onto the color parameters of `effect`.
///
/// Slots are staged under their own name when the effect has that color
/// parameter. Alias parameters then take the color of their canonical slot,
/// overriding a same-named slot; an alias whose canonical slot is missing or
/// unset is left out.
pub fn build_effect_update(effect: &Effect, color_data: &ColorData, palette: &Palette) -> EffectUpdate {
    let color_keys = effect.color_keys();
    let mut config = IndexMap::new();

    for (slot, value) in color_data {
        if !color_keys.contains(&slot.as_str()) {
            continue;
        }
        if let Some(color) = resolve(value, palette) {
            config.insert(slot.clone(), color);
        }
    }

    for (alias, canonical) in EFFECT_COLOR_ALIASES {
        if !color_keys.contains(&alias) {
            continue;
        }
        if let Some(color) = color_data.get(canonical).and_then(|v| resolve(v, palette)) {
            config.insert(alias.to_string(), color);
        }
    }

    EffectUpdate {
        config,
        effect_type: effect.effect_type.clone(),
    }
}

#[derive(Deserialize)]
struct DeviceListResponse {
    devices: IndexMap<String, DeviceEntry>,
}

#[derive(Deserialize)]
struct DeviceEntry {
    config: DeviceConfig,
}

#[derive(Deserialize)]
struct DeviceConfig {
    name: String,
}

#[derive(Deserialize)]
struct VirtualsResponse {
    virtuals: Map<String, Value>,
}

#[derive(Deserialize)]
struct EffectResponse {
    effect: Effect,
}

/// Whether a response `status` counts as present. Null, false, zero and the
/// empty string do not.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Strip whitespace and one trailing slash, then point at `/api`.
fn api_base(url: &str) -> Option<String> {
    let url = url.trim();
    let url = url.strip_suffix('/').unwrap_or(url);
    (!url.is_empty()).then(|| format!("{url}/api"))
}

pub struct LedFxClient<T = HttpTransport> {
    api: Option<String>,
    transport: T,
}

impl LedFxClient<HttpTransport> {
    pub fn new(base_url: &str) -> Self {
        Self::with_transport(base_url, HttpTransport::new())
    }
}

impl<T: Transport> LedFxClient<T> {
    pub fn with_transport(base_url: &str, transport: T) -> Self {
        Self {
            api: api_base(base_url),
            transport,
        }
    }

    /// Whether a base URL is configured at all.
    pub fn is_configured(&self) -> bool {
        self.api.is_some()
    }

    fn request<R: DeserializeOwned>(&self, method: Method, endpoint: &str, body: Option<&str>) -> Option<R> {
        let api = self.api.as_deref()?;
        let url = format!("{api}/{endpoint}");

        let response = match self.transport.send(method, &url, body) {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!("LedFx request failed: {err:#}");
                return None;
            }
        };
        if !(200..300).contains(&response.status) {
            tracing::warn!(status = response.status, %url, "LedFx returned an error status");
            return None;
        }

        let data: Value = match serde_json::from_str(&response.body) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(%url, "LedFx returned invalid JSON: {err}");
                return None;
            }
        };
        if let Some(status) = data.get("status").filter(|s| is_truthy(s)) {
            if status != "success" {
                tracing::warn!(%url, %status, "LedFx reported failure");
                return None;
            }
        }

        serde_json::from_value(data)
            .map_err(|err| tracing::warn!(%url, "unexpected LedFx response: {err}"))
            .ok()
    }

    pub fn list_devices(&self) -> Option<Vec<Device>> {
        let data: DeviceListResponse = self.request(Method::Get, "devices", None)?;
        Some(
            data.devices
                .into_iter()
                .map(|(id, entry)| Device {
                    id,
                    name: entry.config.name,
                })
                .collect(),
        )
    }

    pub fn list_virtuals(&self) -> Option<Vec<String>> {
        let data: VirtualsResponse = self.request(Method::Get, "virtuals", None)?;
        Some(data.virtuals.into_iter().map(|(id, _)| id).collect())
    }

    pub fn get_effect(&self, virtual_id: &str) -> Option<Effect> {
        if virtual_id.is_empty() {
            return None;
        }
        let data: EffectResponse =
            self.request(Method::Get, &format!("virtuals/{virtual_id}/effects"), None)?;
        Some(data.effect)
    }

    /// Push the palette onto the active effect of `virtual_id`. Returns
    /// whether LedFx accepted the whole update.
    pub fn set_effect_colors(&self, virtual_id: &str, color_data: &ColorData, palette: &Palette) -> bool {
        let Some(effect) = self.get_effect(virtual_id) else {
            return false;
        };

        let update = build_effect_update(&effect, color_data, palette);
        let body = match serde_json::to_string(&update) {
            Ok(body) => body,
            Err(err) => {
                tracing::error!("failed to encode effect update: {err}");
                return false;
            }
        };
        tracing::debug!(virtual_id, effect = %effect.effect_type, %body, "updating effect colors");

        self.request::<Value>(Method::Put, &format!("virtuals/{virtual_id}/effects"), Some(&body))
            .is_some()
    }
}
