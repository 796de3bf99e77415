// Records returned by the capture backend.
//
// The backend serializes most values as strings (times in particular) and
// omits or nulls anything it could not decode, so every field here is
// optional on the wire and normalized on the way in.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON object that keeps its keys in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(pub Vec<(String, V)>);

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object or null")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(OrderedMap::new())
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(OrderedMap::new())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    entries.push((key, value));
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_any(OrderedMapVisitor(PhantomData))
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Named count histogram, in the order the backend sent it.
pub type Distribution = OrderedMap<u64>;

/// Flat per-protocol summary (`tcap`, `gsm_map`, `cap`).
pub type Summary = OrderedMap<Value>;

impl Summary {
    /// Display text for a field, or `None` when the field is absent.
    ///
    /// Null, empty strings and `false` count as absent; numeric zero is a
    /// real value and is kept.
    pub fn display(&self, field: &str) -> Option<String> {
        display_value(self.get(field)?)
    }
}

pub fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(false) => None,
        Value::Bool(true) => Some("true".to_string()),
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

// Field normalizers shared by the record types below

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    })
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(lenient_opt_u64(deserializer)?.unwrap_or(0))
}

fn lenient_opt_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(non_empty(deserializer)?.unwrap_or_default())
}

fn non_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PacketRecord {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub frame_num: u64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub time_rel: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub time_epoch: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub src: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dst: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub protocol: String,
    #[serde(default, deserialize_with = "null_default")]
    pub protocols: Vec<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub length: u64,
    #[serde(default, deserialize_with = "non_empty")]
    pub info: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub tcap_type: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub map_op: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub cap_op: Option<String>,
}

/// One page of `GET /api/packets`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PacketPage {
    #[serde(default, deserialize_with = "null_default")]
    pub packets: Vec<PacketRecord>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub offset: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub limit: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PacketDetail {
    #[serde(flatten)]
    pub record: PacketRecord,
    #[serde(default)]
    pub tcap: Option<Summary>,
    #[serde(default)]
    pub gsm_map: Option<Summary>,
    #[serde(default)]
    pub cap: Option<Summary>,
    #[serde(default)]
    pub layers: LayerTree,
}

/// Decoded protocol layers of one frame: layer -> fields, two levels only.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "OrderedMap<WireLayer>")]
pub struct LayerTree(pub Vec<Layer>);

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub fields: Vec<LayerField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerField {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct WireLayer {
    #[serde(default, deserialize_with = "null_default")]
    fields: Vec<WireField>,
}

// Nested `children` on the wire are deliberately not read
#[derive(Debug, Deserialize)]
struct WireField {
    #[serde(default, deserialize_with = "lenient_string")]
    name: String,
    #[serde(default, deserialize_with = "non_empty")]
    show: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    value: Option<String>,
}

impl From<OrderedMap<WireLayer>> for LayerTree {
    fn from(wire: OrderedMap<WireLayer>) -> Self {
        LayerTree(
            wire.0
                .into_iter()
                .map(|(name, layer)| Layer {
                    name,
                    fields: layer
                        .fields
                        .into_iter()
                        .map(|f| LayerField {
                            name: f.name,
                            value: f.show.or(f.value).unwrap_or_default(),
                        })
                        .collect(),
                })
                .collect(),
        )
    }
}

impl LayerTree {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FlowRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub otid: String,
    #[serde(default, deserialize_with = "non_empty")]
    pub dtid: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub messages: Vec<FlowMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FlowMessage {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub frame_num: u64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub time_rel: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub src: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dst: String,
    #[serde(default, deserialize_with = "non_empty")]
    pub tcap_type: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub map_op: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub cap_op: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestStatus {
    /// The request drew an explicit error (or reject) reply.
    ErrorResponse,
    /// No reply was observed anywhere in the capture.
    #[default]
    MissingResponse,
}

impl<'de> Deserialize<'de> for RequestStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Anything without explicit error evidence is an unanswered request
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw.as_deref() {
            Some("error_response") => RequestStatus::ErrorResponse,
            _ => RequestStatus::MissingResponse,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UnansweredRequest {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub frame_num: u64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub time_rel: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub src: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dst: String,
    #[serde(default, deserialize_with = "non_empty")]
    pub operation: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub invoke_id: Option<String>,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default, deserialize_with = "non_empty")]
    pub error_code: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub imsi: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub msisdn: Option<String>,
    // The backend writes 0 when there is no response frame
    #[serde(default, deserialize_with = "lenient_opt_u64")]
    pub response_frame: Option<u64>,
}

impl UnansweredRequest {
    pub fn response_frame(&self) -> Option<u64> {
        self.response_frame.filter(|f| *f != 0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatsPayload {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total_packets: u64,
    #[serde(default)]
    pub protocol_dist: Distribution,
    #[serde(default)]
    pub all_protocols_dist: Distribution,
    #[serde(default)]
    pub tcap_message_types: Distribution,
    #[serde(default)]
    pub gsm_map_operations: Distribution,
    #[serde(default)]
    pub cap_operations: Distribution,
}

/// Response of `POST /api/upload`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UploadResult {
    #[serde(default, deserialize_with = "lenient_string")]
    pub session_key: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub packet_count: u64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub filename: String,
    #[serde(default, deserialize_with = "non_empty")]
    pub format: Option<String>,
    #[serde(default)]
    pub tshark_available: bool,
}
