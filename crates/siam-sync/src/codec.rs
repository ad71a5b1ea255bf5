//! # Firestore Wire Codec
//!
//! Maps between domain values and the Firestore REST document format.
//!
//! ## Tagged Values
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Native ⇄ Wire Value Mapping                          │
//! │                                                                         │
//! │  serde_json::Value        Firestore REST                               │
//! │  ─────────────────        ──────────────                               │
//! │  "Toner"              ⇄   {"stringValue": "Toner"}                     │
//! │  10                   ⇄   {"integerValue": "10"}   (decimal string)    │
//! │  12.5                 ⇄   {"doubleValue": 12.5}                        │
//! │  true                 ⇄   {"booleanValue": true}                       │
//! │  null                 ⇄   {"nullValue": null}                          │
//! │  [1, "a"]             ⇄   {"arrayValue": {"values": [..]}}             │
//! │  {"k": 1}             ⇄   {"mapValue": {"fields": {"k": ..}}}          │
//! │  "2024-05-01T..Z"     ◄   {"timestampValue": "2024-05-01T..Z"}         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Product Documents
//! One document per product, keyed by code:
//! ```json
//! {
//!   "name": "projects/p/databases/(default)/documents/products/7591002200046",
//!   "fields": {
//!     "name":     {"stringValue": "Toner HP 12A"},
//!     "quantity": {"integerValue": "10"},
//!     "max_stock": {"integerValue": "40"}
//!   }
//! }
//! ```
//! The code lives only in the document name. Fields without a dedicated
//! `Product` attribute travel through `extra_fields`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

use crate::error::{SyncError, SyncResult};
use siam_core::{ExtraFields, Movement, Product, DEFAULT_UNIT};

// =============================================================================
// Wire Types
// =============================================================================

/// A single Firestore value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WireValue {
    StringValue(String),
    IntegerValue(#[serde(with = "integer_string")] i64),
    DoubleValue(f64),
    BooleanValue(bool),
    NullValue(()),
    TimestampValue(String),
    ReferenceValue(String),
    BytesValue(String),
    GeoPointValue(GeoPoint),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<WireValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, WireValue>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

/// Firestore encodes 64-bit integers as decimal strings. Numbers are
/// accepted on read as well.
mod integer_string {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(n),
            Raw::Text(text) => text.trim().parse().map_err(D::Error::custom),
        }
    }
}

/// A Firestore document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name; empty on create requests.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default)]
    pub fields: BTreeMap<String, WireValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    /// Last path segment of the resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }
}

/// One page of a collection listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<Document>,

    #[serde(default)]
    pub next_page_token: Option<String>,
}

// =============================================================================
// Native ⇄ Wire
// =============================================================================

/// Encodes a JSON value.
///
/// Fails only for numbers that have no finite `f64` form.
pub fn to_wire(value: &Value) -> SyncResult<WireValue> {
    Ok(match value {
        Value::Null => WireValue::NullValue(()),
        Value::Bool(b) => WireValue::BooleanValue(*b),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => WireValue::IntegerValue(i),
            (None, Some(f)) if f.is_finite() => WireValue::DoubleValue(f),
            _ => {
                return Err(SyncError::SerializationFailed(format!(
                    "number {} has no Firestore representation",
                    n
                )))
            }
        },
        Value::String(s) => WireValue::StringValue(s.clone()),
        Value::Array(items) => WireValue::ArrayValue(ArrayValue {
            values: items.iter().map(to_wire).collect::<SyncResult<_>>()?,
        }),
        Value::Object(map) => WireValue::MapValue(MapValue {
            fields: map
                .iter()
                .map(|(k, v)| Ok((k.clone(), to_wire(v)?)))
                .collect::<SyncResult<_>>()?,
        }),
    })
}

/// Decodes a wire value. Timestamps, references and bytes become strings.
pub fn from_wire(value: WireValue) -> Value {
    match value {
        WireValue::StringValue(s)
        | WireValue::TimestampValue(s)
        | WireValue::ReferenceValue(s)
        | WireValue::BytesValue(s) => Value::String(s),
        WireValue::IntegerValue(i) => Value::from(i),
        WireValue::DoubleValue(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        WireValue::BooleanValue(b) => Value::Bool(b),
        WireValue::NullValue(()) => Value::Null,
        WireValue::GeoPointValue(point) => {
            let mut map = Map::new();
            map.insert("latitude".into(), from_f64(point.latitude));
            map.insert("longitude".into(), from_f64(point.longitude));
            Value::Object(map)
        }
        WireValue::ArrayValue(array) => {
            Value::Array(array.values.into_iter().map(from_wire).collect())
        }
        WireValue::MapValue(map) => Value::Object(
            map.fields
                .into_iter()
                .map(|(k, v)| (k, from_wire(v)))
                .collect(),
        ),
    }
}

fn from_f64(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn wire_string(value: &WireValue) -> Option<String> {
    match value {
        WireValue::StringValue(s) | WireValue::TimestampValue(s) | WireValue::ReferenceValue(s) => {
            Some(s.clone())
        }
        WireValue::IntegerValue(i) => Some(i.to_string()),
        WireValue::DoubleValue(f) => Some(f.to_string()),
        _ => None,
    }
}

fn wire_i64(value: &WireValue) -> Option<i64> {
    match value {
        WireValue::IntegerValue(i) => Some(*i),
        WireValue::DoubleValue(f) if f.is_finite() && f.fract() == 0.0 => {
            let i = *f as i64;
            (i as f64 == *f).then_some(i)
        }
        WireValue::StringValue(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn wire_f64(value: &WireValue) -> Option<f64> {
    let f = match value {
        WireValue::DoubleValue(f) => *f,
        WireValue::IntegerValue(i) => *i as f64,
        WireValue::StringValue(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

// =============================================================================
// Products
// =============================================================================

/// Encodes a product as document fields. The code is not included.
///
/// Extra fields are written first so a stray extra key can never shadow a
/// dedicated attribute.
pub fn encode_product(product: &Product) -> SyncResult<Document> {
    let mut fields = BTreeMap::new();

    for (key, value) in &product.extra_fields {
        fields.insert(key.clone(), to_wire(value)?);
    }

    fields.insert("name".into(), WireValue::StringValue(product.name.clone()));
    fields.insert("category".into(), WireValue::StringValue(product.category.clone()));
    fields.insert("quantity".into(), WireValue::IntegerValue(product.quantity));
    fields.insert("unit".into(), WireValue::StringValue(product.unit.clone()));
    fields.insert("location".into(), WireValue::StringValue(product.location.clone()));

    if let Some(price) = product.unit_price {
        if !price.is_finite() {
            return Err(SyncError::SerializationFailed(format!(
                "unit_price of {} is not a finite number",
                product.code
            )));
        }
        fields.insert("unit_price".into(), WireValue::DoubleValue(price));
    }

    if let Some(url) = &product.image_url {
        fields.insert("image_url".into(), WireValue::StringValue(url.clone()));
    }

    Ok(Document {
        fields,
        ..Default::default()
    })
}

/// Decodes a product document.
///
/// The code comes from the document name (falling back to a `code` field).
/// Unknown fields land in `extra_fields`; `last_sync_timestamp` is left for
/// the cache to stamp.
pub fn decode_product(document: Document) -> SyncResult<Product> {
    let mut code = document.id().to_string();
    let mut product = Product::new(String::new(), String::new());
    let mut extra_fields = ExtraFields::new();

    for (key, value) in document.fields {
        match key.as_str() {
            "code" => {
                if code.is_empty() {
                    code = wire_string(&value).unwrap_or_default();
                }
            }
            "name" => product.name = wire_string(&value).unwrap_or_default(),
            "category" => product.category = wire_string(&value).unwrap_or_default(),
            "unit" => {
                product.unit = wire_string(&value)
                    .filter(|u| !u.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_UNIT.to_string())
            }
            "location" => product.location = wire_string(&value).unwrap_or_default(),
            "quantity" => {
                let quantity = wire_i64(&value).ok_or_else(|| {
                    SyncError::InvalidDocument(format!("{}: quantity is not an integer", document.name))
                })?;
                if quantity < 0 {
                    return Err(SyncError::InvalidDocument(format!(
                        "{}: negative quantity {}",
                        document.name, quantity
                    )));
                }
                product.quantity = quantity;
            }
            "unit_price" => product.unit_price = wire_f64(&value),
            "image_url" => product.image_url = wire_string(&value).filter(|u| !u.is_empty()),
            _ => {
                extra_fields.insert(key, from_wire(value));
            }
        }
    }

    if code.trim().is_empty() {
        return Err(SyncError::InvalidDocument("document has no code".into()));
    }

    product.code = code;
    product.extra_fields = extra_fields;
    Ok(product)
}

// =============================================================================
// Movements
// =============================================================================

/// Encodes a movement. The id is the document id and is not repeated.
pub fn encode_movement(movement: &Movement) -> Document {
    let mut fields = BTreeMap::new();
    fields.insert("code".into(), WireValue::StringValue(movement.code.clone()));
    fields.insert("kind".into(), WireValue::StringValue(movement.kind.as_str().into()));
    fields.insert("quantity".into(), WireValue::IntegerValue(movement.quantity));
    fields.insert("user".into(), WireValue::StringValue(movement.user.clone()));
    fields.insert("notes".into(), WireValue::StringValue(movement.notes.clone()));
    fields.insert(
        "timestamp".into(),
        WireValue::TimestampValue(movement.timestamp.to_rfc3339()),
    );

    Document {
        fields,
        ..Default::default()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
