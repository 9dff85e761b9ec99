//! Record Normalizer
//!
//! Orders were written by several generations of clients and two checkout
//! flows, so no two raw records agree on field names. Everything read from
//! a partition funnels through here and comes out as exactly one canonical
//! [`Order`]. The transform is total for any JSON object (every field has
//! a deterministic default) and idempotent (canonical in, canonical out).
//!
//! Alias resolution is explicit and ordered; nothing depends on the order
//! keys happen to appear in a document.
//!
//! | Canonical field  | Candidates, first usable wins                                 |
//! |------------------|---------------------------------------------------------------|
//! | `customer_phone` | `customerPhone`, `phoneNumber`                                 |
//! | `coordinates`    | `coordinates`, `deliveryLocation`, `address.{latitude,longitude}` |
//! | `status`         | `status`, `orderStatus`, else `"pending"`                      |
//! | item `id`        | `productId`, `id`                                              |
//! | item `price`     | `price`, `priceAtPurchase`                                     |

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use shared::{Coordinates, Order, OrderItem};

use crate::core::error::{RepoError, RepoResult};
use crate::orders::money;
use crate::store::Document;

/// Normalize a located document. The store key becomes the order id only
/// when the record body does not carry an `id` of its own; the two write
/// paths disagreed on that as well.
pub fn try_normalize_document(doc: &Document, owner_id: &str) -> RepoResult<Order> {
    let Some(raw) = doc.data.as_object() else {
        return Err(RepoError::Normalization {
            record_id: doc.key.clone(),
            reason: format!("document is not an object, found {}", value_kind(&doc.data)),
        });
    };
    let mut record = raw.clone();
    record
        .entry("id")
        .or_insert_with(|| Value::String(doc.key.clone()));
    Ok(normalize_order(&record, owner_id))
}

/// Normalize one raw record into the canonical shape. Total: never fails,
/// every missing or malformed field falls back to its default.
///
/// `owner_id` is the partition the record came from; legacy records have
/// no partition owner and pass `""`, falling back to whatever owner field
/// the record itself carries.
pub fn normalize_order(raw: &Map<String, Value>, owner_id: &str) -> Order {
    let now = Utc::now();

    let owner = if owner_id.is_empty() {
        string_field(raw, &["ownerId", "userId"], "")
    } else {
        owner_id.to_string()
    };

    Order {
        id: string_field(raw, &["id"], ""),
        owner_id: owner,
        driver_id: optional_string(raw, "driverId"),
        customer_name: string_field(raw, &["customerName"], ""),
        customer_phone: string_field(raw, &["customerPhone", "phoneNumber"], ""),
        address: string_field(raw, &["address"], ""),
        delivery_instructions: string_field(raw, &["deliveryInstructions"], ""),
        coordinates: normalize_coordinates(raw),
        status: string_field(raw, &["status", "orderStatus"], "pending"),
        payment_status: string_field(raw, &["paymentStatus"], "pending"),
        payment_method: string_field(raw, &["paymentMethod"], ""),
        total: number_field(raw, &["total"], 0.0),
        subtotal: number_field(raw, &["subtotal"], 0.0),
        delivery_fee: number_field(raw, &["deliveryFee"], 0.0),
        tip_amount: number_field(raw, &["tipAmount"], 0.0),
        items: normalize_items(raw.get("items")),
        notes: string_field(raw, &["notes"], ""),
        order_number: string_field(raw, &["orderNumber"], ""),
        created_at: timestamp_field(raw, "createdAt").unwrap_or(now),
        updated_at: timestamp_field(raw, "updatedAt").unwrap_or(now),
        order_confirmed_at: timestamp_field(raw, "orderConfirmedAt"),
        payment_confirmed_at: timestamp_field(raw, "paymentConfirmedAt"),
        restaurant_id: string_field(raw, &["restaurantId"], ""),
        order_type: string_field(raw, &["orderType"], "delivery"),
    }
}

// ========== Field Coercion ==========

/// First candidate holding a non-empty string wins. Bare numbers are
/// rendered to text; phone numbers were occasionally written that way.
fn string_field(raw: &Map<String, Value>, candidates: &[&str], default: &str) -> String {
    for key in candidates {
        match raw.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => return s.clone(),
            Some(Value::Number(n)) => return n.to_string(),
            _ => {}
        }
    }
    default.to_string()
}

/// First candidate holding a number wins; an explicit `0` does not fall
/// through. Numeric strings are parsed, amounts arrive that way sometimes.
fn number_field(raw: &Map<String, Value>, candidates: &[&str], default: f64) -> f64 {
    for key in candidates {
        let Some(value) = raw.get(*key) else {
            continue;
        };
        if let Some(n) = value.as_f64() {
            return n;
        }
        if let Some(n) = value.as_str().and_then(|s| s.parse::<f64>().ok()) {
            return n;
        }
    }
    default
}

fn integer_field(raw: &Map<String, Value>, key: &str, default: i64) -> i64 {
    match raw.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(default),
        Some(Value::String(s)) => s.parse().unwrap_or(default),
        _ => default,
    }
}

fn optional_string(raw: &Map<String, Value>, key: &str) -> Option<String> {
    match raw.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ========== Coordinates ==========

/// Priority: explicit `coordinates`, then `deliveryLocation`, then a pair
/// nested inside `address`. Anything else pins the default point so the
/// map view never crashes on a partial record.
fn normalize_coordinates(raw: &Map<String, Value>) -> Coordinates {
    for key in ["coordinates", "deliveryLocation"] {
        if let Some(point) = raw.get(key).and_then(coordinates_from) {
            return point;
        }
    }
    raw.get("address")
        .and_then(coordinates_from)
        .unwrap_or_default()
}

fn coordinates_from(value: &Value) -> Option<Coordinates> {
    let obj = value.as_object()?;
    let latitude = obj.get("latitude").and_then(Value::as_f64)?;
    let longitude = obj.get("longitude").and_then(Value::as_f64)?;
    Some(Coordinates::new(latitude, longitude))
}

// ========== Timestamps ==========

/// Coerce the three historic timestamp encodings: store-native
/// `{seconds, nanoseconds}` objects (with or without underscore prefixes),
/// RFC 3339 strings, and epoch milliseconds.
fn coerce_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Object(obj) => {
            let seconds = obj
                .get("seconds")
                .or_else(|| obj.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = obj
                .get("nanoseconds")
                .or_else(|| obj.get("_nanoseconds"))
                .and_then(Value::as_i64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0);
            Utc.timestamp_opt(seconds, nanos).single()
        }
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn timestamp_field(raw: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    raw.get(key).and_then(coerce_timestamp)
}

// ========== Items ==========

fn normalize_items(value: Option<&Value>) -> Vec<OrderItem> {
    let Some(Value::Array(entries)) = value else {
        return Vec::new();
    };
    entries.iter().map(normalize_item).collect()
}

fn normalize_item(value: &Value) -> OrderItem {
    let empty = Map::new();
    let raw = value.as_object().unwrap_or(&empty);

    let price = number_field(raw, &["price", "priceAtPurchase"], 0.0);
    let quantity = integer_field(raw, "quantity", 1);
    let subtotal = match raw.get("subtotal").and_then(Value::as_f64) {
        Some(explicit) => explicit,
        None => money::line_total(price, quantity),
    };

    OrderItem {
        id: string_field(raw, &["productId", "id"], ""),
        name: string_field(raw, &["name"], ""),
        price,
        quantity,
        image: normalize_image(raw.get("image")),
        variations: array_field(raw, &["variations", "selectedVariations"]),
        addons: array_field(raw, &["addons", "selectedAddons"]),
        subtotal,
    }
}

fn normalize_image(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(obj)) => obj
            .get("uri")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

fn array_field(raw: &Map<String, Value>, candidates: &[&str]) -> Vec<Value> {
    for key in candidates {
        if let Some(Value::Array(entries)) = raw.get(*key) {
            return entries.clone();
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().expect("test record is an object").clone()
    }

    #[test]
    fn test_explicit_coordinates_win() {
        let raw = record(json!({
            "coordinates": {"latitude": 40.4, "longitude": -3.7},
            "deliveryLocation": {"latitude": 1.0, "longitude": 1.0},
        }));
        let order = normalize_order(&raw, "u1");
        assert_eq!(order.coordinates, Coordinates::new(40.4, -3.7));
    }

    #[test]
    fn test_delivery_location_fallback() {
        let raw = record(json!({
            "deliveryLocation": {"latitude": 41.39, "longitude": 2.17},
        }));
        let order = normalize_order(&raw, "u1");
        assert_eq!(order.coordinates, Coordinates::new(41.39, 2.17));
    }

    #[test]
    fn test_coordinates_nested_in_address() {
        let raw = record(json!({
            "address": {"latitude": 48.85, "longitude": 2.35},
        }));
        let order = normalize_order(&raw, "u1");
        assert_eq!(order.coordinates, Coordinates::new(48.85, 2.35));
        // object-shaped address contributes no display text
        assert_eq!(order.address, "");
    }

    #[test]
    fn test_default_point_when_nothing_usable() {
        let raw = record(json!({
            "coordinates": {"latitude": "broken"},
            "address": "221B Baker Street",
        }));
        let order = normalize_order(&raw, "u1");
        assert_eq!(order.coordinates, Coordinates::default());
        assert_eq!(order.address, "221B Baker Street");
    }

    #[test]
    fn test_phone_alias_and_numeric_phone() {
        let raw = record(json!({"phoneNumber": "555-0101"}));
        assert_eq!(normalize_order(&raw, "u1").customer_phone, "555-0101");

        let raw = record(json!({"customerPhone": 5550101}));
        assert_eq!(normalize_order(&raw, "u1").customer_phone, "5550101");
    }

    #[test]
    fn test_status_chain() {
        let raw = record(json!({"orderStatus": "cooking"}));
        assert_eq!(normalize_order(&raw, "u1").status, "cooking");

        let raw = record(json!({"status": "accepted", "orderStatus": "cooking"}));
        assert_eq!(normalize_order(&raw, "u1").status, "accepted");

        // empty string behaves like absent
        let raw = record(json!({"status": "", "orderStatus": "cooking"}));
        assert_eq!(normalize_order(&raw, "u1").status, "cooking");

        let raw = record(json!({}));
        assert_eq!(normalize_order(&raw, "u1").status, "pending");
    }

    #[test]
    fn test_item_standardization() {
        let raw = record(json!({
            "items": [{"productId": "p1", "priceAtPurchase": 12, "quantity": 3}],
        }));
        let order = normalize_order(&raw, "u1");
        assert_eq!(order.items.len(), 1);
        let item = &order.items[0];
        assert_eq!(item.id, "p1");
        assert_eq!(item.price, 12.0);
        assert_eq!(item.quantity, 3);
        assert_eq!(item.subtotal, 36.0);
        assert_eq!(item.image, "");
    }

    #[test]
    fn test_item_defaults_and_explicit_values() {
        let raw = record(json!({
            "items": [
                {"id": "p2", "price": 0, "subtotal": 4.5},
                {"name": "mystery"},
            ],
        }));
        let order = normalize_order(&raw, "u1");
        // explicit zero price does not fall through, explicit subtotal kept
        assert_eq!(order.items[0].price, 0.0);
        assert_eq!(order.items[0].subtotal, 4.5);
        // absent quantity defaults to 1, absent price to 0
        assert_eq!(order.items[1].quantity, 1);
        assert_eq!(order.items[1].price, 0.0);
        assert_eq!(order.items[1].subtotal, 0.0);
    }

    #[test]
    fn test_item_image_shapes() {
        let raw = record(json!({
            "items": [
                {"image": "https://cdn.example.com/a.jpg"},
                {"image": {"uri": "https://cdn.example.com/b.jpg", "width": 400}},
                {"image": 7},
            ],
        }));
        let order = normalize_order(&raw, "u1");
        assert_eq!(order.items[0].image, "https://cdn.example.com/a.jpg");
        assert_eq!(order.items[1].image, "https://cdn.example.com/b.jpg");
        assert_eq!(order.items[2].image, "");
    }

    #[test]
    fn test_item_selected_variant_aliases() {
        let raw = record(json!({
            "items": [{
                "selectedVariations": [{"name": "large"}],
                "selectedAddons": [{"name": "extra cheese"}],
            }],
        }));
        let order = normalize_order(&raw, "u1");
        assert_eq!(order.items[0].variations, vec![json!({"name": "large"})]);
        assert_eq!(order.items[0].addons, vec![json!({"name": "extra cheese"})]);
    }

    #[test]
    fn test_timestamp_encodings() {
        let raw = record(json!({
            "createdAt": {"seconds": 1_700_000_000, "nanoseconds": 0},
            "updatedAt": "2024-01-15T10:30:00Z",
            "orderConfirmedAt": {"_seconds": 1_700_000_100, "_nanoseconds": 500_000_000},
            "paymentConfirmedAt": 1_700_000_200_000_i64,
        }));
        let order = normalize_order(&raw, "u1");
        assert_eq!(order.created_at.timestamp(), 1_700_000_000);
        assert_eq!(
            order.updated_at,
            "2024-01-15T10:30:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        let confirmed = order.order_confirmed_at.unwrap();
        assert_eq!(confirmed.timestamp(), 1_700_000_100);
        assert_eq!(confirmed.timestamp_subsec_millis(), 500);
        assert_eq!(
            order.payment_confirmed_at.unwrap().timestamp(),
            1_700_000_200
        );
    }

    #[test]
    fn test_missing_creation_timestamps_default_to_now() {
        let before = Utc::now();
        let order = normalize_order(&record(json!({})), "u1");
        let after = Utc::now();
        assert!(order.created_at >= before && order.created_at <= after);
        assert!(order.order_confirmed_at.is_none());
        assert!(order.payment_confirmed_at.is_none());
    }

    #[test]
    fn test_owner_fallback_for_legacy_records() {
        let raw = record(json!({"userId": "u-legacy"}));
        assert_eq!(normalize_order(&raw, "").owner_id, "u-legacy");
        // partition owner always wins over body fields
        assert_eq!(normalize_order(&raw, "u1").owner_id, "u1");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = record(json!({
            "phoneNumber": "555-0101",
            "deliveryLocation": {"latitude": 41.39, "longitude": 2.17},
            "orderStatus": "cooking",
            "total": "25.50",
            "items": [{"productId": "p1", "priceAtPurchase": 12, "quantity": 3}],
            "createdAt": 1_700_000_000_000_i64,
        }));
        let first = normalize_order(&raw, "u1");

        let reserialized = serde_json::to_value(&first).expect("canonical order serializes");
        let second = normalize_order(reserialized.as_object().unwrap(), "u1");

        assert_eq!(first, second);
        assert_eq!(second.total, 25.5);
        assert_eq!(second.status, "cooking");
    }

    #[test]
    fn test_document_key_used_only_when_body_has_no_id() {
        let keyed = Document::new("store-key", json!({"status": "pending"}));
        assert_eq!(try_normalize_document(&keyed, "u1").unwrap().id, "store-key");

        let bodied = Document::new("store-key", json!({"id": "body-id"}));
        assert_eq!(try_normalize_document(&bodied, "u1").unwrap().id, "body-id");
    }

    #[test]
    fn test_non_object_document_is_rejected() {
        let doc = Document::new("o1", json!([1, 2, 3]));
        let err = try_normalize_document(&doc, "u1").unwrap_err();
        match err {
            RepoError::Normalization { record_id, reason } => {
                assert_eq!(record_id, "o1");
                assert!(reason.contains("array"));
            }
            other => panic!("expected Normalization, got {other:?}"),
        }
    }
}
