//! Shared domain types exchanged with the shop backend

use serde::{Deserialize, Serialize};

/// A single line item in a user's cart
///
/// Immutable per fetch: the cart screen replaces its list wholesale on
/// refresh and removes items by id on delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Line-item identifier, unique within a cart
    pub id: u64,
    /// Product this line refers to
    pub product_id: u64,
    /// Unit price in minor currency units
    pub unit_price: f64,
    /// Number of units
    pub quantity: u32,
    /// Presentation metadata; never priced
    pub display: DisplayMeta,
}

impl CartItem {
    /// Price of the whole line (`unit_price * quantity`)
    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

/// Presentation metadata for a cart line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayMeta {
    /// Product name shown in the cart list
    pub name: String,
    /// Thumbnail URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A geographic coordinate in WGS84 decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude, positive north
    pub lat: f64,
    /// Longitude, positive east
    pub lon: f64,
}

impl Coordinate {
    /// Create a coordinate
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// One candidate place returned by a geocoder search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceHit {
    /// Human-readable place name
    pub name: String,
    /// Resolved coordinate
    pub coord: Coordinate,
}

/// Receipt returned when an order is created from selected cart items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    /// Server-assigned order id
    pub order_id: u64,
    /// Line items included in the order
    pub item_ids: Vec<u64>,
    /// Charged total, tax included
    pub total: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> CartItem {
        CartItem {
            id: 7,
            product_id: 42,
            unit_price: 100_000.0,
            quantity: 2,
            display: DisplayMeta {
                name: "Royal Canin Kitten 2kg".to_string(),
                image_url: Some("https://cdn.pawcart.id/p/42.jpg".to_string()),
            },
        }
    }

    #[test]
    fn test_line_total() {
        assert_eq!(sample_item().line_total(), 200_000.0);
    }

    #[test]
    fn test_cart_item_wire_format() {
        let json = serde_json::to_value(sample_item()).unwrap();
        assert_eq!(json["productId"], 42);
        assert_eq!(json["unitPrice"], 100_000.0);
        assert_eq!(json["display"]["imageUrl"], "https://cdn.pawcart.id/p/42.jpg");
    }

    #[test]
    fn test_cart_item_roundtrip() {
        let item = sample_item();
        let json = serde_json::to_string(&item).unwrap();
        let back: CartItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_display_meta_omits_missing_image() {
        let meta = DisplayMeta {
            name: "Cat litter 10L".to_string(),
            image_url: None,
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(!json.contains("imageUrl"));
    }

    #[test]
    fn test_place_hit_decode() {
        let json = r#"{"name":"Pekanbaru, Riau","coord":{"lat":0.5071,"lon":101.4478}}"#;
        let hit: PlaceHit = serde_json::from_str(json).unwrap();
        assert_eq!(hit.name, "Pekanbaru, Riau");
        assert_eq!(hit.coord, Coordinate::new(0.5071, 101.4478));
    }
}
