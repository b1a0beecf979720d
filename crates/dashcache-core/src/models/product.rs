use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Product {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(rename = "discountPercentage", default)]
    pub discount_percentage: f64,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(rename = "warrantyInformation", default)]
    pub warranty_information: Option<String>,
    #[serde(rename = "shippingInformation", default)]
    pub shipping_information: Option<String>,
    #[serde(rename = "availabilityStatus", default)]
    pub availability_status: Option<String>,
    #[serde(rename = "returnPolicy", default)]
    pub return_policy: Option<String>,
    #[serde(rename = "minimumOrderQuantity", default)]
    pub minimum_order_quantity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl Product {
    /// Price after applying the listed discount, rounded to cents
    pub fn discounted_price(&self) -> f64 {
        let discount = self.discount_percentage.clamp(0.0, 100.0);
        let price = self.price * (1.0 - discount / 100.0);
        (price * 100.0).round() / 100.0
    }

    pub fn in_stock(&self) -> bool {
        self.stock.map(|s| s > 0).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT_JSON: &str = r#"{
        "id": 1,
        "title": "Essence Mascara Lash Princess",
        "description": "A popular mascara.",
        "category": "beauty",
        "price": 9.99,
        "discountPercentage": 10.0,
        "rating": 2.56,
        "stock": 99,
        "tags": ["beauty", "mascara"],
        "brand": "Essence",
        "sku": "BEA-ESS-ESS-001",
        "weight": 4,
        "dimensions": {"width": 15.14, "height": 13.08, "depth": 22.99},
        "warrantyInformation": "1 week warranty",
        "shippingInformation": "Ships in 3-5 business days",
        "availabilityStatus": "In Stock",
        "returnPolicy": "No return policy",
        "minimumOrderQuantity": 48,
        "images": ["https://cdn.dummyjson.com/product-images/beauty/1.webp"],
        "thumbnail": "https://cdn.dummyjson.com/product-images/beauty/thumbnail.webp"
    }"#;

    #[test]
    fn test_parse_product() {
        let product: Product = serde_json::from_str(PRODUCT_JSON).expect("Failed to parse product test JSON");
        assert_eq!(product.id, 1);
        assert_eq!(product.brand.as_deref(), Some("Essence"));
        assert_eq!(product.tags, vec!["beauty", "mascara"]);
        assert_eq!(product.minimum_order_quantity, Some(48));
        assert!(product.in_stock());
        assert_eq!(product.dimensions.as_ref().map(|d| d.depth), Some(22.99));
    }

    #[test]
    fn test_discounted_price() {
        let mut product: Product = serde_json::from_str(PRODUCT_JSON).expect("Failed to parse product test JSON");
        assert_eq!(product.discounted_price(), 8.99);

        product.discount_percentage = 0.0;
        assert_eq!(product.discounted_price(), 9.99);

        product.discount_percentage = 150.0;
        assert_eq!(product.discounted_price(), 0.0);
    }

    #[test]
    fn test_product_without_brand_or_stock() {
        let product: Product = serde_json::from_str(r#"{"id": 5, "title": "Thing", "price": 1.5}"#)
            .expect("Failed to parse minimal product");
        assert!(product.brand.is_none());
        assert!(!product.in_stock());
        assert!(product.images.is_empty());
    }
}
