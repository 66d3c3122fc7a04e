//! The product catalog.
//!
//! A small, fixed assortment shipped in-process: bullion inventory turns
//! over slowly and prices are derived live from spot, so there is nothing a
//! database would add here. `premium_usd` is the flat per-unit markup above
//! spot; `weight_grams` drives the weight-aware quote.

use serde::Serialize;

/// Metal a product is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Metal {
    Gold,
    Silver,
}

/// Physical form of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Form {
    Bar,
    Coin,
}

/// One catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: &'static str,
    pub sku: &'static str,
    pub name: &'static str,
    pub metal: Metal,
    pub form: Form,
    pub weight_grams: f64,
    /// Fineness, e.g. "999.9".
    pub purity: &'static str,
    /// Flat premium added to the spot-derived value, per unit.
    pub premium_usd: f64,
    pub brand: &'static str,
    pub country: &'static str,
    pub image: &'static str,
    pub in_stock: bool,
}

/// The full catalog, in display order.
pub static PRODUCTS: &[Product] = &[
    Product {
        id: "au-bar-1oz-royal-mint",
        sku: "AU-BAR-1OZ-ROYALMINT",
        name: "The Royal Mint - Una and the Lion (1oz Gold Bar)",
        metal: Metal::Gold,
        form: Form::Bar,
        weight_grams: 31.1035,
        purity: "999.9",
        premium_usd: 150.0,
        brand: "The Royal Mint",
        country: "UK",
        image: "/products/royal-mint-una-lion-1oz.jpg",
        in_stock: true,
    },
    Product {
        id: "au-bar-1oz-credit-suisse",
        sku: "AU-BAR-1OZ-CREDITSUISSE",
        name: "The Credit Suisse (1oz Gold Bar)",
        metal: Metal::Gold,
        form: Form::Bar,
        weight_grams: 31.1035,
        purity: "999.9",
        premium_usd: 200.0,
        brand: "The Credit Suisse",
        country: "CH",
        image: "/products/credit-suisse-1oz.jpg",
        in_stock: true,
    },
    Product {
        id: "au-bar-1oz-johnson",
        sku: "AU-BAR-1OZ-JM",
        name: "Johnson Matthey (1oz Gold Bar)",
        metal: Metal::Gold,
        form: Form::Bar,
        weight_grams: 31.1035,
        purity: "999.9",
        premium_usd: 120.0,
        brand: "Johnson Matthey",
        country: "US",
        image: "/products/johnson-matthey-1oz.jpg",
        in_stock: true,
    },
    Product {
        id: "au-bar-1oz-pamp",
        sku: "AU-BAR-1OZ-PAMP",
        name: "PAMP Suisse Classic (1oz Gold Bar)",
        metal: Metal::Gold,
        form: Form::Bar,
        weight_grams: 31.1035,
        purity: "999.9",
        premium_usd: 150.0,
        brand: "PAMP Suisse",
        country: "CH",
        image: "/products/pamp-suisse-classic-1oz.jpg",
        in_stock: true,
    },
    Product {
        id: "au-bar-1oz-perth",
        sku: "AU-BAR-1OZ-PERTH",
        name: "The Perth Mint Australia (1oz Gold Bar)",
        metal: Metal::Gold,
        form: Form::Bar,
        weight_grams: 31.1035,
        purity: "999.9",
        premium_usd: 120.0,
        brand: "The Perth Mint",
        country: "AU",
        image: "/products/perth-mint-1oz.jpg",
        in_stock: true,
    },
    Product {
        id: "au-bar-10g-pamp-fortuna",
        sku: "AU-BAR-10G-PAMPFORTUNA",
        name: "PAMP Suisse Lady Fortuna (10g Gold Bar)",
        metal: Metal::Gold,
        form: Form::Bar,
        weight_grams: 10.0,
        purity: "999.9",
        premium_usd: 150.0,
        brand: "PAMP Suisse",
        country: "CH",
        image: "/products/pamp-suisse-fortuna-10g.jpg",
        in_stock: true,
    },
    Product {
        id: "au-bar-1oz-varied-mint",
        sku: "AU-BAR-1OZ-VARIED",
        name: "Varied Mint - Any Mint (1oz Gold Bar)",
        metal: Metal::Gold,
        form: Form::Bar,
        weight_grams: 31.1035,
        purity: "999.9",
        premium_usd: 140.0,
        brand: "Various",
        country: "INTL",
        image: "/products/varied-anymint-1oz.jpg",
        in_stock: false,
    },
    Product {
        id: "au-bar-1kg-varied",
        sku: "AU-BAR-1KG-VARIED",
        name: "Varied Mint - Any Mint (1kg Gold Bar)",
        metal: Metal::Gold,
        form: Form::Bar,
        weight_grams: 999.865,
        purity: "999.9",
        premium_usd: 3858.0,
        brand: "Various",
        country: "INTL",
        image: "/products/varied-anymint-1kg.jpg",
        in_stock: true,
    },
];

/// Look up a product by id.
#[must_use]
pub fn get_product_by_id(id: &str) -> Option<&'static Product> {
    PRODUCTS.iter().find(|p| p.id == id)
}

/// Iterate over purchasable products.
pub fn list_in_stock() -> impl Iterator<Item = &'static Product> {
    PRODUCTS.iter().filter(|p| p.in_stock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_product_ids_unique() {
        let ids: HashSet<_> = PRODUCTS.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), PRODUCTS.len());
    }

    #[test]
    fn test_lookup() {
        let product = get_product_by_id("au-bar-10g-pamp-fortuna").expect("product");
        assert!((product.weight_grams - 10.0).abs() < f64::EPSILON);
        assert!(get_product_by_id("missing").is_none());
    }

    #[test]
    fn test_in_stock_filter() {
        assert!(list_in_stock().all(|p| p.in_stock));
        assert!(list_in_stock().count() < PRODUCTS.len());
    }

    #[test]
    fn test_weights_and_premiums_sane() {
        for product in PRODUCTS {
            assert!(product.weight_grams > 0.0, "{} has no mass", product.id);
            assert!(product.premium_usd >= 0.0, "{} negative premium", product.id);
        }
    }
}
