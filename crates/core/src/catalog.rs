//! Built-in sample catalog, used whenever the document store has no seller
//! inventory to offer.

use crate::domain::product::{Product, ProductId};

fn product(
    id: &str,
    name: &str,
    seller: &str,
    price: u64,
    category: &str,
    description: &str,
    tags: &[&str],
    available: bool,
) -> Product {
    Product {
        id: ProductId(id.to_string()),
        seller_id: None,
        name: name.to_string(),
        seller: seller.to_string(),
        price,
        category: category.to_string(),
        description: description.to_string(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        available,
    }
}

pub fn sample_products() -> Vec<Product> {
    vec![
        product(
            "p1",
            "Nasi Rendang",
            "Padang Jaya",
            17_000,
            "nasi padang",
            "Nasi dengan rendang daging sapi empuk",
            &["nasi", "padang", "rendang", "daging", "beef", "spicy"],
            true,
        ),
        product(
            "p2",
            "Nasi Ayam Bakar",
            "Padang Sederhana",
            16_000,
            "nasi padang",
            "Nasi dengan ayam bakar bumbu padang",
            &["nasi", "padang", "ayam", "chicken", "bakar", "grilled"],
            true,
        ),
        product(
            "p3",
            "Nasi Ayam Goreng",
            "Warteg Bu Tini",
            15_000,
            "nasi padang",
            "Nasi dengan ayam goreng crispy",
            &["nasi", "ayam", "chicken", "goreng", "fried", "cheap", "murah"],
            true,
        ),
        product(
            "p4",
            "Nasi Dendeng Balado",
            "RM Minang Asli",
            18_000,
            "nasi padang",
            "Nasi dengan dendeng balado pedas",
            &["nasi", "padang", "dendeng", "balado", "spicy", "beef"],
            true,
        ),
        product(
            "p5",
            "Es Teler",
            "Es Teler 77",
            12_000,
            "minuman",
            "Es campur dengan alpukat, kelapa, dan nangka",
            &["sweet", "manis", "cold", "drink", "dessert", "fruit"],
            true,
        ),
        product(
            "p6",
            "Pisang Goreng Coklat",
            "Kedai Pisgor",
            8_000,
            "snack",
            "Pisang goreng dengan topping coklat leleh",
            &["sweet", "manis", "pisang", "banana", "coklat", "chocolate", "cheap", "murah"],
            true,
        ),
        product(
            "p7",
            "Klepon",
            "Jajan Pasar Bu Yuni",
            5_000,
            "snack",
            "Kue klepon isi gula merah (isi 5)",
            &["sweet", "manis", "traditional", "cheap", "murah", "snack"],
            false,
        ),
        product(
            "p8",
            "Martabak Manis",
            "Martabak Pecenongan",
            35_000,
            "snack",
            "Martabak manis coklat keju kacang",
            &["sweet", "manis", "martabak", "chocolate", "cheese", "big", "sharing"],
            true,
        ),
        product(
            "p9",
            "Es Jeruk",
            "Warung Pak Jo",
            5_000,
            "minuman",
            "Es jeruk segar",
            &["drink", "cold", "fresh", "cheap", "murah", "orange"],
            true,
        ),
        product(
            "p10",
            "Kopi Susu",
            "Kopi Kenangan",
            18_000,
            "minuman",
            "Kopi susu gula aren",
            &["drink", "coffee", "kopi", "milk", "susu"],
            true,
        ),
        product(
            "p11",
            "Mie Ayam",
            "Mie Ayam Bangka",
            15_000,
            "makanan",
            "Mie ayam dengan bakso",
            &["noodle", "mie", "ayam", "chicken", "cheap", "murah"],
            true,
        ),
        product(
            "p12",
            "Bakso Urat",
            "Bakso Pak Kumis",
            18_000,
            "makanan",
            "Bakso urat dengan kuah kaldu sapi",
            &["bakso", "meatball", "beef", "soup", "kuah"],
            true,
        ),
        product(
            "p13",
            "Sate Ayam",
            "Sate Madura Cak Man",
            20_000,
            "makanan",
            "Sate ayam 10 tusuk dengan lontong",
            &["sate", "satay", "ayam", "chicken", "grilled"],
            true,
        ),
        product(
            "p14",
            "Gado-gado",
            "Bu Haji Gado-gado",
            12_000,
            "makanan",
            "Gado-gado dengan bumbu kacang",
            &["vegetable", "sayur", "healthy", "cheap", "murah", "peanut"],
            true,
        ),
        product(
            "p15",
            "Nasi Goreng Spesial",
            "Nasgor Bang Jali",
            18_000,
            "makanan",
            "Nasi goreng dengan telur, ayam, dan kerupuk",
            &["nasi", "goreng", "fried rice", "egg", "chicken"],
            true,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::sample_products;

    #[test]
    fn sample_catalog_has_the_full_spread_of_categories() {
        let products = sample_products();
        assert_eq!(products.len(), 15);

        for category in ["nasi padang", "snack", "minuman", "makanan"] {
            assert!(
                products.iter().any(|p| p.category == category),
                "missing category {category}"
            );
        }
    }

    #[test]
    fn exactly_one_sample_item_is_sold_out() {
        let products = sample_products();
        let unavailable: Vec<&str> = products
            .iter()
            .filter(|p| !p.available)
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(unavailable, vec!["Klepon"]);
    }
}
