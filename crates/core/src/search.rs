//! Keyword product search: substring term matches scored across every
//! searchable field, ranked by relevance and then by cheapest price.

use crate::domain::product::Product;

/// Score `products` against a whitespace-separated query. Zero-score items
/// are filtered out; ties break toward the cheaper product.
pub fn search_products(products: &[Product], query: &str) -> Vec<Product> {
    let terms: Vec<String> =
        query.to_lowercase().split_whitespace().map(|term| term.to_string()).collect();
    if terms.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(u32, &Product)> = products
        .iter()
        .filter_map(|product| {
            let score = score_product(product, &terms);
            (score > 0).then_some((score, product))
        })
        .collect();

    scored.sort_by(|(score_a, product_a), (score_b, product_b)| {
        score_b.cmp(score_a).then(product_a.price.cmp(&product_b.price))
    });

    scored.into_iter().map(|(_, product)| product.clone()).collect()
}

fn score_product(product: &Product, terms: &[String]) -> u32 {
    let searchable = [
        product.name.as_str(),
        product.seller.as_str(),
        product.category.as_str(),
        product.description.as_str(),
    ]
    .into_iter()
    .chain(product.tags.iter().map(|tag| tag.as_str()))
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase();

    terms.iter().filter(|term| searchable.contains(term.as_str())).count() as u32
}
