//! Bundled product catalog and browsing filters.

use crate::money::Money;
use crate::types::Product;

/// Category name that selects every section
pub const ALL_CATEGORIES: &str = "All";

/// (name, price, weight, image)
type Row = (&'static str, &'static str, &'static str, &'static str);

const GROCERY: &[(&str, &[Row])] = &[
    (
        "Popular",
        &[
            ("Avocado", "₹120", "each", "https://placehold.co/150/90EE90/FFFFFF?text=Avocado"),
            ("Bananas", "₹60", "dozen", "https://placehold.co/150/FFD93D/FFFFFF?text=Banana"),
            ("Milk", "₹70", "1 L", "https://placehold.co/150/74B9FF/FFFFFF?text=Milk"),
            ("Bread", "₹50", "loaf", "https://placehold.co/150/F5CBA7/FFFFFF?text=Bread"),
        ],
    ),
    (
        "Fruits",
        &[
            ("Apples", "₹180", "1 kg", "https://placehold.co/150/FF6B6B/FFFFFF?text=Apple"),
            ("Oranges", "₹150", "1 kg", "https://placehold.co/150/FF9F43/FFFFFF?text=Orange"),
            ("Grapes", "₹120", "500g", "https://placehold.co/150/6C5CE7/FFFFFF?text=Grape"),
            ("Berries", "₹300", "pack", "https://placehold.co/150/E84393/FFFFFF?text=Berry"),
        ],
    ),
    (
        "Vegetables",
        &[
            ("Carrots", "₹60", "1 kg", "https://placehold.co/150/E17055/FFFFFF?text=Carrot"),
            ("Broccoli", "₹80", "head", "https://placehold.co/150/00B894/FFFFFF?text=Broccoli"),
            ("Spinach", "₹40", "bunch", "https://placehold.co/150/55EFC4/FFFFFF?text=Spinach"),
            ("Potatoes", "₹50", "1 kg", "https://placehold.co/150/B2BEC3/FFFFFF?text=Potato"),
        ],
    ),
    (
        "Dairy & Eggs",
        &[
            ("Milk", "₹70", "1 L", "https://placehold.co/150/74B9FF/FFFFFF?text=Milk"),
            ("Cheese", "₹250", "block", "https://placehold.co/150/FAB1A0/FFFFFF?text=Cheese"),
            ("Yogurt", "₹40", "cup", "https://placehold.co/150/A29BFE/FFFFFF?text=Yogurt"),
            ("Eggs", "₹90", "dozen", "https://placehold.co/150/FFEAA7/FFFFFF?text=Eggs"),
        ],
    ),
    (
        "Bakery",
        &[
            ("Bread", "₹50", "loaf", "https://placehold.co/150/F5CBA7/FFFFFF?text=Bread"),
            ("Bagels", "₹150", "6 pack", "https://placehold.co/150/E67E22/FFFFFF?text=Bagel"),
            ("Croissants", "₹200", "4 pack", "https://placehold.co/150/D35400/FFFFFF?text=Croissant"),
        ],
    ),
    (
        "Snacks",
        &[
            ("Chips", "₹40", "bag", "https://placehold.co/150/FF7675/FFFFFF?text=Chips"),
            ("Popcorn", "₹60", "bag", "https://placehold.co/150/FDCB6E/FFFFFF?text=Popcorn"),
            ("Cookies", "₹100", "pack", "https://placehold.co/150/6C5CE7/FFFFFF?text=Cookie"),
        ],
    ),
    (
        "Beverages",
        &[
            ("Orange Juice", "₹150", "1 L", "https://placehold.co/150/FFA502/FFFFFF?text=Juice"),
            ("Soda", "₹90", "2 L", "https://placehold.co/150/FF6348/FFFFFF?text=Soda"),
            ("Water", "₹40", "1 L", "https://placehold.co/150/74B9FF/FFFFFF?text=Water"),
        ],
    ),
];

/// A titled group of products
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    /// Category title
    pub title: String,
    /// Products in display order
    pub products: Vec<Product>,
}

/// Sectioned product catalog
///
/// The same product may appear in several sections (Milk is both Popular
/// and Dairy).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    sections: Vec<Section>,
}

impl Catalog {
    /// Catalog from explicit sections
    #[must_use]
    pub const fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    /// The bundled grocery catalog
    #[must_use]
    pub fn grocery() -> Self {
        let sections = GROCERY
            .iter()
            .map(|(title, rows)| Section {
                title: (*title).to_string(),
                products: rows
                    .iter()
                    .map(|(name, price, weight, image)| {
                        Product::new(*name, Money::parse_lenient(price), *weight).with_image(*image)
                    })
                    .collect(),
            })
            .collect();
        Self { sections }
    }

    /// All sections in display order
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Category chips: `"All"` then every section title
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        std::iter::once(ALL_CATEGORIES)
            .chain(self.sections.iter().map(|section| section.title.as_str()))
            .collect()
    }

    /// Sections matching `category` (or all for `"All"`), each narrowed to
    /// products whose name contains `query`, ignoring case
    ///
    /// Sections left without products are dropped. An empty query keeps
    /// every product.
    #[must_use]
    pub fn filter(&self, category: &str, query: &str) -> Vec<Section> {
        let needle = query.trim().to_lowercase();

        self.sections
            .iter()
            .filter(|section| category == ALL_CATEGORIES || section.title == category)
            .filter_map(|section| {
                let products: Vec<Product> = section
                    .products
                    .iter()
                    .filter(|product| product.name.to_lowercase().contains(&needle))
                    .cloned()
                    .collect();
                (!products.is_empty()).then(|| Section {
                    title: section.title.clone(),
                    products,
                })
            })
            .collect()
    }

    /// First product with exactly this name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Product> {
        self.sections
            .iter()
            .flat_map(|section| section.products.iter())
            .find(|product| product.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(sections: &[Section]) -> Vec<&str> {
        sections.iter().map(|s| s.title.as_str()).collect()
    }

    #[test]
    fn categories_start_with_all() {
        let catalog = Catalog::grocery();
        assert_eq!(
            catalog.categories(),
            vec![
                "All",
                "Popular",
                "Fruits",
                "Vegetables",
                "Dairy & Eggs",
                "Bakery",
                "Snacks",
                "Beverages"
            ]
        );
    }

    #[test]
    fn prices_are_parsed() {
        let catalog = Catalog::grocery();
        let avocado = catalog.find("Avocado");
        assert_eq!(avocado.map(|p| p.price), Some(Money::from_rupees(120)));
        assert_eq!(avocado.map(|p| p.weight.as_str()), Some("each"));
    }

    #[test]
    fn query_matches_case_insensitively_across_sections() {
        let catalog = Catalog::grocery();
        let sections = catalog.filter(ALL_CATEGORIES, "mILk");

        assert_eq!(titles(&sections), vec!["Popular", "Dairy & Eggs"]);
        assert!(sections.iter().all(|s| s.products.len() == 1));
    }

    #[test]
    fn category_selects_one_section() {
        let catalog = Catalog::grocery();
        let sections = catalog.filter("Bakery", "");

        assert_eq!(titles(&sections), vec!["Bakery"]);
        assert_eq!(sections[0].products.len(), 3);
    }

    #[test]
    fn empty_sections_are_dropped() {
        let catalog = Catalog::grocery();
        assert!(catalog.filter("Snacks", "milk").is_empty());
        assert!(catalog.filter("Meat", "").is_empty());
    }
}
