//! Domain types shared by the storefront stores.

use crate::money::Money;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A catalog product
///
/// The name is the identity key: carts and favorites match products by name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Display name, unique within the catalog
    pub name: String,
    /// Unit price
    pub price: Money,
    /// Pack size label ("1 L", "dozen", "each")
    #[serde(default)]
    pub weight: String,
    /// Image URL
    #[serde(default)]
    pub image: String,
    /// Promotional label, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<String>,
}

impl Product {
    /// Product without image or discount
    #[must_use]
    pub fn new(name: impl Into<String>, price: Money, weight: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price,
            weight: weight.into(),
            image: String::new(),
            discount: None,
        }
    }

    /// Set the image URL
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Set the promotional label
    #[must_use]
    pub fn with_discount(mut self, discount: impl Into<String>) -> Self {
        self.discount = Some(discount.into());
        self
    }
}

/// One cart entry: a product and how many of it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// The product, flattened so records read like the product plus `quantity`
    #[serde(flatten)]
    pub product: Product,
    /// Units in the cart, at least 1 while the line exists
    pub quantity: u32,
}

impl CartLine {
    /// A line of `quantity` units
    #[must_use]
    pub const fn new(product: Product, quantity: u32) -> Self {
        Self { product, quantity }
    }

    /// The product name (line identity)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.product.name
    }

    /// Price times quantity
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.product.price * self.quantity
    }
}

/// Order identifier, `ORD` followed by a number
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Wrap an existing identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier for a generated order number
    #[must_use]
    pub fn from_number(number: u64) -> Self {
        Self(format!("ORD{number}"))
    }

    /// The identifier text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an order is in its lifecycle
///
/// Placed orders move `Pending → Accepted → Out for Delivery → Delivered`.
/// `Processing` and `Cancelled` only come from restored or sample history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Just placed
    Pending,
    /// Accepted by the store
    Accepted,
    /// With a delivery partner
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    /// Handed over
    Delivered,
    /// Cancelled
    Cancelled,
    /// Being prepared (legacy status)
    Processing,
}

impl OrderStatus {
    /// The status automatic progression moves to next, if any
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Accepted),
            Self::Accepted => Some(Self::OutForDelivery),
            Self::OutForDelivery => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled | Self::Processing => None,
        }
    }

    /// Whether no further change is expected
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Display name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::OutForDelivery => "Out for Delivery",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Processing => "Processing",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A placed order
///
/// `items` is an owned copy taken at placement; later cart changes never
/// reach it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Identifier
    pub id: OrderId,
    /// Placement date
    pub date: NaiveDate,
    /// Current status
    pub status: OrderStatus,
    /// Amount charged
    pub total: Money,
    /// Lines as they were at checkout
    pub items: Vec<CartLine>,
    /// Delivery address
    pub delivery_address: String,
    /// Delivery time label ("15 mins", "Just now")
    pub delivery_time: String,
    /// Payment method, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

impl Order {
    /// Total units across all lines
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    /// One-line summary, e.g. `"4 items: Fresh Apples, Organic Milk, Brown Bread"`
    #[must_use]
    pub fn summary(&self) -> String {
        let count = self.item_count();
        let names: Vec<&str> = self.items.iter().map(CartLine::name).collect();
        let plural = if count > 1 { "s" } else { "" };
        format!("{count} item{plural}: {}", names.join(", "))
    }
}
