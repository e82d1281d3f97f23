use crate::cart::{Cart, NewItem};

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: &'static str,
    pub name: &'static str,
    pub price: f64,
    pub process: &'static str,
    pub taste_profile: &'static str,
    pub variety: &'static str,
    pub altitude: &'static str,
    pub producer: &'static str,
    pub details: &'static str,
    pub primary_color: &'static str,
}

impl Product {
    /// The name without the producer, as printed on the product badge.
    pub fn badge(&self) -> String {
        self.name
            .split(' ')
            .skip(1)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn to_cart_item(&self) -> NewItem {
        NewItem {
            id: self.id.to_string(),
            name: self.name.to_string(),
            price: self.price,
            primary_color: self.primary_color.to_string(),
        }
    }
}

pub static PRODUCTS: [Product; 2] = [
    Product {
        id: "izzys-lot-1",
        name: "IZZY'S LOT NO. 1",
        price: 25.00,
        process: "Semi-washed apple co-ferment",
        taste_profile: "Vanilla, Cinnamon, Citrus",
        variety: "Colombia, Castillo",
        altitude: "1650 m",
        producer: "Andres Cardona",
        details: "This lot is Andrés' apple co-ferment, an innovative experiment where he \
                  combines his coffee cherries with fresh apple juice and ferments them for five \
                  days. The addition of apple juice not only intensifies the natural acidity of \
                  the cup but also contributes to a round, creamy mouthfeel that makes the \
                  profile truly distinctive. Andrés has always been known for his restless \
                  curiosity and drive to experiment. His portfolio is constantly evolving as he \
                  tests new ideas, techniques, and flavor profiles.",
        primary_color: "#E07A5F",
    },
    Product {
        id: "joes-lot-1",
        name: "JOE'S LOT NO. 1",
        price: 25.00,
        process: "Black Berry Co-Ferment",
        taste_profile: "Strawberry, Raspberry Cherry, Chocolate",
        variety: "Caturra",
        altitude: "1800 m",
        producer: "Sebastian Ramirez",
        details: "The Black Berry Co-Fermented process is a unique technique that blends the \
                  flavor of blackberries with coffee in a perfectly balanced way. This coffee \
                  stands out for its tartaric acidity, achieved through controlled fermentation, \
                  where the temperature is carefully regulated. After the coffee is depulped, a \
                  thermal shock with hot water is applied to halt the fermentation process and \
                  lock in the flavors developed up to that point.",
        primary_color: "#C5D92D",
    },
];

pub fn products() -> &'static [Product] {
    &PRODUCTS
}

pub fn find(id: &str) -> Option<&'static Product> {
    PRODUCTS.iter().find(|product| product.id == id)
}

/// Products to suggest from the cart drawer: everything not already in the
/// cart. An empty cart gets no suggestions.
pub fn recommendations(cart: &Cart) -> Vec<&'static Product> {
    if cart.is_empty() {
        return Vec::new();
    }

    PRODUCTS
        .iter()
        .filter(|product| !cart.contains(product.id))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(PRODUCTS[0].id, PRODUCTS[1].id);
        assert_eq!(find("joes-lot-1").map(|p| p.producer), Some("Sebastian Ramirez"));
        assert_eq!(find("nope"), None);
    }

    #[test]
    fn badges_drop_the_first_word() {
        assert_eq!(PRODUCTS[0].badge(), "LOT NO. 1");
    }

    #[test]
    fn recommends_what_is_not_in_the_cart() {
        let mut cart = Cart::new();
        assert!(recommendations(&cart).is_empty());

        cart.add(PRODUCTS[0].to_cart_item());
        let ids: Vec<&str> = recommendations(&cart).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["joes-lot-1"]);

        cart.add(PRODUCTS[1].to_cart_item());
        assert!(recommendations(&cart).is_empty());
    }

    #[test]
    fn details_are_not_broken_by_line_continuations() {
        assert!(PRODUCTS[1].details.contains("balanced way. This coffee"));
        assert!(!PRODUCTS[0].details.contains("  "));
    }
}
