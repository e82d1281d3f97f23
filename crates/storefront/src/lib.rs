pub mod cart;
pub mod catalog;
pub mod clock;
pub mod drawer;

pub use cart::{Cart, CartItem, NewItem};
pub use catalog::Product;
pub use clock::WallTime;
pub use drawer::Drawers;

use serde::Serialize;

/// Drawer and cart state for a page. Passed by reference to whatever needs
/// it.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Storefront {
    pub drawers: Drawers,
    pub cart: Cart,
}

impl Storefront {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adding to the cart always brings the cart drawer up.
    pub fn add_to_cart(&mut self, item: NewItem) {
        log::debug!("Adding {} to the cart", item.id);
        self.cart.add(item);
        self.drawers.open_cart();
    }

    pub fn remove_from_cart(&mut self, id: &str) {
        self.cart.remove(id);
    }

    pub fn update_quantity(&mut self, id: &str, quantity: i64) {
        self.cart.update_quantity(id, quantity);
    }

    pub fn recommendations(&self) -> Vec<&'static Product> {
        catalog::recommendations(&self.cart)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn adding_opens_the_cart_drawer() {
        let mut storefront = Storefront::new();
        storefront.drawers.open_about();

        storefront.add_to_cart(catalog::PRODUCTS[1].to_cart_item());

        assert!(storefront.drawers.is_cart_open);
        assert!(storefront.drawers.is_about_open);
        assert_eq!(storefront.cart.count(), 1);
    }

    #[test]
    fn closing_the_drawer_keeps_the_cart() {
        let mut storefront = Storefront::new();
        storefront.add_to_cart(catalog::PRODUCTS[0].to_cart_item());
        storefront.drawers.close_cart();

        assert!(!storefront.drawers.is_cart_open);
        assert!(storefront.cart.contains("izzys-lot-1"));
        assert_eq!(storefront.recommendations().len(), 1);

        storefront.update_quantity("izzys-lot-1", 0);
        assert!(storefront.recommendations().is_empty());
    }
}
