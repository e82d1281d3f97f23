use serde::{Deserialize, Serialize};

/// A product as it goes into the cart, before it has a quantity.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub primary_color: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub primary_color: String,
    pub quantity: u32,
}

/// Cart lines in the order they were first added. Each id appears once.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Adding an id that is already in the cart bumps its quantity.
    pub fn add(&mut self, item: NewItem) {
        match self.items.iter_mut().find(|line| line.id == item.id) {
            Some(line) => line.quantity += 1,
            None => self.items.push(CartItem {
                id: item.id,
                name: item.name,
                price: item.price,
                primary_color: item.primary_color,
                quantity: 1,
            }),
        }
    }

    pub fn remove(&mut self, id: &str) {
        self.items.retain(|line| line.id != id);
    }

    /// A quantity of zero or less removes the line. Unknown ids are ignored.
    pub fn update_quantity(&mut self, id: &str, quantity: i64) {
        if quantity <= 0 {
            self.remove(id);
            return;
        }

        if let Some(line) = self.items.iter_mut().find(|line| line.id == id) {
            line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|line| line.id == id)
    }

    pub fn total(&self) -> f64 {
        self.items
            .iter()
            .map(|line| line.price * f64::from(line.quantity))
            .sum()
    }

    pub fn count(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn checkout_enabled(&self) -> bool {
        !self.is_empty()
    }
}
