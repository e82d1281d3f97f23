use gloo_utils::format::JsValueSerdeExt;
use storefront::{catalog, clock, NewItem, Storefront, WallTime};
use wasm_bindgen::prelude::*;

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    JsValue::from_serde(value).map_err(|err| JsValue::from_str(&err.to_string()))
}

/// Cart and drawer state for the page.
#[wasm_bindgen]
#[derive(Default)]
pub struct Store {
    inner: Storefront,
}

#[wasm_bindgen]
impl Store {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Store {
        Store::default()
    }

    #[wasm_bindgen(js_name = addToCart)]
    pub fn add_to_cart(&mut self, item: &JsValue) -> Result<(), JsValue> {
        let item: NewItem = item
            .into_serde()
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        self.inner.add_to_cart(item);
        Ok(())
    }

    #[wasm_bindgen(js_name = addProduct)]
    pub fn add_product(&mut self, id: &str) -> Result<(), JsValue> {
        let product = catalog::find(id)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown product: {}", id)))?;
        self.inner.add_to_cart(product.to_cart_item());
        Ok(())
    }

    #[wasm_bindgen(js_name = removeFromCart)]
    pub fn remove_from_cart(&mut self, id: &str) {
        self.inner.remove_from_cart(id);
    }

    // JS numbers. `as` saturates, and NaN becomes zero.
    #[wasm_bindgen(js_name = updateQuantity)]
    pub fn update_quantity(&mut self, id: &str, quantity: f64) {
        self.inner.update_quantity(id, quantity as i64);
    }

    #[wasm_bindgen(js_name = openAbout)]
    pub fn open_about(&mut self) {
        self.inner.drawers.open_about();
    }

    #[wasm_bindgen(js_name = closeAbout)]
    pub fn close_about(&mut self) {
        self.inner.drawers.close_about();
    }

    #[wasm_bindgen(js_name = toggleAbout)]
    pub fn toggle_about(&mut self) {
        self.inner.drawers.toggle_about();
    }

    #[wasm_bindgen(js_name = openCart)]
    pub fn open_cart(&mut self) {
        self.inner.drawers.open_cart();
    }

    #[wasm_bindgen(js_name = closeCart)]
    pub fn close_cart(&mut self) {
        self.inner.drawers.close_cart();
    }

    #[wasm_bindgen(js_name = toggleCart)]
    pub fn toggle_cart(&mut self) {
        self.inner.drawers.toggle_cart();
    }

    #[wasm_bindgen(getter = isAboutOpen)]
    pub fn is_about_open(&self) -> bool {
        self.inner.drawers.is_about_open
    }

    #[wasm_bindgen(getter = isCartOpen)]
    pub fn is_cart_open(&self) -> bool {
        self.inner.drawers.is_cart_open
    }

    #[wasm_bindgen(getter = cartItems)]
    pub fn cart_items(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.cart.items())
    }

    #[wasm_bindgen(getter = cartTotal)]
    pub fn cart_total(&self) -> f64 {
        self.inner.cart.total()
    }

    #[wasm_bindgen(getter = cartCount)]
    pub fn cart_count(&self) -> u32 {
        self.inner.cart.count()
    }

    #[wasm_bindgen(getter = checkoutEnabled)]
    pub fn checkout_enabled(&self) -> bool {
        self.inner.cart.checkout_enabled()
    }

    pub fn recommendations(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.recommendations())
    }
}

#[wasm_bindgen]
pub fn products() -> Result<JsValue, JsValue> {
    to_js(&catalog::products())
}

fn now() -> WallTime {
    let date = js_sys::Date::new_0();
    WallTime {
        month: date.get_month(),
        day_of_month: date.get_date(),
        weekday: date.get_day(),
        hours: date.get_hours(),
        minutes: date.get_minutes(),
        seconds: date.get_seconds(),
    }
}

#[wasm_bindgen(js_name = timeClockHands)]
pub fn time_clock_hands() -> Result<JsValue, JsValue> {
    to_js(&clock::time_hands(&now()))
}

#[wasm_bindgen(js_name = hourDayClockHands)]
pub fn hour_day_clock_hands() -> Result<JsValue, JsValue> {
    to_js(&clock::hour_day_hands(&now()))
}

#[wasm_bindgen(js_name = orbitalClockHands)]
pub fn orbital_clock_hands() -> Result<JsValue, JsValue> {
    to_js(&clock::orbital_hands(&now()))
}

#[wasm_bindgen(js_name = displayHour)]
pub fn display_hour() -> u32 {
    now().display_hour()
}
