use serde::Serialize;

/// The two slide-out drawers. They open and close independently.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Drawers {
    pub is_about_open: bool,
    pub is_cart_open: bool,
}

impl Drawers {
    pub fn open_about(&mut self) {
        self.is_about_open = true;
    }

    pub fn close_about(&mut self) {
        self.is_about_open = false;
    }

    pub fn toggle_about(&mut self) {
        self.is_about_open = !self.is_about_open;
    }

    pub fn open_cart(&mut self) {
        self.is_cart_open = true;
    }

    pub fn close_cart(&mut self) {
        self.is_cart_open = false;
    }

    pub fn toggle_cart(&mut self) {
        self.is_cart_open = !self.is_cart_open;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn starts_closed() {
        assert_eq!(
            Drawers::default(),
            Drawers {
                is_about_open: false,
                is_cart_open: false,
            }
        );
    }

    #[test]
    fn drawers_are_independent() {
        let mut drawers = Drawers::default();

        drawers.toggle_about();
        drawers.open_cart();
        assert!(drawers.is_about_open && drawers.is_cart_open);

        drawers.close_about();
        assert!(!drawers.is_about_open);
        assert!(drawers.is_cart_open);

        drawers.toggle_cart();
        drawers.toggle_cart();
        assert!(drawers.is_cart_open);
    }
}
