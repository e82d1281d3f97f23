/// A velocity impulse in field space: origin at the bottom-left, Y up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Splat {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
}

impl Splat {
    /// Convert a pointer position and movement from screen space, where Y
    /// grows downwards.
    pub fn from_screen(x: f32, y: f32, dx: f32, dy: f32) -> Self {
        Self {
            x,
            y: 1.0 - y,
            dx,
            dy: -dy,
        }
    }

    pub fn force(&self, gain: f32) -> [f32; 3] {
        [self.dx * gain, self.dy * gain, 0.0]
    }
}

/// Pointer position normalized to the canvas, in screen space.
#[derive(Clone, Copy, Debug, Default)]
pub struct Pointer {
    x: f32,
    y: f32,
    previous_x: f32,
    previous_y: f32,
    seen: bool,
}

impl Pointer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        // The first event only establishes where the pointer is. Otherwise the
        // jump from the origin would register as a huge stroke.
        if !self.seen {
            self.previous_x = x;
            self.previous_y = y;
            self.seen = true;
        }

        self.x = x;
        self.y = y;
    }

    /// Consume the movement since the last call. Returns a splat if the
    /// pointer moved further than `threshold` along either axis.
    pub fn take_splat(&mut self, threshold: f32) -> Option<Splat> {
        let dx = self.x - self.previous_x;
        let dy = self.y - self.previous_y;

        self.previous_x = self.x;
        self.previous_y = self.y;

        if dx.abs() > threshold || dy.abs() > threshold {
            Some(Splat::from_screen(self.x, self.y, dx, dy))
        } else {
            None
        }
    }
}

/// Normalize a client-space position against the canvas bounds.
pub fn normalize(
    client_x: f64,
    client_y: f64,
    left: f64,
    top: f64,
    width: f64,
    height: f64,
) -> (f32, f32) {
    if width <= 0.0 || height <= 0.0 {
        return (0.0, 0.0);
    }

    (
        ((client_x - left) / width) as f32,
        ((client_y - top) / height) as f32,
    )
}
