use crate::effect::Problem;
use crate::render::{self, Context, TextureOptions};

use glow::HasContext;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Somewhere a finished capture can be written.
pub trait ContentSurface {
    /// Upload tightly packed RGBA8 pixels, top row first.
    fn upload_rgba(&mut self, width: u32, height: u32, pixels: &[u8]) -> Result<(), Problem>;

    #[cfg(target_arch = "wasm32")]
    fn upload_image_bitmap(&mut self, bitmap: &web_sys::ImageBitmap) -> Result<(), Problem>;

    /// Whether a capture has landed yet.
    fn is_populated(&self) -> bool;

    /// Decode a PNG or JPEG and upload it.
    fn upload_encoded(&mut self, encoded_bytes: &[u8]) -> Result<(), Problem> {
        let img = image::load_from_memory(encoded_bytes).map_err(Problem::DecodeContent)?;
        let rgba = img.to_rgba8();

        log::debug!(
            "Uploading content (width: {}, height: {})",
            rgba.width(),
            rgba.height()
        );

        self.upload_rgba(rgba.width(), rgba.height(), rgba.as_raw())
    }
}

/// Checks that `pixels` holds exactly `width * height` RGBA8 texels.
pub fn check_rgba_size(width: u32, height: u32, pixels: &[u8]) -> Result<(), Problem> {
    let expected = 4 * (width as usize) * (height as usize);
    if pixels.len() != expected {
        return Err(Problem::Render(render::Problem::WrongDataSize {
            expected,
            actual: pixels.len(),
        }));
    }

    Ok(())
}

/// The latest raster of the wrapped content.
///
/// The texture object is created on the first upload and re-specified on
/// every upload after that.
pub struct ContentTexture {
    context: Context,
    texture: Option<glow::Texture>,
}

impl Drop for ContentTexture {
    fn drop(&mut self) {
        if let Some(texture) = self.texture.take() {
            unsafe {
                self.context.delete_texture(texture);
            }
        }
    }
}

impl ContentTexture {
    pub fn new(context: &Context) -> Self {
        Self {
            context: Rc::clone(context),
            texture: None,
        }
    }

    /// `None` until the first successful upload.
    pub fn texture(&self) -> Option<glow::Texture> {
        self.texture
    }

    // Binds the texture, creating it on first use.
    fn bind(&mut self) -> Result<glow::Texture, Problem> {
        let texture = match self.texture {
            Some(texture) => texture,
            None => unsafe {
                self.context
                    .create_texture()
                    .map_err(|_| Problem::Render(render::Problem::CannotCreateTexture))?
            },
        };

        unsafe {
            self.context.bind_texture(glow::TEXTURE_2D, Some(texture));
            TextureOptions::default().apply(&self.context);
        }

        Ok(texture)
    }
}

impl ContentSurface for ContentTexture {
    fn upload_rgba(&mut self, width: u32, height: u32, pixels: &[u8]) -> Result<(), Problem> {
        check_rgba_size(width, height, pixels)?;

        let texture = self.bind()?;
        unsafe {
            self.context.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                Some(pixels),
            );
            self.context.bind_texture(glow::TEXTURE_2D, None);
        }

        self.texture = Some(texture);
        Ok(())
    }

    #[cfg(target_arch = "wasm32")]
    fn upload_image_bitmap(&mut self, bitmap: &web_sys::ImageBitmap) -> Result<(), Problem> {
        let texture = self.bind()?;
        unsafe {
            self.context.tex_image_2d_with_image_bitmap(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                bitmap,
            );
            self.context.bind_texture(glow::TEXTURE_2D, None);
        }

        self.texture = Some(texture);
        Ok(())
    }

    fn is_populated(&self) -> bool {
        self.texture.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Uploaded,
    /// The effect was torn down while the capture was running.
    Discarded,
}

/// Where a rasterizer delivers a finished capture.
///
/// Holds only a weak reference, so a capture that outlives the effect never
/// touches a released texture.
#[derive(Clone)]
pub struct ContentSink {
    surface: Weak<RefCell<dyn ContentSurface>>,
}

impl ContentSink {
    pub fn new<S: ContentSurface + 'static>(surface: &Rc<RefCell<S>>) -> Self {
        let surface: Rc<RefCell<dyn ContentSurface>> = surface.clone();
        Self {
            surface: Rc::downgrade(&surface),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.surface.strong_count() > 0
    }

    pub fn upload_rgba(&self, width: u32, height: u32, pixels: &[u8]) -> Result<Delivery, Problem> {
        self.deliver(|surface| surface.upload_rgba(width, height, pixels))
    }

    pub fn upload_encoded(&self, encoded_bytes: &[u8]) -> Result<Delivery, Problem> {
        self.deliver(|surface| surface.upload_encoded(encoded_bytes))
    }

    #[cfg(target_arch = "wasm32")]
    pub fn upload_image_bitmap(&self, bitmap: &web_sys::ImageBitmap) -> Result<Delivery, Problem> {
        self.deliver(|surface| surface.upload_image_bitmap(bitmap))
    }

    fn deliver<F>(&self, upload: F) -> Result<Delivery, Problem>
    where
        F: FnOnce(&mut dyn ContentSurface) -> Result<(), Problem>,
    {
        match self.surface.upgrade() {
            Some(surface) => {
                upload(&mut *surface.borrow_mut())?;
                Ok(Delivery::Uploaded)
            }
            None => {
                log::debug!("Discarding a capture that finished after teardown");
                Ok(Delivery::Discarded)
            }
        }
    }
}

/// Produces a raster of the wrapped content.
pub trait Rasterizer {
    /// Start a capture. The result goes to `sink`. Drop `ticket` once the
    /// capture has finished, successfully or not; until then no other
    /// capture starts.
    fn rasterize(&mut self, sink: ContentSink, ticket: CaptureTicket);
}

/// Held for the duration of a capture. Dropping it re-arms the cadence.
#[derive(Debug)]
pub struct CaptureTicket {
    in_flight: Rc<Cell<bool>>,
}

impl Drop for CaptureTicket {
    fn drop(&mut self) {
        self.in_flight.set(false);
    }
}

/// Decides on which frames to re-capture the content.
///
/// A capture is due every `interval` frames, or on the next frame after
/// `request`. Nothing starts while a previous capture is still in flight; a
/// pending request waits until it can.
#[derive(Debug)]
pub struct CaptureCadence {
    interval: u32,
    frame: u32,
    dirty: bool,
    in_flight: Rc<Cell<bool>>,
}

impl CaptureCadence {
    /// An `interval` of zero disables the periodic captures.
    pub fn new(interval: u32) -> Self {
        Self {
            interval,
            frame: 0,
            dirty: true,
            in_flight: Rc::new(Cell::new(false)),
        }
    }

    pub fn set_interval(&mut self, interval: u32) {
        self.interval = interval;
    }

    pub fn request(&mut self) {
        self.dirty = true;
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.get()
    }

    /// Advance by one frame and hand out a ticket if a capture should start.
    pub fn poll(&mut self) -> Option<CaptureTicket> {
        self.frame = self.frame.wrapping_add(1);

        let is_periodic = self.interval > 0 && self.frame % self.interval == 0;
        if !(self.dirty || is_periodic) || self.in_flight.get() {
            return None;
        }

        self.dirty = false;
        self.in_flight.set(true);

        Some(CaptureTicket {
            in_flight: Rc::clone(&self.in_flight),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn frames_with_capture(cadence: &mut CaptureCadence, frames: u32) -> Vec<u32> {
        (1..=frames)
            .filter(|_| cadence.poll().is_some())
            .collect()
    }

    #[test]
    fn captures_on_the_first_frame_after_mount() {
        let mut cadence = CaptureCadence::new(30);
        assert!(cadence.poll().is_some());
        assert!(!cadence.is_in_flight());
    }

    #[test]
    fn captures_every_interval() {
        let mut cadence = CaptureCadence::new(30);
        assert_eq!(frames_with_capture(&mut cadence, 95), vec![1, 30, 60, 90]);
    }

    #[test]
    fn never_overlaps_an_in_flight_capture() {
        let mut cadence = CaptureCadence::new(2);
        let ticket = cadence.poll();
        assert!(ticket.is_some());
        assert!(cadence.is_in_flight());

        assert!(frames_with_capture(&mut cadence, 10).is_empty());

        drop(ticket);
        assert!(!cadence.is_in_flight());

        // Frame 12 is on the interval.
        assert!(cadence.poll().is_some());
    }

    #[test]
    fn a_request_waits_for_the_running_capture() {
        let mut cadence = CaptureCadence::new(0);
        let ticket = cadence.poll().unwrap();

        cadence.request();
        assert!(cadence.poll().is_none());
        assert!(cadence.poll().is_none());

        drop(ticket);
        assert!(cadence.poll().is_some());
        assert!(cadence.poll().is_none());
    }

    #[test]
    fn zero_interval_only_captures_on_request() {
        let mut cadence = CaptureCadence::new(0);
        assert_eq!(frames_with_capture(&mut cadence, 100), vec![1]);

        cadence.request();
        assert!(cadence.poll().is_some());
    }

    #[derive(Default)]
    struct MemorySurface {
        pixels: Option<(u32, u32, Vec<u8>)>,
    }

    impl ContentSurface for MemorySurface {
        fn upload_rgba(&mut self, width: u32, height: u32, pixels: &[u8]) -> Result<(), Problem> {
            check_rgba_size(width, height, pixels)?;
            self.pixels = Some((width, height, pixels.to_vec()));
            Ok(())
        }

        #[cfg(target_arch = "wasm32")]
        fn upload_image_bitmap(&mut self, _bitmap: &web_sys::ImageBitmap) -> Result<(), Problem> {
            self.pixels = Some((0, 0, Vec::new()));
            Ok(())
        }

        fn is_populated(&self) -> bool {
            self.pixels.is_some()
        }
    }

    /// Delivers a fixed 2x1 image as soon as it is asked to.
    struct ImmediateRasterizer;

    impl Rasterizer for ImmediateRasterizer {
        fn rasterize(&mut self, sink: ContentSink, _ticket: CaptureTicket) {
            let delivery = sink.upload_rgba(2, 1, &[255; 8]).unwrap();
            assert_eq!(delivery, Delivery::Uploaded);
        }
    }

    #[test]
    fn the_first_capture_populates_the_content() {
        let surface = Rc::new(RefCell::new(MemorySurface::default()));
        let mut cadence = CaptureCadence::new(30);
        assert!(!surface.borrow().is_populated());

        let ticket = cadence.poll().unwrap();
        ImmediateRasterizer.rasterize(ContentSink::new(&surface), ticket);

        assert!(surface.borrow().is_populated());
        assert!(!cadence.is_in_flight());
        assert_eq!(surface.borrow().pixels, Some((2, 1, vec![255; 8])));
    }

    #[test]
    fn a_wrongly_sized_capture_leaves_the_content_empty() {
        let surface = Rc::new(RefCell::new(MemorySurface::default()));
        let sink = ContentSink::new(&surface);

        assert!(sink.upload_rgba(2, 2, &[0; 4]).is_err());
        assert!(!surface.borrow().is_populated());
    }

    #[test]
    fn undecodable_captures_are_reported() {
        let surface = Rc::new(RefCell::new(MemorySurface::default()));
        let sink = ContentSink::new(&surface);

        assert!(matches!(
            sink.upload_encoded(b"not an image"),
            Err(Problem::DecodeContent(_))
        ));
        assert!(!surface.borrow().is_populated());
    }

    #[test]
    fn a_detached_sink_discards_deliveries() {
        let surface = Rc::new(RefCell::new(MemorySurface::default()));
        let sink = ContentSink::new(&surface);
        drop(surface);

        assert!(!sink.is_attached());
        assert_eq!(
            sink.upload_rgba(1, 1, &[0, 0, 0, 255]).unwrap(),
            Delivery::Discarded
        );
        assert_eq!(sink.upload_encoded(&[]).unwrap(), Delivery::Discarded);
    }
}
