use fluid_distortion::{CaptureTicket, ContentSink, Delivery, Rasterizer};

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{HtmlElement, ImageBitmap};

/// Rasterizes the content element with a caller-supplied function of the
/// shape `(element) => Promise<ImageBitmap>`.
pub struct DomRasterizer {
    capture: js_sys::Function,
    content: HtmlElement,
}

impl DomRasterizer {
    pub fn new(capture: js_sys::Function, content: &HtmlElement) -> Self {
        Self {
            capture,
            content: content.clone(),
        }
    }
}

impl Rasterizer for DomRasterizer {
    fn rasterize(&mut self, sink: ContentSink, ticket: CaptureTicket) {
        let capture = self.capture.clone();
        let content = self.content.clone();

        // Runs as a microtask, after the current frame has released the
        // scheduler, so `capture` may call back into the effect.
        wasm_bindgen_futures::spawn_local(async move {
            // Held until the upload is done.
            let _ticket = ticket;

            let promise = match capture.call1(&JsValue::NULL, &content) {
                Ok(value) => js_sys::Promise::resolve(&value),
                Err(error) => {
                    log::error!("Failed to capture content: {:?}", error);
                    return;
                }
            };

            let bitmap = match JsFuture::from(promise).await {
                Ok(value) => value.dyn_into::<ImageBitmap>(),
                Err(error) => Err(error),
            };

            match bitmap {
                Ok(bitmap) => {
                    match sink.upload_image_bitmap(&bitmap) {
                        Ok(Delivery::Uploaded) => log::debug!(
                            "Captured content ({}x{})",
                            bitmap.width(),
                            bitmap.height()
                        ),
                        Ok(Delivery::Discarded) => (),
                        Err(problem) => log::error!("Failed to upload content: {}", problem),
                    }
                    bitmap.close();
                }
                Err(error) => log::error!("Failed to capture content: {:?}", error),
            }
        });
    }
}
