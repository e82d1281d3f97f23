use crate::host::{SharedScheduler, WebHost};
use crate::rasterizer::DomRasterizer;

use fluid_distortion::{Distortion, Problem, Scheduler, Settings};
use gloo_utils::format::JsValueSerdeExt;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, HtmlElement, Window};

#[wasm_bindgen]
pub struct FluidDistortion {
    scheduler: SharedScheduler,
    content: HtmlElement,
    container: HtmlElement,
    canvas: HtmlCanvasElement,
}

#[wasm_bindgen]
impl FluidDistortion {
    /// Hide `content` inside `container` and overlay it with the distorted
    /// copy. `capture` is called with `content`, outside the frame loop, and
    /// must resolve to an `ImageBitmap`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        container: HtmlElement,
        content: HtmlElement,
        capture: js_sys::Function,
        settings_object: &JsValue,
    ) -> Result<FluidDistortion, JsValue> {
        set_panic_hook();
        // A second mount finds the logger already set.
        let _ = console_log::init_with_level(log::Level::Debug);

        let settings = Rc::new(read_settings(settings_object)?);
        let window = window()?;

        let canvas = create_overlay(&window, &container, &content, settings.canvas_size)?;

        let scheduler: SharedScheduler = Rc::new(RefCell::new(Scheduler::new(
            WebHost::new(&window, &container, &canvas),
            &settings,
        )));
        let attached = scheduler
            .borrow_mut()
            .host_mut()
            .attach(Rc::downgrade(&scheduler));
        if let Err(error) = attached {
            scheduler.borrow_mut().teardown();
            restore_page(&canvas, &content)?;
            return Err(error);
        }

        let mounted = scheduler.borrow_mut().mount(|| {
            let context = get_rendering_context(&canvas)?;
            let rasterizer = DomRasterizer::new(capture, &content);
            Distortion::new(&Rc::new(context), &settings, Box::new(rasterizer))
        });

        // Leave the page as it was if the effect cannot run.
        if mounted.is_err() {
            restore_page(&canvas, &content)?;
        }

        Ok(Self {
            scheduler,
            content,
            container,
            canvas,
        })
    }

    #[wasm_bindgen(setter)]
    pub fn set_settings(&mut self, settings_object: &JsValue) -> Result<(), JsValue> {
        let settings = Rc::new(read_settings(settings_object)?);

        size_overlay(&self.container, &self.canvas, settings.canvas_size)?;

        let mut scheduler = self.scheduler.borrow_mut();
        scheduler.update(&settings);
        if let Some(effect) = scheduler.effect_mut() {
            effect.update(&settings);
        }

        Ok(())
    }

    /// Re-capture the content on the next frame.
    pub fn refresh(&mut self) {
        self.scheduler.borrow_mut().request_capture();
    }

    #[wasm_bindgen(getter)]
    pub fn running(&self) -> bool {
        self.scheduler.borrow().state() == fluid_distortion::State::Running
    }

    /// Stop the effect and show the page content again. Safe to call
    /// more than once.
    pub fn unmount(&mut self) -> Result<(), JsValue> {
        self.scheduler.borrow_mut().teardown();
        restore_page(&self.canvas, &self.content)
    }
}

fn read_settings(settings_object: &JsValue) -> Result<Settings, JsValue> {
    if settings_object.is_undefined() || settings_object.is_null() {
        return Ok(Settings::default());
    }

    settings_object
        .into_serde()
        .map_err(|err| JsValue::from_str(&Problem::ReadSettings(err.to_string()).to_string()))
}

fn create_overlay(
    window: &Window,
    container: &HtmlElement,
    content: &HtmlElement,
    size: u32,
) -> Result<HtmlCanvasElement, JsValue> {
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("The document doesn’t exist"))?;

    container.style().set_property("position", "relative")?;

    let content_style = content.style();
    content_style.set_property("position", "absolute")?;
    content_style.set_property("inset", "0")?;
    content_style.set_property("visibility", "hidden")?;

    let canvas = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()?;

    let canvas_style = canvas.style();
    canvas_style.set_property("position", "absolute")?;
    canvas_style.set_property("inset", "0")?;
    canvas_style.set_property("width", "100%")?;
    canvas_style.set_property("height", "100%")?;

    size_overlay(container, &canvas, size)?;
    container.append_child(&canvas)?;

    Ok(canvas)
}

// The container and the canvas drawing buffer share one square size.
fn size_overlay(
    container: &HtmlElement,
    canvas: &HtmlCanvasElement,
    size: u32,
) -> Result<(), JsValue> {
    let container_style = container.style();
    container_style.set_property("width", &format!("{}px", size))?;
    container_style.set_property("height", &format!("{}px", size))?;

    canvas.set_width(size);
    canvas.set_height(size);

    Ok(())
}

// Removes the overlay and shows the content again.
fn restore_page(canvas: &HtmlCanvasElement, content: &HtmlElement) -> Result<(), JsValue> {
    canvas.remove();
    content.style().remove_property("visibility")?;
    Ok(())
}

fn get_rendering_context(canvas: &HtmlCanvasElement) -> Result<glow::Context, Problem> {
    use web_sys::WebGl2RenderingContext as GL;

    let options = ContextOptions {
        alpha: true,
        depth: false,
        stencil: false,
        antialias: false,
        premultiplied_alpha: true,
        preserve_drawing_buffer: false,
    }
    .serialize()?;

    let gl = match canvas.get_context_with_context_options("webgl2", &options) {
        Ok(Some(gl)) => gl
            .dyn_into::<GL>()
            .map_err(|_| Problem::CreateContext("Not a WebGL2 context".to_string()))?,
        _ => {
            return Err(Problem::CreateContext(
                "WebGL2 is not available".to_string(),
            ))
        }
    };

    // Half-float render targets. Without them the fields fall back to bytes.
    let _ = gl.get_extension("EXT_color_buffer_half_float");
    let _ = gl.get_extension("EXT_color_buffer_float");

    gl.disable(GL::BLEND);
    gl.disable(GL::DEPTH_TEST);

    Ok(glow::Context::from_webgl2_context(gl))
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ContextOptions {
    pub alpha: bool,
    pub depth: bool,
    pub stencil: bool,
    pub antialias: bool,
    pub premultiplied_alpha: bool,
    pub preserve_drawing_buffer: bool,
}

impl ContextOptions {
    pub fn serialize(&self) -> Result<JsValue, Problem> {
        JsValue::from_serde(self).map_err(|err| Problem::CreateContext(err.to_string()))
    }
}

fn window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("The global `window` doesn’t exist"))
}

// https://github.com/rustwasm/console_error_panic_hook#readme
fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

#[cfg(test)]
mod test {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn page() -> (Window, HtmlElement, HtmlElement) {
        let window = window().unwrap();
        let document = window.document().unwrap();
        let element = || {
            document
                .create_element("div")
                .unwrap()
                .dyn_into::<HtmlElement>()
                .unwrap()
        };

        let container = element();
        let content = element();
        container.append_child(&content).unwrap();
        document.body().unwrap().append_child(&container).unwrap();

        (window, container, content)
    }

    #[wasm_bindgen_test]
    fn the_overlay_hides_the_content() {
        let (window, container, content) = page();
        let canvas = create_overlay(&window, &container, &content, 300).unwrap();

        assert!(canvas.parent_element().is_some());
        assert_eq!(canvas.width(), 300);
        assert_eq!(
            content.style().get_property_value("visibility").unwrap(),
            "hidden"
        );
    }

    #[wasm_bindgen_test]
    fn restoring_the_page_removes_the_overlay() {
        let (window, container, content) = page();
        let canvas = create_overlay(&window, &container, &content, 300).unwrap();

        restore_page(&canvas, &content).unwrap();

        assert!(canvas.parent_element().is_none());
        assert_eq!(container.child_element_count(), 1);
        assert_eq!(content.style().get_property_value("visibility").unwrap(), "");
    }

    #[wasm_bindgen_test]
    fn resizing_moves_the_container_with_the_canvas() {
        let (window, container, content) = page();
        let canvas = create_overlay(&window, &container, &content, 300).unwrap();

        size_overlay(&container, &canvas, 480).unwrap();

        assert_eq!(canvas.width(), 480);
        assert_eq!(canvas.height(), 480);
        assert_eq!(container.style().get_property_value("width").unwrap(), "480px");
        assert_eq!(container.style().get_property_value("height").unwrap(), "480px");
    }
}
