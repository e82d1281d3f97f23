use fluid_distortion::{Distortion, FrameHost, Scheduler};

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, HtmlElement, MouseEvent, Window};

pub type SharedScheduler = Rc<RefCell<Scheduler<Distortion, WebHost>>>;

/// Drives the scheduler from `requestAnimationFrame` and forwards pointer
/// movement over the container.
pub struct WebHost {
    window: Window,
    container: HtmlElement,
    canvas: HtmlCanvasElement,
    on_frame: Option<Closure<dyn FnMut(f64)>>,
    on_pointer_move: Option<Closure<dyn FnMut(MouseEvent)>>,
}

impl WebHost {
    pub fn new(window: &Window, container: &HtmlElement, canvas: &HtmlCanvasElement) -> Self {
        Self {
            window: window.clone(),
            container: container.clone(),
            canvas: canvas.clone(),
            on_frame: None,
            on_pointer_move: None,
        }
    }

    /// Create the callbacks. They only hold a weak reference, so the
    /// scheduler is released as soon as its owner lets go of it.
    pub fn attach(
        &mut self,
        scheduler: Weak<RefCell<Scheduler<Distortion, WebHost>>>,
    ) -> Result<(), JsValue> {
        let frame_scheduler = Weak::clone(&scheduler);
        let on_frame = Closure::wrap(Box::new(move |timestamp: f64| {
            if let Some(scheduler) = frame_scheduler.upgrade() {
                if let Ok(mut scheduler) = scheduler.try_borrow_mut() {
                    scheduler.tick(timestamp);
                }
            }
        }) as Box<dyn FnMut(f64)>);

        let canvas = self.canvas.clone();
        let on_pointer_move = Closure::wrap(Box::new(move |event: MouseEvent| {
            let rect = canvas.get_bounding_client_rect();
            let (x, y) = fluid_distortion::normalize(
                f64::from(event.client_x()),
                f64::from(event.client_y()),
                rect.left(),
                rect.top(),
                rect.width(),
                rect.height(),
            );

            if let Some(scheduler) = scheduler.upgrade() {
                if let Ok(mut scheduler) = scheduler.try_borrow_mut() {
                    scheduler.pointer_moved(x, y);
                }
            }
        }) as Box<dyn FnMut(MouseEvent)>);

        self.container.add_event_listener_with_callback(
            "mousemove",
            on_pointer_move.as_ref().unchecked_ref(),
        )?;

        self.on_frame = Some(on_frame);
        self.on_pointer_move = Some(on_pointer_move);

        Ok(())
    }
}

impl FrameHost for WebHost {
    type Handle = Option<i32>;

    fn request_frame(&mut self) -> Option<i32> {
        let on_frame = self.on_frame.as_ref()?;

        match self
            .window
            .request_animation_frame(on_frame.as_ref().unchecked_ref())
        {
            Ok(handle) => Some(handle),
            Err(error) => {
                log::error!("Failed to request an animation frame: {:?}", error);
                None
            }
        }
    }

    fn cancel_frame(&mut self, handle: Option<i32>) {
        if let Some(handle) = handle {
            if let Err(error) = self.window.cancel_animation_frame(handle) {
                log::error!("Failed to cancel the animation frame: {:?}", error);
            }
        }
    }

    fn detach(&mut self) {
        if let Some(on_pointer_move) = self.on_pointer_move.take() {
            if let Err(error) = self.container.remove_event_listener_with_callback(
                "mousemove",
                on_pointer_move.as_ref().unchecked_ref(),
            ) {
                log::error!("Failed to remove the pointer listener: {:?}", error);
            }
        }

        self.on_frame = None;
    }
}
