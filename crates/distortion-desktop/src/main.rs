use fluid_distortion::{
    CaptureTicket, ContentSink, Delivery, Distortion, FrameHost, Problem, Rasterizer, Scheduler,
    Settings, State,
};
use glutin::event::{Event, WindowEvent};
use glutin::event_loop::{ControlFlow, EventLoop, EventLoopProxy};
use glutin::window::Window;
use glutin::{ContextWrapper, PossiblyCurrent};
use image::RgbaImage;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

type WindowedContext = ContextWrapper<PossiblyCurrent, Window>;

/// A decoded capture, sent back to the event loop from the decoding thread.
struct Captured(Result<RgbaImage, Problem>);

/// The capture waiting for its decoded image.
type PendingCapture = Rc<RefCell<Option<(ContentSink, CaptureTicket)>>>;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let image_path = match args.next() {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("Usage: fluid-distortion-desktop <image> [settings.json]");
            std::process::exit(2);
        }
    };
    let settings = match args.next().map(read_settings).transpose() {
        Ok(settings) => Rc::new(settings.unwrap_or_default()),
        Err(problem) => {
            log::error!("{}", problem);
            std::process::exit(1);
        }
    };

    let (context, window, event_loop) = match get_rendering_context(settings.canvas_size) {
        Ok(parts) => parts,
        Err(problem) => {
            log::error!("{}", problem);
            std::process::exit(1);
        }
    };
    let context = Rc::new(context);
    let window = Rc::new(window);

    let pending = PendingCapture::default();
    let mut scheduler = Scheduler::new(DesktopHost::new(&window), &settings);
    let _ = scheduler.mount(|| {
        let rasterizer = ImageFileRasterizer {
            path: image_path,
            sender: event_loop.create_proxy(),
            pending: Rc::clone(&pending),
        };
        let mut distortion = Distortion::new(&context, &settings, Box::new(rasterizer))?;

        let size = window.window().inner_size();
        distortion.resize(size.width, size.height);

        Ok(distortion)
    });
    if scheduler.state() != State::Running {
        std::process::exit(1);
    }

    let start = std::time::Instant::now();

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::UserEvent(Captured(captured)) => finish_capture(&pending, captured),

            Event::RedrawRequested(_) => {
                scheduler.tick(start.elapsed().as_secs_f64() * 1000.0);
                if let Err(error) = window.swap_buffers() {
                    log::error!("Failed to swap buffers: {}", error);
                }
            }

            Event::WindowEvent { ref event, .. } => match event {
                WindowEvent::CursorMoved { position, .. } => {
                    let size = window.window().inner_size();
                    let (x, y) = fluid_distortion::normalize(
                        position.x,
                        position.y,
                        0.0,
                        0.0,
                        f64::from(size.width),
                        f64::from(size.height),
                    );
                    scheduler.pointer_moved(x, y);
                }

                WindowEvent::Resized(physical_size) => {
                    window.resize(*physical_size);
                    if let Some(effect) = scheduler.effect_mut() {
                        effect.resize(physical_size.width, physical_size.height);
                    }
                }

                WindowEvent::CloseRequested => {
                    scheduler.teardown();
                    *control_flow = ControlFlow::Exit;
                }
                _ => (),
            },
            _ => (),
        }
    });
}

/// Redraw requests stand in for animation frames.
struct DesktopHost {
    window: Rc<WindowedContext>,
    attached: bool,
}

impl DesktopHost {
    fn new(window: &Rc<WindowedContext>) -> Self {
        Self {
            window: Rc::clone(window),
            attached: true,
        }
    }
}

impl FrameHost for DesktopHost {
    type Handle = ();

    fn request_frame(&mut self) {
        if self.attached {
            self.window.window().request_redraw();
        }
    }

    // A redraw request cannot be withdrawn. The scheduler ignores the tick.
    fn cancel_frame(&mut self, _handle: ()) {}

    fn detach(&mut self) {
        self.attached = false;
    }
}

/// Hands a decoded capture to the event loop.
trait CaptureSender: Clone + Send + 'static {
    fn send(&self, captured: Captured);
}

impl CaptureSender for EventLoopProxy<Captured> {
    fn send(&self, captured: Captured) {
        if self.send_event(captured).is_err() {
            log::debug!("The window closed before the capture finished");
        }
    }
}

/// Re-reads and decodes an image file on every capture, so edits to the file
/// show up at the next capture. Decoding runs on its own thread; the upload
/// happens in `finish_capture`, on the thread that owns the GL context.
struct ImageFileRasterizer<S: CaptureSender> {
    path: PathBuf,
    sender: S,
    pending: PendingCapture,
}

impl<S: CaptureSender> Rasterizer for ImageFileRasterizer<S> {
    fn rasterize(&mut self, sink: ContentSink, ticket: CaptureTicket) {
        *self.pending.borrow_mut() = Some((sink, ticket));

        let path = self.path.clone();
        let sender = self.sender.clone();
        std::thread::spawn(move || sender.send(Captured(read_image(&path))));
    }
}

fn read_image(path: &Path) -> Result<RgbaImage, Problem> {
    let img = image::open(path).map_err(Problem::DecodeContent)?;
    Ok(img.to_rgba8())
}

// Uploads the decoded image and releases the ticket, so the next capture can
// start.
fn finish_capture(pending: &PendingCapture, captured: Result<RgbaImage, Problem>) {
    let (sink, _ticket) = match pending.borrow_mut().take() {
        Some(capture) => capture,
        None => return,
    };

    let delivery =
        captured.and_then(|image| sink.upload_rgba(image.width(), image.height(), image.as_raw()));
    match delivery {
        Ok(Delivery::Uploaded) => log::debug!("Captured content"),
        Ok(Delivery::Discarded) => (),
        Err(problem) => log::error!("Failed to capture content: {}", problem),
    }
}

fn read_settings(path: String) -> Result<Settings, Problem> {
    let json = std::fs::read_to_string(&path)
        .map_err(|error| Problem::ReadSettings(format!("{}: {}", path, error)))?;
    serde_json::from_str(&json).map_err(|error| Problem::ReadSettings(error.to_string()))
}

fn get_rendering_context(
    size: u32,
) -> Result<(glow::Context, WindowedContext, EventLoop<Captured>), Problem> {
    let event_loop = EventLoop::with_user_event();

    let window_builder = glutin::window::WindowBuilder::new()
        .with_title("Fluid Distortion")
        .with_resizable(true)
        .with_inner_size(glutin::dpi::LogicalSize::new(size, size));

    let window = glutin::ContextBuilder::new()
        .with_vsync(true)
        .with_multisampling(0)
        .with_double_buffer(Some(true))
        .with_gl(glutin::GlRequest::Specific(glutin::Api::OpenGl, (3, 3)))
        .with_gl_profile(glutin::GlProfile::Core)
        .build_windowed(window_builder, &event_loop)
        .map_err(|error| Problem::CreateContext(error.to_string()))?;
    let window = unsafe {
        window
            .make_current()
            .map_err(|(_, error)| Problem::CreateContext(error.to_string()))?
    };

    let gl =
        unsafe { glow::Context::from_loader_function(|s| window.get_proc_address(s) as *const _) };

    Ok((gl, window, event_loop))
}

#[cfg(test)]
mod test {
    use super::*;
    use fluid_distortion::content::CaptureCadence;
    use fluid_distortion::ContentSurface;
    use std::sync::mpsc;
    use std::time::Duration;

    impl CaptureSender for mpsc::Sender<Captured> {
        fn send(&self, captured: Captured) {
            let _ = mpsc::Sender::send(self, captured);
        }
    }

    #[derive(Default)]
    struct Raster {
        size: Option<(u32, u32)>,
    }

    impl ContentSurface for Raster {
        fn upload_rgba(&mut self, width: u32, height: u32, _pixels: &[u8]) -> Result<(), Problem> {
            self.size = Some((width, height));
            Ok(())
        }

        fn is_populated(&self) -> bool {
            self.size.is_some()
        }
    }

    fn start_capture(
        path: PathBuf,
    ) -> (
        CaptureCadence,
        Rc<RefCell<Raster>>,
        PendingCapture,
        mpsc::Receiver<Captured>,
    ) {
        let (sender, receiver) = mpsc::channel();
        let pending = PendingCapture::default();
        let mut rasterizer = ImageFileRasterizer {
            path,
            sender,
            pending: Rc::clone(&pending),
        };

        let raster = Rc::new(RefCell::new(Raster::default()));
        let mut cadence = CaptureCadence::new(0);
        let ticket = cadence.poll().unwrap();
        rasterizer.rasterize(ContentSink::new(&raster), ticket);

        (cadence, raster, pending, receiver)
    }

    #[test]
    fn decodes_off_the_frame_loop_and_uploads_on_delivery() {
        let path = std::env::temp_dir().join(format!("distortion-{}.png", std::process::id()));
        RgbaImage::from_pixel(3, 2, image::Rgba([200, 80, 40, 255]))
            .save(&path)
            .unwrap();

        let (cadence, raster, pending, receiver) = start_capture(path.clone());

        // Nothing lands until the event loop hands the result over.
        assert!(cadence.is_in_flight());
        assert!(!raster.borrow().is_populated());

        let Captured(captured) = receiver.recv_timeout(Duration::from_secs(10)).unwrap();
        finish_capture(&pending, captured);

        assert_eq!(raster.borrow().size, Some((3, 2)));
        assert!(!cadence.is_in_flight());

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn a_missing_file_still_rearms_the_cadence() {
        let path = std::env::temp_dir().join("distortion-does-not-exist.png");
        let (cadence, raster, pending, receiver) = start_capture(path);

        let Captured(captured) = receiver.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(captured.is_err());
        finish_capture(&pending, captured);

        assert!(!raster.borrow().is_populated());
        assert!(!cadence.is_in_flight());
    }
}
