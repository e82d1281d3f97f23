use crate::content::{CaptureCadence, CaptureTicket};
use crate::effect::Problem;
use crate::pointer::{Pointer, Splat};
use crate::settings::Settings;

use std::rc::Rc;

/// What the scheduler drives every frame.
pub trait Effect {
    fn capture(&mut self, ticket: CaptureTicket);
    fn splat(&mut self, splat: &Splat);
    fn step(&mut self, timestep: f32);
    fn render(&mut self);
}

/// The platform side of the frame loop.
pub trait FrameHost {
    type Handle;

    /// Ask for `Scheduler::tick` to be called once more.
    fn request_frame(&mut self) -> Self::Handle;
    fn cancel_frame(&mut self, handle: Self::Handle);

    /// Stop delivering input events.
    fn detach(&mut self);
}

/// Turns frame timestamps, in milliseconds, into simulation timesteps, in
/// seconds.
#[derive(Clone, Copy, Debug)]
pub struct FrameClock {
    last_timestamp: Option<f64>,
    max_timestep: f32,
}

impl FrameClock {
    pub fn new(max_timestep: f32) -> Self {
        Self {
            last_timestamp: None,
            max_timestep,
        }
    }

    pub fn set_max_timestep(&mut self, max_timestep: f32) {
        self.max_timestep = max_timestep;
    }

    /// The first frame has nothing to measure against and advances by zero.
    /// Timestamps that go backwards also advance by zero.
    pub fn advance(&mut self, timestamp: f64) -> f32 {
        let timestep = match self.last_timestamp {
            Some(last_timestamp) => (0.001 * (timestamp - last_timestamp)).max(0.0) as f32,
            None => 0.0,
        };
        self.last_timestamp = Some(timestamp);

        self.max_timestep.min(timestep)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    Initializing,
    Running,
    TornDown,
}

/// Runs an effect once per frame, between mount and teardown.
pub struct Scheduler<E: Effect, H: FrameHost> {
    host: H,
    settings: Rc<Settings>,
    state: State,
    effect: Option<E>,
    pending_frame: Option<H::Handle>,

    clock: FrameClock,
    cadence: CaptureCadence,
    pointer: Pointer,
}

impl<E: Effect, H: FrameHost> Scheduler<E, H> {
    pub fn new(host: H, settings: &Rc<Settings>) -> Self {
        Self {
            host,
            settings: Rc::clone(settings),
            state: State::Uninitialized,
            effect: None,
            pending_frame: None,

            clock: FrameClock::new(settings.max_timestep),
            cadence: CaptureCadence::new(settings.capture_interval),
            pointer: Pointer::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Build the effect and start the frame loop. On failure the scheduler
    /// is torn down straight away and no frame is ever requested.
    pub fn mount<F>(&mut self, init: F) -> Result<(), Problem>
    where
        F: FnOnce() -> Result<E, Problem>,
    {
        if self.state != State::Uninitialized {
            return Ok(());
        }
        self.state = State::Initializing;

        match init() {
            Ok(effect) => {
                self.effect = Some(effect);
                self.state = State::Running;
                self.pending_frame = Some(self.host.request_frame());
                Ok(())
            }
            Err(problem) => {
                log::error!("Failed to initialise the effect: {}", problem);
                self.host.detach();
                self.state = State::TornDown;
                Err(problem)
            }
        }
    }

    pub fn tick(&mut self, timestamp: f64) {
        if self.state != State::Running {
            return;
        }
        self.pending_frame = None;

        let timestep = self.clock.advance(timestamp);

        if let Some(effect) = self.effect.as_mut() {
            if let Some(ticket) = self.cadence.poll() {
                effect.capture(ticket);
            }

            if let Some(splat) = self.pointer.take_splat(self.settings.pointer_threshold) {
                effect.splat(&splat);
            }

            effect.step(timestep);
            effect.render();
        }

        self.pending_frame = Some(self.host.request_frame());
    }

    /// `x` and `y` are normalized to the canvas, with Y growing downwards.
    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        if self.state != State::Running {
            return;
        }
        self.pointer.move_to(x, y);
    }

    /// Capture the content on the next frame, regardless of the cadence.
    pub fn request_capture(&mut self) {
        self.cadence.request();
    }

    pub fn update(&mut self, settings: &Rc<Settings>) {
        self.settings = Rc::clone(settings);
        self.clock.set_max_timestep(settings.max_timestep);
        self.cadence.set_interval(settings.capture_interval);
    }

    pub fn effect_mut(&mut self) -> Option<&mut E> {
        self.effect.as_mut()
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn teardown(&mut self) {
        if self.state == State::TornDown {
            return;
        }

        if let Some(handle) = self.pending_frame.take() {
            self.host.cancel_frame(handle);
        }
        self.host.detach();
        self.effect = None;
        self.state = State::TornDown;

        log::debug!("Torn down the effect");
    }
}

impl<E: Effect, H: FrameHost> Drop for Scheduler<E, H> {
    fn drop(&mut self) {
        self.teardown();
    }
}
