#![cfg(target_arch = "wasm32")]

mod host;
mod rasterizer;
mod store;
mod wasm_wrapper;

pub use store::Store;
pub use wasm_wrapper::FluidDistortion;
