//! Labelweb - project/image browser and annotation client
//!
//! Lets a user browse projects and their images, draw region annotations on an
//! image, and save them to a remote persistence service. Runs in the browser
//! as a WASM module and natively as a headless terminal client.

pub mod client;
pub mod config;
pub mod constants;
pub mod gateway;
pub mod logging;
pub mod message;
pub mod model;
pub mod session;
pub mod state;
pub mod widget;

#[cfg(not(target_arch = "wasm32"))]
pub mod native;

pub use client::{Client, SurfaceLoader};
pub use message::{Effect, Message, Notice};
pub use session::Session;

// WASM entry point
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;
