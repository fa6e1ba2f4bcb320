#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod assets;
pub mod barycentric;
pub mod battery;
pub mod clock;
pub mod co5300;
pub mod face;
pub mod geometry;
pub mod hand;
pub mod raster;
pub mod rtc_pcf85063;
pub mod shader;
pub mod surface;
pub mod texture;

#[cfg(feature = "firmware")]
pub mod display;
#[cfg(feature = "firmware")]
pub mod wiring;

pub use face::{FaceConfig, WatchFace};
pub use surface::{Framebuffer, Surface};
