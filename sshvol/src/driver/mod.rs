pub mod constants;
pub mod options;

mod core;
pub use core::VolumeDriver;
