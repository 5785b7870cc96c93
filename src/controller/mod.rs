//! # Controller Module
//!
//! Game controller input handling.
//!
//! This module handles:
//! - Controller detection and acquisition via evdev
//! - Binding devices to `[inputN]` configuration sections
//! - Normalizing raw axis samples with dead zones and inversion
//! - Mapping normalized values onto control channels

pub mod calibration;
pub mod device;
pub mod device_list;
pub mod evdev_backend;
pub mod mapper;

pub use device::{Device, DeviceInfo, InputDevice};
pub use device_list::{DeviceList, InputBackend};
pub use evdev_backend::EvdevBackend;
