//! # AltInput Library
//!
//! Fly with joysticks, throttles and gamepads.
//!
//! This library maps game controller axes, buttons and POV hats onto a
//! flight simulator's vehicle control state, with per-mode bindings
//! (Flight, AltFlight, Ground), loudest-wins merging across devices and an
//! autopilot manual override signal.

pub mod bindings;
pub mod config;
pub mod controller;
pub mod error;
pub mod flight;
pub mod telemetry;
