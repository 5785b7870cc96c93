//! # evdev Backend
//!
//! Game controller access through the Linux evdev interface.
//!
//! ## Controller Detection
//!
//! Every `/dev/input/event*` node is enumerated. A device counts as a game
//! controller when it reports joystick or gamepad buttons (`BTN_JOYSTICK`
//! to `BTN_THUMBR`, `BTN_TRIGGER_HAPPY*`), or absolute axes without being a
//! touch surface or keyboard. The node path is the device identity.
//!
//! ## Axes
//!
//! | Axis | evdev code |
//! |------|------------|
//! | AxisX, AxisY, AxisZ | `ABS_X`, `ABS_Y`, `ABS_Z` |
//! | RotationX, RotationY, RotationZ | `ABS_RX`, `ABS_RY`, `ABS_RZ` |
//! | Slider1 | `ABS_THROTTLE` |
//! | Slider2 | `ABS_RUDDER` |
//!
//! Hats (`ABS_HAT0X`/`ABS_HAT0Y` .. `ABS_HAT3X`/`ABS_HAT3Y`) are reported as
//! POV angles in hundredths of a degree, clockwise from up, -1 when centred.
//!
//! ## Polling
//!
//! Polling never blocks: the current absolute and key state is read and
//! compared against the previous poll, and only changed controls are
//! reported. The first poll after acquiring reports every control.

use evdev::{AbsoluteAxisType, Key};
use std::array;
use std::path::Path;
use tracing::{debug, info};

use super::calibration::AxisRange;
use super::device::{AxisId, DeviceClass, DeviceInfo, InputDevice, Offset, Sample};
use super::device_list::InputBackend;
use crate::error::{AltInputError, Result};

/// Name matched against a section's `Interface`.
pub const INTERFACE_NAME: &str = "evdev";

/// evdev axis read for each [`AxisId`].
const AXIS_CODES: [AbsoluteAxisType; AxisId::COUNT] = [
    AbsoluteAxisType::ABS_X,
    AbsoluteAxisType::ABS_Y,
    AbsoluteAxisType::ABS_Z,
    AbsoluteAxisType::ABS_RX,
    AbsoluteAxisType::ABS_RY,
    AbsoluteAxisType::ABS_RZ,
    AbsoluteAxisType::ABS_THROTTLE,
    AbsoluteAxisType::ABS_RUDDER,
];

/// X/Y axis pairs of the hats.
const HATS: [(AbsoluteAxisType, AbsoluteAxisType); 4] = [
    (AbsoluteAxisType::ABS_HAT0X, AbsoluteAxisType::ABS_HAT0Y),
    (AbsoluteAxisType::ABS_HAT1X, AbsoluteAxisType::ABS_HAT1Y),
    (AbsoluteAxisType::ABS_HAT2X, AbsoluteAxisType::ABS_HAT2Y),
    (AbsoluteAxisType::ABS_HAT3X, AbsoluteAxisType::ABS_HAT3Y),
];

/// `BTN_JOYSTICK` up to and including `BTN_THUMBR`.
const JOYSTICK_BUTTONS: std::ops::RangeInclusive<u16> = 0x120..=0x13e;

/// `BTN_TRIGGER_HAPPY1` to `BTN_TRIGGER_HAPPY40`.
const TRIGGER_HAPPY_BUTTONS: std::ops::RangeInclusive<u16> = 0x2c0..=0x2e7;

/// Whether a key code is a joystick or gamepad button.
#[must_use]
pub fn is_game_button(code: u16) -> bool {
    JOYSTICK_BUTTONS.contains(&code) || TRIGGER_HAPPY_BUTTONS.contains(&code)
}

/// Converts a hat position (each of `x`, `y` in -1, 0, 1) to a POV angle.
///
/// # Examples
///
/// ```
/// use alt_input::controller::evdev_backend::hat_angle;
///
/// assert_eq!(hat_angle(0, -1), 0);      // up
/// assert_eq!(hat_angle(1, 1), 13500);   // down-right
/// assert_eq!(hat_angle(0, 0), -1);      // centred
/// ```
#[must_use]
pub fn hat_angle(x: i32, y: i32) -> i32 {
    match (x.signum(), y.signum()) {
        (0, -1) => 0,
        (1, -1) => 4500,
        (1, 0) => 9000,
        (1, 1) => 13500,
        (0, 1) => 18000,
        (-1, 1) => 22500,
        (-1, 0) => 27000,
        (-1, -1) => 31500,
        _ => -1,
    }
}

/// What a device reports, as far as classification cares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub game_buttons: usize,
    pub joystick_axes: bool,
    pub touch: bool,
    pub letters: bool,
    pub relative: bool,
}

impl Capabilities {
    fn probe(device: &evdev::Device) -> Self {
        let keys = device.supported_keys();
        let has_key = |key: Key| keys.map_or(false, |keys| keys.contains(key));
        Self {
            game_buttons: game_buttons(device).len(),
            joystick_axes: device.supported_absolute_axes().map_or(false, |axes| {
                AXIS_CODES.iter().any(|code| axes.contains(*code))
            }),
            touch: has_key(Key::BTN_TOUCH) || has_key(Key::BTN_TOOL_PEN),
            letters: has_key(Key::KEY_A),
            relative: device.supported_relative_axes().is_some(),
        }
    }

    /// Device class implied by these capabilities.
    #[must_use]
    pub fn class(&self) -> DeviceClass {
        if self.game_buttons > 0 || (self.joystick_axes && !self.touch && !self.letters) {
            DeviceClass::GameControl
        } else if self.letters {
            DeviceClass::Keyboard
        } else if self.relative || self.touch {
            DeviceClass::Pointer
        } else {
            DeviceClass::Other
        }
    }
}

fn game_buttons(device: &evdev::Device) -> Vec<Key> {
    device
        .supported_keys()
        .map(|keys| keys.iter().filter(|key| is_game_button(key.code())).collect())
        .unwrap_or_default()
}

fn hats(device: &evdev::Device) -> Vec<usize> {
    device
        .supported_absolute_axes()
        .map(|axes| {
            HATS.iter()
                .enumerate()
                .filter(|(_, (x, y))| axes.contains(*x) && axes.contains(*y))
                .map(|(i, _)| i)
                .collect()
        })
        .unwrap_or_default()
}

fn describe(path: &Path, device: &evdev::Device) -> DeviceInfo {
    DeviceInfo {
        id: path.display().to_string(),
        name: device.name().unwrap_or("Unknown").to_string(),
        class: Capabilities::probe(device).class(),
        button_count: game_buttons(device).len(),
        pov_count: hats(device).len(),
    }
}

/// Enumerates and opens evdev devices.
#[derive(Debug, Default)]
pub struct EvdevBackend;

impl EvdevBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl InputBackend for EvdevBackend {
    fn interface(&self) -> &'static str {
        INTERFACE_NAME
    }

    fn enumerate(&mut self) -> Result<Vec<DeviceInfo>> {
        let mut found: Vec<DeviceInfo> = evdev::enumerate()
            .map(|(path, device)| describe(&path, &device))
            .collect();
        // Deterministic binding order when several controllers match
        found.sort_by(|a, b| a.id.cmp(&b.id));

        for info in &found {
            debug!(
                "Found input device: {} '{}' ({}, {} buttons, {} hats)",
                info.id, info.name, info.class, info.button_count, info.pov_count
            );
        }
        Ok(found)
    }

    fn connect(&mut self, info: &DeviceInfo) -> Result<Box<dyn InputDevice>> {
        let device = evdev::Device::open(&info.id)
            .map_err(|e| AltInputError::Device(format!("Failed to open {}: {}", info.id, e)))?;
        Ok(Box::new(EvdevDevice::new(device, info.clone())))
    }
}

/// Control state read in one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub axes: [i32; AxisId::COUNT],
    pub buttons: Vec<bool>,
    pub hats: Vec<i32>,
}

impl Snapshot {
    /// Samples for every control that differs from `previous`, or for every
    /// control when there is no previous snapshot. Axes without a range are
    /// skipped.
    #[must_use]
    pub fn diff(&self, previous: Option<&Snapshot>, ranges: &[Option<AxisRange>; AxisId::COUNT]) -> Vec<Sample> {
        let mut samples = Vec::new();

        for id in AxisId::ALL {
            let i = id.index();
            if ranges[i].is_none() {
                continue;
            }
            if previous.map_or(true, |p| p.axes[i] != self.axes[i]) {
                samples.push(Sample::new(Offset::Axis(id), self.axes[i]));
            }
        }
        for (i, &pressed) in self.buttons.iter().enumerate() {
            if previous.map_or(true, |p| p.buttons.get(i) != Some(&pressed)) {
                samples.push(Sample::new(Offset::Button(i), i32::from(pressed)));
            }
        }
        for (i, &angle) in self.hats.iter().enumerate() {
            if previous.map_or(true, |p| p.hats.get(i) != Some(&angle)) {
                samples.push(Sample::new(Offset::Pov(i), angle));
            }
        }
        samples
    }
}

/// An opened evdev game controller.
pub struct EvdevDevice {
    device: evdev::Device,
    info: DeviceInfo,
    ranges: [Option<AxisRange>; AxisId::COUNT],
    buttons: Vec<Key>,
    hats: Vec<usize>,
    last: Option<Snapshot>,
    grabbed: bool,
}

impl EvdevDevice {
    /// Wraps an opened device, probing its axis ranges.
    #[must_use]
    pub fn new(device: evdev::Device, info: DeviceInfo) -> Self {
        let supported = device.supported_absolute_axes();
        let state = device.get_abs_state().ok();
        let ranges = array::from_fn(|i| {
            let code = AXIS_CODES[i];
            if !supported.map_or(false, |axes| axes.contains(code)) {
                return None;
            }
            state
                .as_ref()
                .map(|state| state[code.0 as usize])
                .map(|abs| AxisRange::new(abs.minimum, abs.maximum))
        });

        Self {
            buttons: game_buttons(&device),
            hats: hats(&device),
            device,
            info,
            ranges,
            last: None,
            grabbed: false,
        }
    }

    fn snapshot(&self) -> Result<Snapshot> {
        let abs = self
            .device
            .get_abs_state()
            .map_err(|e| AltInputError::Device(format!("Failed to read axes: {}", e)))?;
        let keys = self
            .device
            .get_key_state()
            .map_err(|e| AltInputError::Device(format!("Failed to read buttons: {}", e)))?;

        Ok(Snapshot {
            axes: array::from_fn(|i| abs[AXIS_CODES[i].0 as usize].value),
            buttons: self.buttons.iter().map(|key| keys.contains(*key)).collect(),
            hats: self
                .hats
                .iter()
                .map(|&h| {
                    let (x, y) = HATS[h];
                    hat_angle(abs[x.0 as usize].value, abs[y.0 as usize].value)
                })
                .collect(),
        })
    }
}

impl InputDevice for EvdevDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn axis_range(&self, axis: AxisId) -> Option<AxisRange> {
        self.ranges[axis.index()]
    }

    fn open(&mut self) -> Result<()> {
        self.device
            .grab()
            .map_err(|e| AltInputError::Device(format!("Failed to grab {}: {}", self.info.id, e)))?;
        self.grabbed = true;
        self.last = None;
        info!("Grabbed {} ({})", self.info.name, self.info.id);
        Ok(())
    }

    fn close(&mut self) {
        if !self.grabbed {
            return;
        }
        if let Err(e) = self.device.ungrab() {
            debug!("Failed to release {}: {}", self.info.id, e);
        }
        self.grabbed = false;
    }

    fn poll(&mut self) -> Result<Vec<Sample>> {
        let current = self.snapshot()?;
        let samples = current.diff(self.last.as_ref(), &self.ranges);
        self.last = Some(current);
        Ok(samples)
    }
}
