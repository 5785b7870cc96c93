//! # Game Controller Device
//!
//! A connected game controller and its per-mode bindings.
//!
//! ## Controls
//!
//! | Control | Config key | Samples |
//! |---------|------------|---------|
//! | Axis | `AxisX`, `AxisY`, `AxisZ`, `RotationX`, `RotationY`, `RotationZ`, `Slider1`, `Slider2` | Raw integer within the probed range |
//! | Button | `Button1` .. `ButtonN` | Non-zero while pressed |
//! | POV hat | `POV1.Up`, `POV1.Right`, `POV1.Down`, `POV1.Left`, .. | Angle in hundredths of a degree, negative when centred |
//!
//! The raw device is reached through the [`InputDevice`] trait so a backend
//! (evdev, or a mock in tests) only has to report ranges and samples.

use std::fmt;
use tracing::{debug, info, warn};

use super::calibration::{normalize_sample, AxisKind, AxisRange, Calibration};
use super::mapper::{map_axis, map_value, AxisBinding, ButtonMapping, Candidate};
use crate::error::{AltInputError, Result};
use crate::flight::{Aggregator, EnabledModes, Mode, PerMode, SourceId};

/// Class of an input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    GameControl,
    Keyboard,
    Pointer,
    Other,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceClass::GameControl => "GameControl",
            DeviceClass::Keyboard => "Keyboard",
            DeviceClass::Pointer => "Pointer",
            DeviceClass::Other => "Other",
        })
    }
}

/// Static description of a device as enumerated by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Stable identity (e.g. the device node path).
    pub id: String,
    /// Human-readable product name.
    pub name: String,
    pub class: DeviceClass,
    pub button_count: usize,
    pub pov_count: usize,
}

/// The eight standard axes of a game controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisId {
    X,
    Y,
    Z,
    RotationX,
    RotationY,
    RotationZ,
    Slider1,
    Slider2,
}

impl AxisId {
    pub const COUNT: usize = 8;

    pub const ALL: [AxisId; AxisId::COUNT] = [
        AxisId::X,
        AxisId::Y,
        AxisId::Z,
        AxisId::RotationX,
        AxisId::RotationY,
        AxisId::RotationZ,
        AxisId::Slider1,
        AxisId::Slider2,
    ];

    /// Key naming this axis in binding sections.
    #[must_use]
    pub fn config_name(self) -> &'static str {
        match self {
            AxisId::X => "AxisX",
            AxisId::Y => "AxisY",
            AxisId::Z => "AxisZ",
            AxisId::RotationX => "RotationX",
            AxisId::RotationY => "RotationY",
            AxisId::RotationZ => "RotationZ",
            AxisId::Slider1 => "Slider1",
            AxisId::Slider2 => "Slider2",
        }
    }

    #[must_use]
    pub fn kind(self) -> AxisKind {
        match self {
            AxisId::Slider1 | AxisId::Slider2 => AxisKind::Slider,
            _ => AxisKind::Rotational,
        }
    }

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// The four bindable directions of a POV hat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PovPosition {
    Up,
    Right,
    Down,
    Left,
}

impl PovPosition {
    pub const ALL: [PovPosition; 4] = [
        PovPosition::Up,
        PovPosition::Right,
        PovPosition::Down,
        PovPosition::Left,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            PovPosition::Up => "Up",
            PovPosition::Right => "Right",
            PovPosition::Down => "Down",
            PovPosition::Left => "Left",
        }
    }

    /// Hat angle of this direction, in hundredths of a degree.
    fn angle(self) -> i32 {
        self as i32 * 9000
    }

    /// Whether a hat at `angle` presses this direction. Diagonals press
    /// both neighbouring directions.
    #[must_use]
    pub fn is_pressed(self, angle: i32) -> bool {
        if !(0..36000).contains(&angle) {
            return false;
        }
        let diff = (angle - self.angle()).rem_euclid(36000);
        diff.min(36000 - diff) <= 4500
    }
}

/// Which control a sample comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    Axis(AxisId),
    Button(usize),
    Pov(usize),
}

/// A single changed control value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub offset: Offset,
    pub value: i32,
}

impl Sample {
    #[must_use]
    pub fn new(offset: Offset, value: i32) -> Self {
        Self { offset, value }
    }
}

/// Raw access to a physical device.
///
/// Implemented by each backend. `poll` returns the controls that changed
/// since the previous poll and never blocks.
#[cfg_attr(test, mockall::automock)]
pub trait InputDevice {
    /// Static description.
    fn info(&self) -> &DeviceInfo;

    /// Probed range of an axis, `None` if the device has no such axis.
    fn axis_range(&self, axis: AxisId) -> Option<AxisRange>;

    /// Acquires the device for exclusive use.
    fn open(&mut self) -> Result<()>;

    /// Releases the device.
    fn close(&mut self);

    /// Buffered samples since the last poll.
    fn poll(&mut self) -> Result<Vec<Sample>>;
}

/// One axis of a device.
#[derive(Debug, Clone)]
pub struct Axis {
    id: AxisId,
    range: Option<AxisRange>,
    last_value: f32,
    calibration: PerMode<Calibration>,
    binding: PerMode<AxisBinding>,
}

impl Axis {
    fn new(id: AxisId, range: Option<AxisRange>) -> Self {
        Self {
            id,
            range,
            last_value: 0.0,
            calibration: [Calibration::default(); Mode::COUNT],
            binding: [AxisBinding::default(); Mode::COUNT],
        }
    }

    #[must_use]
    pub fn id(&self) -> AxisId {
        self.id
    }

    /// Probed range, `None` when the device lacks this axis.
    #[must_use]
    pub fn range(&self) -> Option<AxisRange> {
        self.range
    }

    /// An axis is available iff it exists and its range is non-degenerate.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.range.map_or(false, |range| range.is_usable())
    }

    /// Last normalized value read.
    #[must_use]
    pub fn last_value(&self) -> f32 {
        self.last_value
    }

    #[must_use]
    pub fn calibration(&self, mode: Mode) -> &Calibration {
        &self.calibration[mode.index()]
    }

    #[must_use]
    pub fn binding(&self, mode: Mode) -> &AxisBinding {
        &self.binding[mode.index()]
    }

    /// Sets the calibration and binding used in `mode`.
    pub fn configure(&mut self, mode: Mode, calibration: Calibration, binding: AxisBinding) {
        self.calibration[mode.index()] = calibration;
        self.binding[mode.index()] = binding;
    }
}

/// A button, or one direction of a POV hat.
#[derive(Debug, Clone, Default)]
pub struct Button {
    mapping: PerMode<Option<ButtonMapping>>,
    pressed: bool,
    /// Mapping applied at press time, released through on release
    active: Option<ButtonMapping>,
}

impl Button {
    #[must_use]
    pub fn mapping(&self, mode: Mode) -> Option<&ButtonMapping> {
        self.mapping[mode.index()].as_ref()
    }

    pub fn set_mapping(&mut self, mode: Mode, mapping: Option<ButtonMapping>) {
        self.mapping[mode.index()] = mapping;
    }

    #[must_use]
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Records a new state and returns the candidate it produces.
    ///
    /// A press uses the mapping of `mode` (none when the mode is not
    /// enabled). A release always goes through the mapping the press used,
    /// so a mode switch in between cannot leave its channel stuck.
    fn update(&mut self, pressed: bool, mode: Option<Mode>) -> Option<Candidate> {
        if self.pressed == pressed {
            return None;
        }
        self.pressed = pressed;
        if pressed {
            self.active = mode.and_then(|mode| self.mapping[mode.index()]);
            self.active.map(|mapping| mapping.candidate(true))
        } else {
            self.active.take().map(|mapping| mapping.candidate(false))
        }
    }
}

/// A POV hat, bound as four directional buttons.
#[derive(Debug, Clone, Default)]
pub struct Pov {
    positions: [Button; 4],
}

impl Pov {
    #[must_use]
    pub fn position(&self, position: PovPosition) -> &Button {
        &self.positions[position as usize]
    }

    pub fn position_mut(&mut self, position: PovPosition) -> &mut Button {
        &mut self.positions[position as usize]
    }
}

/// A game controller with its bindings.
///
/// Dropping a `Device` releases it if it was acquired.
pub struct Device {
    inner: Box<dyn InputDevice>,
    modes: EnabledModes,
    axes: Vec<Axis>,
    buttons: Vec<Button>,
    povs: Vec<Pov>,
    acquired: bool,
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("info", self.inner.info())
            .field("modes", &self.modes)
            .field("acquired", &self.acquired)
            .finish()
    }
}

impl Device {
    /// Wraps a raw device, probing the range of every axis.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDeviceClass` if the device is not a game controller.
    pub fn new(inner: Box<dyn InputDevice>) -> Result<Self> {
        let info = inner.info();
        if info.class != DeviceClass::GameControl {
            return Err(AltInputError::InvalidDeviceClass(info.class.to_string()));
        }

        let axes = AxisId::ALL
            .into_iter()
            .map(|id| Axis::new(id, inner.axis_range(id)))
            .collect::<Vec<_>>();
        for axis in &axes {
            if matches!(axis.range, Some(range) if !range.is_usable()) {
                warn!(
                    "'{}': axis {} was disabled because its range is zero",
                    info.name,
                    axis.id.config_name()
                );
            }
        }

        Ok(Self {
            buttons: vec![Button::default(); info.button_count],
            povs: vec![Pov::default(); info.pov_count],
            axes,
            modes: EnabledModes::default(),
            acquired: false,
            inner,
        })
    }

    #[must_use]
    pub fn info(&self) -> &DeviceInfo {
        self.inner.info()
    }

    #[must_use]
    pub fn modes(&self) -> EnabledModes {
        self.modes
    }

    pub fn set_modes(&mut self, modes: EnabledModes) {
        self.modes = modes;
    }

    #[must_use]
    pub fn axis(&self, id: AxisId) -> &Axis {
        &self.axes[id.index()]
    }

    pub fn axis_mut(&mut self, id: AxisId) -> &mut Axis {
        &mut self.axes[id.index()]
    }

    #[must_use]
    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    pub fn buttons_mut(&mut self) -> &mut [Button] {
        &mut self.buttons
    }

    #[must_use]
    pub fn povs(&self) -> &[Pov] {
        &self.povs
    }

    pub fn povs_mut(&mut self) -> &mut [Pov] {
        &mut self.povs
    }

    #[must_use]
    pub fn is_acquired(&self) -> bool {
        self.acquired
    }

    /// Acquires the device, releasing any previous acquisition first.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the device cannot be acquired.
    pub fn open(&mut self) -> Result<()> {
        self.close();
        self.inner.open()?;
        self.acquired = true;
        info!("Opened controller '{}'", self.info().name);
        Ok(())
    }

    /// Releases the device if acquired.
    pub fn close(&mut self) {
        if self.acquired {
            self.inner.close();
            self.acquired = false;
            debug!("Closed controller '{}'", self.info().name);
        }
    }

    /// Polls the device and proposes a candidate for every changed control
    /// bound in `mode`.
    ///
    /// A failed poll is treated as "nothing changed". Devices without
    /// bindings for `mode` are still drained so stale samples do not pile
    /// up.
    pub fn process_input(&mut self, device: usize, mode: Mode, aggregator: &mut Aggregator) {
        let samples = match self.inner.poll() {
            Ok(samples) => samples,
            Err(e) => {
                debug!("'{}': poll failed: {}", self.inner.info().name, e);
                return;
            }
        };

        let enabled = self.modes.contains(mode);
        let button_mode = enabled.then_some(mode);
        let m = mode.index();

        for sample in samples {
            match sample.offset {
                Offset::Axis(id) => {
                    let axis = &mut self.axes[id.index()];
                    let range = match axis.range {
                        Some(range) if range.is_usable() => range,
                        _ => continue,
                    };
                    let calibration = axis.calibration[m];
                    let value = normalize_sample(sample.value, range, &calibration, id.kind());
                    axis.last_value = value;
                    if !enabled {
                        continue;
                    }
                    let candidate = map_axis(&axis.binding[m], value, calibration.factor(), |channel| {
                        aggregator.current(channel)
                    });
                    if let Some(candidate) = candidate {
                        let source = SourceId::axis(device, id.index());
                        // A range axis drives one target at a time
                        for other in axis.binding[m].targets() {
                            if other.channel() != candidate.channel {
                                aggregator.propose(source, Candidate { channel: other.channel(), value: 0.0 });
                            }
                        }
                        aggregator.propose(source, candidate);
                    }
                }
                Offset::Button(index) => {
                    let Some(button) = self.buttons.get_mut(index) else {
                        continue;
                    };
                    if let Some(candidate) = button.update(sample.value != 0, button_mode) {
                        aggregator.propose(SourceId::button(device, index), candidate);
                    }
                }
                Offset::Pov(index) => {
                    let Some(pov) = self.povs.get_mut(index) else {
                        continue;
                    };
                    for (p, position) in PovPosition::ALL.into_iter().enumerate() {
                        let button = &mut pov.positions[p];
                        if let Some(candidate) = button.update(position.is_pressed(sample.value), button_mode) {
                            aggregator.propose(SourceId::pov(device, index, p), candidate);
                        }
                    }
                }
            }
        }
    }

    /// Drives every non-throttle axis target bound in `mode` back to zero,
    /// as an absolute mapping.
    pub fn reset(&self, device: usize, mode: Mode, aggregator: &mut Aggregator) {
        if !self.modes.contains(mode) {
            return;
        }
        let m = mode.index();
        for axis in self.axes.iter().filter(|axis| axis.is_available()) {
            let factor = axis.calibration[m].factor();
            for mapping in axis.binding[m].targets() {
                if mapping.channel().is_throttle() {
                    continue;
                }
                let candidate = map_value(&mapping.as_absolute(), 0.0, factor, 0.0);
                aggregator.propose(SourceId::axis(device, axis.id.index()), candidate);
            }
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.close();
    }
}
