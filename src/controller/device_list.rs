//! # Device List
//!
//! Builds the list of bound game controllers from the `[inputN]` binding
//! sections.
//!
//! ## Section Attributes
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `Interface` | Input backend, must match the running backend. Sections without one are skipped |
//! | `Ignore` | `true` skips the section |
//! | `Class` | Empty or `GameControl` |
//! | `Name` | Substring filter on the product name. Empty matches every controller |
//! | `DeadZone`, `Factor` | Device defaults for axes that set neither |
//!
//! Every matching controller not already bound by an earlier section is
//! added, so one section can bind several identical sticks.

use tracing::{debug, info, warn};

use super::calibration::Calibration;
use super::device::{AxisId, Device, DeviceClass, DeviceInfo, InputDevice, PovPosition};
use super::mapper::{AxisBinding, ButtonMapping, ButtonParseError, Mapping, MappingType};
use crate::bindings::resolver::parse_bool;
use crate::bindings::{ConfigIssue, ConfigSource, Resolved, Resolver, ValidationReport};
use crate::error::Result;
use crate::flight::{Channel, Mode};

/// Binding file version this build understands.
pub const SUPPORTED_VERSION: f32 = 1.3;

/// Highest `inputN` section read.
pub const MAX_INPUTS: usize = 128;

/// Enumerates and connects physical devices.
#[cfg_attr(test, mockall::automock)]
pub trait InputBackend {
    /// Name matched against a section's `Interface`.
    fn interface(&self) -> &'static str;

    /// Every input device currently attached.
    fn enumerate(&mut self) -> Result<Vec<DeviceInfo>>;

    /// Opens a raw handle on an enumerated device.
    fn connect(&mut self, info: &DeviceInfo) -> Result<Box<dyn InputDevice>>;
}

/// The bound game controllers, in binding order.
#[derive(Debug, Default)]
pub struct DeviceList {
    devices: Vec<Device>,
}

impl DeviceList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every `[inputN]` section and binds the matching controllers.
    ///
    /// Configuration problems are collected in the returned report and never
    /// abort loading. A version mismatch yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDeviceClass` if the backend connects a device that is
    /// not a game controller.
    pub fn load<S, B>(source: &S, backend: &mut B) -> Result<(Self, ValidationReport)>
    where
        S: ConfigSource + ?Sized,
        B: InputBackend + ?Sized,
    {
        let mut list = Self::new();
        let mut report = ValidationReport::new();

        let version = source.get("global", "version").trim();
        if version.parse::<f32>().ok() != Some(SUPPORTED_VERSION) {
            report.push(ConfigIssue::VersionMismatch {
                found: version.to_string(),
                expected: SUPPORTED_VERSION.to_string(),
            });
            return Ok((list, report));
        }

        let mut attached: Option<Vec<DeviceInfo>> = None;

        for i in 1..=MAX_INPUTS {
            let section = format!("input{}", i);
            let interface = source.get(&section, "Interface").trim();
            if interface.is_empty() || parse_bool(source.get(&section, "Ignore")) == Some(true) {
                continue;
            }
            if interface != backend.interface() {
                report.push(ConfigIssue::UnsupportedInterface {
                    section,
                    expected: backend.interface().to_string(),
                    found: interface.to_string(),
                });
                continue;
            }
            let class = source.get(&section, "Class").trim();
            if !class.is_empty() && class != "GameControl" {
                report.push(ConfigIssue::DisallowedClass {
                    section,
                    class: class.to_string(),
                });
                continue;
            }
            let name = source.get(&section, "Name").trim();

            if attached.is_none() {
                attached = Some(backend.enumerate().unwrap_or_else(|e| {
                    warn!("Failed to enumerate input devices: {}", e);
                    Vec::new()
                }));
            }
            let candidates = attached
                .iter()
                .flatten()
                .filter(|info| info.class == DeviceClass::GameControl)
                .filter(|info| name.is_empty() || info.name.contains(name));

            for info in candidates {
                if list.contains(&info.id) {
                    continue;
                }
                let raw = match backend.connect(info) {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!("[{}] could not connect '{}': {}", section, info.name, e);
                        continue;
                    }
                };
                let mut device = Device::new(raw)?;
                configure(&mut device, source, &section, &mut report);
                info!("AltInput: Added controller '{}'", info.name);
                list.devices.push(device);
            }
        }

        if list.is_empty() {
            info!("AltInput: No controller found");
        }
        Ok((list, report))
    }

    /// Appends an already configured device unless its identity is bound.
    pub fn push(&mut self, device: Device) -> bool {
        if self.contains(&device.info().id) {
            return false;
        }
        self.devices.push(device);
        true
    }

    /// Whether a device with this identity is bound.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.devices.iter().any(|device| device.info().id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Device> {
        self.devices.iter_mut()
    }

    /// Acquires every device. A device that fails to open is logged and
    /// skipped.
    ///
    /// # Returns
    ///
    /// Number of devices acquired
    pub fn open_all(&mut self) -> usize {
        let mut opened = 0;
        for device in &mut self.devices {
            match device.open() {
                Ok(()) => opened += 1,
                Err(e) => warn!("Failed to open controller '{}': {}", device.info().name, e),
            }
        }
        opened
    }

    /// Releases every acquired device.
    pub fn close_all(&mut self) {
        for device in &mut self.devices {
            device.close();
        }
    }
}

/// Applies the bindings of `section` to a freshly connected device.
fn configure<S: ConfigSource + ?Sized>(
    device: &mut Device,
    source: &S,
    section: &str,
    report: &mut ValidationReport,
) {
    let resolver = Resolver::new(source, section);
    let modes = resolver.modes();
    device.set_modes(modes);

    let device_deadzone = resolver.number("DeadZone", report);
    let device_factor = resolver
        .number("Factor", report)
        .map(|factor| if factor == 0.0 { 1.0 } else { factor });

    for id in AxisId::ALL {
        if !device.axis(id).is_available() {
            continue;
        }
        let name = id.config_name();
        let primary = resolver.lookup_all(name);
        let secondary = resolver.lookup_all(&format!("{}.Max", name));
        let kinds = resolver.parsed(&format!("{}.Type", name), report, |r| {
            r.value.parse::<MappingType>().map_err(|()| ConfigIssue::InvalidMappingType {
                section: r.section.clone(),
                key: format!("{}.Type", name),
                value: r.value.to_string(),
            })
        });
        let thresholds = resolver.number(&format!("{}.Threshold", name), report);
        let deadzones = resolver.number(&format!("{}.DeadZone", name), report);
        let factors = resolver.number(&format!("{}.Factor", name), report);
        let inverted = resolver.boolean(&format!("{}.Inverted", name), report);

        for mode in modes.iter() {
            let m = mode.index();
            let deadzone = if deadzones[m] == 0.0 { device_deadzone[m] } else { deadzones[m] };
            let factor = if factors[m] == 0.0 { device_factor[m] } else { factors[m] };
            let binding = AxisBinding {
                primary: channel(&primary[m], name, report)
                    .map(|channel| Mapping::new(channel, kinds[m], thresholds[m])),
                secondary: channel(&secondary[m], &format!("{}.Max", name), report)
                    .map(Mapping::absolute),
            };
            device
                .axis_mut(id)
                .configure(mode, Calibration::new(deadzone, factor, inverted[m]), binding);
        }

        let axis = device.axis(id);
        if let Some(range) = axis.range() {
            let mappings = modes
                .iter()
                .map(|mode| format!("{}={:?}", mode, axis.binding(mode).primary.map(|p| p.channel())))
                .collect::<Vec<_>>()
                .join(", ");
            debug!(
                "[{}] {}: range [{}, {}], {}",
                section, name, range.min, range.max, mappings
            );
        }
    }

    for (i, button) in device.buttons_mut().iter_mut().enumerate() {
        let key = format!("Button{}", i + 1);
        let mappings = resolver.parsed(&key, report, |r| parse_button(r, &key).map(Some));
        for mode in Mode::ALL {
            button.set_mapping(mode, mappings[mode.index()]);
        }
    }

    for (i, pov) in device.povs_mut().iter_mut().enumerate() {
        for position in PovPosition::ALL {
            let key = format!("POV{}.{}", i + 1, position.name());
            let mappings = resolver.parsed(&key, report, |r| parse_button(r, &key).map(Some));
            for mode in Mode::ALL {
                pov.position_mut(position).set_mapping(mode, mappings[mode.index()]);
            }
        }
    }
}

fn parse_button(resolved: &Resolved<'_>, key: &str) -> std::result::Result<ButtonMapping, ConfigIssue> {
    ButtonMapping::parse(resolved.value).map_err(|e| match e {
        ButtonParseError::UnknownChannel(unknown) => ConfigIssue::UnknownChannel {
            section: resolved.section.clone(),
            key: key.to_string(),
            name: unknown.0,
        },
        ButtonParseError::InvalidValue(value) => ConfigIssue::InvalidNumber {
            section: resolved.section.clone(),
            key: key.to_string(),
            value,
        },
    })
}

fn channel(resolved: &Option<Resolved<'_>>, key: &str, report: &mut ValidationReport) -> Option<Channel> {
    let resolved = resolved.as_ref()?;
    match resolved.value.trim().parse::<Channel>() {
        Ok(channel) => Some(channel),
        Err(unknown) => {
            report.push(ConfigIssue::UnknownChannel {
                section: resolved.section.clone(),
                key: key.to_string(),
                name: unknown.0,
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::SectionStore;
    use crate::controller::device::mocks::{game_control, mock_device};
    use crate::controller::device::{Offset, Sample};
    use crate::error::AltInputError;
    use crate::flight::{Aggregator, ControlState};

    fn backend(attached: Vec<DeviceInfo>) -> MockInputBackend {
        let mut backend = MockInputBackend::new();
        backend.expect_interface().return_const("evdev");
        backend.expect_enumerate().returning(move || Ok(attached.clone()));
        backend
            .expect_connect()
            .returning(|info| Ok(Box::new(mock_device(info.clone(), vec![])) as Box<dyn InputDevice>));
        backend
    }

    fn store(toml: &str) -> SectionStore {
        SectionStore::from_toml_str(toml).unwrap()
    }

    const HEADER: &str = "[global]\nversion = 1.3\n";

    fn load(toml: &str, attached: Vec<DeviceInfo>) -> (DeviceList, ValidationReport) {
        let source = store(&format!("{}{}", HEADER, toml));
        DeviceList::load(&source, &mut backend(attached)).unwrap()
    }

    // ==================== Section Selection Tests ====================

    #[test]
    fn test_version_mismatch_loads_nothing() {
        let source = store("[global]\nversion = 1.2\n[input1]\nInterface = \"evdev\"\n");
        let mut backend = MockInputBackend::new();
        backend.expect_enumerate().times(0);

        let (list, report) = DeviceList::load(&source, &mut backend).unwrap();
        assert!(list.is_empty());
        assert_eq!(
            report.issues(),
            &[ConfigIssue::VersionMismatch {
                found: "1.2".to_string(),
                expected: "1.3".to_string(),
            }]
        );
    }

    #[test]
    fn test_missing_version_loads_nothing() {
        let source = store("[input1]\nInterface = \"evdev\"\n");
        let mut backend = MockInputBackend::new();
        let (list, report) = DeviceList::load(&source, &mut backend).unwrap();
        assert!(list.is_empty());
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn test_binds_matching_controllers() {
        let (list, report) = load(
            "[input1]\nInterface = \"evdev\"\nName = \"Stick\"\nAxisX = \"roll\"\n",
            vec![
                game_control("/dev/input/event3", "Logitech Extreme 3D Stick", 12, 1),
                game_control("/dev/input/event4", "Pedals", 0, 0),
            ],
        );
        assert!(report.is_empty());
        assert_eq!(list.len(), 1);
        assert_eq!(list.iter().next().unwrap().info().id, "/dev/input/event3");
    }

    #[test]
    fn test_empty_name_binds_every_controller() {
        let (list, _) = load(
            "[input1]\nInterface = \"evdev\"\n",
            vec![
                game_control("/dev/input/event3", "Stick", 0, 0),
                game_control("/dev/input/event4", "Throttle", 0, 0),
            ],
        );
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_device_bound_once_across_sections() {
        let (list, _) = load(
            "[input1]\nInterface = \"evdev\"\n[input2]\nInterface = \"evdev\"\nName = \"Stick\"\n",
            vec![game_control("/dev/input/event3", "Stick", 0, 0)],
        );
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_skipped_sections() {
        let (list, report) = load(
            "[input1]\nInterface = \"evdev\"\nIgnore = \"TRUE\"\n\
             [input2]\nInterface = \"DirectInput\"\n\
             [input3]\nInterface = \"evdev\"\nClass = \"Keyboard\"\n\
             [input4]\nName = \"Stick\"\n",
            vec![game_control("/dev/input/event3", "Stick", 0, 0)],
        );
        assert!(list.is_empty());
        assert_eq!(
            report.issues(),
            &[
                ConfigIssue::UnsupportedInterface {
                    section: "input2".to_string(),
                    expected: "evdev".to_string(),
                    found: "DirectInput".to_string(),
                },
                ConfigIssue::DisallowedClass {
                    section: "input3".to_string(),
                    class: "Keyboard".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_non_game_controllers_never_bound() {
        let mut keyboard = game_control("/dev/input/event0", "Keyboard", 0, 0);
        keyboard.class = DeviceClass::Keyboard;
        let (list, _) = load("[input1]\nInterface = \"evdev\"\n", vec![keyboard]);
        assert!(list.is_empty());
    }

    #[test]
    fn test_backend_returning_wrong_class_is_fatal() {
        let source = store(&format!("{}[input1]\nInterface = \"evdev\"\n", HEADER));
        let mut backend = MockInputBackend::new();
        backend.expect_interface().return_const("evdev");
        backend
            .expect_enumerate()
            .returning(|| Ok(vec![game_control("/dev/input/event0", "Stick", 0, 0)]));
        backend.expect_connect().returning(|info| {
            let mut lying = info.clone();
            lying.class = DeviceClass::Pointer;
            Ok(Box::new(mock_device(lying, vec![])) as Box<dyn InputDevice>)
        });

        let err = DeviceList::load(&source, &mut backend).unwrap_err();
        assert!(matches!(err, AltInputError::InvalidDeviceClass(_)));
    }

    #[test]
    fn test_connect_failure_skips_device() {
        let source = store(&format!("{}[input1]\nInterface = \"evdev\"\n", HEADER));
        let mut backend = MockInputBackend::new();
        backend.expect_interface().return_const("evdev");
        backend.expect_enumerate().returning(|| {
            Ok(vec![
                game_control("/dev/input/event0", "Busy", 0, 0),
                game_control("/dev/input/event1", "Stick", 0, 0),
            ])
        });
        backend.expect_connect().returning(|info| {
            if info.name == "Busy" {
                Err(AltInputError::Device("permission denied".to_string()))
            } else {
                Ok(Box::new(mock_device(info.clone(), vec![])) as Box<dyn InputDevice>)
            }
        });

        let (list, _) = DeviceList::load(&source, &mut backend).unwrap();
        assert_eq!(list.len(), 1);
    }

    // ==================== Attribute Tests ====================

    fn only(list: &DeviceList) -> &Device {
        list.iter().next().unwrap()
    }

    #[test]
    fn test_axis_bindings_per_mode() {
        let (list, report) = load(
            r#"
[input1]
Interface = "evdev"
AxisX = "roll"
"AxisX.Inverted" = "true"
[input1.Ground]
AxisX = "wheelSteer"
"#,
            vec![game_control("js", "Stick", 0, 0)],
        );
        assert!(report.is_empty());
        let axis = only(&list).axis(AxisId::X);

        assert_eq!(axis.binding(Mode::Flight).primary, Some(Mapping::absolute(Channel::Roll)));
        assert_eq!(axis.binding(Mode::Ground).primary, Some(Mapping::absolute(Channel::WheelSteer)));
        assert!(axis.calibration(Mode::Ground).inverted());
        // No [input1.AltFlight]
        assert!(!axis.binding(Mode::AltFlight).is_mapped());
        assert!(!only(&list).modes().contains(Mode::AltFlight));
    }

    #[test]
    fn test_numeric_fallbacks() {
        let (list, _) = load(
            r#"
[input1]
Interface = "evdev"
DeadZone = 0.1
"AxisX.Factor" = 0.5
AxisX = "roll"
AxisY = "pitch"
"AxisY.DeadZone" = 0.3
"#,
            vec![game_control("js", "Stick", 0, 0)],
        );
        let device = only(&list);
        let x = device.axis(AxisId::X).calibration(Mode::Flight);
        let y = device.axis(AxisId::Y).calibration(Mode::Flight);

        assert_eq!(x.deadzone(), 0.1);
        assert_eq!(x.factor(), 0.5);
        assert_eq!(y.deadzone(), 0.3);
        // Device factor 0 means 1.0
        assert_eq!(y.factor(), 1.0);
    }

    #[test]
    fn test_range_binding() {
        let (list, _) = load(
            r#"
[input1]
Interface = "evdev"
AxisZ = "pitch"
"AxisZ.Type" = "Range"
"AxisZ.Threshold" = 0.25
"AxisZ.Max" = "yaw"
"#,
            vec![game_control("js", "Stick", 0, 0)],
        );
        let binding = *only(&list).axis(AxisId::Z).binding(Mode::Flight);
        assert_eq!(binding.primary, Some(Mapping::new(Channel::Pitch, MappingType::Range, 0.25)));
        assert_eq!(binding.secondary, Some(Mapping::absolute(Channel::Yaw)));
    }

    #[test]
    fn test_invalid_values_reported_and_zeroed() {
        let (list, report) = load(
            r#"
[input1]
Interface = "evdev"
AxisX = "rol"
AxisY = "pitch"
"AxisY.Type" = "Exponential"
"AxisY.Inverted" = "yes"
"#,
            vec![game_control("js", "Stick", 0, 0)],
        );
        let device = only(&list);
        assert!(!device.axis(AxisId::X).binding(Mode::Flight).is_mapped());
        assert_eq!(
            device.axis(AxisId::Y).binding(Mode::Flight).primary.map(|m| m.kind()),
            Some(MappingType::Absolute)
        );
        assert!(!device.axis(AxisId::Y).calibration(Mode::Flight).inverted());
        assert_eq!(report.len(), 3);
        assert!(report.issues().contains(&ConfigIssue::UnknownChannel {
            section: "input1".to_string(),
            key: "AxisX".to_string(),
            name: "rol".to_string(),
        }));
    }

    #[test]
    fn test_unavailable_axis_not_bound() {
        let (list, report) = load(
            "[input1]\nInterface = \"evdev\"\nRotationZ = \"yaw\"\nRotationX = \"nope\"\n",
            vec![game_control("js", "Stick", 0, 0)],
        );
        let device = only(&list);
        assert!(!device.axis(AxisId::RotationZ).binding(Mode::Flight).is_mapped());
        // Axes the device lacks are never parsed
        assert!(report.is_empty());
    }

    #[test]
    fn test_button_and_pov_bindings() {
        let (list, report) = load(
            r#"
[input1]
Interface = "evdev"
Button1 = "mainThrottle 1.0"
"POV1.Up" = "pitch [-0.5]"
[input1.AltFlight]
Button1 = "wheelThrottle [0.8]"
"#,
            vec![game_control("js", "Stick", 2, 1)],
        );
        assert!(report.is_empty());
        let device = only(&list);

        let button = &device.buttons()[0];
        assert_eq!(button.mapping(Mode::Flight), Some(&ButtonMapping::new(Channel::MainThrottle, 1.0)));
        assert_eq!(button.mapping(Mode::AltFlight), Some(&ButtonMapping::new(Channel::WheelThrottle, 0.8)));
        assert_eq!(button.mapping(Mode::Ground), None);
        assert_eq!(device.buttons()[1].mapping(Mode::Flight), None);

        let up = device.povs()[0].position(PovPosition::Up);
        assert_eq!(up.mapping(Mode::Flight), Some(&ButtonMapping::new(Channel::Pitch, -0.5)));
        assert_eq!(up.mapping(Mode::AltFlight), Some(&ButtonMapping::new(Channel::Pitch, -0.5)));
    }

    // ==================== Lifecycle Tests ====================

    #[test]
    fn test_open_all_continues_past_failures() {
        let mut failing = mock_device(game_control("a", "Broken", 0, 0), vec![]);
        failing
            .expect_open()
            .returning(|| Err(AltInputError::Device("no access".to_string())));
        let mut working = mock_device(game_control("b", "Stick", 0, 0), vec![]);
        working.expect_open().times(1).returning(|| Ok(()));
        working.expect_close().times(1).return_const(());

        let mut list = DeviceList::new();
        assert!(list.push(Device::new(Box::new(failing)).unwrap()));
        assert!(list.push(Device::new(Box::new(working)).unwrap()));

        assert_eq!(list.open_all(), 1);
        list.close_all();
        assert!(list.iter().all(|device| !device.is_acquired()));
    }

    #[test]
    fn test_push_rejects_duplicate_identity() {
        let mut list = DeviceList::new();
        let first = mock_device(game_control("same", "Stick", 0, 0), vec![]);
        let second = mock_device(game_control("same", "Stick", 0, 0), vec![]);
        assert!(list.push(Device::new(Box::new(first)).unwrap()));
        assert!(!list.push(Device::new(Box::new(second)).unwrap()));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_loaded_device_drives_its_binding() {
        let source = store(&format!(
            "{}[input1]\nInterface = \"evdev\"\nSlider1 = \"mainThrottle\"\n",
            HEADER
        ));
        let mut backend = MockInputBackend::new();
        backend.expect_interface().return_const("evdev");
        backend
            .expect_enumerate()
            .returning(|| Ok(vec![game_control("js", "Throttle", 0, 0)]));
        backend.expect_connect().returning(|info| {
            let samples = vec![vec![Sample::new(Offset::Axis(AxisId::Slider1), 10000)]];
            Ok(Box::new(mock_device(info.clone(), samples)) as Box<dyn InputDevice>)
        });

        let (mut list, _) = DeviceList::load(&source, &mut backend).unwrap();
        let mut aggregator = Aggregator::default();
        for (i, device) in list.iter_mut().enumerate() {
            device.process_input(i, Mode::Flight, &mut aggregator);
        }
        aggregator.settle();

        let mut expected = ControlState::new();
        expected.set(Channel::MainThrottle, 1.0);
        assert_eq!(*aggregator.held(), expected);
    }
}
