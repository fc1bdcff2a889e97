//! The W3C Actions API: virtual input devices whose queued actions are
//! composed into a single `/actions` payload.
//!
//! Low-level access goes through [`ActionBuilder`] and the per-device
//! types; [`ActionChains`] layers the usual gesture helpers (drag and drop,
//! double click, modifier chords) on top.

mod key;
mod pointer;
mod wheel;

pub use key::KeyInput;
pub use pointer::{PointerInput, PointerKind, DEFAULT_MOVE_DURATION};
pub use wheel::WheelInput;

use std::time::Duration;

use serde_json::{json, Value};

use oxidriver_types::ELEMENT_KEY;

use crate::command::Command;
use crate::conn::params;
use crate::element::Element;
use crate::error::Result;
use crate::session::WebDriver;

/// The shared surface of the three virtual device kinds.
pub trait InputDevice {
    fn name(&self) -> &str;
    /// The wire device type: `pointer`, `key` or `wheel`.
    fn device_type(&self) -> &'static str;
    /// Extra device parameters, e.g. a pointer's `pointerType`.
    fn parameters(&self) -> Option<Value> {
        None
    }
    fn actions(&self) -> &[Value];
    fn add_action(&mut self, action: Value);
    fn clear_actions(&mut self);

    /// Queues a pause tick on this device.
    fn pause(&mut self, duration: Duration) {
        self.add_action(json!({
            "type": "pause",
            "duration": duration.as_millis() as u64,
        }));
    }

    /// The device's record in the `/actions` payload, or `None` when its
    /// queue is empty.
    fn encode(&self) -> Option<Value> {
        if self.actions().is_empty() {
            return None;
        }
        let mut record = json!({
            "type": self.device_type(),
            "id": self.name(),
            "actions": self.actions(),
        });
        if let Some(parameters) = self.parameters() {
            record["parameters"] = parameters;
        }
        Some(record)
    }
}

/// A mouse button, by W3C button index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    pub fn code(self) -> u64 {
        match self {
            MouseButton::Left => 0,
            MouseButton::Middle => 1,
            MouseButton::Right => 2,
        }
    }
}

/// Where pointer and wheel coordinates are anchored.
#[derive(Debug, Clone)]
pub enum Origin {
    /// The top-left corner of the viewport.
    Viewport,
    /// The pointer's current location.
    Pointer,
    /// The center of an element.
    Element(String),
}

impl Origin {
    pub fn element(element: &Element) -> Origin {
        Origin::Element(element.id().to_string())
    }

    pub(crate) fn to_value(&self) -> Value {
        match self {
            Origin::Viewport => json!("viewport"),
            Origin::Pointer => json!("pointer"),
            Origin::Element(id) => json!({ELEMENT_KEY: id}),
        }
    }
}

/// A raw action for the session-level stored-actions queue.
#[derive(Debug, Clone)]
pub struct StoredAction(Value);

impl StoredAction {
    pub fn into_value(self) -> Value {
        self.0
    }
}

pub fn key_down(value: impl Into<String>) -> StoredAction {
    StoredAction(json!({"type": "keyDown", "value": value.into()}))
}

pub fn key_up(value: impl Into<String>) -> StoredAction {
    StoredAction(json!({"type": "keyUp", "value": value.into()}))
}

pub fn pointer_down(button: MouseButton) -> StoredAction {
    StoredAction(json!({"type": "pointerDown", "button": button.code()}))
}

pub fn pointer_up(button: MouseButton) -> StoredAction {
    StoredAction(json!({"type": "pointerUp", "button": button.code()}))
}

pub fn pause_action(duration: Duration) -> StoredAction {
    StoredAction(json!({"type": "pause", "duration": duration.as_millis() as u64}))
}

/// Owns one device of each kind and composes their queues into a single
/// tick-aligned `/actions` payload.
///
/// Devices appear in the payload in registration order (pointer, key,
/// wheel); within a device, queue order is preserved. Devices with no
/// queued actions are omitted.
#[derive(Debug)]
pub struct ActionBuilder {
    driver: WebDriver,
    pointer: PointerInput,
    key: KeyInput,
    wheel: WheelInput,
}

impl ActionBuilder {
    pub fn new(driver: WebDriver) -> Self {
        ActionBuilder {
            driver,
            pointer: PointerInput::new(PointerKind::Mouse, "default mouse"),
            key: KeyInput::new("default keyboard"),
            wheel: WheelInput::new("default wheel"),
        }
    }

    /// Replaces the default pointer device, e.g. with a touch input.
    pub fn with_pointer(mut self, pointer: PointerInput) -> Self {
        self.pointer = pointer;
        self
    }

    pub fn pointer(&mut self) -> &mut PointerInput {
        &mut self.pointer
    }

    pub fn key(&mut self) -> &mut KeyInput {
        &mut self.key
    }

    pub fn wheel(&mut self) -> &mut WheelInput {
        &mut self.wheel
    }

    /// Queues a pause on every device, keeping their tick streams aligned.
    pub fn pause_all(&mut self, duration: Duration) {
        self.pointer.pause(duration);
        self.key.pause(duration);
        self.wheel.pause(duration);
    }

    /// The composed `/actions` payload.
    pub fn payload(&self) -> Value {
        let devices: Vec<Value> = [
            self.pointer.encode(),
            self.key.encode(),
            self.wheel.encode(),
        ]
        .into_iter()
        .flatten()
        .collect();
        json!({"actions": devices})
    }

    /// Flushes every queued action in one request and clears the queues.
    pub async fn perform(&mut self) -> Result<()> {
        let payload = self.payload();
        let result = self
            .driver
            .void(Command::PerformActions, params(payload))
            .await;
        self.pointer.clear_actions();
        self.key.clear_actions();
        self.wheel.clear_actions();
        result
    }

    /// Releases all depressed keys and buttons on the remote end.
    pub async fn release(&self) -> Result<()> {
        self.driver.release_actions().await
    }
}

/// Chainable gesture helpers over an [`ActionBuilder`].
///
/// ```no_run
/// # use oxidriver::{actions::ActionChains, WebDriver};
/// # async fn run(driver: WebDriver, source: oxidriver::Element, target: oxidriver::Element) -> oxidriver::Result<()> {
/// ActionChains::new(driver)
///     .drag_and_drop(&source, &target)
///     .perform()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ActionChains {
    builder: ActionBuilder,
}

impl ActionChains {
    pub fn new(driver: WebDriver) -> Self {
        ActionChains {
            builder: ActionBuilder::new(driver),
        }
    }

    /// Clicks at the pointer's current location.
    pub fn click(mut self) -> Self {
        self.builder.pointer().click(MouseButton::Left);
        self
    }

    /// Moves to the element's center and clicks it.
    pub fn click_on(self, element: &Element) -> Self {
        self.move_to_element(element).click()
    }

    pub fn click_and_hold(mut self) -> Self {
        self.builder.pointer().press(MouseButton::Left);
        self
    }

    pub fn release_button(mut self) -> Self {
        self.builder.pointer().release(MouseButton::Left);
        self
    }

    /// A single right-button click.
    pub fn context_click(mut self) -> Self {
        self.builder.pointer().click(MouseButton::Right);
        self
    }

    pub fn double_click(mut self) -> Self {
        self.builder.pointer().double_click(MouseButton::Left);
        self
    }

    /// Holds the left button on `source`, moves to `target`, and releases.
    pub fn drag_and_drop(self, source: &Element, target: &Element) -> Self {
        self.move_to_element(source)
            .click_and_hold()
            .move_to_element(target)
            .release_button()
    }

    /// Like [`drag_and_drop`](ActionChains::drag_and_drop), but releasing
    /// at an offset from the source.
    pub fn drag_and_drop_by_offset(self, source: &Element, dx: i64, dy: i64) -> Self {
        self.move_to_element(source)
            .click_and_hold()
            .move_by_offset(dx, dy)
            .release_button()
    }

    pub fn move_to_element(mut self, element: &Element) -> Self {
        self.builder
            .pointer()
            .move_to(0, 0, Origin::element(element));
        self
    }

    pub fn move_by_offset(mut self, dx: i64, dy: i64) -> Self {
        self.builder.pointer().move_to(dx, dy, Origin::Pointer);
        self
    }

    pub fn key_down(mut self, value: impl Into<String>) -> Self {
        self.builder.key().key_down(value);
        self
    }

    pub fn key_up(mut self, value: impl Into<String>) -> Self {
        self.builder.key().key_up(value);
        self
    }

    /// Types `text` as a down/up pair per character.
    pub fn send_keys(mut self, text: impl AsRef<str>) -> Self {
        self.builder.key().send_keys(text);
        self
    }

    /// Pauses every device for `duration`.
    pub fn pause(mut self, duration: Duration) -> Self {
        self.builder.pause_all(duration);
        self
    }

    pub fn scroll_to_element(mut self, element: &Element) -> Self {
        self.builder
            .wheel()
            .scroll(0, 0, 0, 0, Origin::element(element));
        self
    }

    pub fn scroll_by_amount(mut self, delta_x: i64, delta_y: i64) -> Self {
        self.builder
            .wheel()
            .scroll(0, 0, delta_x, delta_y, Origin::Viewport);
        self
    }

    /// The composed payload, for inspection.
    pub fn payload(&self) -> Value {
        self.builder.payload()
    }

    /// Flushes the queued gestures to the remote end.
    pub async fn perform(mut self) -> Result<()> {
        self.builder.perform().await
    }

    /// Clears actions stored on the remote end.
    pub async fn reset_actions(&self) -> Result<()> {
        self.builder.release().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conn::ClientConfig;

    fn driver() -> WebDriver {
        WebDriver::new(ClientConfig::new("http://localhost:4444")).unwrap()
    }

    #[test]
    fn empty_devices_are_omitted() {
        let mut builder = ActionBuilder::new(driver());
        builder.key().key_down("a");
        builder.key().key_up("a");

        let payload = builder.payload();
        let devices = payload["actions"].as_array().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0]["type"], "key");
        assert_eq!(devices[0]["id"], "default keyboard");
    }

    #[test]
    fn devices_encode_in_registration_order() {
        let mut builder = ActionBuilder::new(driver());
        builder.wheel().scroll(0, 0, 0, 120, Origin::Viewport);
        builder.key().key_down("x");
        builder.pointer().click(MouseButton::Left);

        let payload = builder.payload();
        let kinds: Vec<&str> = payload["actions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["type"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, ["pointer", "key", "wheel"]);
    }

    #[test]
    fn pointer_moves_carry_the_default_duration() {
        let mut pointer = PointerInput::new(PointerKind::Mouse, "m");
        pointer.move_to(10, 20, Origin::Viewport);
        let action = &pointer.actions()[0];
        assert_eq!(action["duration"], 250);
        assert_eq!(action["origin"], "viewport");
        assert_eq!(action["x"], 10);
        assert_eq!(action["y"], 20);
    }

    #[test]
    fn pointer_device_carries_its_parameters() {
        let mut pointer = PointerInput::new(PointerKind::Touch, "finger");
        pointer.click(MouseButton::Left);
        let record = pointer.encode().unwrap();
        assert_eq!(record["parameters"], serde_json::json!({"pointerType": "touch"}));
        assert_eq!(record["actions"][0]["button"], 0);
    }

    #[test]
    fn element_origin_uses_the_w3c_reference() {
        let element = crate::element::Element::new(driver(), "E1");
        let origin = Origin::element(&element).to_value();
        assert_eq!(origin[ELEMENT_KEY], "E1");
    }

    #[test]
    fn send_keys_pairs_down_and_up_per_character() {
        let mut key = KeyInput::new("kb");
        key.send_keys("ab");
        let kinds: Vec<(&str, &str)> = key
            .actions()
            .iter()
            .map(|a| {
                (
                    a["type"].as_str().unwrap(),
                    a["value"].as_str().unwrap(),
                )
            })
            .collect();
        assert_eq!(
            kinds,
            [
                ("keyDown", "a"),
                ("keyUp", "a"),
                ("keyDown", "b"),
                ("keyUp", "b"),
            ]
        );
    }

    #[test]
    fn drag_and_drop_is_move_down_move_up() {
        let d = driver();
        let source = crate::element::Element::new(d.clone(), "S");
        let target = crate::element::Element::new(d.clone(), "T");
        let chains = ActionChains::new(d).drag_and_drop(&source, &target);

        let payload = chains.payload();
        let actions = payload["actions"][0]["actions"].as_array().unwrap();
        let kinds: Vec<&str> = actions.iter().map(|a| a["type"].as_str().unwrap()).collect();
        assert_eq!(kinds, ["pointerMove", "pointerDown", "pointerMove", "pointerUp"]);
        assert_eq!(actions[0]["origin"][ELEMENT_KEY], "S");
        assert_eq!(actions[2]["origin"][ELEMENT_KEY], "T");
    }

    #[test]
    fn pause_aligns_every_device() {
        let mut builder = ActionBuilder::new(driver());
        builder.pause_all(Duration::from_millis(30));
        // all three devices now have one queued action, so all are encoded
        let payload = builder.payload();
        assert_eq!(payload["actions"].as_array().unwrap().len(), 3);
        assert_eq!(payload["actions"][0]["actions"][0]["duration"], 30);
    }
}
