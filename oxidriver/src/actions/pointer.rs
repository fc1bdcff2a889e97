use std::time::Duration;

use serde_json::{json, Value};

use super::{InputDevice, MouseButton, Origin};

/// Default duration of a pointer move when none is configured.
pub const DEFAULT_MOVE_DURATION: Duration = Duration::from_millis(250);

/// The kind of hardware a pointer device emulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerKind {
    #[default]
    Mouse,
    Pen,
    Touch,
}

impl PointerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PointerKind::Mouse => "mouse",
            PointerKind::Pen => "pen",
            PointerKind::Touch => "touch",
        }
    }
}

/// A virtual pointer device with an ordered action queue.
#[derive(Debug, Clone)]
pub struct PointerInput {
    name: String,
    kind: PointerKind,
    move_duration: Duration,
    actions: Vec<Value>,
}

impl PointerInput {
    pub fn new(kind: PointerKind, name: impl Into<String>) -> Self {
        PointerInput {
            name: name.into(),
            kind,
            move_duration: DEFAULT_MOVE_DURATION,
            actions: Vec::new(),
        }
    }

    /// Overrides the duration pointer moves are animated over.
    pub fn move_duration(&mut self, duration: Duration) -> &mut Self {
        self.move_duration = duration;
        self
    }

    pub fn kind(&self) -> PointerKind {
        self.kind
    }

    /// Queues a move to `(x, y)` relative to `origin`.
    pub fn move_to(&mut self, x: i64, y: i64, origin: Origin) {
        let action = json!({
            "type": "pointerMove",
            "duration": self.move_duration.as_millis() as u64,
            "x": x,
            "y": y,
            "origin": origin.to_value(),
        });
        self.actions.push(action);
    }

    pub fn press(&mut self, button: MouseButton) {
        self.actions
            .push(json!({"type": "pointerDown", "button": button.code()}));
    }

    pub fn release(&mut self, button: MouseButton) {
        self.actions
            .push(json!({"type": "pointerUp", "button": button.code()}));
    }

    /// Queues a press/release pair.
    pub fn click(&mut self, button: MouseButton) {
        self.press(button);
        self.release(button);
    }

    pub fn double_click(&mut self, button: MouseButton) {
        self.click(button);
        self.click(button);
    }

    /// Cancels the current input source's action stream.
    pub fn cancel(&mut self) {
        self.actions.push(json!({"type": "pointerCancel"}));
    }
}

impl InputDevice for PointerInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn device_type(&self) -> &'static str {
        "pointer"
    }

    fn parameters(&self) -> Option<Value> {
        Some(json!({"pointerType": self.kind.as_str()}))
    }

    fn actions(&self) -> &[Value] {
        &self.actions
    }

    fn add_action(&mut self, action: Value) {
        self.actions.push(action);
    }

    fn clear_actions(&mut self) {
        self.actions.clear();
    }
}
