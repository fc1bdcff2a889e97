use serde_json::{json, Value};

use super::{InputDevice, Origin};

/// A virtual scroll wheel with an ordered action queue.
#[derive(Debug, Clone)]
pub struct WheelInput {
    name: String,
    actions: Vec<Value>,
}

impl WheelInput {
    pub fn new(name: impl Into<String>) -> Self {
        WheelInput {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    /// Queues a scroll of `(delta_x, delta_y)` starting at `(x, y)`
    /// relative to `origin`.
    pub fn scroll(&mut self, x: i64, y: i64, delta_x: i64, delta_y: i64, origin: Origin) {
        self.actions.push(json!({
            "type": "wheel",
            "x": x,
            "y": y,
            "deltaX": delta_x,
            "deltaY": delta_y,
            "origin": origin.to_value(),
        }));
    }
}

impl InputDevice for WheelInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn device_type(&self) -> &'static str {
        "wheel"
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
