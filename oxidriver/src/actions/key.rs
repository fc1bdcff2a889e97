use serde_json::{json, Value};

use super::InputDevice;

/// A virtual keyboard with an ordered action queue.
#[derive(Debug, Clone)]
pub struct KeyInput {
    name: String,
    actions: Vec<Value>,
}

impl KeyInput {
    pub fn new(name: impl Into<String>) -> Self {
        KeyInput {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    pub fn key_down(&mut self, value: impl Into<String>) {
        self.actions
            .push(json!({"type": "keyDown", "value": value.into()}));
    }

    pub fn key_up(&mut self, value: impl Into<String>) {
        self.actions
            .push(json!({"type": "keyUp", "value": value.into()}));
    }

    /// Queues a down/up pair for every character of `text`.
    pub fn send_keys(&mut self, text: impl AsRef<str>) {
        for ch in text.as_ref().chars() {
            let value = ch.to_string();
            self.key_down(value.clone());
            self.key_up(value);
        }
    }
}

impl InputDevice for KeyInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn device_type(&self) -> &'static str {
        "key"
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
