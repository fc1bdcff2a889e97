//! The non-typeable key codepoints of the W3C keyboard actions section.
//!
//! These are sent through `send_keys` and key actions exactly like regular
//! characters; the remote end maps the private-use codepoints back to the
//! corresponding physical keys.

pub const NULL: char = '\u{e000}';
pub const CANCEL: char = '\u{e001}';
pub const HELP: char = '\u{e002}';
pub const BACKSPACE: char = '\u{e003}';
pub const TAB: char = '\u{e004}';
pub const CLEAR: char = '\u{e005}';
pub const RETURN: char = '\u{e006}';
pub const ENTER: char = '\u{e007}';
pub const SHIFT: char = '\u{e008}';
pub const CONTROL: char = '\u{e009}';
pub const ALT: char = '\u{e00a}';
pub const PAUSE: char = '\u{e00b}';
pub const ESCAPE: char = '\u{e00c}';
pub const SPACE: char = '\u{e00d}';
pub const PAGE_UP: char = '\u{e00e}';
pub const PAGE_DOWN: char = '\u{e00f}';
pub const END: char = '\u{e010}';
pub const HOME: char = '\u{e011}';
pub const LEFT: char = '\u{e012}';
pub const UP: char = '\u{e013}';
pub const RIGHT: char = '\u{e014}';
pub const DOWN: char = '\u{e015}';
pub const INSERT: char = '\u{e016}';
pub const DELETE: char = '\u{e017}';
pub const SEMICOLON: char = '\u{e018}';
pub const EQUALS: char = '\u{e019}';

pub const NUMPAD0: char = '\u{e01a}';
pub const NUMPAD1: char = '\u{e01b}';
pub const NUMPAD2: char = '\u{e01c}';
pub const NUMPAD3: char = '\u{e01d}';
pub const NUMPAD4: char = '\u{e01e}';
pub const NUMPAD5: char = '\u{e01f}';
pub const NUMPAD6: char = '\u{e020}';
pub const NUMPAD7: char = '\u{e021}';
pub const NUMPAD8: char = '\u{e022}';
pub const NUMPAD9: char = '\u{e023}';
pub const MULTIPLY: char = '\u{e024}';
pub const ADD: char = '\u{e025}';
pub const SEPARATOR: char = '\u{e026}';
pub const SUBTRACT: char = '\u{e027}';
pub const DECIMAL: char = '\u{e028}';
pub const DIVIDE: char = '\u{e029}';

pub const F1: char = '\u{e031}';
pub const F2: char = '\u{e032}';
pub const F3: char = '\u{e033}';
pub const F4: char = '\u{e034}';
pub const F5: char = '\u{e035}';
pub const F6: char = '\u{e036}';
pub const F7: char = '\u{e037}';
pub const F8: char = '\u{e038}';
pub const F9: char = '\u{e039}';
pub const F10: char = '\u{e03a}';
pub const F11: char = '\u{e03b}';
pub const F12: char = '\u{e03c}';

pub const META: char = '\u{e03d}';
/// Alias for [`META`] on Apple keyboards.
pub const COMMAND: char = '\u{e03d}';
pub const ZENKAKU_HANKAKU: char = '\u{e040}';
