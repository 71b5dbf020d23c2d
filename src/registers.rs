//! Vim-style registers: named (`a`-`z`), append (`A`-`Z`), yank (`0`),
//! unnamed (`"`), and the system clipboard (`+`/`*`), bridged out via an
//! OSC 52 escape sequence (spec §4.6).

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Holds the contents of every register. The unnamed register always
/// mirrors the most recent yank or delete, matching vim's behavior.
#[derive(Debug, Default)]
pub struct RegisterStore {
    named: HashMap<char, String>,
    unnamed: String,
    yank: String,
    clipboard: String,
}

impl RegisterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `text` under `register`. Uppercase named registers append to
    /// their lowercase counterpart instead of overwriting. Writing to `+`
    /// or `*` also updates the in-memory shadow used by [`clipboard_osc52`].
    pub fn set(&mut self, register: char, text: &str, is_yank: bool) {
        match register {
            'A'..='Z' => {
                let lower = register.to_ascii_lowercase();
                self.named.entry(lower).or_default().push_str(text);
            }
            '+' | '*' => {
                self.clipboard = text.to_string();
            }
            '0' => {
                self.yank = text.to_string();
            }
            _ => {
                self.named.insert(register, text.to_string());
            }
        }
        self.unnamed = text.to_string();
        if is_yank {
            self.yank = text.to_string();
        }
    }

    /// Read back whatever is stored under `register`, falling back to the
    /// unnamed register for `"` itself.
    pub fn get(&self, register: char) -> &str {
        match register {
            '"' => &self.unnamed,
            '0' => &self.yank,
            '+' | '*' => &self.clipboard,
            c => self.named.get(&c).map(String::as_str).unwrap_or(""),
        }
    }

    /// Build the OSC 52 sequence that asks the host terminal to set its
    /// system clipboard to `text` (spec §4.6, "clipboard bridging").
    pub fn clipboard_osc52(text: &str) -> Vec<u8> {
        let encoded = BASE64.encode(text.as_bytes());
        format!("\x1b]52;c;{encoded}\x07").into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_register_round_trips() {
        let mut store = RegisterStore::new();
        store.set('a', "hello", false);
        assert_eq!(store.get('a'), "hello");
    }

    #[test]
    fn uppercase_register_appends() {
        let mut store = RegisterStore::new();
        store.set('a', "hello", false);
        store.set('A', " world", false);
        assert_eq!(store.get('a'), "hello world");
    }

    #[test]
    fn yank_updates_yank_and_unnamed() {
        let mut store = RegisterStore::new();
        store.set('b', "yanked", true);
        assert_eq!(store.get('0'), "yanked");
        assert_eq!(store.get('"'), "yanked");
    }

    #[test]
    fn clipboard_register_feeds_osc52() {
        let mut store = RegisterStore::new();
        store.set('+', "copy me", false);
        assert_eq!(store.get('+'), "copy me");
        let seq = RegisterStore::clipboard_osc52(store.get('+'));
        assert!(seq.starts_with(b"\x1b]52;c;"));
        assert!(seq.ends_with(b"\x07"));
    }
}
