use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "settings.toml";

/// Keywords the inbox service starts with when nothing else says otherwise.
pub const DEFAULT_KEYWORDS: [&str; 3] = ["networking", "internship", "club events"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub keywords: Vec<String>,
    /// JSON file with `emails` and `keywords`, used instead of the home page.
    pub snapshot: Option<PathBuf>,
    pub log_filter: String,
    pub keybindings: Keybindings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:7747".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Keybindings {
    pub next_panel: Vec<String>,
    pub prev_panel: Vec<String>,
    pub move_up: Vec<String>,
    pub move_down: Vec<String>,
    pub toggle_check: Vec<String>,
    pub select_all: Vec<String>,
    pub classify: Vec<String>,
    pub classify_batch: Vec<String>,
    pub untag: Vec<String>,
    pub highlight: Vec<String>,
    pub delete: Vec<String>,
    pub new_message: Vec<String>,
    pub send_message: Vec<String>,
    pub chat: Vec<String>,
    pub categories: Vec<String>,
    pub search: Vec<String>,
    pub process_untagged: Vec<String>,
    pub toggle_theme: Vec<String>,
    pub quit: Vec<String>,
}

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}

impl Default for Keybindings {
    fn default() -> Self {
        Self {
            next_panel: keys(&["l", "Right", "Tab"]),
            prev_panel: keys(&["h", "Left", "BackTab"]),
            move_up: keys(&["k", "Up"]),
            move_down: keys(&["j", "Down"]),
            toggle_check: keys(&[" "]),
            select_all: keys(&["a"]),
            classify: keys(&["c"]),
            classify_batch: keys(&["C"]),
            untag: keys(&["u"]),
            highlight: keys(&["*"]),
            delete: keys(&["Backspace", "d"]),
            new_message: keys(&["n"]),
            send_message: keys(&["ctrl-s"]),
            chat: keys(&["i"]),
            categories: keys(&["t"]),
            search: keys(&["/"]),
            process_untagged: keys(&["p"]),
            toggle_theme: keys(&["T"]),
            quit: keys(&["q"]),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            keywords: keys(&DEFAULT_KEYWORDS),
            snapshot: None,
            log_filter: "tagmail=debug".to_string(),
            keybindings: Keybindings::default(),
        }
    }
}

impl Config {
    /// Reads `settings.toml` from the working directory, or defaults when absent.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

pub fn parse_key_string(key_str: &str) -> (KeyCode, KeyModifiers) {
    let mut modifiers = KeyModifiers::empty();

    // "-" on its own, or as the last segment of "ctrl--", is the base key.
    let (prefix, base_key_str) = match key_str.rsplit_once('-') {
        Some((prefix, "")) => (prefix.strip_suffix('-').unwrap_or(prefix), "-"),
        Some((prefix, base)) => (prefix, base),
        None => ("", key_str),
    };

    for part in prefix.split('-').filter(|p| !p.is_empty()) {
        match part.to_lowercase().as_str() {
            "ctrl" => modifiers.insert(KeyModifiers::CONTROL),
            "alt" => modifiers.insert(KeyModifiers::ALT),
            "shift" => modifiers.insert(KeyModifiers::SHIFT),
            "cmd" | "command" | "super" => modifiers.insert(KeyModifiers::SUPER),
            "meta" => modifiers.insert(KeyModifiers::META),
            _ => {}
        }
    }

    let mut chars = base_key_str.chars();
    let code = match (base_key_str, chars.next(), chars.next()) {
        ("Backspace", ..) => KeyCode::Backspace,
        ("Enter", ..) => KeyCode::Enter,
        ("Left", ..) => KeyCode::Left,
        ("Right", ..) => KeyCode::Right,
        ("Up", ..) => KeyCode::Up,
        ("Down", ..) => KeyCode::Down,
        ("Tab", ..) => KeyCode::Tab,
        ("BackTab", ..) => KeyCode::BackTab,
        ("Esc", ..) => KeyCode::Esc,
        ("Delete", ..) => KeyCode::Delete,
        (_, Some(c), None) => KeyCode::Char(c),
        _ => KeyCode::Null,
    };

    (code, modifiers)
}

pub fn matches_key(event: KeyEvent, bindings: &[String]) -> bool {
    bindings.iter().any(|b| {
        let (code, modifiers) = parse_key_string(b);
        event.code == code && event.modifiers.contains(modifiers)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_modified_keys() {
        assert_eq!(
            parse_key_string("ctrl-s"),
            (KeyCode::Char('s'), KeyModifiers::CONTROL)
        );
        assert_eq!(
            parse_key_string("Backspace"),
            (KeyCode::Backspace, KeyModifiers::empty())
        );
        assert_eq!(
            parse_key_string(" "),
            (KeyCode::Char(' '), KeyModifiers::empty())
        );
        assert_eq!(
            parse_key_string("/"),
            (KeyCode::Char('/'), KeyModifiers::empty())
        );
        assert_eq!(
            parse_key_string("-"),
            (KeyCode::Char('-'), KeyModifiers::empty())
        );
        assert_eq!(
            parse_key_string("alt--"),
            (KeyCode::Char('-'), KeyModifiers::ALT)
        );
        assert_eq!(parse_key_string("Nope").0, KeyCode::Null);
    }

    #[test]
    fn bindings_match_events() {
        let bindings = keys(&["ctrl-s", "q"]);
        assert!(matches_key(
            KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL),
            &bindings
        ));
        assert!(matches_key(
            KeyEvent::new(KeyCode::Char('q'), KeyModifiers::empty()),
            &bindings
        ));
        assert!(!matches_key(
            KeyEvent::new(KeyCode::Char('s'), KeyModifiers::empty()),
            &bindings
        ));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            keywords = ["research"]

            [server]
            base_url = "https://inbox.example.edu"

            [keybindings]
            quit = ["ctrl-q"]
            "#,
        )
        .unwrap();
        assert_eq!(config.server.base_url, "https://inbox.example.edu");
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.keywords, vec!["research".to_string()]);
        assert_eq!(config.keybindings.quit, vec!["ctrl-q".to_string()]);
        assert_eq!(config.keybindings.move_up, vec!["k".to_string(), "Up".to_string()]);
        assert!(config.snapshot.is_none());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load_from(Path::new("does/not/exist.toml")).unwrap();
        assert_eq!(config.keywords.len(), 3);
        assert_eq!(config.server.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(Config::parse("keywords = 3").is_err());
    }
}
