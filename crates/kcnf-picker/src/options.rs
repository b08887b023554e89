use std::str::FromStr;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::error::PickerError;

pub const MIN_ROWS: u16 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Prompt at the bottom, list growing upwards.
    #[default]
    Default,
    /// Prompt at the top, list growing downwards.
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Height {
    Percent(u16),
    Rows(u16),
}

impl Default for Height {
    fn default() -> Self {
        Self::Percent(100)
    }
}

impl Height {
    /// Rows the picker occupies on a terminal with `terminal_rows` rows.
    pub fn rows(self, terminal_rows: u16) -> u16 {
        let wanted = match self {
            Self::Percent(percent) => {
                let scaled = u32::from(terminal_rows) * u32::from(percent) / 100;
                u16::try_from(scaled).unwrap_or(u16::MAX).max(MIN_ROWS)
            }
            Self::Rows(rows) => rows,
        };

        wanted.min(terminal_rows)
    }
}

impl FromStr for Height {
    type Err = PickerError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim();
        let invalid = |reason: &str| PickerError::invalid(format!("--height={value}"), reason);

        if let Some(percent) = value.strip_suffix('%') {
            let percent = percent
                .parse::<u16>()
                .map_err(|_| invalid("expected <1-100>% or a row count"))?;
            if !(1..=100).contains(&percent) {
                return Err(invalid("percentage must be between 1 and 100"));
            }
            return Ok(Self::Percent(percent));
        }

        let rows = value
            .parse::<u16>()
            .map_err(|_| invalid("expected <1-100>% or a row count"))?;
        if rows < MIN_ROWS {
            return Err(invalid("at least 3 rows are required"));
        }
        Ok(Self::Rows(rows))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewPosition {
    Up,
    Down,
    Left,
    #[default]
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewWindow {
    pub position: PreviewPosition,
    pub size_percent: u16,
    pub hidden: bool,
    pub wrap: bool,
}

impl Default for PreviewWindow {
    fn default() -> Self {
        Self {
            position: PreviewPosition::Right,
            size_percent: 50,
            hidden: false,
            wrap: false,
        }
    }
}

impl FromStr for PreviewWindow {
    type Err = PickerError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut window = Self::default();

        for token in raw.split(',').map(str::trim).filter(|token| !token.is_empty()) {
            match token {
                "hidden" => window.hidden = true,
                "nohidden" => window.hidden = false,
                "wrap" => window.wrap = true,
                "nowrap" => window.wrap = false,
                "up" | "top" => window.position = PreviewPosition::Up,
                "down" | "bottom" => window.position = PreviewPosition::Down,
                "left" => window.position = PreviewPosition::Left,
                "right" => window.position = PreviewPosition::Right,
                _ => {
                    let percent = token
                        .strip_suffix('%')
                        .and_then(|digits| digits.parse::<u16>().ok())
                        .filter(|percent| (1..100).contains(percent))
                        .ok_or_else(|| {
                            PickerError::invalid(
                                format!("--preview-window={raw}"),
                                format!("unknown token '{token}'"),
                            )
                        })?;
                    window.size_percent = percent;
                }
            }
        }

        Ok(window)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Accept,
    Abort,
    ClearQuery,
    Up,
    Down,
    TogglePreview,
}

impl FromStr for Action {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "accept" => Ok(Self::Accept),
            "abort" => Ok(Self::Abort),
            "clear-query" => Ok(Self::ClearQuery),
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "toggle-preview" => Ok(Self::TogglePreview),
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
    pub action: Action,
}

impl KeyBinding {
    pub fn matches(&self, event: &KeyEvent) -> bool {
        if self.code != event.code {
            return false;
        }
        // Terminals report shifted characters with or without SHIFT; only
        // CONTROL and ALT distinguish a binding.
        let relevant = KeyModifiers::CONTROL | KeyModifiers::ALT;
        (event.modifiers & relevant) == (self.modifiers & relevant)
    }

    fn parse(raw: &str) -> Result<Vec<Self>, PickerError> {
        let invalid = |reason: String| PickerError::invalid(format!("--bind={raw}"), reason);

        raw.split(',')
            .map(|chord_action| {
                let (chord, action) = chord_action
                    .split_once(':')
                    .ok_or_else(|| invalid(format!("expected KEY:ACTION, got '{chord_action}'")))?;
                let (code, modifiers) = parse_key(chord).ok_or_else(|| {
                    invalid(format!("unsupported key '{chord}'"))
                })?;
                let action = action.parse::<Action>().map_err(invalid)?;
                Ok(Self {
                    code,
                    modifiers,
                    action,
                })
            })
            .collect()
    }
}

fn parse_key(chord: &str) -> Option<(KeyCode, KeyModifiers)> {
    let chord = chord.trim();
    let named = match chord {
        "tab" => Some((KeyCode::Tab, KeyModifiers::NONE)),
        "btab" | "shift-tab" => Some((KeyCode::BackTab, KeyModifiers::SHIFT)),
        "enter" | "return" => Some((KeyCode::Enter, KeyModifiers::NONE)),
        "esc" => Some((KeyCode::Esc, KeyModifiers::NONE)),
        "space" => Some((KeyCode::Char(' '), KeyModifiers::NONE)),
        "up" => Some((KeyCode::Up, KeyModifiers::NONE)),
        "down" => Some((KeyCode::Down, KeyModifiers::NONE)),
        "left" => Some((KeyCode::Left, KeyModifiers::NONE)),
        "right" => Some((KeyCode::Right, KeyModifiers::NONE)),
        "home" => Some((KeyCode::Home, KeyModifiers::NONE)),
        "end" => Some((KeyCode::End, KeyModifiers::NONE)),
        "pgup" | "page-up" => Some((KeyCode::PageUp, KeyModifiers::NONE)),
        "pgdn" | "page-down" => Some((KeyCode::PageDown, KeyModifiers::NONE)),
        _ => None,
    };
    if named.is_some() {
        return named;
    }

    if let Some(function) = chord.strip_prefix('f') {
        if let Ok(number) = function.parse::<u8>() {
            return (1..=12)
                .contains(&number)
                .then_some((KeyCode::F(number), KeyModifiers::NONE));
        }
    }

    let (modifiers, rest) = if let Some(rest) = chord.strip_prefix("ctrl-") {
        (KeyModifiers::CONTROL, rest)
    } else if let Some(rest) = chord.strip_prefix("alt-") {
        (KeyModifiers::ALT, rest)
    } else {
        (KeyModifiers::NONE, chord)
    };

    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) if !ch.is_control() => Some((KeyCode::Char(ch), modifiers)),
        _ => None,
    }
}

/// Configuration of one picker run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerOptions {
    pub layout: Layout,
    pub height: Height,
    pub delimiter: String,
    /// 1-based field shown and matched against; the whole line when unset.
    pub with_nth: Option<usize>,
    pub query: String,
    pub bindings: Vec<KeyBinding>,
    pub preview: Option<String>,
    pub preview_window: PreviewWindow,
}

impl Default for PickerOptions {
    fn default() -> Self {
        Self {
            layout: Layout::Default,
            height: Height::default(),
            delimiter: "\t".to_string(),
            with_nth: None,
            query: String::new(),
            bindings: Vec::new(),
            preview: None,
            preview_window: PreviewWindow::default(),
        }
    }
}

impl PickerOptions {
    /// Parses fzf-style `--name=value` arguments. Later arguments override
    /// earlier ones, except `--bind` which accumulates.
    pub fn parse<I, S>(args: I) -> Result<Self, PickerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::default();

        for arg in args {
            let arg = arg.as_ref();
            let Some(body) = arg.strip_prefix("--") else {
                return Err(PickerError::invalid(arg, "expected --name=value"));
            };
            let (name, value) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (body, None),
            };

            match (name, value) {
                ("reverse", None) => options.layout = Layout::Reverse,
                ("layout", Some("reverse")) => options.layout = Layout::Reverse,
                ("layout", Some("default")) => options.layout = Layout::Default,
                ("height", Some(value)) => options.height = value.parse()?,
                ("delimiter", Some(value)) => options.delimiter = parse_delimiter(arg, value)?,
                ("with-nth", Some(value)) => options.with_nth = Some(parse_field_index(arg, value)?),
                ("query", Some(value)) => options.query = value.to_string(),
                ("bind", Some(value)) => options.bindings.extend(KeyBinding::parse(value)?),
                ("preview", Some(value)) => {
                    options.preview = Some(value.to_string()).filter(|cmd| !cmd.trim().is_empty());
                }
                ("preview-window", Some(value)) => options.preview_window = value.parse()?,
                _ => return Err(PickerError::invalid(arg, "unknown option or missing value")),
            }
        }

        Ok(options)
    }

    pub fn action_for(&self, event: &KeyEvent) -> Option<Action> {
        self.bindings
            .iter()
            .find(|binding| binding.matches(event))
            .map(|binding| binding.action)
    }
}

fn parse_delimiter(arg: &str, value: &str) -> Result<String, PickerError> {
    let delimiter = match value {
        "\\t" => "\t".to_string(),
        other => other.to_string(),
    };
    if delimiter.is_empty() {
        return Err(PickerError::invalid(arg, "delimiter must not be empty"));
    }
    Ok(delimiter)
}

fn parse_field_index(arg: &str, value: &str) -> Result<usize, PickerError> {
    value
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|index| *index >= 1)
        .ok_or_else(|| PickerError::invalid(arg, "expected a positive field index"))
}
