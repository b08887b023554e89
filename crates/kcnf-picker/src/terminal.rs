use std::io::{self, Stderr};
use std::time::Duration;

use crossbeam::channel::{Receiver, Sender, TryRecvError};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout as Split, Rect};
use ratatui::style::{Modifier, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListDirection, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal, TerminalOptions, Viewport};
use tracing::{debug, warn};

use crate::error::PickerError;
use crate::options::{Action, Layout, PickerOptions, PreviewPosition};
use crate::preview;
use crate::state::PickerState;

const TICK: Duration = Duration::from_millis(30);
const PROMPT: &str = "> ";

type InlineTerminal = Terminal<CrosstermBackend<Stderr>>;

/// Runs the picker until the user accepts or aborts.
///
/// Lines are read from `input` while the picker is running; the sender
/// closing marks the end of the candidate stream. The accepted line is sent
/// on `output` only after the terminal has been restored, and `output` is
/// dropped on return so the receiver observes completion either way.
pub fn run(
    options: &PickerOptions,
    input: Receiver<String>,
    output: Sender<String>,
) -> Result<(), PickerError> {
    let mut state = PickerState::new(options);

    let selection = {
        let mut session = Session::start(options)?;
        let outcome = event_loop(&mut session.terminal, options, &mut state, &input);
        session.restore()?;
        outcome?
    };
    drop(input);

    match selection {
        Some(line) => {
            debug!("picker accepted a line");
            if output.send(line).is_err() {
                warn!("selection receiver dropped before the picker finished");
            }
        }
        None => debug!("picker aborted without a selection"),
    }

    Ok(())
}

struct Session {
    terminal: InlineTerminal,
    restored: bool,
}

impl Session {
    fn start(options: &PickerOptions) -> Result<Self, PickerError> {
        let (_, terminal_rows) = crossterm::terminal::size()?;
        let rows = options.height.rows(terminal_rows);

        enable_raw_mode()?;
        let terminal = Terminal::with_options(
            CrosstermBackend::new(io::stderr()),
            TerminalOptions {
                viewport: Viewport::Inline(rows),
            },
        );

        match terminal {
            Ok(terminal) => Ok(Self {
                terminal,
                restored: false,
            }),
            Err(error) => {
                let _ = disable_raw_mode();
                Err(error.into())
            }
        }
    }

    fn restore(&mut self) -> Result<(), PickerError> {
        self.restored = true;
        let cleared = self.clear_viewport();
        disable_raw_mode()?;
        cleared
    }

    fn clear_viewport(&mut self) -> Result<(), PickerError> {
        self.terminal.clear()?;
        let area = self.terminal.get_frame().area();
        self.terminal.set_cursor_position((area.x, area.y))?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.restored {
            let _ = self.clear_viewport();
            let _ = disable_raw_mode();
        }
    }
}

enum Input {
    Action(Action),
    Char(char),
    Backspace,
}

fn key_input(options: &PickerOptions, key: &KeyEvent) -> Option<Input> {
    if let Some(action) = options.action_for(key) {
        return Some(Input::Action(action));
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    let input = match key.code {
        KeyCode::Enter => Input::Action(Action::Accept),
        KeyCode::Esc => Input::Action(Action::Abort),
        KeyCode::Up => Input::Action(Action::Up),
        KeyCode::Down => Input::Action(Action::Down),
        KeyCode::Backspace => Input::Backspace,
        KeyCode::Char(ch) if ctrl => match ch {
            'c' | 'g' | 'q' => Input::Action(Action::Abort),
            'u' => Input::Action(Action::ClearQuery),
            'k' | 'p' => Input::Action(Action::Up),
            'j' | 'n' => Input::Action(Action::Down),
            'h' => Input::Backspace,
            _ => return None,
        },
        KeyCode::Char(ch) if !alt => Input::Char(ch),
        _ => return None,
    };

    Some(input)
}

fn event_loop(
    terminal: &mut InlineTerminal,
    options: &PickerOptions,
    state: &mut PickerState,
    input: &Receiver<String>,
) -> Result<Option<String>, PickerError> {
    let mut preview_visible = options.preview.is_some() && !options.preview_window.hidden;
    let mut preview_cache: Option<(String, Text<'static>)> = None;
    let mut dirty = true;

    loop {
        if !state.input_closed() {
            let mut batch = Vec::new();
            loop {
                match input.try_recv() {
                    Ok(line) => batch.push(line),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        state.close_input();
                        dirty = true;
                        break;
                    }
                }
            }
            if !batch.is_empty() {
                state.extend(batch);
                dirty = true;
            }
        }

        if dirty {
            let preview_text = if preview_visible {
                refresh_preview(options, state, &mut preview_cache)
            } else {
                None
            };
            terminal.draw(|frame| draw(frame, options, state, preview_text))?;
            dirty = false;
        }

        if !event::poll(TICK)? {
            continue;
        }

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let Some(input) = key_input(options, &key) else {
                    continue;
                };
                dirty = true;
                match input {
                    Input::Char(ch) => state.push_char(ch),
                    Input::Backspace => state.pop_char(),
                    Input::Action(Action::Accept) => {
                        return Ok(state.selected_line().map(str::to_string));
                    }
                    Input::Action(Action::Abort) => return Ok(None),
                    Input::Action(Action::ClearQuery) => state.clear_query(),
                    Input::Action(Action::TogglePreview) => {
                        preview_visible = options.preview.is_some() && !preview_visible;
                    }
                    Input::Action(Action::Up) => match options.layout {
                        Layout::Reverse => state.select_previous(),
                        Layout::Default => state.select_next(),
                    },
                    Input::Action(Action::Down) => match options.layout {
                        Layout::Reverse => state.select_next(),
                        Layout::Default => state.select_previous(),
                    },
                }
            }
            Event::Resize(..) => dirty = true,
            _ => {}
        }
    }
}

fn refresh_preview<'a>(
    options: &PickerOptions,
    state: &PickerState,
    cache: &'a mut Option<(String, Text<'static>)>,
) -> Option<&'a Text<'static>> {
    let template = options.preview.as_deref()?;
    let Some(line) = state.selected_line() else {
        *cache = None;
        return None;
    };

    let command = preview::expand_placeholders(template, line, &options.delimiter);
    let stale = cache.as_ref().is_none_or(|(cached, _)| *cached != command);
    if stale {
        let text = preview::render(&command)
            .unwrap_or_else(|error| Text::raw(error.to_string()).red());
        *cache = Some((command, text));
    }

    cache.as_ref().map(|(_, text)| text)
}

fn draw(
    frame: &mut Frame<'_>,
    options: &PickerOptions,
    state: &PickerState,
    preview_text: Option<&Text<'static>>,
) {
    let area = frame.area();

    let (list_area, preview_area) = match preview_text {
        Some(_) => split_preview(area, options),
        None => (area, None),
    };

    let constraints = match options.layout {
        Layout::Reverse => [Constraint::Length(1), Constraint::Length(1), Constraint::Fill(1)],
        Layout::Default => [Constraint::Fill(1), Constraint::Length(1), Constraint::Length(1)],
    };
    let rows = Split::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(list_area);
    let (prompt_area, info_area, items_area) = match options.layout {
        Layout::Reverse => (rows[0], rows[1], rows[2]),
        Layout::Default => (rows[2], rows[1], rows[0]),
    };

    let prompt = Line::from(vec![Span::raw(PROMPT).bold(), Span::raw(state.query())]);
    frame.render_widget(Paragraph::new(prompt), prompt_area);
    let cursor_x = prompt_area.x + (PROMPT.chars().count() + state.query().chars().count()) as u16;
    frame.set_cursor_position((cursor_x.min(prompt_area.right().saturating_sub(1)), prompt_area.y));

    let loading = if state.input_closed() { "" } else { " (loading)" };
    let info = format!("  {}/{}{loading}", state.matches().len(), state.total());
    frame.render_widget(Paragraph::new(info).dim(), info_area);

    let items: Vec<ListItem<'_>> = state
        .matches()
        .iter()
        .map(|matched| ListItem::new(highlighted(state.display(matched.index), &matched.positions)))
        .collect();
    let direction = match options.layout {
        Layout::Reverse => ListDirection::TopToBottom,
        Layout::Default => ListDirection::BottomToTop,
    };
    let list = List::new(items)
        .direction(direction)
        .highlight_symbol("> ")
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));
    let mut list_state = ListState::default();
    list_state.select((!state.matches().is_empty()).then_some(state.cursor()));
    frame.render_stateful_widget(list, items_area, &mut list_state);

    if let (Some(text), Some(preview_area)) = (preview_text, preview_area) {
        let title = state
            .selected_line()
            .map(|line| format!(" {} ", state_title(line, options)))
            .unwrap_or_default();
        let mut paragraph = Paragraph::new(text.clone())
            .block(Block::default().borders(Borders::ALL).title(title));
        if options.preview_window.wrap {
            paragraph = paragraph.wrap(Wrap { trim: false });
        }
        frame.render_widget(paragraph, preview_area);
    }
}

fn split_preview(area: Rect, options: &PickerOptions) -> (Rect, Option<Rect>) {
    let size = options.preview_window.size_percent;
    let rest = 100 - size;
    let (direction, preview_first) = match options.preview_window.position {
        PreviewPosition::Right => (Direction::Horizontal, false),
        PreviewPosition::Left => (Direction::Horizontal, true),
        PreviewPosition::Down => (Direction::Vertical, false),
        PreviewPosition::Up => (Direction::Vertical, true),
    };

    let constraints = if preview_first {
        [Constraint::Percentage(size), Constraint::Percentage(rest)]
    } else {
        [Constraint::Percentage(rest), Constraint::Percentage(size)]
    };
    let parts = Split::default()
        .direction(direction)
        .constraints(constraints)
        .split(area);

    if preview_first {
        (parts[1], Some(parts[0]))
    } else {
        (parts[0], Some(parts[1]))
    }
}

fn state_title<'a>(line: &'a str, options: &PickerOptions) -> &'a str {
    crate::state::field(line, &options.delimiter, 1).unwrap_or(line)
}

fn highlighted<'a>(text: &'a str, positions: &[usize]) -> Line<'a> {
    if positions.is_empty() {
        return Line::raw(text);
    }

    let mut spans = Vec::new();
    let mut run = String::new();
    let mut run_matched = false;

    for (index, ch) in text.chars().enumerate() {
        let matched = positions.binary_search(&index).is_ok();
        if matched != run_matched && !run.is_empty() {
            spans.push(styled_run(std::mem::take(&mut run), run_matched));
        }
        run_matched = matched;
        run.push(ch);
    }
    if !run.is_empty() {
        spans.push(styled_run(run, run_matched));
    }

    Line::from(spans)
}

fn styled_run(text: String, matched: bool) -> Span<'static> {
    if matched {
        Span::raw(text).green().bold()
    } else {
        Span::raw(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn default_keys_map_to_editing_and_actions() {
        let options = PickerOptions::default();

        assert!(matches!(
            key_input(&options, &key(KeyCode::Char('a'), KeyModifiers::NONE)),
            Some(Input::Char('a'))
        ));
        assert!(matches!(
            key_input(&options, &key(KeyCode::Char('A'), KeyModifiers::SHIFT)),
            Some(Input::Char('A'))
        ));
        assert!(matches!(
            key_input(&options, &key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Input::Action(Action::Abort))
        ));
        assert!(matches!(
            key_input(&options, &key(KeyCode::Enter, KeyModifiers::NONE)),
            Some(Input::Action(Action::Accept))
        ));
        assert!(matches!(
            key_input(&options, &key(KeyCode::Backspace, KeyModifiers::NONE)),
            Some(Input::Backspace)
        ));
        assert!(key_input(&options, &key(KeyCode::Tab, KeyModifiers::NONE)).is_none());
    }

    #[test]
    fn bound_keys_take_precedence_over_defaults() {
        let options =
            PickerOptions::parse(["--bind=tab:toggle-preview,ctrl-c:clear-query"]).expect("bind");

        assert!(matches!(
            key_input(&options, &key(KeyCode::Tab, KeyModifiers::NONE)),
            Some(Input::Action(Action::TogglePreview))
        ));
        assert!(matches!(
            key_input(&options, &key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Input::Action(Action::ClearQuery))
        ));
    }

    #[test]
    fn highlighted_splits_matched_runs() {
        let line = highlighted("prod-eu", &[0, 1, 5]);
        let parts: Vec<&str> = line.spans.iter().map(|span| span.content.as_ref()).collect();

        assert_eq!(parts, vec!["pr", "od-", "e", "u"]);
    }

    #[test]
    fn preview_split_honours_position_and_size() {
        let area = Rect::new(0, 0, 100, 20);
        let options = PickerOptions::parse(["--preview-window=75%"]).expect("window");

        let (list, preview) = split_preview(area, &options);
        let preview = preview.expect("preview area");

        assert_eq!(list.width, 25);
        assert_eq!(preview.width, 75);
        assert_eq!(preview.x, 25);
    }
}
