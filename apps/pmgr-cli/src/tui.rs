//! Terminal form for placeholder values.
//!
//! When a run needs values that were not given on the command line, this
//! ratatui form asks for every text placeholder and file path at once.
//! Enter submits, Esc cancels, Tab and the arrow keys move between fields.

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use pmgr_pm::{PlaceholderKind, PlaceholderValues, PromptError, ProvidedValues, ValueProvider};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use std::io;

/// One editable row of the form.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    kind: PlaceholderKind,
    name: String,
    value: String,
}

/// What the last key did to the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormStatus {
    Editing,
    Submitted,
    Cancelled,
}

/// Form state, independent of the terminal.
#[derive(Debug)]
struct FormState {
    title: String,
    fields: Vec<Field>,
    selected: usize,
    status: FormStatus,
}

impl FormState {
    fn new(
        title: impl Into<String>,
        text_names: &[String],
        file_names: &[String],
        prefill: &PlaceholderValues,
    ) -> Self {
        let text = text_names.iter().map(|name| Field {
            kind: PlaceholderKind::Text,
            name: name.clone(),
            value: prefill.text(name).unwrap_or_default().to_string(),
        });
        let files = file_names.iter().map(|name| Field {
            kind: PlaceholderKind::File,
            name: name.clone(),
            value: prefill
                .file(name)
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        });

        Self {
            title: title.into(),
            fields: text.chain(files).collect(),
            selected: 0,
            status: FormStatus::Editing,
        }
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        let count = self.fields.len();
        match code {
            KeyCode::Esc => self.status = FormStatus::Cancelled,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.status = FormStatus::Cancelled
            }
            KeyCode::Enter => self.status = FormStatus::Submitted,
            KeyCode::Tab | KeyCode::Down if count > 0 => {
                self.selected = (self.selected + 1) % count;
            }
            KeyCode::BackTab | KeyCode::Up if count > 0 => {
                self.selected = (self.selected + count - 1) % count;
            }
            KeyCode::Backspace => {
                if let Some(field) = self.fields.get_mut(self.selected) {
                    field.value.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(field) = self.fields.get_mut(self.selected) {
                    field.value.push(c);
                }
            }
            _ => {}
        }
    }

    /// Collected values. Empty text values are still supplied; empty file
    /// paths are left out so they resolve to the missing-file marker.
    fn values(&self) -> PlaceholderValues {
        self.fields
            .iter()
            .fold(PlaceholderValues::new(), |values, field| match field.kind {
                PlaceholderKind::File if field.value.trim().is_empty() => values,
                PlaceholderKind::File => values.with_file(&field.name, field.value.trim()),
                _ => values.with_text(&field.name, &field.value),
            })
    }
}

/// Value provider backed by the terminal form.
#[derive(Debug)]
pub struct FormProvider {
    title: String,
    prefill: PlaceholderValues,
}

impl FormProvider {
    /// Creates a form titled after the template, pre-filled with `prefill`.
    pub fn new(title: impl Into<String>, prefill: PlaceholderValues) -> Self {
        Self {
            title: title.into(),
            prefill,
        }
    }
}

impl ValueProvider for FormProvider {
    fn provide(
        &mut self,
        text_names: &[String],
        file_names: &[String],
    ) -> pmgr_pm::Result<ProvidedValues> {
        let mut state = FormState::new(&self.title, text_names, file_names, &self.prefill);
        run_form(&mut state).map_err(|e| PromptError::ProviderFailed(format!("{:#}", e)))?;

        Ok(match state.status {
            FormStatus::Submitted => ProvidedValues::Values(state.values()),
            _ => ProvidedValues::Cancelled,
        })
    }
}

/// Runs the form until it is submitted or cancelled.
fn run_form(state: &mut FormState) -> Result<()> {
    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let result = run_app(&mut terminal, state);

    // Restore terminal
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    result
}

/// Run the main form loop
fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    state: &mut FormState,
) -> Result<()> {
    while state.status == FormStatus::Editing {
        terminal
            .draw(|f| ui(f, state))
            .map_err(|e| anyhow::anyhow!("Failed to draw UI: {}", e))?;

        if let Event::Key(key) = event::read().context("Failed to read event")?
            && key.kind == KeyEventKind::Press
        {
            state.handle_key(key.code, key.modifiers);
        }
    }

    Ok(())
}

/// Render the form
fn ui(frame: &mut Frame, state: &FormState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(5),    // Fields
            Constraint::Length(3), // Key help
        ])
        .split(frame.area());

    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            "Placeholder values - ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            state.title.as_str(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, chunks[0]);

    let lines: Vec<Line> = state
        .fields
        .iter()
        .enumerate()
        .map(|(i, field)| field_line(field, i == state.selected))
        .collect();
    let fields = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Fields"))
        .wrap(Wrap { trim: false });
    frame.render_widget(fields, chunks[1]);

    let help = Paragraph::new("Enter submit · Esc cancel · Tab/↑/↓ move")
        .style(Style::default().fg(Color::Green))
        .block(Block::default().borders(Borders::ALL).title("Keys"));
    frame.render_widget(help, chunks[2]);
}

fn field_line(field: &Field, selected: bool) -> Line<'_> {
    let label = match field.kind {
        PlaceholderKind::File => format!("{} (file path)", field.name),
        _ => field.name.clone(),
    };
    let label_style = if selected {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let cursor = if selected { "_" } else { "" };

    Line::from(vec![
        Span::styled(format!("{label}: "), label_style),
        Span::raw(field.value.as_str()),
        Span::styled(cursor, Style::default().add_modifier(Modifier::SLOW_BLINK)),
    ])
}
