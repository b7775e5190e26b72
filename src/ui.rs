use std::io::{stdout, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use color_eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Terminal,
};
use tracing::warn;
use unicode_width::UnicodeWidthChar;

use crate::entry::JournalEntry;
use crate::store::JournalStore;

pub enum Action {
    Write,
    View,
    Search,
    OnThisDay,
    Sync,
    Pull,
    Quit,
}

/// Everything the entry form collects before an entry is assembled.
#[derive(Debug)]
pub struct EntryDraft {
    pub note: String,
    pub tags: Vec<String>,
    pub date: DateTime<Local>,
    pub photo_path: Option<PathBuf>,
    pub coords: Option<(f64, f64)>,
}

pub struct UI {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    cursor_position: usize,
    cursor_visible: bool,
    last_cursor_update: Instant,
}

impl UI {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;

        Ok(UI {
            terminal,
            cursor_position: 0,
            cursor_visible: true,
            last_cursor_update: Instant::now(),
        })
    }

    /// Main screen: entries grouped into month sections, newest first.
    pub fn display(&mut self, store: &JournalStore) -> Result<()> {
        let sections = store.monthly_sections();
        let empty = store.entries().is_empty();

        self.terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(1)
                .constraints(
                    [
                        Constraint::Length(3),
                        Constraint::Min(0),
                        Constraint::Length(3),
                    ]
                    .as_ref(),
                )
                .split(f.area());

            let title = Paragraph::new("Daybook")
                .style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
                .alignment(Alignment::Center);
            f.render_widget(title, chunks[0]);

            let width = chunks[1].width.saturating_sub(4) as usize;
            let mut items: Vec<ListItem> = Vec::new();
            for (month, entries) in &sections {
                items.push(ListItem::new(Line::from(Span::styled(
                    month.clone(),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))));
                for entry in entries {
                    items.push(entry_list_item(entry, width));
                }
            }
            let entries_list =
                List::new(items).block(Block::default().borders(Borders::ALL).title("Entries"));
            f.render_widget(entries_list, chunks[1]);

            let controls = if empty {
                Line::from(vec![
                    Span::raw("Press "),
                    Span::styled("w", Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(" to write, "),
                    Span::styled("q", Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(" to quit"),
                ])
            } else {
                Line::from(vec![
                    Span::raw("Press "),
                    Span::styled("w", Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(" to write, "),
                    Span::styled("v", Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(" to view, "),
                    Span::styled("s", Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(" to search, "),
                    Span::styled("t", Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(" for on this day, "),
                    Span::styled("y", Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(" to sync, "),
                    Span::styled("p", Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(" to pull, "),
                    Span::styled("q", Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(" to quit"),
                ])
            };
            let controls_paragraph = Paragraph::new(controls)
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center);
            f.render_widget(controls_paragraph, chunks[2]);
        })?;

        Ok(())
    }

    pub fn handle_input(&self, store: &JournalStore) -> Result<Option<Action>> {
        if let Event::Key(key) = event::read()? {
            let has_entries = !store.entries().is_empty();
            match key.code {
                KeyCode::Char('w') => Ok(Some(Action::Write)),
                KeyCode::Char('q') => Ok(Some(Action::Quit)),
                KeyCode::Char('v') if has_entries => Ok(Some(Action::View)),
                KeyCode::Char('s') if has_entries => Ok(Some(Action::Search)),
                KeyCode::Char('t') if has_entries => Ok(Some(Action::OnThisDay)),
                KeyCode::Char('y') => Ok(Some(Action::Sync)),
                KeyCode::Char('p') => Ok(Some(Action::Pull)),
                _ => Ok(None),
            }
        } else {
            Ok(None)
        }
    }

    /// Run the entry form: a multi-line note editor followed by one-line
    /// prompts for tags, date, photo, and location. Unparseable date or
    /// location input is logged and treated as absent.
    pub fn get_new_entry(&mut self) -> Result<EntryDraft> {
        let note = self.edit_note()?;
        let tags_raw = self.prompt_line(
            "New Entry",
            "Tags (comma-separated)",
            "Enter: Continue, Esc: Skip",
        )?;
        let date_raw = self.prompt_line(
            "New Entry",
            "Entry date (YYYY-MM-DD, blank for today)",
            "Enter: Continue, Esc: Skip",
        )?;
        let photo_raw = self.prompt_line(
            "New Entry",
            "Photo file to attach (blank for none)",
            "Enter: Continue, Esc: Skip",
        )?;
        let coords_raw = self.prompt_line(
            "New Entry",
            "Location as lat,lon (blank for none)",
            "Enter: Save entry, Esc: Skip",
        )?;

        let tags: Vec<String> = tags_raw
            .split(',')
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();

        let date = if date_raw.trim().is_empty() {
            Local::now()
        } else {
            match parse_date(date_raw.trim()) {
                Some(day) => local_datetime_on(day),
                None => {
                    warn!(input = %date_raw, "unparseable entry date; using today");
                    Local::now()
                }
            }
        };

        let photo_path = {
            let trimmed = photo_raw.trim();
            (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
        };

        let coords = {
            let trimmed = coords_raw.trim();
            if trimmed.is_empty() {
                None
            } else {
                let parsed = parse_coords(trimmed);
                if parsed.is_none() {
                    warn!(input = %coords_raw, "unparseable location; dropping it");
                }
                parsed
            }
        };

        Ok(EntryDraft {
            note,
            tags,
            date,
            photo_path,
            coords,
        })
    }

    pub fn view_entries(&mut self, store: &JournalStore) -> Result<()> {
        let mut entries = store.entries().to_vec();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        self.browse_entries("View Entries", &entries)
    }

    /// Selectable list of entries; Enter opens the full entry.
    pub fn browse_entries(&mut self, title: &str, entries: &[JournalEntry]) -> Result<()> {
        if entries.is_empty() {
            return self.show_message(title, "No entries.");
        }
        let mut selected_index = 0;

        loop {
            self.terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .margin(1)
                    .constraints(
                        [
                            Constraint::Length(3),
                            Constraint::Min(10),
                            Constraint::Length(3),
                        ]
                        .as_ref(),
                    )
                    .split(f.area());

                let heading = Paragraph::new(title.to_string())
                    .style(
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    )
                    .alignment(Alignment::Center);
                f.render_widget(heading, chunks[0]);

                let width = chunks[1].width.saturating_sub(4) as usize;
                let items: Vec<ListItem> = entries
                    .iter()
                    .map(|entry| entry_list_item(entry, width))
                    .collect();

                let entries_list = List::new(items)
                    .block(Block::default().borders(Borders::ALL).title("Entries"))
                    .highlight_style(Style::default().add_modifier(Modifier::BOLD))
                    .highlight_symbol("> ");

                f.render_stateful_widget(
                    entries_list,
                    chunks[1],
                    &mut ListState::default().with_selected(Some(selected_index)),
                );

                let instructions =
                    Paragraph::new("Up/Down: Navigate, Enter: View full entry, Esc: Back")
                        .style(Style::default().fg(Color::Yellow))
                        .alignment(Alignment::Center);
                f.render_widget(instructions, chunks[2]);
            })?;

            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Up => selected_index = selected_index.saturating_sub(1),
                    KeyCode::Down => {
                        if selected_index + 1 < entries.len() {
                            selected_index += 1;
                        }
                    }
                    KeyCode::Enter => {
                        self.view_full_entry(&entries[selected_index])?;
                    }
                    KeyCode::Esc => break,
                    _ => {}
                }
            }
        }

        Ok(())
    }

    fn view_full_entry(&mut self, entry: &JournalEntry) -> Result<()> {
        let details = entry_details(entry);
        let title = format!("Entry from {}", entry.date.format("%Y-%m-%d %H:%M"));
        let note = entry.note.clone().unwrap_or_default();

        loop {
            self.terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .margin(1)
                    .constraints(
                        [
                            Constraint::Length(3),
                            Constraint::Min(8),
                            Constraint::Length(7),
                            Constraint::Length(3),
                        ]
                        .as_ref(),
                    )
                    .split(f.area());

                let heading = Paragraph::new(title.clone())
                    .style(
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    )
                    .alignment(Alignment::Center);
                f.render_widget(heading, chunks[0]);

                let note_paragraph = Paragraph::new(note.clone())
                    .block(Block::default().borders(Borders::ALL).title("Note"));
                f.render_widget(note_paragraph, chunks[1]);

                let details_paragraph = Paragraph::new(details.join("\n"))
                    .block(Block::default().borders(Borders::ALL).title("Details"));
                f.render_widget(details_paragraph, chunks[2]);

                let instructions = Paragraph::new("Esc: Back")
                    .style(Style::default().fg(Color::Yellow))
                    .alignment(Alignment::Center);
                f.render_widget(instructions, chunks[3]);
            })?;

            if let Event::Key(_) = event::read()? {
                break;
            }
        }

        Ok(())
    }

    pub fn get_search_query(&mut self) -> Result<String> {
        self.prompt_line("Search Entries", "Search Query", "Enter: Submit, Esc: Cancel")
    }

    /// Show a status line and wait for any key.
    pub fn show_message(&mut self, title: &str, body: &str) -> Result<()> {
        self.draw_form(title, "Status", body, "Press any key to continue")?;
        loop {
            if let Event::Key(_) = event::read()? {
                break;
            }
        }
        Ok(())
    }

    /// Multi-line note editor with a blinking cursor bar.
    fn edit_note(&mut self) -> Result<String> {
        let mut note = String::new();
        self.cursor_position = 0;
        let mut last_edit = Instant::now();

        loop {
            let now = Instant::now();
            let should_blink =
                now.duration_since(self.last_cursor_update) >= Duration::from_millis(500);
            let should_redraw =
                should_blink || now.duration_since(last_edit) < Duration::from_millis(50);

            if should_redraw {
                let shown = if self.cursor_visible {
                    let mut with_cursor = note.clone();
                    with_cursor.insert(self.cursor_position, '|');
                    with_cursor
                } else {
                    note.clone()
                };
                self.draw_form("New Entry", "Note", &shown, "Press Esc to continue")?;

                if should_blink {
                    self.cursor_visible = !self.cursor_visible;
                    self.last_cursor_update = now;
                }
            }

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    match key.code {
                        KeyCode::Esc => break,
                        KeyCode::Char(c) => {
                            note.insert(self.cursor_position, c);
                            self.cursor_position += c.len_utf8();
                            last_edit = Instant::now();
                        }
                        KeyCode::Enter => {
                            note.insert(self.cursor_position, '\n');
                            self.cursor_position += 1;
                            last_edit = Instant::now();
                        }
                        KeyCode::Backspace => {
                            if self.cursor_position > 0 {
                                let prev = prev_char_boundary(&note, self.cursor_position);
                                note.remove(prev);
                                self.cursor_position = prev;
                                last_edit = Instant::now();
                            }
                        }
                        KeyCode::Delete => {
                            if self.cursor_position < note.len() {
                                note.remove(self.cursor_position);
                                last_edit = Instant::now();
                            }
                        }
                        KeyCode::Left => {
                            if self.cursor_position > 0 {
                                self.cursor_position =
                                    prev_char_boundary(&note, self.cursor_position);
                            }
                        }
                        KeyCode::Right => {
                            if self.cursor_position < note.len() {
                                self.cursor_position =
                                    next_char_boundary(&note, self.cursor_position);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        Ok(note)
    }

    /// One-line input; Enter submits, Esc leaves the field blank.
    fn prompt_line(&mut self, title: &str, field: &str, footer: &str) -> Result<String> {
        let mut value = String::new();
        loop {
            self.draw_form(title, field, &value, footer)?;
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Enter => break,
                    KeyCode::Esc => {
                        value.clear();
                        break;
                    }
                    KeyCode::Char(c) => value.push(c),
                    KeyCode::Backspace => {
                        value.pop();
                    }
                    _ => {}
                }
            }
        }
        Ok(value)
    }

    fn draw_form(&mut self, title: &str, body_title: &str, body: &str, footer: &str) -> Result<()> {
        self.terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(1)
                .constraints(
                    [
                        Constraint::Length(3),
                        Constraint::Min(10),
                        Constraint::Length(3),
                    ]
                    .as_ref(),
                )
                .split(f.area());

            let heading = Paragraph::new(title.to_string())
                .style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
                .alignment(Alignment::Center);
            f.render_widget(heading, chunks[0]);

            let input = Paragraph::new(body.to_string()).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(body_title.to_string()),
            );
            f.render_widget(input, chunks[1]);

            let instructions = Paragraph::new(footer.to_string())
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center);
            f.render_widget(instructions, chunks[2]);
        })?;
        Ok(())
    }
}

impl Drop for UI {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

fn entry_list_item(entry: &JournalEntry, width: usize) -> ListItem<'static> {
    let first_line = entry
        .note
        .as_deref()
        .unwrap_or("(no text)")
        .lines()
        .next()
        .unwrap_or("")
        .to_string();
    let heading = truncate_to_width(
        &format!("[{}] {}", entry.date.format("%Y-%m-%d %H:%M"), first_line),
        width,
    );

    let mut lines = vec![Line::from(Span::raw(heading))];
    let mut details = Vec::new();
    if let Some(tags) = &entry.tags {
        if !tags.is_empty() {
            details.push(format!("Tags: {}", tags.join(", ")));
        }
    }
    if entry.image_path.is_some() {
        details.push("(photo)".to_string());
    }
    if !details.is_empty() {
        lines.push(Line::from(Span::raw(format!(
            "  {}",
            truncate_to_width(&details.join("  "), width)
        ))));
    }
    ListItem::new(lines)
}

fn entry_details(entry: &JournalEntry) -> Vec<String> {
    let mut details = vec![
        format!("Created: {}", entry.created_at.format("%Y-%m-%d %H:%M")),
        format!(
            "Tags: {}",
            entry
                .tags
                .as_ref()
                .map(|tags| tags.join(", "))
                .unwrap_or_else(|| "-".to_string())
        ),
        format!(
            "Location: {}",
            match (entry.latitude, entry.longitude) {
                (Some(lat), Some(lon)) => format!("{lat:.4}, {lon:.4}"),
                _ => "-".to_string(),
            }
        ),
        format!("Photo: {}", entry.image_path.as_deref().unwrap_or("-")),
        format!("Synced: {}", if entry.synced { "yes" } else { "no" }),
    ];
    if let Some(record) = &entry.remote_record_id {
        details.push(format!("Remote record: {record}"));
    }
    details
}

fn prev_char_boundary(text: &str, index: usize) -> usize {
    text[..index]
        .char_indices()
        .next_back()
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn next_char_boundary(text: &str, index: usize) -> usize {
    text[index..]
        .chars()
        .next()
        .map(|c| index + c.len_utf8())
        .unwrap_or(index)
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    let mut width = 0usize;
    let mut out = String::new();
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + w > max_width {
            out.push('…');
            break;
        }
        width += w;
        out.push(ch);
    }
    out
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn parse_coords(raw: &str) -> Option<(f64, f64)> {
    let (lat, lon) = raw.split_once(',')?;
    Some((lat.trim().parse().ok()?, lon.trim().parse().ok()?))
}

/// The chosen calendar day at the current local time of day.
fn local_datetime_on(day: NaiveDate) -> DateTime<Local> {
    let at = day.and_time(Local::now().time());
    Local
        .from_local_datetime(&at)
        .earliest()
        .unwrap_or_else(Local::now)
}
