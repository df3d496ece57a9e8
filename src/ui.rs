use crate::cache::CachedEmail;
use crate::chat::ChatRole;
use crate::inbox::{CheckState, ClassificationResult, DetailView, Session};
use crate::models::{EmailDraft, Theme};
use crate::notify::NotificationKind;
use crate::tags::{badge_spans, render_badge, render_tags};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use tui_textarea::TextArea;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum FocusedPanel {
    Folders,
    #[default]
    Emails,
    Details,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Confirm {
    DeleteEmail,
    ProcessUntagged,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UIMode {
    Browsing,
    Composing,
    Categories,
    Chatting,
    Searching,
    Confirming(Confirm),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum ComposeField {
    #[default]
    SenderName,
    SenderEmail,
    Recipients,
    Subject,
    Content,
}

impl ComposeField {
    const ORDER: [ComposeField; 5] = [
        ComposeField::SenderName,
        ComposeField::SenderEmail,
        ComposeField::Recipients,
        ComposeField::Subject,
        ComposeField::Content,
    ];

    fn index(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ORDER[(self.index() + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        Self::ORDER[(self.index() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    fn title(self) -> &'static str {
        match self {
            ComposeField::SenderName => " Your Name ",
            ComposeField::SenderEmail => " Your Email ",
            ComposeField::Recipients => " To ",
            ComposeField::Subject => " Subject ",
            ComposeField::Content => " Message [Esc to Cancel, Ctrl-S to Send, Tab to Switch] ",
        }
    }
}

fn input_area<'a>(text: &str) -> TextArea<'a> {
    let mut area = TextArea::from(text.lines());
    area.set_cursor_line_style(Style::default());
    area
}

fn text_of(area: &TextArea<'_>) -> String {
    area.lines().join("\n")
}

pub struct ComposeState<'a> {
    pub sender_name: TextArea<'a>,
    pub sender_email: TextArea<'a>,
    pub recipients: TextArea<'a>,
    pub subject: TextArea<'a>,
    pub content: TextArea<'a>,
    pub focused_field: ComposeField,
}

impl<'a> Default for ComposeState<'a> {
    fn default() -> Self {
        Self {
            sender_name: input_area(""),
            sender_email: input_area(""),
            recipients: input_area(""),
            subject: input_area(""),
            content: input_area(""),
            focused_field: ComposeField::SenderName,
        }
    }
}

impl<'a> ComposeState<'a> {
    pub fn field(&self, field: ComposeField) -> &TextArea<'a> {
        match field {
            ComposeField::SenderName => &self.sender_name,
            ComposeField::SenderEmail => &self.sender_email,
            ComposeField::Recipients => &self.recipients,
            ComposeField::Subject => &self.subject,
            ComposeField::Content => &self.content,
        }
    }

    pub fn focused_textarea(&mut self) -> &mut TextArea<'a> {
        match self.focused_field {
            ComposeField::SenderName => &mut self.sender_name,
            ComposeField::SenderEmail => &mut self.sender_email,
            ComposeField::Recipients => &mut self.recipients,
            ComposeField::Subject => &mut self.subject,
            ComposeField::Content => &mut self.content,
        }
    }

    pub fn draft(&self) -> EmailDraft {
        EmailDraft {
            sender_name: text_of(&self.sender_name),
            sender_email: text_of(&self.sender_email),
            recipients: text_of(&self.recipients),
            subject: text_of(&self.subject),
            content: text_of(&self.content),
        }
    }
}

/// Category showcase popup: existing categories plus the add input.
pub struct CategoryPanel<'a> {
    pub input: TextArea<'a>,
    pub selected: usize,
}

impl<'a> Default for CategoryPanel<'a> {
    fn default() -> Self {
        let mut input = input_area("");
        input.set_placeholder_text("New category");
        Self { input, selected: 0 }
    }
}

pub struct UIState<'a> {
    pub focused_panel: FocusedPanel,
    pub mode: UIMode,
    pub emails_list_state: ListState,
    pub detail_scroll: u16,
    pub chat_scroll: u16,
    pub compose_state: Option<ComposeState<'a>>,
    pub category_panel: CategoryPanel<'a>,
    pub chat_input: TextArea<'a>,
    pub search_input: TextArea<'a>,
}

fn chat_input<'a>() -> TextArea<'a> {
    let mut area = input_area("");
    area.set_placeholder_text("Ask about this email");
    area
}

fn search_input<'a>() -> TextArea<'a> {
    let mut area = input_area("");
    area.set_placeholder_text("Search subject, content or sender");
    area
}

impl<'a> Default for UIState<'a> {
    fn default() -> Self {
        Self {
            focused_panel: FocusedPanel::Emails,
            mode: UIMode::Browsing,
            emails_list_state: ListState::default(),
            detail_scroll: 0,
            chat_scroll: 0,
            compose_state: None,
            category_panel: CategoryPanel::default(),
            chat_input: chat_input(),
            search_input: search_input(),
        }
    }
}

impl<'a> UIState<'a> {
    pub fn open_compose(&mut self) {
        self.compose_state = Some(ComposeState::default());
        self.mode = UIMode::Composing;
    }

    pub fn close_popup(&mut self) {
        self.compose_state = None;
        self.mode = UIMode::Browsing;
    }

    /// Empties the chat input and returns what was typed.
    pub fn take_chat_input(&mut self) -> String {
        let text = text_of(&self.chat_input);
        self.chat_input = chat_input();
        text
    }

    pub fn clear_search(&mut self) {
        self.search_input = search_input();
    }

    pub fn take_category_input(&mut self) -> String {
        let text = text_of(&self.category_panel.input);
        self.category_panel = CategoryPanel {
            selected: self.category_panel.selected,
            ..CategoryPanel::default()
        };
        text
    }

    pub fn search_text(&self) -> String {
        text_of(&self.search_input)
    }
}

struct Palette {
    fg: Color,
    bg: Color,
    accent: Color,
    muted: Color,
    highlight: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                fg: Color::Black,
                bg: Color::White,
                accent: Color::Blue,
                muted: Color::DarkGray,
                highlight: Color::Rgb(255, 244, 194),
            },
            Theme::Dark => Self {
                fg: Color::White,
                bg: Color::Black,
                accent: Color::Yellow,
                muted: Color::Gray,
                highlight: Color::Rgb(92, 78, 20),
            },
        }
    }

    fn border(&self, focused: bool) -> Style {
        if focused {
            Style::default()
                .fg(self.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.muted)
        }
    }
}

pub fn render(f: &mut Frame, session: &mut Session, state: &mut UIState<'_>) {
    let palette = Palette::for_theme(session.theme);
    f.render_widget(
        Block::default().style(Style::default().fg(palette.fg).bg(palette.bg)),
        f.area(),
    );

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(15), // Keyword folders
            Constraint::Percentage(35), // Inbox list
            Constraint::Percentage(50), // Selected email and chat
        ])
        .split(f.area());

    render_folders(f, session, state, &palette, chunks[0]);
    render_emails(f, session, state, &palette, chunks[1]);
    render_details(f, session, state, &palette, chunks[2]);

    match state.mode {
        UIMode::Composing => render_compose(f, state, &palette),
        UIMode::Categories => render_categories(f, session, state, &palette),
        UIMode::Confirming(confirm) => render_confirm(f, confirm, &palette),
        _ => {}
    }

    render_notifications(f, session);
}

fn render_folders(
    f: &mut Frame,
    session: &Session,
    state: &UIState<'_>,
    palette: &Palette,
    area: Rect,
) {
    let mut names = vec![format!("All mail ({})", session.cache.len())];
    names.extend(
        session
            .categories
            .folders()
            .iter()
            .map(|folder| format!("{} ({})", folder.display_name, folder.count)),
    );

    let active = session.active_folder();
    let items: Vec<ListItem> = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let style = if i == active {
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(name).style(style)
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Keywords")
        .border_style(palette.border(state.focused_panel == FocusedPanel::Folders));
    f.render_widget(List::new(items).block(block), area);
}

fn email_item(
    entry: &CachedEmail,
    selected: bool,
    session_colors: &mut crate::colors::ColorAssigner,
    palette: &Palette,
    width: usize,
) -> ListItem<'static> {
    let checkbox = if entry.view.checked { "[x]" } else { "[ ]" };
    let star = if entry.view.highlighted { "★" } else { " " };
    let sender = if entry.record.sender_name.is_empty() {
        entry.record.sender_email.as_str()
    } else {
        entry.record.sender_name.as_str()
    };
    let subject = if entry.record.subject.is_empty() {
        "No Subject"
    } else {
        entry.record.subject.as_str()
    };

    let indicator = if selected { "█" } else { " " };
    let header = truncate(
        &format!("{} {} {}  {}", checkbox, star, sender, entry.record.date),
        width,
    );
    let mut lines = vec![
        Line::from(format!("{}{}", indicator, header)),
        Line::from(format!("{}  {}", indicator, truncate(subject, width.saturating_sub(2))))
            .style(Style::default().add_modifier(Modifier::BOLD)),
    ];

    let mut tag_line = vec![Span::raw(format!("{}  ", indicator))];
    if entry.view.classifying {
        tag_line.push(Span::styled(
            "Classifying...",
            Style::default()
                .fg(palette.muted)
                .add_modifier(Modifier::ITALIC),
        ));
    } else if let Some(note) = entry.view.note {
        tag_line.push(Span::styled(
            note.text(),
            Style::default().fg(palette.muted),
        ));
    } else {
        tag_line.extend(badge_spans(&render_tags(&entry.record.tags, session_colors)));
    }
    lines.push(Line::from(tag_line));

    let mut style = if selected {
        Style::default().fg(palette.accent)
    } else {
        Style::default()
    };
    if entry.view.highlighted {
        style = style.bg(palette.highlight);
    }
    ListItem::new(lines).style(style)
}

fn render_emails(
    f: &mut Frame,
    session: &mut Session,
    state: &mut UIState<'_>,
    palette: &Palette,
    area: Rect,
) {
    let area = if state.mode == UIMode::Searching {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(area);
        state.search_input.set_block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Search [Enter to apply, Esc to clear] ")
                .border_style(palette.border(true)),
        );
        f.render_widget(&state.search_input, chunks[0]);
        chunks[1]
    } else {
        area
    };

    let select_all = match session.check_state() {
        CheckState::All => "[x]",
        CheckState::Partial => "[-]",
        CheckState::None => "[ ]",
    };
    let mut title = format!("{} Inbox", select_all);
    if let Some(keyword) = session.keyword_filter() {
        title.push_str(&format!(" - {}", keyword));
    }
    let query = session.search_query();
    if !query.is_empty() {
        title.push_str(&format!(" - \"{}\"", query));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(palette.border(state.focused_panel == FocusedPanel::Emails));

    let visible = session.visible_ids();
    if visible.is_empty() {
        let text = if session.cache.is_empty() {
            "Inbox is empty"
        } else {
            "No emails match"
        };
        let paragraph = Paragraph::new(text)
            .block(block)
            .style(Style::default().fg(palette.muted));
        f.render_widget(paragraph, area);
        return;
    }

    let width = area.width.saturating_sub(4) as usize;
    let current = session.current;
    let Session { cache, colors, .. } = session;
    let items: Vec<ListItem> = cache
        .iter()
        .filter(|e| visible.contains(&e.id))
        .map(|e| email_item(e, Some(e.id) == current, colors, palette, width))
        .collect();

    let selected = current.and_then(|id| visible.iter().position(|v| *v == id));
    state.emails_list_state.select(selected);
    f.render_stateful_widget(List::new(items).block(block), area, &mut state.emails_list_state);
}

fn render_details(
    f: &mut Frame,
    session: &mut Session,
    state: &mut UIState<'_>,
    palette: &Palette,
    area: Rect,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Email")
        .border_style(palette.border(state.focused_panel == FocusedPanel::Details));

    let lines = match session.detail_view() {
        None => vec![Line::from("No email selected")],
        Some(view) => detail_lines(&view, session, palette),
    };
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((state.detail_scroll, 0));
    f.render_widget(paragraph, chunks[0]);

    render_chat(f, session, state, palette, chunks[1]);
}

fn detail_lines(view: &DetailView, session: &mut Session, palette: &Palette) -> Vec<Line<'static>> {
    let label = Style::default()
        .fg(palette.muted)
        .add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(Span::styled(
            view.subject.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![Span::styled("From: ", label), Span::raw(view.sender.clone())]),
        Line::from(vec![
            Span::styled("To: ", label),
            Span::raw(view.recipients.clone()),
        ]),
        Line::from(vec![Span::styled("Date: ", label), Span::raw(view.date.clone())]),
    ];
    if let Some(reply_to) = &view.reply_to {
        lines.push(Line::from(vec![
            Span::styled("Reply-To: ", label),
            Span::raw(reply_to.clone()),
        ]));
    }

    if !view.tags.is_empty() {
        let mut spans = vec![Span::styled("Tags: ", label)];
        spans.extend(badge_spans(&render_tags(&view.tags, &mut session.colors)));
        lines.push(Line::from(spans));
    }

    match &session.classification {
        None => {}
        Some(ClassificationResult::Pending) => lines.push(Line::from(Span::styled(
            "Classifying...",
            Style::default().fg(palette.muted),
        ))),
        Some(ClassificationResult::NoTags) => {
            lines.push(Line::from("Classification: No relevant tags found."))
        }
        Some(ClassificationResult::Tagged(tags)) => {
            let mut spans = vec![Span::styled("Classification: ", label)];
            spans.extend(badge_spans(&render_tags(tags, &mut session.colors)));
            lines.push(Line::from(spans));
        }
        Some(ClassificationResult::Failed(message)) => lines.push(Line::from(Span::styled(
            format!("Classification failed: {}", message),
            Style::default().fg(Color::Red),
        ))),
    }

    lines.push(Line::from(""));
    lines.extend(clean_body(&view.content).lines().map(|l| Line::from(l.to_string())));
    lines
}

fn render_chat(
    f: &mut Frame,
    session: &Session,
    state: &mut UIState<'_>,
    palette: &Palette,
    area: Rect,
) {
    let chatting = state.mode == UIMode::Chatting;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(if chatting { 3 } else { 0 })])
        .split(area);

    let mut lines = Vec::new();
    for entry in session.chat.entries() {
        let (who, style) = match entry.role {
            ChatRole::User => ("You", Style::default().fg(palette.accent)),
            ChatRole::Assistant => ("Assistant", Style::default().fg(Color::Green)),
            ChatRole::Typing => ("Assistant", Style::default().fg(palette.muted)),
        };
        lines.push(Line::from(vec![
            Span::styled(who, style.add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("  {}", entry.at.format("%H:%M")),
                Style::default().fg(palette.muted),
            ),
        ]));
        let text_style = if entry.role == ChatRole::Typing {
            Style::default()
                .fg(palette.muted)
                .add_modifier(Modifier::ITALIC)
        } else {
            Style::default()
        };
        lines.extend(
            entry
                .text
                .lines()
                .map(|l| Line::from(Span::styled(l.to_string(), text_style))),
        );
    }

    let height = chunks[0].height.saturating_sub(2);
    if session.chat.follow_tail {
        state.chat_scroll = (lines.len() as u16).saturating_sub(height);
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Chat")
        .border_style(palette.border(chatting));
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((state.chat_scroll, 0));
    f.render_widget(paragraph, chunks[0]);

    if chatting {
        state.chat_input.set_block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Message [Enter to send, Esc to leave] ")
                .border_style(palette.border(true)),
        );
        f.render_widget(&state.chat_input, chunks[1]);
    }
}

fn render_compose(f: &mut Frame, state: &mut UIState<'_>, palette: &Palette) {
    let Some(cs) = &mut state.compose_state else {
        return;
    };
    let area = centered_rect(80, 80, f.area());
    f.render_widget(Clear, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(6),
        ])
        .split(area);

    let focused = cs.focused_field;
    for (i, field) in ComposeField::ORDER.into_iter().enumerate() {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(field.title())
            .border_style(palette.border(field == focused));
        let area = match field {
            ComposeField::SenderName => &mut cs.sender_name,
            ComposeField::SenderEmail => &mut cs.sender_email,
            ComposeField::Recipients => &mut cs.recipients,
            ComposeField::Subject => &mut cs.subject,
            ComposeField::Content => &mut cs.content,
        };
        area.set_block(block);
        f.render_widget(&*area, chunks[i]);
    }

    let (row, col) = cs.field(focused).cursor();
    let chunk = chunks[focused.index()];
    f.set_cursor_position((chunk.x + 1 + col as u16, chunk.y + 1 + row as u16));
}

fn render_categories(f: &mut Frame, session: &mut Session, state: &mut UIState<'_>, palette: &Palette) {
    let area = centered_rect(50, 60, f.area());
    f.render_widget(Clear, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let items: Vec<ListItem> = session
        .categories
        .list_existing()
        .to_vec()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let badge = render_badge(name, &mut session.colors);
            let marker = if i == state.category_panel.selected {
                "› "
            } else {
                "  "
            };
            let mut spans = vec![Span::raw(marker)];
            spans.extend(badge_spans(std::slice::from_ref(&badge)));
            ListItem::new(Line::from(spans))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Categories [Enter to add, Del to remove, Esc to close] ")
        .border_style(palette.border(true));
    f.render_widget(List::new(items).block(block), chunks[0]);

    state.category_panel.input.set_block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Add category ")
            .border_style(palette.border(true)),
    );
    f.render_widget(&state.category_panel.input, chunks[1]);
}

fn render_confirm(f: &mut Frame, confirm: Confirm, palette: &Palette) {
    let area = centered_rect(40, 20, f.area());
    f.render_widget(Clear, area);
    let question = match confirm {
        Confirm::DeleteEmail => "Delete this email?",
        Confirm::ProcessUntagged => "Process all untagged emails in the browser?",
    };
    let paragraph = Paragraph::new(vec![
        Line::from(question),
        Line::from(""),
        Line::from("[y] Yes   [n] No"),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Confirm ")
            .border_style(palette.border(true)),
    );
    f.render_widget(paragraph, area);
}

fn render_notifications(f: &mut Frame, session: &Session) {
    let screen = f.area();
    let width = (screen.width / 3).max(24).min(screen.width);
    let mut y = screen.y;
    for note in session.notifications.active() {
        if y + 3 > screen.bottom() {
            break;
        }
        let color = match note.kind {
            NotificationKind::Success => Color::Green,
            NotificationKind::Info => Color::Cyan,
            NotificationKind::Warning => Color::Yellow,
            NotificationKind::Error => Color::Red,
        };
        let area = Rect {
            x: screen.right().saturating_sub(width),
            y,
            width,
            height: 3,
        };
        f.render_widget(Clear, area);
        f.render_widget(
            Paragraph::new(note.message.as_str())
                .style(Style::default().fg(color))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(color)),
                ),
            area,
        );
        y += 3;
    }
}

fn truncate(s: &str, len: usize) -> String {
    if s.chars().count() > len {
        let truncated: String = s.chars().take(len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Collapses runs of blank lines to one and trims trailing whitespace.
fn clean_body(body: &str) -> String {
    let normalized = body.replace("\r\n", "\n").replace('\r', "\n");
    let mut result = String::with_capacity(normalized.len());
    let mut blank_run = 0;
    let mut first_content = true;

    for line in normalized.split('\n') {
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            blank_run += 1;
            continue;
        }
        if !first_content {
            // One newline between adjacent lines, two when blanks separated them.
            for _ in 0..(blank_run + 1).min(2) {
                result.push('\n');
            }
        }
        result.push_str(trimmed);
        blank_run = 0;
        first_content = false;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmailRecord, InitialState};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    #[test]
    fn clean_body_collapses_blank_runs() {
        assert_eq!(
            clean_body("Line 1\n\n\nLine 2\n\n\n\nLine 3"),
            "Line 1\n\nLine 2\n\nLine 3"
        );
        assert_eq!(clean_body("Line 1\r\n   \r\n\t\r\nLine 2"), "Line 1\n\nLine 2");
    }

    #[test]
    fn clean_body_trims_line_ends() {
        assert_eq!(clean_body("Line 1   \nLine 2\t"), "Line 1\nLine 2");
    }

    #[test]
    fn compose_fields_cycle_both_ways() {
        assert_eq!(ComposeField::SenderName.prev(), ComposeField::Content);
        assert_eq!(ComposeField::Content.next(), ComposeField::SenderName);
        assert_eq!(ComposeField::Recipients.next(), ComposeField::Subject);
    }

    #[test]
    fn compose_state_builds_draft() {
        let mut compose = ComposeState::default();
        compose.focused_textarea().insert_str("Ada");
        compose.focused_field = ComposeField::Content;
        compose.focused_textarea().insert_str("Hello");
        compose.focused_textarea().insert_newline();
        compose.focused_textarea().insert_str("World");

        let draft = compose.draft();
        assert_eq!(draft.sender_name, "Ada");
        assert_eq!(draft.content, "Hello\nWorld");
        assert!(!draft.is_complete());
    }

    #[test]
    fn taking_chat_input_clears_it() {
        let mut state = UIState::default();
        state.chat_input.insert_str("When is it?");
        assert_eq!(state.take_chat_input(), "When is it?");
        assert_eq!(state.take_chat_input(), "");
    }

    #[test]
    fn renders_inbox_with_badges_and_notes() {
        let mut session = Session::new(
            InitialState {
                emails: vec![
                    EmailRecord {
                        subject: "Networking Night".into(),
                        sender_name: "Career Center".into(),
                        tags: vec!["networking".into(), "hackathons".into()],
                        ..Default::default()
                    },
                    EmailRecord {
                        sender_name: "Dining Hall".into(),
                        ..Default::default()
                    },
                ],
                keywords: vec!["networking".into()],
            },
            Theme::Dark,
        );
        session.select_position(0);
        session.notifications.info("Email highlighted.");
        let mut state = UIState::default();

        let mut terminal = Terminal::new(TestBackend::new(160, 40)).unwrap();
        terminal
            .draw(|f| render(f, &mut session, &mut state))
            .unwrap();

        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(screen.contains("Networking Night"));
        assert!(screen.contains("hackathons"));
        assert!(screen.contains("Email highlighted."));
        assert!(screen.contains("No Subject"));
        assert!(screen.contains("Networking (0)"));
        assert_eq!(session.colors.assigned(), 1);
    }
}
