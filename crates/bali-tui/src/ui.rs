use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use bali_core::{ChatRole, CAPABILITIES};
use crate::app::{App, Field, FocusPane, InputMode, Screen, TextInput};

/// Parse a line of text and convert **bold** and *italic* markdown to styled spans
fn parse_inline_markdown(text: &str, base: Style) -> Vec<Span<'static>> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c != '*' {
            current_text.push(c);
            continue;
        }

        let bold = chars.peek() == Some(&'*');
        if bold {
            chars.next();
        }

        // Find the matching closing marker
        let mut inner = String::new();
        let mut found_close = false;
        while let Some(c) = chars.next() {
            if c == '*' {
                if !bold {
                    found_close = true;
                    break;
                }
                if chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
            }
            inner.push(c);
        }

        let marker = if bold { "**" } else { "*" };
        if found_close && !inner.is_empty() {
            if !current_text.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut current_text), base));
            }
            let modifier = if bold { Modifier::BOLD } else { Modifier::ITALIC };
            spans.push(Span::styled(inner, base.add_modifier(modifier)));
        } else {
            // No closing marker, treat as literal
            current_text.push_str(marker);
            current_text.push_str(&inner);
            if found_close {
                current_text.push_str(marker);
            }
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::styled(current_text, base));
    }

    spans
}

/// Render one line of the simple markdown the assistant is asked to produce:
/// headings, `-`/`*` bullets, **bold** and *italic*
fn parse_markdown_line(text: &str) -> Line<'static> {
    let trimmed = text.trim_start();

    if let Some(heading) = trimmed.strip_prefix('#') {
        let heading = heading.trim_start_matches('#').trim();
        return Line::from(parse_inline_markdown(
            heading,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    }

    let indent = &text[..text.len() - trimmed.len()];
    let bullet = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "));

    let mut spans = Vec::new();
    let body = match bullet {
        Some(rest) => {
            spans.push(Span::raw(format!("{}• ", indent)));
            rest
        }
        None => text,
    };
    spans.extend(parse_inline_markdown(body, Style::default()));

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Visible slice of a single-line input and the cursor column inside it
fn visible_input(input: &TextInput, width: usize) -> (String, u16) {
    // Scroll horizontally to keep the cursor visible
    let scroll_offset = if width == 0 || input.cursor < width {
        0
    } else {
        input.cursor - width + 1
    };

    let text: String = input.value.chars().skip(scroll_offset).take(width).collect();
    (text, (input.cursor - scroll_offset) as u16)
}

/// Centered popup area of the given size
fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn border_color(focused: bool) -> Color {
    if focused { Color::Cyan } else { Color::DarkGray }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Welcome => render_welcome_screen(app, frame, body_area),
        Screen::Chat => render_chat_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    // Popups
    if app.show_model_picker {
        render_model_picker(app, frame, area);
    } else if app.show_capabilities {
        render_capabilities(frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(" 🤖 Bali.AI - Your Personal Assistant ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    if app.screen == Screen::Chat {
        spans.push(Span::styled(
            format!("  {} | {} ", app.assistant.model(), app.assistant.tone().as_str()),
            Style::default().fg(Color::Gray),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match (app.screen, app.input_mode) {
        (Screen::Welcome, _) => " WELCOME ",
        (Screen::Chat, InputMode::Normal) => " CHAT ",
        (Screen::Chat, InputMode::Editing) => " EDIT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        vec![
            Span::styled(format!(" {} ", key), key_style),
            Span::styled(format!(" {} ", label), label_style),
        ]
    };

    let hints: Vec<Span> = if app.show_model_picker {
        [hint("j/k", "nav"), hint("Enter", "select"), hint("Esc", "cancel")].concat()
    } else if app.show_capabilities {
        hint("Esc", "close")
    } else {
        match (app.screen, app.input_mode) {
            (Screen::Welcome, _) => [hint("Enter", "save"), hint("Esc", "quit")].concat(),
            (Screen::Chat, InputMode::Editing) => match app.editing {
                Field::ReminderTask | Field::ReminderTime => {
                    [hint("Tab", "task/time"), hint("Enter", "next/set"), hint("Esc", "cancel")].concat()
                }
                _ => [hint("Enter", "submit"), hint("Esc", "cancel")].concat(),
            },
            (Screen::Chat, InputMode::Normal) => {
                let mut hints = match app.focus {
                    FocusPane::Chat => [hint("j/k", "scroll"), hint("g/G", "top/bottom")].concat(),
                    FocusPane::Input => hint("Enter", "ask"),
                    FocusPane::Todos | FocusPane::Reminders => {
                        [hint("j/k", "nav"), hint("a", "add"), hint("d", "remove")].concat()
                    }
                };
                hints.extend(
                    [
                        hint("Tab", "focus"),
                        hint("i", "ask"),
                        hint("s", "action"),
                        hint("t", "tone"),
                        hint("m", "model"),
                        hint("C", "clear"),
                        hint("?", "about"),
                        hint("q", "quit"),
                    ]
                    .concat(),
                );
                hints
            }
        }
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_welcome_screen(app: &App, frame: &mut Frame, area: Rect) {
    let card = popup_area(area, 50, 7);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Welcome! Let's get to know each other. ");
    let inner = block.inner(card);
    frame.render_widget(block, card);

    let [prompt_area, _, input_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(inner);

    let prompt = Paragraph::new("What's your name?").style(Style::default().fg(Color::Gray));
    frame.render_widget(prompt, prompt_area);

    let (text, cursor_x) = visible_input(&app.name_input, input_area.width as usize);
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::Cyan)),
        input_area,
    );
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [main_area, sidebar_area] = Layout::horizontal([
        Constraint::Percentage(68),
        Constraint::Percentage(32),
    ])
    .areas(area);

    let [greeting_area, chat_area, input_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(main_area);

    let greeting = Paragraph::new(Line::from(Span::styled(
        format!(" {}", app.greeting_line()),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    frame.render_widget(greeting, greeting_area);

    render_chat_history(app, frame, chat_area);
    render_query_input(app, frame, input_area);
    render_sidebar(app, frame, sidebar_area);
}

fn render_chat_history(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store area and inner size for mouse hit-testing and scroll calculations
    app.chat_area = Some(area);
    app.query_chat_height = area.height.saturating_sub(2);
    app.query_chat_width = area.width.saturating_sub(2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app.focus == FocusPane::Chat)))
        .title(" 💬 Chat ");

    let chat_text = if app.chat_messages.is_empty() && !app.query_loading {
        Text::from(Span::styled(
            "Ask me anything... (type \"what can you do\" to see my capabilities)",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in &app.chat_messages {
            let color = match msg.role {
                ChatRole::User => Color::Cyan,
                _ => Color::Yellow,
            };
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{} ", msg.role.label()),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("({}):", msg.timestamp),
                    Style::default().fg(Color::DarkGray),
                ),
            ]));
            match msg.role {
                ChatRole::User => {
                    lines.extend(msg.content.lines().map(|l| Line::from(l.to_string())));
                }
                _ => lines.extend(msg.content.lines().map(parse_markdown_line)),
            }
            lines.push(Line::default());
        }

        if app.query_loading {
            lines.push(Line::from(Span::styled(
                "Assistant:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("🧠 Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.query_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_query_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing && app.editing == Field::Query;
    let color = if editing || app.focus == FocusPane::Input {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(format!(" Ask me anything [{}] ", app.action.as_str()));

    let inner_width = area.width.saturating_sub(2) as usize;
    let (text, cursor_x) = visible_input(&app.query_input, inner_width);

    // Cyan text matches the "User" label
    let input = Paragraph::new(text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    if editing {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_sidebar(app: &mut App, frame: &mut Frame, area: Rect) {
    let [settings_area, todo_area, reminder_area, entry_area] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Percentage(50),
        Constraint::Min(3),
        Constraint::Length(3),
    ])
    .areas(area);

    app.todo_area = Some(todo_area);
    app.reminder_area = Some(reminder_area);

    // Settings
    let settings = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Tone: ", Style::default().fg(Color::Gray)),
            Span::styled(app.assistant.tone().as_str(), Style::default().fg(Color::Green).bold()),
        ]),
        Line::from(vec![
            Span::styled("Model: ", Style::default().fg(Color::Gray)),
            Span::raw(format!(
                "{} (fallback {})",
                app.assistant.model(),
                app.assistant.fallback_model()
            )),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title(" ⚙️ Settings "));
    frame.render_widget(settings, settings_area);

    let highlight = Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD);

    // To-do list
    let todo_focused = app.focus == FocusPane::Todos;
    let todo_items: Vec<ListItem> = if app.store.todos().is_empty() {
        vec![ListItem::new("No tasks yet!").style(Style::default().fg(Color::DarkGray))]
    } else {
        app.store
            .todos()
            .iter()
            .map(|task| ListItem::new(format!("- {}", task)))
            .collect()
    };
    let todo_list = List::new(todo_items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color(todo_focused)))
                .title(" 📋 To-Do List "),
        )
        .highlight_style(if todo_focused { highlight } else { Style::default() })
        .highlight_symbol("> ");
    frame.render_stateful_widget(todo_list, todo_area, &mut app.todo_state);

    // Reminders
    let reminder_focused = app.focus == FocusPane::Reminders;
    let reminder_items: Vec<ListItem> = if app.store.reminders().is_empty() {
        vec![ListItem::new("No reminders yet!").style(Style::default().fg(Color::DarkGray))]
    } else {
        app.store
            .reminders()
            .iter()
            .map(|r| ListItem::new(format!("- {} at {}", r.task, r.time)))
            .collect()
    };
    let reminder_list = List::new(reminder_items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color(reminder_focused)))
                .title(" ⏰ Reminders "),
        )
        .highlight_style(if reminder_focused { highlight } else { Style::default() })
        .highlight_symbol("> ");
    frame.render_stateful_widget(reminder_list, reminder_area, &mut app.reminder_state);

    render_sidebar_entry(app, frame, entry_area);
}

/// Entry box for new tasks and reminders; shows the last status otherwise
fn render_sidebar_entry(app: &App, frame: &mut Frame, area: Rect) {
    let sidebar_field = app.input_mode == InputMode::Editing
        && matches!(app.editing, Field::Todo | Field::ReminderTask | Field::ReminderTime);

    if !sidebar_field {
        let status = app.status_message.as_deref().unwrap_or("");
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));
        frame.render_widget(Paragraph::new(status).block(block), area);
        return;
    }

    let (title, input) = match app.editing {
        Field::Todo => (" Add a task ", &app.todo_input),
        Field::ReminderTask => (" Reminder task ", &app.reminder_task_input),
        _ => (" Time (e.g., 2025-07-04 14:00) ", &app.reminder_time_input),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(title);

    let (text, cursor_x) = visible_input(input, area.width.saturating_sub(2) as usize);
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::Cyan)).block(block),
        area,
    );
    frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
}

fn render_capabilities(frame: &mut Frame, area: Rect) {
    let lines: Vec<Line> = CAPABILITIES.lines().map(parse_markdown_line).collect();
    let popup = popup_area(area, 90, lines.len() as u16 + 4);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" ℹ️ About Bali.AI (Esc to close) ");

    let about = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(about, popup);
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let popup = popup_area(area, 40, app.available_models.len() as u16 + 2);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Model (Enter to select, Esc to cancel) ");

    let current = app.assistant.model().to_string();
    let items: Vec<ListItem> = app
        .available_models
        .iter()
        .map(|model| {
            let style = if *model == current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", model)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup, &mut app.model_picker_state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use bali_core::ChatMessage;
    use ratatui::{backend::TestBackend, Terminal};

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_bold_and_italic_spans() {
        let line = parse_markdown_line("a **bold** and *soft* word");
        assert_eq!(plain(&line), "a bold and soft word");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert!(line.spans[3].style.add_modifier.contains(Modifier::ITALIC));
    }

    #[test]
    fn test_unclosed_markers_stay_literal() {
        assert_eq!(plain(&parse_markdown_line("2 * 3 = 6")), "2 * 3 = 6");
        assert_eq!(plain(&parse_markdown_line("**open")), "**open");
    }

    #[test]
    fn test_bullets_and_headings() {
        assert_eq!(plain(&parse_markdown_line("- item")), "• item");
        assert_eq!(plain(&parse_markdown_line("  * nested")), "  • nested");

        let heading = parse_markdown_line("### Limitations");
        assert_eq!(plain(&heading), "Limitations");
        assert_eq!(heading.spans[0].style.fg, Some(Color::Cyan));
    }

    #[test]
    fn test_empty_line() {
        assert!(parse_markdown_line("").spans.is_empty());
    }

    #[test]
    fn test_visible_input_scrolls_to_cursor() {
        let mut input = TextInput::default();
        input.insert_str("abcdefghij");
        let (text, cursor) = visible_input(&input, 5);
        assert_eq!(text, "ghij");
        assert_eq!(cursor, 4);

        input.home();
        let (text, cursor) = visible_input(&input, 5);
        assert_eq!(text, "abcde");
        assert_eq!(cursor, 0);
    }

    #[test]
    fn test_renders_chat_screen() {
        let (_dir, mut app) = test_app(false, Some("Ana"));
        app.chat_messages.push(ChatMessage::new(
            ChatRole::Assistant,
            "**Hello** there",
            "2025-01-01 09:00:00",
        ));
        app.show_capabilities = true;

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        assert!(app.chat_area.is_some());
        assert!(app.query_chat_height > 0);
    }

    #[test]
    fn test_renders_welcome_screen_small_terminal() {
        let (_dir, mut app) = test_app(false, None);
        let mut terminal = Terminal::new(TestBackend::new(20, 6)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
    }
}
