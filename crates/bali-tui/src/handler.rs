use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, Field, FocusPane, InputMode, Screen};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await?,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    // Popups take all keys while open
    if app.show_capabilities {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.show_capabilities = false;
        }
        return Ok(());
    }
    if app.show_model_picker {
        handle_model_picker(app, key);
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key).await,
        InputMode::Editing => handle_editing_mode(app, key),
    }

    Ok(())
}

fn handle_model_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.show_model_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.model_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.model_picker_nav_up(),
        KeyCode::Enter => app.select_model(),
        _ => {}
    }
}

async fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    if app.screen == Screen::Welcome {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
            _ => app.start_editing(Field::Name),
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::Char('?') => app.show_capabilities = true,
        KeyCode::Char('t') => app.cycle_tone(),
        KeyCode::Char('s') => app.toggle_action(),
        KeyCode::Char('m') => app.open_model_picker().await,
        KeyCode::Char('C') => app.clear_chat(),
        KeyCode::Char('i') | KeyCode::Char('/') => app.start_editing(Field::Query),

        _ => match app.focus {
            FocusPane::Chat => handle_chat_pane(app, key),
            FocusPane::Input => {
                if key.code == KeyCode::Enter {
                    app.start_editing(Field::Query);
                }
            }
            FocusPane::Todos => handle_todo_pane(app, key),
            FocusPane::Reminders => handle_reminder_pane(app, key),
        },
    }
}

fn handle_chat_pane(app: &mut App, key: KeyEvent) {
    let half_page = (app.query_chat_height / 2).max(1);
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.query_scroll = app.query_scroll.saturating_add(1),
        KeyCode::Char('k') | KeyCode::Up => app.query_scroll = app.query_scroll.saturating_sub(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.query_scroll = app.query_scroll.saturating_add(half_page);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.query_scroll = app.query_scroll.saturating_sub(half_page);
        }
        KeyCode::Char('g') => app.query_scroll = 0,
        KeyCode::Char('G') => app.scroll_query_to_bottom(),
        _ => {}
    }
}

fn handle_todo_pane(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.todo_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.todo_nav_up(),
        KeyCode::Char('a') | KeyCode::Enter => app.start_editing(Field::Todo),
        KeyCode::Char('d') | KeyCode::Char('x') | KeyCode::Delete => app.remove_selected_todo(),
        _ => {}
    }
}

fn handle_reminder_pane(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.reminder_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.reminder_nav_up(),
        KeyCode::Char('a') | KeyCode::Enter => app.start_editing(Field::ReminderTask),
        KeyCode::Char('d') | KeyCode::Char('x') | KeyCode::Delete => app.remove_selected_reminder(),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            if app.screen == Screen::Welcome {
                app.should_quit = true;
            } else {
                app.stop_editing();
            }
        }
        KeyCode::Enter => submit_field(app),
        // Switch between the two reminder fields
        KeyCode::Tab | KeyCode::BackTab if matches!(app.editing, Field::ReminderTask | Field::ReminderTime) => {
            app.editing = if app.editing == Field::ReminderTask {
                Field::ReminderTime
            } else {
                Field::ReminderTask
            };
        }
        KeyCode::Backspace => app.active_input().backspace(),
        KeyCode::Delete => app.active_input().delete(),
        KeyCode::Left => app.active_input().left(),
        KeyCode::Right => app.active_input().right(),
        KeyCode::Home => app.active_input().home(),
        KeyCode::End => app.active_input().end(),
        KeyCode::Char(c) => app.active_input().insert(c),
        _ => {}
    }
}

fn submit_field(app: &mut App) {
    match app.editing {
        Field::Name => app.submit_name(),
        Field::Query => {
            app.submit_query();
        }
        Field::Todo => {
            app.add_todo();
            app.stop_editing();
        }
        Field::ReminderTask => app.editing = Field::ReminderTime,
        Field::ReminderTime => {
            app.add_reminder();
            app.stop_editing();
        }
    }
}

fn handle_paste(app: &mut App, text: &str) {
    if app.input_mode == InputMode::Editing {
        app.active_input().insert_str(text);
    } else if app.screen == Screen::Chat {
        app.start_editing(Field::Query);
        app.query_input.insert_str(text);
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    // Position-based scrolling
    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_todos = app.todo_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_reminders = app.reminder_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_chat {
                app.query_scroll = app.query_scroll.saturating_add(3);
            } else if in_todos {
                app.todo_nav_down();
            } else if in_reminders {
                app.reminder_nav_down();
            }
        }
        MouseEventKind::ScrollUp => {
            if in_chat {
                app.query_scroll = app.query_scroll.saturating_sub(3);
            } else if in_todos {
                app.todo_nav_up();
            } else if in_reminders {
                app.reminder_nav_up();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c))).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_welcome_name_entry() {
        let (_dir, mut app) = test_app(false, None);
        type_text(&mut app, "Ana").await;
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();

        assert_eq!(app.screen, Screen::Chat);
        assert_eq!(app.input_mode, InputMode::Editing);
        assert_eq!(app.editing, Field::Query);
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_while_editing() {
        let (_dir, mut app) = test_app(false, None);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        handle_event(&mut app, AppEvent::Key(ctrl_c)).await.unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_add_todo_from_sidebar() {
        let (_dir, mut app) = test_app(false, Some("Ana"));
        app.focus = FocusPane::Todos;
        handle_event(&mut app, key(KeyCode::Char('a'))).await.unwrap();
        assert_eq!(app.editing, Field::Todo);

        type_text(&mut app, "water plants").await;
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.store.todos(), ["water plants".to_string()]);

        handle_event(&mut app, key(KeyCode::Char('d'))).await.unwrap();
        assert!(app.store.todos().is_empty());
    }

    #[tokio::test]
    async fn test_reminder_entry_moves_task_to_time() {
        let (_dir, mut app) = test_app(false, Some("Ana"));
        app.focus = FocusPane::Reminders;
        handle_event(&mut app, key(KeyCode::Char('a'))).await.unwrap();
        type_text(&mut app, "dentist").await;
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.editing, Field::ReminderTime);

        type_text(&mut app, "2025-07-04 14:00").await;
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();

        let reminders = app.store.reminders();
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].task, "dentist");
        assert_eq!(reminders[0].time, "2025-07-04 14:00");
    }

    #[tokio::test]
    async fn test_normal_mode_shortcuts() {
        let (_dir, mut app) = test_app(false, Some("Ana"));
        handle_event(&mut app, key(KeyCode::Char('s'))).await.unwrap();
        assert_eq!(app.action, bali_core::Action::Summarize);

        handle_event(&mut app, key(KeyCode::Char('?'))).await.unwrap();
        assert!(app.show_capabilities);
        // Keys are swallowed by the popup
        handle_event(&mut app, key(KeyCode::Char('t'))).await.unwrap();
        assert_eq!(app.assistant.tone(), bali_core::Tone::Friendly);
        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert!(!app.show_capabilities);

        handle_event(&mut app, key(KeyCode::Char('t'))).await.unwrap();
        assert_eq!(app.assistant.tone(), bali_core::Tone::Formal);
    }

    #[tokio::test]
    async fn test_paste_starts_query_editing() {
        let (_dir, mut app) = test_app(false, Some("Ana"));
        handle_event(&mut app, AppEvent::Paste("pasted\ntext".to_string())).await.unwrap();
        assert_eq!(app.input_mode, InputMode::Editing);
        assert_eq!(app.query_input.value, "pasted text");
    }
}
