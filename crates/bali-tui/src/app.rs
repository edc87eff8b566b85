use std::path::PathBuf;
use chrono::{Local, Timelike};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use bali_core::state::now_timestamp;
use bali_core::{
    greeting, prepare_prompt, Action, Assistant, ChatMessage, ChatRole, Config, DataStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Welcome,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    Input,
    Todos,
    Reminders,
}

impl FocusPane {
    pub fn next(&self) -> FocusPane {
        match self {
            FocusPane::Chat => FocusPane::Input,
            FocusPane::Input => FocusPane::Todos,
            FocusPane::Todos => FocusPane::Reminders,
            FocusPane::Reminders => FocusPane::Chat,
        }
    }
}

/// Text field currently receiving keystrokes in editing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Query,
    Todo,
    ReminderTask,
    ReminderTime,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line text input with a character cursor
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    pub value: String,
    pub cursor: usize,
}

impl TextInput {
    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars().filter(|c| *c != '\r') {
            // Single-line field: newlines become spaces
            self.insert(if c == '\n' { ' ' } else { c });
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Take the contents, leaving the input empty
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.value)
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub editing: Field,

    // Text inputs
    pub name_input: TextInput,
    pub query_input: TextInput,
    pub todo_input: TextInput,
    pub reminder_task_input: TextInput,
    pub reminder_time_input: TextInput,

    // Chat state
    pub action: Action,
    pub chat_messages: Vec<ChatMessage>,
    pub query_loading: bool,
    pub query_scroll: u16,
    pub query_chat_height: u16, // Height of chat area for scroll calculations
    pub query_chat_width: u16,  // Width of chat area for wrap calculations
    pub query_task: Option<JoinHandle<String>>,
    pending_timestamp: Option<String>,

    // Sidebar lists
    pub todo_state: ListState,
    pub reminder_state: ListState,

    // Feedback from the last to-do or reminder action
    pub status_message: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Popups
    pub show_capabilities: bool,
    pub show_model_picker: bool,
    pub available_models: Vec<String>,
    pub model_picker_state: ListState,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub todo_area: Option<Rect>,
    pub reminder_area: Option<Rect>,

    // Data
    pub assistant: Assistant,
    pub store: DataStore,
    pub config: Config,
    pub config_path: Option<PathBuf>,
}

impl App {
    pub fn new(assistant: Assistant, store: DataStore, config: Config, config_path: Option<PathBuf>) -> Self {
        let mut assistant = assistant;
        let screen = match config.user_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                assistant.set_user_name(name);
                Screen::Chat
            }
            _ => Screen::Welcome,
        };

        // The welcome screen is a single name field
        let input_mode = if screen == Screen::Welcome {
            InputMode::Editing
        } else {
            InputMode::Normal
        };

        let mut app = Self {
            should_quit: false,
            screen,
            input_mode,
            focus: FocusPane::Input,
            editing: if screen == Screen::Welcome { Field::Name } else { Field::Query },

            name_input: TextInput::default(),
            query_input: TextInput::default(),
            todo_input: TextInput::default(),
            reminder_task_input: TextInput::default(),
            reminder_time_input: TextInput::default(),

            action: Action::default(),
            chat_messages: Vec::new(),
            query_loading: false,
            query_scroll: 0,
            query_chat_height: 0,
            query_chat_width: 0,
            query_task: None,
            pending_timestamp: None,

            todo_state: ListState::default(),
            reminder_state: ListState::default(),

            status_message: None,
            animation_frame: 0,

            show_capabilities: false,
            show_model_picker: false,
            available_models: Vec::new(),
            model_picker_state: ListState::default(),

            chat_area: None,
            todo_area: None,
            reminder_area: None,

            assistant,
            store,
            config,
            config_path,
        };
        app.clamp_list_selections();
        app
    }

    /// Greeting line for the chat screen
    pub fn greeting_line(&self) -> String {
        let hello = greeting(Local::now().hour());
        match self.assistant.user_name() {
            Some(name) => format!("{}, {}! How can I assist you today?", hello, name),
            None => format!("{}! How can I assist you today?", hello),
        }
    }

    pub fn input_for(&mut self, field: Field) -> &mut TextInput {
        match field {
            Field::Name => &mut self.name_input,
            Field::Query => &mut self.query_input,
            Field::Todo => &mut self.todo_input,
            Field::ReminderTask => &mut self.reminder_task_input,
            Field::ReminderTime => &mut self.reminder_time_input,
        }
    }

    /// Text input currently being edited
    pub fn active_input(&mut self) -> &mut TextInput {
        self.input_for(self.editing)
    }

    pub fn start_editing(&mut self, field: Field) {
        self.editing = field;
        self.input_mode = InputMode::Editing;
        self.focus = match field {
            Field::Todo => FocusPane::Todos,
            Field::ReminderTask | Field::ReminderTime => FocusPane::Reminders,
            Field::Name | Field::Query => FocusPane::Input,
        };
    }

    pub fn stop_editing(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    /// Save the name from the welcome screen and open the chat
    pub fn submit_name(&mut self) {
        let name = self.name_input.value.trim().to_string();
        if name.is_empty() {
            return;
        }
        self.name_input.take();
        info!(user = %name, "session started");
        self.assistant.set_user_name(name);
        self.screen = Screen::Chat;
        self.focus = FocusPane::Input;
        self.start_editing(Field::Query);
    }

    /// Send the query input to the model in the background
    pub fn submit_query(&mut self) {
        if self.query_input.is_empty() || self.query_task.is_some() {
            return;
        }

        let question = self.query_input.take();
        let prompt = prepare_prompt(&question, self.action);
        let timestamp = now_timestamp();

        // Prior turns only; the new prompt is appended by the assistant
        let history = self.chat_messages.clone();
        self.chat_messages
            .push(ChatMessage::new(ChatRole::User, question, timestamp.clone()));
        self.pending_timestamp = Some(timestamp);
        self.query_loading = true;

        // Scroll to bottom so "Thinking..." is visible
        self.scroll_query_to_bottom();

        let assistant = self.assistant.clone();
        self.query_task = Some(tokio::spawn(async move {
            assistant.respond(&history, &prompt).await
        }));
    }

    /// Collect the model reply once the background task has finished
    pub async fn poll_query(&mut self) {
        let finished = self
            .query_task
            .as_ref()
            .map(|task| task.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }

        let Some(task) = self.query_task.take() else {
            return;
        };
        let reply = match task.await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "chat task failed");
                format!("⚠️ Error: {}", e)
            }
        };

        let timestamp = self.pending_timestamp.take().unwrap_or_else(now_timestamp);
        self.chat_messages
            .push(ChatMessage::new(ChatRole::Assistant, reply, timestamp));
        self.query_loading = false;
        self.scroll_query_to_bottom();
    }

    /// Drop the conversation, cancelling any reply still in flight
    pub fn clear_chat(&mut self) {
        if let Some(task) = self.query_task.take() {
            task.abort();
            info!("cancelled in-flight query");
        }
        self.pending_timestamp = None;
        self.query_loading = false;
        self.chat_messages.clear();
        self.query_scroll = 0;
    }

    pub fn toggle_action(&mut self) {
        self.action = self.action.toggle();
    }

    pub fn cycle_tone(&mut self) {
        let tone = self.assistant.tone().next();
        self.assistant.set_tone(tone);
    }

    pub fn add_todo(&mut self) {
        let task = self.todo_input.take();
        self.status_message = Some(match self.store.add_todo(&task) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "failed to save to-do list");
                format!("⚠️ Could not save: {}", e)
            }
        });
        self.clamp_list_selections();
    }

    pub fn add_reminder(&mut self) {
        let task = self.reminder_task_input.take();
        let time = self.reminder_time_input.take();
        self.status_message = Some(match self.store.add_reminder(&task, &time) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "failed to save reminders");
                format!("⚠️ Could not save: {}", e)
            }
        });
        self.clamp_list_selections();
    }

    pub fn remove_selected_todo(&mut self) {
        let Some(idx) = self.todo_state.selected() else {
            return;
        };
        match self.store.remove_todo(idx) {
            Ok(Some(task)) => self.status_message = Some(format!("🗑️ Removed: {}", task)),
            Ok(None) => {}
            Err(e) => self.status_message = Some(format!("⚠️ Could not save: {}", e)),
        }
        self.clamp_list_selections();
    }

    pub fn remove_selected_reminder(&mut self) {
        let Some(idx) = self.reminder_state.selected() else {
            return;
        };
        match self.store.remove_reminder(idx) {
            Ok(Some(reminder)) => {
                self.status_message = Some(format!("🗑️ Deleted reminder: {}", reminder.task))
            }
            Ok(None) => {}
            Err(e) => self.status_message = Some(format!("⚠️ Could not save: {}", e)),
        }
        self.clamp_list_selections();
    }

    /// Keep list selections inside the current list bounds
    fn clamp_list_selections(&mut self) {
        clamp_selection(&mut self.todo_state, self.store.todos().len());
        clamp_selection(&mut self.reminder_state, self.store.reminders().len());
    }

    pub fn todo_nav_down(&mut self) {
        list_nav_down(&mut self.todo_state, self.store.todos().len());
    }

    pub fn todo_nav_up(&mut self) {
        list_nav_up(&mut self.todo_state);
    }

    pub fn reminder_nav_down(&mut self) {
        list_nav_down(&mut self.reminder_state, self.store.reminders().len());
    }

    pub fn reminder_nav_up(&mut self) {
        list_nav_up(&mut self.reminder_state);
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.query_loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll chat to bottom so the latest message is visible
    pub fn scroll_query_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.query_chat_width > 0 {
            self.query_chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in &self.chat_messages {
            total_lines = total_lines.saturating_add(1); // "User (timestamp):" header
            for line in msg.content.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                let wrapped = if char_count == 0 { 1 } else { char_count / wrap_width + 1 };
                total_lines = total_lines.saturating_add(wrapped as u16);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if self.query_loading {
            total_lines = total_lines.saturating_add(2); // header + "Thinking..."
        }

        let visible_height = if self.query_chat_height > 0 {
            self.query_chat_height
        } else {
            20
        };

        self.query_scroll = total_lines.saturating_sub(visible_height);
    }

    pub async fn open_model_picker(&mut self) {
        match self.assistant.backend().list_models().await {
            Ok(models) if models.is_empty() => {
                self.status_message =
                    Some("No models found. Pull one with: ollama pull gemma3:1b".to_string());
            }
            Ok(models) => {
                let current = models.iter().position(|m| m == self.assistant.model());
                self.available_models = models;
                self.model_picker_state.select(Some(current.unwrap_or(0)));
                self.show_model_picker = true;
            }
            Err(e) => {
                warn!(error = %e, "could not list models");
                self.status_message = Some(format!("⚠️ Could not list models: {}", e));
            }
        }
    }

    pub fn model_picker_nav_down(&mut self) {
        list_nav_down(&mut self.model_picker_state, self.available_models.len());
    }

    pub fn model_picker_nav_up(&mut self) {
        list_nav_up(&mut self.model_picker_state);
    }

    /// Use the highlighted model as primary and remember it in the config
    pub fn select_model(&mut self) {
        let Some(model) = self
            .model_picker_state
            .selected()
            .and_then(|i| self.available_models.get(i))
            .cloned()
        else {
            return;
        };

        self.assistant.set_model(model.clone());
        self.show_model_picker = false;
        info!(model = %model, "primary model changed");

        if let Some(path) = &self.config_path {
            if let Err(e) = self.config.save_default_model(&model, path) {
                warn!(error = %e, "failed to save config");
            }
        }
    }
}

fn list_nav_down(state: &mut ListState, len: usize) {
    if len == 0 {
        return;
    }
    let i = state.selected().map(|i| (i + 1).min(len - 1)).unwrap_or(0);
    state.select(Some(i));
}

fn list_nav_up(state: &mut ListState) {
    if let Some(i) = state.selected() {
        state.select(Some(i.saturating_sub(1)));
    }
}

fn clamp_selection(state: &mut ListState, len: usize) {
    if len == 0 {
        state.select(None);
    } else {
        let i = state.selected().unwrap_or(0).min(len - 1);
        state.select(Some(i));
    }
}
