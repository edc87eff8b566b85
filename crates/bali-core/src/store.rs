use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name used when no data file is configured
pub const DATA_FILE_NAME: &str = "bali_ai_data.json";

const DUPLICATE_OR_EMPTY: &str = "⚠️ Task is empty or already exists.";

/// A stored reminder. `time` is free text and never validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub task: String,
    pub time: String,
    pub created: String,
}

/// On-disk layout of the data file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantData {
    #[serde(default)]
    pub todo_list: Vec<String>,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
}

/// To-do list and reminders backed by a flat JSON file.
///
/// Every mutation rewrites the whole file.
#[derive(Debug)]
pub struct DataStore {
    path: PathBuf,
    data: AssistantData,
}

impl DataStore {
    /// Open the store at `path`, loading existing data if the file exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = Self::load(&path)?;
        info!(
            path = %path.display(),
            todos = data.todo_list.len(),
            reminders = data.reminders.len(),
            "loaded assistant data"
        );
        Ok(Self { path, data })
    }

    pub fn load(path: &Path) -> Result<AssistantData> {
        if !path.exists() {
            return Ok(AssistantData::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read data file {}", path.display()))?;
        let data: AssistantData = serde_json::from_str(&content)
            .with_context(|| format!("Data file {} is not valid JSON", path.display()))?;
        Ok(data)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write data file {}", self.path.display()))?;
        debug!(path = %self.path.display(), "saved assistant data");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &AssistantData {
        &self.data
    }

    pub fn todos(&self) -> &[String] {
        &self.data.todo_list
    }

    pub fn reminders(&self) -> &[Reminder] {
        &self.data.reminders
    }

    /// Add a task unless it is blank or already present. The task is
    /// stored exactly as given.
    ///
    /// Returns the message to show the user.
    pub fn add_todo(&mut self, task: &str) -> Result<String> {
        if task.trim().is_empty() || self.data.todo_list.iter().any(|t| t == task) {
            return Ok(DUPLICATE_OR_EMPTY.to_string());
        }

        self.data.todo_list.push(task.to_string());
        if let Err(e) = self.save() {
            self.data.todo_list.pop();
            return Err(e);
        }
        Ok(format!("✅ Added to your to-do list: {}", task))
    }

    /// Append a reminder. No field is validated.
    pub fn add_reminder(&mut self, task: &str, time: &str) -> Result<String> {
        let created = Local::now()
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string();

        self.data.reminders.push(Reminder {
            task: task.to_string(),
            time: time.to_string(),
            created,
        });
        if let Err(e) = self.save() {
            self.data.reminders.pop();
            return Err(e);
        }
        Ok(format!("⏰ Reminder set: {} at {}", task, time))
    }

    /// Remove the task at `index`. Returns the removed task, if any.
    pub fn remove_todo(&mut self, index: usize) -> Result<Option<String>> {
        if index >= self.data.todo_list.len() {
            return Ok(None);
        }
        let removed = self.data.todo_list.remove(index);
        if let Err(e) = self.save() {
            self.data.todo_list.insert(index, removed);
            return Err(e);
        }
        Ok(Some(removed))
    }

    /// Remove the reminder at `index`. Returns the removed reminder, if any.
    pub fn remove_reminder(&mut self, index: usize) -> Result<Option<Reminder>> {
        if index >= self.data.reminders.len() {
            return Ok(None);
        }
        let removed = self.data.reminders.remove(index);
        if let Err(e) = self.save() {
            self.data.reminders.insert(index, removed);
            return Err(e);
        }
        Ok(Some(removed))
    }
}
