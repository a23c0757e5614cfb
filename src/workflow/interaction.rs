//! Everything the workflow asks of, or shows to, the user.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Mutex;

use dialoguer::{Confirm, Input, MultiSelect, Select};
use tracing::debug;

use crate::commit::Category;
use crate::config::Config;
use crate::error::AcpError;

const ALL_FILES: &str = "All files";

/// Visual weight of a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelStyle {
    Info,
    Warning,
    Error,
}

impl PanelStyle {
    fn marker(&self) -> &'static str {
        match self {
            PanelStyle::Info => "[INFO]",
            PanelStyle::Warning => "[WARN]",
            PanelStyle::Error => "[FAIL]",
        }
    }
}

/// Prompts and output used by the workflow.
///
/// Prompt methods return a `Cancelled` error when the user backs out.
pub trait UserInteraction: Send + Sync {
    /// Pick files to commit from `changed`. `["."]` means everything.
    fn select_files(&self, changed: &BTreeSet<String>) -> Result<Vec<String>, AcpError>;

    fn select_category(&self, suggested: Category, config: &Config) -> Result<Category, AcpError>;

    fn confirm(&self, prompt: &str) -> Result<bool, AcpError>;

    /// Ask for a commit message by hand. `None` when the user gives none.
    fn prompt_manual_message(&self) -> Option<String> {
        None
    }

    /// Offer to edit an AI draft.
    fn edit_message(&self, message: String) -> Result<String, AcpError> {
        Ok(message)
    }

    fn print_message(&self, message: &str);

    fn print_error(&self, message: &str, suggestion: Option<&str>, title: &str);

    fn print_panel(&self, content: &str, title: &str, style: PanelStyle);
}

/// Render a titled panel as plain text.
pub fn render_panel(content: &str, title: &str, style: PanelStyle) -> String {
    let width = content
        .lines()
        .map(|l| l.chars().count())
        .chain(std::iter::once(title.chars().count() + 8))
        .max()
        .unwrap_or(0)
        .min(100);

    let mut out = format!("── {} {} ", style.marker(), title);
    let used = out.chars().count();
    out.push_str(&"─".repeat(width.saturating_sub(used).max(2)));
    out.push('\n');
    for line in content.lines() {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&"─".repeat(width.max(used + 2)));
    out
}

/// Interactive terminal prompts via dialoguer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalInteraction;

impl UserInteraction for TerminalInteraction {
    fn select_files(&self, changed: &BTreeSet<String>) -> Result<Vec<String>, AcpError> {
        if changed.is_empty() {
            return Err(AcpError::git("No changed files found to commit."));
        }

        if changed.len() == 1 {
            let file: Vec<String> = changed.iter().cloned().collect();
            println!("Adding file: {}", file[0]);
            return Ok(file);
        }

        let mut items: Vec<String> = changed.iter().cloned().collect();
        items.push(ALL_FILES.to_string());

        let picked = MultiSelect::new()
            .with_prompt("Select files to commit (space to select, enter to confirm)")
            .items(&items)
            .interact_opt()
            .map_err(|_| AcpError::cancelled())?
            .ok_or_else(AcpError::cancelled)?;

        if picked.is_empty() {
            return Err(AcpError::git("No files selected."));
        }

        let selected: Vec<String> = picked.into_iter().map(|i| items[i].clone()).collect();
        if selected.iter().any(|f| f == ALL_FILES) {
            println!("Adding all files");
            return Ok(vec![".".to_string()]);
        }

        println!("Adding files:");
        for file in &selected {
            println!("  - {}", file);
        }
        Ok(selected)
    }

    fn select_category(&self, suggested: Category, config: &Config) -> Result<Category, AcpError> {
        if config.skip_confirmation {
            debug!("Auto-selecting commit type: {}", suggested);
            return Ok(suggested);
        }

        // Suggested category first, the rest in menu order
        let choices: Vec<Category> = std::iter::once(suggested)
            .chain(Category::ALL.iter().copied().filter(|c| *c != suggested))
            .collect();
        let labels: Vec<String> = choices
            .iter()
            .map(|c| {
                if *c == suggested {
                    format!("{} (suggested)", c.label())
                } else {
                    c.label().to_string()
                }
            })
            .collect();

        let index = Select::new()
            .with_prompt("Select commit type")
            .items(&labels)
            .default(0)
            .interact_opt()
            .map_err(|_| AcpError::cancelled())?
            .ok_or_else(AcpError::cancelled)?;

        Ok(choices[index])
    }

    fn confirm(&self, prompt: &str) -> Result<bool, AcpError> {
        Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact_opt()
            .map_err(|_| AcpError::cancelled())?
            .ok_or_else(AcpError::cancelled)
    }

    fn prompt_manual_message(&self) -> Option<String> {
        let message: String = Input::new()
            .with_prompt("Enter commit message")
            .allow_empty(true)
            .interact_text()
            .ok()?;
        let message = message.trim();
        (!message.is_empty()).then(|| message.to_string())
    }

    fn edit_message(&self, message: String) -> Result<String, AcpError> {
        self.print_panel(&message, "Generated Commit Message", PanelStyle::Info);
        if !self.confirm("Would you like to edit this message?")? {
            return Ok(message);
        }

        let edited: String = Input::new()
            .with_prompt("Edit commit message")
            .with_initial_text(message.clone())
            .allow_empty(true)
            .interact_text()
            .map_err(|_| AcpError::cancelled())?;

        let edited = edited.trim();
        if edited.is_empty() {
            Ok(message)
        } else {
            Ok(edited.to_string())
        }
    }

    fn print_message(&self, message: &str) {
        println!("{}", message);
    }

    fn print_error(&self, message: &str, suggestion: Option<&str>, title: &str) {
        let mut content = message.to_string();
        if let Some(suggestion) = suggestion {
            content.push_str("\n\nSuggestion:\n");
            content.push_str(suggestion);
        }
        eprintln!("{}", render_panel(&content, title, PanelStyle::Error));
    }

    fn print_panel(&self, content: &str, title: &str, style: PanelStyle) {
        println!("{}", render_panel(content, title, style));
    }
}

/// A panel or error shown through [`ScriptedInteraction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPanel {
    pub title: String,
    pub content: String,
    pub style: PanelStyle,
}

/// Non-interactive [`UserInteraction`] with canned answers.
///
/// Records every prompt and panel so callers can assert on them.
#[derive(Debug)]
pub struct ScriptedInteraction {
    files: Mutex<Option<Result<Vec<String>, AcpError>>>,
    category: Mutex<Option<Result<Category, AcpError>>>,
    confirms: Mutex<VecDeque<Result<bool, AcpError>>>,
    default_confirm: bool,
    manual_message: Option<String>,
    edited_message: Option<String>,
    prompts: Mutex<Vec<String>>,
    panels: Mutex<Vec<RecordedPanel>>,
    messages: Mutex<Vec<String>>,
}

impl Default for ScriptedInteraction {
    fn default() -> Self {
        Self {
            files: Mutex::new(None),
            category: Mutex::new(None),
            confirms: Mutex::new(VecDeque::new()),
            default_confirm: true,
            manual_message: None,
            edited_message: None,
            prompts: Mutex::new(Vec::new()),
            panels: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedInteraction {
    /// Accepts every suggestion and confirms every prompt.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(self, files: Vec<String>) -> Self {
        self.set(&self.files, Some(Ok(files)));
        self
    }

    pub fn failing_file_selection(self, error: AcpError) -> Self {
        self.set(&self.files, Some(Err(error)));
        self
    }

    pub fn with_category(self, category: Category) -> Self {
        self.set(&self.category, Some(Ok(category)));
        self
    }

    pub fn cancelling_category(self) -> Self {
        self.set(&self.category, Some(Err(AcpError::cancelled())));
        self
    }

    /// Answers for successive `confirm` calls.
    pub fn with_confirms(self, answers: impl IntoIterator<Item = bool>) -> Self {
        self.set(&self.confirms, answers.into_iter().map(Ok).collect());
        self
    }

    /// Answer for `confirm` once the scripted answers run out.
    pub fn confirming_by_default(mut self, answer: bool) -> Self {
        self.default_confirm = answer;
        self
    }

    pub fn with_manual_message(mut self, message: impl Into<String>) -> Self {
        self.manual_message = Some(message.into());
        self
    }

    pub fn with_edited_message(mut self, message: impl Into<String>) -> Self {
        self.edited_message = Some(message.into());
        self
    }

    /// Every confirm prompt, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.get(&self.prompts)
    }

    pub fn panels(&self) -> Vec<RecordedPanel> {
        self.get(&self.panels)
    }

    pub fn panel_titles(&self) -> Vec<String> {
        self.panels().into_iter().map(|p| p.title).collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.get(&self.messages)
    }

    fn set<T>(&self, slot: &Mutex<T>, value: T) {
        if let Ok(mut guard) = slot.lock() {
            *guard = value;
        }
    }

    fn get<T: Clone>(&self, slot: &Mutex<T>) -> T
    where
        T: Default,
    {
        slot.lock().map(|g| g.clone()).unwrap_or_default()
    }

    fn record_panel(&self, title: &str, content: String, style: PanelStyle) {
        if let Ok(mut panels) = self.panels.lock() {
            panels.push(RecordedPanel {
                title: title.to_string(),
                content,
                style,
            });
        }
    }
}

impl UserInteraction for ScriptedInteraction {
    fn select_files(&self, changed: &BTreeSet<String>) -> Result<Vec<String>, AcpError> {
        let scripted = self.files.lock().ok().and_then(|g| g.clone());
        scripted.unwrap_or_else(|| {
            if changed.is_empty() {
                return Err(AcpError::git("No changed files found to commit."));
            }
            Ok(changed.iter().cloned().collect())
        })
    }

    fn select_category(&self, suggested: Category, _config: &Config) -> Result<Category, AcpError> {
        let scripted = self.category.lock().ok().and_then(|g| g.clone());
        scripted.unwrap_or(Ok(suggested))
    }

    fn confirm(&self, prompt: &str) -> Result<bool, AcpError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.confirms
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or(Ok(self.default_confirm))
    }

    fn prompt_manual_message(&self) -> Option<String> {
        self.manual_message.clone()
    }

    fn edit_message(&self, message: String) -> Result<String, AcpError> {
        Ok(self.edited_message.clone().unwrap_or(message))
    }

    fn print_message(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }

    fn print_error(&self, message: &str, suggestion: Option<&str>, title: &str) {
        let content = match suggestion {
            Some(s) => format!("{}\n\nSuggestion:\n{}", message, s),
            None => message.to_string(),
        };
        self.record_panel(title, content, PanelStyle::Error);
    }

    fn print_panel(&self, content: &str, title: &str, style: PanelStyle) {
        self.record_panel(title, content.to_string(), style);
    }
}
