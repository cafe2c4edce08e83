//! One open sticky note.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use sticky_core::{Debouncer, Invoke};

use crate::services::NoteServices;
use crate::settings::SettingsError;
use crate::vault::{NotePath, VaultError};

const UNTITLED: &str = "Sticky Note";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no file is attached to this note")]
    NoFile,
    #[error("note is closed")]
    Closed,
    #[error(transparent)]
    Vault(#[from] VaultError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub file: Option<NotePath>,
    pub is_pinned: bool,
    /// Raw markdown editing; `false` is live preview.
    pub is_edit_mode: bool,
    pub is_favorited: bool,
}

/// Editing state of one note plus its debounced auto-save.
///
/// [`edit`](Self::edit) is meant to be called on every keystroke. The text
/// is written once typing has paused for the configured auto-save delay.
pub struct NoteSession {
    services: NoteServices,
    state: Rc<RefCell<SessionState>>,
    auto_save: Debouncer<String>,
    closed: Cell<bool>,
}

impl NoteSession {
    /// A session without a file, in live preview.
    pub fn new(services: &NoteServices) -> Self {
        let state = Rc::new(RefCell::new(SessionState::default()));
        let auto_save = {
            let vault = Rc::clone(services.vault());
            let notifier = Rc::downgrade(services.notifier());
            let state = Rc::downgrade(&state);
            Debouncer::trailing(
                services.runtime(),
                services.settings().auto_save_delay(),
                move |text: String| {
                    let Some(state) = state.upgrade() else {
                        return;
                    };
                    let file = state.borrow().file.clone();
                    let Some(file) = file else {
                        log::debug!("auto-save skipped, no file attached");
                        return;
                    };
                    match vault.modify(&file, &text) {
                        Ok(()) => log::info!("saved {file}"),
                        Err(err) => {
                            log::error!("failed to save {file}: {err}");
                            if let Some(notifier) = notifier.upgrade() {
                                let message = format!("❌ Failed to save {}", file.basename());
                                notifier.show(&message, true);
                            }
                        }
                    }
                },
            )
        };
        Self {
            services: services.clone(),
            state,
            auto_save,
            closed: Cell::new(false),
        }
    }

    /// A session attached to an existing file.
    pub fn open(services: &NoteServices, path: NotePath) -> Result<Self, SessionError> {
        let session = Self::new(services);
        session.set_file(path)?;
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn file(&self) -> Option<NotePath> {
        self.state.borrow().file.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Window title: the file's basename, the mode, then pin and favorite
    /// markers.
    pub fn display_text(&self) -> String {
        let state = self.state.borrow();
        let mut text = state
            .file
            .as_ref()
            .map_or(UNTITLED, NotePath::basename)
            .to_owned();
        text.push_str(if state.is_edit_mode { " [RAW]" } else { " [LIVE]" });
        if state.is_pinned {
            text.push_str(" 📌");
        }
        if state.is_favorited {
            text.push_str(" ⭐");
        }
        text
    }

    /// Attaches `path`. Unsaved edits for the previous file are written
    /// first. The note returns to live preview.
    pub fn set_file(&self, path: NotePath) -> Result<(), SessionError> {
        self.ensure_open()?;
        if !self.services.vault().exists(path.as_str()) {
            return Err(VaultError::NotFound(path).into());
        }
        self.auto_save.flush();
        let is_favorited = self.services.settings().is_favorite(&path);
        {
            let mut state = self.state.borrow_mut();
            state.file = Some(path.clone());
            state.is_edit_mode = false;
            state.is_favorited = is_favorited;
        }
        log::info!("note attached to {path}");
        self.services
            .notify(&format!("📄 Loaded: {}", path.basename()));
        Ok(())
    }

    /// Current file content. Empty when no file is attached.
    pub fn content(&self) -> Result<String, SessionError> {
        match self.file() {
            Some(file) => Ok(self.services.vault().read(&file)?),
            None => Ok(String::new()),
        }
    }

    /// Writes `text` now, replacing any pending auto-save.
    pub fn set_content(&self, text: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        let file = self.file().ok_or(SessionError::NoFile)?;
        self.auto_save.cancel();
        self.services.vault().modify(&file, text)?;
        log::info!("saved {file}");
        Ok(())
    }

    /// Records an edit. The latest text is saved after the auto-save delay.
    pub fn edit(&self, text: impl Into<String>) -> Invoke {
        self.auto_save.invoke(text.into())
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.auto_save.is_pending()
    }

    /// Writes pending edits now. Returns whether anything was written.
    pub fn save_now(&self) -> bool {
        self.auto_save.flush()
    }

    /// Switches between raw editing and live preview. Leaving raw editing
    /// saves pending edits first.
    pub fn toggle_edit_mode(&self, is_edit_mode: bool) {
        if self.closed.get() {
            return;
        }
        let was_edit_mode = self.state.borrow().is_edit_mode;
        if was_edit_mode && !is_edit_mode && self.auto_save.flush() {
            self.services.notify("💾 Changes saved before mode switch");
        }
        self.state.borrow_mut().is_edit_mode = is_edit_mode;
        self.services.notify(if is_edit_mode {
            "✨ Switched to Raw Edit Mode"
        } else {
            "✨ Switched to Live Preview Mode"
        });
    }

    pub fn toggle_pin(&self, is_pinned: bool) {
        if self.closed.get() {
            return;
        }
        self.state.borrow_mut().is_pinned = is_pinned;
        self.services.notify(if is_pinned {
            "📌 Sticky note pinned on top"
        } else {
            "📌 Sticky note unpinned"
        });
    }

    /// Marks the attached file as a favorite and persists the settings.
    /// Does nothing without a file.
    pub fn toggle_favorite(&self, is_favorited: bool) -> Result<(), SessionError> {
        self.ensure_open()?;
        let Some(file) = self.file() else {
            return Ok(());
        };
        self.services
            .update_settings(|settings| {
                settings.set_favorite(&file, is_favorited);
            })?;
        self.state.borrow_mut().is_favorited = is_favorited;
        self.services.notify(if is_favorited {
            "⭐ Added to favorites"
        } else {
            "☆ Removed from favorites"
        });
        Ok(())
    }

    /// Saves pending edits and stops auto-saving. Idempotent.
    pub fn close(&self) {
        if self.closed.replace(true) {
            return;
        }
        self.auto_save.flush();
        self.auto_save.dispose();
        log::info!("closed note {}", self.display_text());
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed.get() {
            return Err(SessionError::Closed);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
