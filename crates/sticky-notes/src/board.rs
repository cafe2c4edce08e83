//! The set of open sticky notes and the windows that show them.

use std::fmt;

use chrono::NaiveDateTime;
use indexmap::IndexMap;

use crate::naming::{initial_content, local_now, note_name, note_path};
use crate::services::NoteServices;
use crate::session::{NoteSession, SessionError};
use crate::vault::{NotePath, VaultError};

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("at most {limit} sticky notes can be open")]
    LimitReached { limit: usize },
    #[error("no open note with id {0}")]
    UnknownNote(NoteId),
    #[error("template not found: {0}")]
    TemplateNotFound(NotePath),
    #[error("window host could not open a popout window")]
    PopoutUnavailable,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Vault(#[from] VaultError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(u64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "note#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl WindowSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Host windowing used by the board.
pub trait WindowHost {
    /// Opens a detached window. `None` when the host cannot open one.
    fn open_popout(&mut self, size: WindowSize) -> Option<WindowId>;

    fn focus(&mut self, window: WindowId);

    fn place(&mut self, window: WindowId, rect: WindowRect);

    fn close(&mut self, window: WindowId);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowEvent {
    Opened(WindowId, WindowSize),
    Focused(WindowId),
    Placed(WindowId, WindowRect),
    Closed(WindowId),
}

/// Window host without a display. Records every request it receives.
#[derive(Debug, Default)]
pub struct HeadlessWindows {
    next_id: u64,
    capacity: Option<usize>,
    open: IndexMap<WindowId, WindowRect>,
    events: Vec<WindowEvent>,
}

impl HeadlessWindows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses to open more than `capacity` windows at once.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn events(&self) -> &[WindowEvent] {
        &self.events
    }

    pub fn open_windows(&self) -> usize {
        self.open.len()
    }

    pub fn rect(&self, window: WindowId) -> Option<WindowRect> {
        self.open.get(&window).copied()
    }

    pub fn last_focused(&self) -> Option<WindowId> {
        self.events.iter().rev().find_map(|event| match event {
            WindowEvent::Focused(window) => Some(*window),
            _ => None,
        })
    }
}

impl WindowHost for HeadlessWindows {
    fn open_popout(&mut self, size: WindowSize) -> Option<WindowId> {
        if self
            .capacity
            .is_some_and(|capacity| self.open.len() >= capacity)
        {
            return None;
        }
        self.next_id += 1;
        let window = WindowId(self.next_id);
        self.open.insert(
            window,
            WindowRect {
                x: 0,
                y: 0,
                width: size.width,
                height: size.height,
            },
        );
        self.events.push(WindowEvent::Opened(window, size));
        Some(window)
    }

    fn focus(&mut self, window: WindowId) {
        self.events.push(WindowEvent::Focused(window));
    }

    fn place(&mut self, window: WindowId, rect: WindowRect) {
        if let Some(slot) = self.open.get_mut(&window) {
            *slot = rect;
        }
        self.events.push(WindowEvent::Placed(window, rect));
    }

    fn close(&mut self, window: WindowId) {
        self.open.shift_remove(&window);
        self.events.push(WindowEvent::Closed(window));
    }
}

/// What [`StickyBoard::open`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opened {
    Created(NoteId),
    /// The file was already open; its window was focused instead.
    Focused(NoteId),
}

impl Opened {
    pub fn id(self) -> NoteId {
        match self {
            Opened::Created(id) | Opened::Focused(id) => id,
        }
    }
}

struct OpenNote {
    window: WindowId,
    session: NoteSession,
}

/// Grid placement for `count` windows on `screen`.
///
/// Columns are `ceil(sqrt(count))`, rows fill up from the top. Windows are
/// at most 400x300 and keep a 20px gutter.
pub fn grid_layout(count: usize, screen: WindowSize) -> Vec<WindowRect> {
    if count == 0 {
        return Vec::new();
    }
    let mut cols = 1;
    while cols * cols < count {
        cols += 1;
    }
    let rows = count.div_ceil(cols);
    let width = (screen.width / cols as u32).saturating_sub(20).min(400);
    let height = (screen.height / rows as u32).saturating_sub(60).min(300);
    (0..count)
        .map(|index| {
            let col = (index % cols) as i32;
            let row = (index / cols) as i32;
            WindowRect {
                x: col * (width as i32 + 20) + 10,
                y: row * (height as i32 + 20) + 50,
                width,
                height,
            }
        })
        .collect()
}

/// Open sticky notes, in the order they were opened.
pub struct StickyBoard<W: WindowHost> {
    services: NoteServices,
    windows: W,
    notes: IndexMap<NoteId, OpenNote>,
    focused: Option<NoteId>,
    next_id: u64,
}

impl<W: WindowHost> StickyBoard<W> {
    pub fn new(services: NoteServices, windows: W) -> Self {
        Self {
            services,
            windows,
            notes: IndexMap::new(),
            focused: None,
            next_id: 0,
        }
    }

    pub fn services(&self) -> &NoteServices {
        &self.services
    }

    pub fn windows(&self) -> &W {
        &self.windows
    }

    pub fn count(&self) -> usize {
        self.notes.len()
    }

    pub fn ids(&self) -> Vec<NoteId> {
        self.notes.keys().copied().collect()
    }

    pub fn session(&self, id: NoteId) -> Option<&NoteSession> {
        self.notes.get(&id).map(|note| &note.session)
    }

    pub fn window(&self, id: NoteId) -> Option<WindowId> {
        self.notes.get(&id).map(|note| note.window)
    }

    pub fn focused(&self) -> Option<NoteId> {
        self.focused
    }

    /// The open note showing `path`, if any.
    pub fn find(&self, path: &NotePath) -> Option<NoteId> {
        self.notes
            .iter()
            .find(|(_, note)| note.session.file().as_ref() == Some(path))
            .map(|(id, _)| *id)
    }

    /// Opens `path` in a new sticky window, or an empty note for `None`.
    /// A file that is already open is focused rather than opened twice.
    pub fn open(&mut self, path: Option<NotePath>) -> Result<Opened, BoardError> {
        if let Some(id) = path.as_ref().and_then(|path| self.find(path)) {
            self.focus(id)?;
            if let Some(path) = &path {
                self.services
                    .notify(&format!("📝 Focused existing sticky: {}", path.basename()));
            }
            return Ok(Opened::Focused(id));
        }
        self.check_limit()?;

        let session = match path {
            Some(path) => NoteSession::open(&self.services, path)?,
            None => NoteSession::new(&self.services),
        };
        let window = match self.open_window() {
            Ok(window) => window,
            Err(err) => {
                session.close();
                return Err(err);
            }
        };
        Ok(Opened::Created(self.register(window, session)))
    }

    /// Creates a note file named after `at` in the sticky notes folder and
    /// opens it.
    pub fn create_new_note_at(&mut self, at: NaiveDateTime) -> Result<NoteId, BoardError> {
        let result = self.check_limit().and_then(|()| {
            let (path, content) = {
                let settings = self.services.settings();
                let name = note_name(&settings.auto_naming_prefix, &at);
                let content = initial_content(&name, &settings, &at);
                (note_path(&settings.sticky_notes_folder, &name), content)
            };
            self.create_and_open(path, &content)
        });
        if let Err(err) = &result {
            log::error!("failed to create new sticky note: {err}");
            self.services
                .notify_forced("❌ Failed to create new sticky note");
        }
        result
    }

    pub fn create_new_note(&mut self) -> Result<NoteId, BoardError> {
        self.create_new_note_at(local_now())
    }

    /// Creates a note holding a copy of `template` and opens it.
    pub fn create_from_template_at(
        &mut self,
        template: &NotePath,
        at: NaiveDateTime,
    ) -> Result<NoteId, BoardError> {
        if !self.services.vault().exists(template.as_str()) {
            self.services
                .notify_forced(&format!("❌ Template not found: {template}"));
            return Err(BoardError::TemplateNotFound(template.clone()));
        }
        let result = self.check_limit().and_then(|()| {
            let content = self.services.vault().read(template)?;
            let path = {
                let settings = self.services.settings();
                let name = note_name(&settings.auto_naming_prefix, &at);
                note_path(&settings.sticky_notes_folder, &name)
            };
            self.create_and_open(path, &content)
        });
        if let Err(err) = &result {
            log::error!("failed to create sticky from template {template}: {err}");
            self.services
                .notify_forced("❌ Failed to create sticky from template");
        }
        result
    }

    pub fn create_from_template(&mut self, template: &NotePath) -> Result<NoteId, BoardError> {
        self.create_from_template_at(template, local_now())
    }

    pub fn focus(&mut self, id: NoteId) -> Result<(), BoardError> {
        let window = self.window(id).ok_or(BoardError::UnknownNote(id))?;
        self.windows.focus(window);
        self.focused = Some(id);
        Ok(())
    }

    /// Focuses the note after the focused one, wrapping around. With no
    /// focused note the first one is focused.
    pub fn focus_next(&mut self) -> Option<NoteId> {
        if self.notes.is_empty() {
            self.services.notify("ℹ️ No sticky notes to focus");
            return None;
        }
        let next = match self
            .focused
            .and_then(|focused| self.notes.get_index_of(&focused))
        {
            Some(index) => (index + 1) % self.notes.len(),
            None => 0,
        };
        let (&id, note) = self.notes.get_index(next)?;
        let name = note
            .session
            .file()
            .map_or_else(|| "Untitled".to_owned(), |file| file.basename().to_owned());
        self.focus(id).ok()?;
        self.services.notify(&format!("➡️ Focused: {name}"));
        Some(id)
    }

    /// Closes one note, saving pending edits.
    pub fn close(&mut self, id: NoteId) -> Result<(), BoardError> {
        let note = self
            .notes
            .shift_remove(&id)
            .ok_or(BoardError::UnknownNote(id))?;
        self.close_note(id, note);
        Ok(())
    }

    /// Closes every note. Returns how many were closed. `silent` skips the
    /// summary notice.
    pub fn close_all(&mut self, silent: bool) -> usize {
        if self.notes.is_empty() {
            if !silent {
                self.services.notify("ℹ️ No sticky notes to close");
            }
            return 0;
        }
        let notes: Vec<_> = self.notes.drain(..).collect();
        let closed = notes.len();
        for (id, note) in notes {
            self.close_note(id, note);
        }
        if !silent {
            self.services
                .notify(&format!("🗑️ Closed {closed} sticky notes"));
        }
        closed
    }

    /// Arranges every open window in a grid on `screen`.
    pub fn organize(&mut self, screen: WindowSize) -> Vec<(NoteId, WindowRect)> {
        if self.notes.is_empty() {
            self.services.notify("ℹ️ No sticky notes to organize");
            return Vec::new();
        }
        let layout: Vec<_> = self
            .notes
            .iter()
            .zip(grid_layout(self.notes.len(), screen))
            .map(|((id, note), rect)| (*id, note.window, rect))
            .collect();
        for (_, window, rect) in &layout {
            self.windows.place(*window, *rect);
        }
        self.services
            .notify(&format!("📐 Organized {} sticky notes", layout.len()));
        layout
            .into_iter()
            .map(|(id, _, rect)| (id, rect))
            .collect()
    }

    fn check_limit(&self) -> Result<(), BoardError> {
        let limit = self.services.settings().max_sticky_notes;
        if self.notes.len() >= limit {
            self.services
                .notify_forced(&format!("⚠️ Maximum of {limit} sticky notes reached"));
            return Err(BoardError::LimitReached { limit });
        }
        Ok(())
    }

    /// The window is opened before the file is written, so a refused
    /// window leaves nothing behind in the vault.
    fn create_and_open(&mut self, path: NotePath, content: &str) -> Result<NoteId, BoardError> {
        let window = self.open_window()?;
        let session = self
            .write_note(&path, content)
            .map_err(BoardError::from)
            .and_then(|()| Ok(NoteSession::open(&self.services, path)?));
        match session {
            Ok(session) => Ok(self.register(window, session)),
            Err(err) => {
                self.windows.close(window);
                Err(err)
            }
        }
    }

    fn write_note(&self, path: &NotePath, content: &str) -> Result<(), VaultError> {
        let vault = self.services.vault();
        if let Some(folder) = path.parent() {
            if !vault.exists(folder) {
                vault.create_folder(folder)?;
            }
        }
        vault.create(path, content)?;
        log::info!("created {path}");
        Ok(())
    }

    fn open_window(&mut self) -> Result<WindowId, BoardError> {
        let size = {
            let settings = self.services.settings();
            WindowSize::new(settings.default_width, settings.default_height)
        };
        self.windows.open_popout(size).ok_or_else(|| {
            self.services
                .notify_forced("❌ Failed to create sticky note");
            BoardError::PopoutUnavailable
        })
    }

    fn register(&mut self, window: WindowId, session: NoteSession) -> NoteId {
        self.next_id += 1;
        let id = NoteId(self.next_id);
        let message = match session.file() {
            Some(file) => format!("📝 Opened sticky: {}", file.basename()),
            None => "📝 Sticky note created!".to_owned(),
        };
        log::info!("opened {id} in window {window:?}");
        self.notes.insert(id, OpenNote { window, session });
        self.windows.focus(window);
        self.focused = Some(id);
        self.services.notify(&message);
        id
    }

    fn close_note(&mut self, id: NoteId, note: OpenNote) {
        note.session.close();
        self.windows.close(note.window);
        if self.focused == Some(id) {
            self.focused = None;
        }
    }
}

impl<W: WindowHost> Drop for StickyBoard<W> {
    fn drop(&mut self) {
        self.close_all(true);
    }
}

#[cfg(test)]
#[path = "tests/board_tests.rs"]
mod tests;
