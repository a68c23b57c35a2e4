use std::collections::{HashMap, VecDeque};

use tracing::{debug, info};

use crate::buffer::{Buffer, BufferResult};
use crate::keymap::{default_keymap, load_config, Action, Key, Mode};
use crate::level::{levels, Level};

const HISTORY_LIMIT: usize = 50;

/// Multi-key commands park here until the second key arrives. A tick with
/// no input leaves the state untouched, so a pending command is never
/// dropped by the non-blocking loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Go,
    Find,
    Till,
    Replace,
    Delete,
    Change,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// One training session: the buffer under edit, the modal state machine and
/// everything it owns, plus the level tracker.
pub struct Game {
    pub buf: Buffer,
    pub cx: usize,
    pub cy: usize,
    mode: Mode,
    keymap: HashMap<char, Action>,
    history: VecDeque<Buffer>,
    yank_register: Vec<String>,
    visual_anchor: Option<(usize, usize)>,
    pending: Option<Pending>,
    command: String,
    last_search: String,
    levels: Vec<Level>,
    level_index: usize,
    target: Buffer,
}

impl Game {
    pub fn new() -> Self {
        let cfg = load_config(default_keymap());
        let levels = levels();
        let start = cfg.start_level.min(levels.len().saturating_sub(1));
        let mut game = Self {
            buf: Buffer::default(),
            cx: 0,
            cy: 0,
            mode: Mode::Normal,
            keymap: cfg.keymap,
            history: VecDeque::new(),
            yank_register: Vec::new(),
            visual_anchor: None,
            pending: None,
            command: String::new(),
            last_search: String::new(),
            levels,
            level_index: 0,
            target: Buffer::default(),
        };
        game.load_level(start);
        game
    }

    // --- State exposed to the rendering layer ---

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn command_text(&self) -> &str {
        &self.command
    }

    /// Selection bounds in document order while in VISUAL mode; the live
    /// endpoint is the cursor itself.
    pub fn selection(&self) -> Option<((usize, usize), (usize, usize))> {
        if self.mode != Mode::Visual {
            return None;
        }
        let anchor = self.visual_anchor?;
        let cursor = (self.cy, self.cx);
        Some(if anchor <= cursor {
            (anchor, cursor)
        } else {
            (cursor, anchor)
        })
    }

    pub fn cursor_visible(&self) -> bool {
        matches!(self.mode, Mode::Insert | Mode::Replace)
    }

    pub fn level_progress(&self) -> (usize, usize) {
        (self.level_index + 1, self.levels.len())
    }

    // --- Level tracking ---

    fn load_level(&mut self, index: usize) {
        self.level_index = index;
        let level = &self.levels[index];
        self.buf = Buffer::from_lines(&level.initial);
        self.target = Buffer::from_lines(&level.target);
        self.cx = 0;
        self.cy = 0;
        self.mode = Mode::Normal;
        self.visual_anchor = None;
        self.pending = None;
        self.command.clear();
        // Stale undo/paste state must not leak across levels
        self.history.clear();
        self.yank_register.clear();
        self.clamp_cursor();
        info!(level = index + 1, total = self.levels.len(), "level loaded");
    }

    pub fn is_level_complete(&self) -> bool {
        self.buf == self.target
    }

    /// Loads the next level; false when the campaign is finished.
    pub fn advance_level(&mut self) -> bool {
        if self.level_index + 1 < self.levels.len() {
            self.load_level(self.level_index + 1);
            true
        } else {
            info!("all levels complete");
            false
        }
    }

    // --- Dispatch ---

    pub fn handle_key(&mut self, key: Key) -> BufferResult<Flow> {
        match self.mode {
            Mode::Normal => self.handle_normal(key),
            Mode::Insert => {
                self.handle_insert(key)?;
                Ok(Flow::Continue)
            }
            Mode::Visual => {
                self.handle_visual(key);
                Ok(Flow::Continue)
            }
            Mode::Command => {
                self.handle_command(key)?;
                Ok(Flow::Continue)
            }
            Mode::Replace => {
                self.handle_replace(key)?;
                Ok(Flow::Continue)
            }
        }
    }

    fn handle_normal(&mut self, key: Key) -> BufferResult<Flow> {
        if let Some(pending) = self.pending.take() {
            self.resolve_pending(pending, key)?;
            return Ok(Flow::Continue);
        }
        let Key::Char(c) = key else {
            return Ok(Flow::Continue);
        };
        let Some(&act) = self.keymap.get(&c) else {
            return Ok(Flow::Continue);
        };
        match act {
            Action::MoveLeft => self.move_left(),
            Action::MoveRight => self.move_right(),
            Action::MoveUp => self.move_up(),
            Action::MoveDown => self.move_down(),
            Action::WordForward => self.move_word_forward(),
            Action::WordBackward => self.move_word_backward(),
            Action::WordEnd => self.move_to_end_of_word(),
            Action::Goto => self.pending = Some(Pending::Go),
            Action::GotoLastLine => {
                self.cy = self.buf.line_count().saturating_sub(1);
                self.cx = 0;
                self.clamp_cursor();
            }
            Action::FindChar => self.pending = Some(Pending::Find),
            Action::TillChar => self.pending = Some(Pending::Till),
            Action::ReplaceChar => self.pending = Some(Pending::Replace),
            Action::EnterReplace => {
                self.save_history();
                self.set_mode(Mode::Replace);
            }
            Action::Change => self.pending = Some(Pending::Change),
            Action::Delete => self.pending = Some(Pending::Delete),
            Action::Paste => self.paste()?,
            Action::Undo => self.undo(),
            Action::EnterVisual => self.set_mode(Mode::Visual),
            Action::CommandPrompt => {
                self.command = String::from(":");
                self.set_mode(Mode::Command);
            }
            Action::SearchPrompt => {
                self.command = String::from("/");
                self.set_mode(Mode::Command);
            }
            Action::SearchNext => self.search_next(),
            Action::SearchPrev => self.search_prev(),
            Action::EnterInsert => {
                self.save_history();
                self.set_mode(Mode::Insert);
            }
            Action::DeleteChar => self.delete_char_under_cursor()?,
            Action::Quit => return Ok(Flow::Quit),
            // yank only acts on a visual selection
            Action::Yank => {}
        }
        Ok(Flow::Continue)
    }

    fn resolve_pending(&mut self, pending: Pending, key: Key) -> BufferResult<()> {
        // Anything but a character cancels the sequence
        let Key::Char(c) = key else {
            return Ok(());
        };
        match pending {
            Pending::Go => {
                if c == 'g' {
                    self.cy = 0;
                    self.cx = 0;
                    self.clamp_cursor();
                }
            }
            Pending::Find => {
                if let Some(x) = self.buf.find_char_forward(self.cy, self.cx, c) {
                    self.cx = x;
                }
            }
            Pending::Till => {
                if let Some(x) = self.buf.find_char_forward(self.cy, self.cx, c) {
                    self.cx = x.saturating_sub(1);
                }
            }
            Pending::Replace => {
                if !c.is_control() && self.cx < self.buf.line_len(self.cy) {
                    self.save_history();
                    self.buf.replace_char(self.cy, self.cx, c)?;
                }
            }
            Pending::Delete => match c {
                'w' => {
                    self.save_history();
                    self.delete_word();
                }
                'd' => {
                    self.save_history();
                    self.delete_line()?;
                }
                _ => {}
            },
            Pending::Change => {
                if c == 'w' {
                    self.save_history();
                    self.delete_word();
                    self.set_mode(Mode::Insert);
                }
            }
        }
        Ok(())
    }

    fn handle_insert(&mut self, key: Key) -> BufferResult<()> {
        match key {
            Key::Esc => self.set_mode(Mode::Normal),
            Key::Enter => {
                self.buf.split_line(self.cy, self.cx)?;
                self.cy += 1;
                self.cx = 0;
            }
            Key::Backspace => {
                if self.cx > 0 {
                    self.buf.delete_char(self.cy, self.cx - 1)?;
                    self.cx -= 1;
                } else if self.cy > 0 {
                    let prev_len = self.buf.line_len(self.cy - 1);
                    self.buf.join_lines(self.cy - 1)?;
                    self.cy -= 1;
                    self.cx = prev_len;
                }
            }
            Key::Char(c) if !c.is_control() => {
                self.buf.insert_char(self.cy, self.cx, c)?;
                self.cx += 1;
            }
            Key::Char(_) => {}
        }
        self.clamp_cursor();
        Ok(())
    }

    fn handle_replace(&mut self, key: Key) -> BufferResult<()> {
        match key {
            Key::Esc => self.set_mode(Mode::Normal),
            Key::Char(c) if !c.is_control() => {
                if self.cx < self.buf.line_len(self.cy) {
                    self.buf.replace_char(self.cy, self.cx, c)?;
                }
                self.move_right();
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_visual(&mut self, key: Key) {
        let Key::Char(c) = key else {
            return;
        };
        match self.keymap.get(&c) {
            Some(Action::MoveLeft) => self.move_left(),
            Some(Action::MoveRight) => self.move_right(),
            Some(Action::MoveUp) => self.move_up(),
            Some(Action::MoveDown) => self.move_down(),
            Some(Action::WordForward) => self.move_word_forward(),
            Some(Action::WordBackward) => self.move_word_backward(),
            Some(Action::WordEnd) => self.move_to_end_of_word(),
            Some(Action::Yank) => self.yank(),
            _ => {}
        }
    }

    fn handle_command(&mut self, key: Key) -> BufferResult<()> {
        match key {
            Key::Enter => {
                let cmd = std::mem::take(&mut self.command);
                match cmd.chars().next() {
                    Some('/') => {
                        self.last_search = cmd[1..].to_string();
                        self.set_mode(Mode::Normal);
                        self.search_next();
                    }
                    Some(':') => {
                        self.execute_ex(&cmd[1..])?;
                        self.set_mode(Mode::Normal);
                    }
                    _ => self.set_mode(Mode::Normal),
                }
            }
            Key::Esc => {
                self.command.clear();
                self.set_mode(Mode::Normal);
            }
            Key::Backspace => {
                self.command.pop();
                if self.command.is_empty() {
                    self.set_mode(Mode::Normal);
                }
            }
            Key::Char(c) if !c.is_control() => self.command.push(c),
            Key::Char(_) => {}
        }
        Ok(())
    }

    /// Executes the body of a `:` command: substitution or go-to-line.
    /// Anything unparseable is discarded without complaint.
    fn execute_ex(&mut self, body: &str) -> BufferResult<()> {
        if let Some(rest) = body.strip_prefix("s/") {
            let mut parts = rest.splitn(3, '/');
            let pattern = parts.next().unwrap_or("");
            let Some(replacement) = parts.next() else {
                debug!(command = body, "discarding malformed substitution");
                return Ok(());
            };
            if pattern.is_empty() {
                return Ok(());
            }
            if self.buf.line(self.cy)?.contains(pattern) {
                self.save_history();
                self.buf.replace_first(self.cy, pattern, replacement)?;
                debug!(pattern, replacement, line = self.cy, "substituted");
            }
            self.clamp_cursor();
        } else {
            match body.trim().parse::<usize>() {
                Ok(n) => {
                    self.cy = n.saturating_sub(1);
                    self.cx = 0;
                    self.clamp_cursor();
                    debug!(line = n, "jumped to line");
                }
                Err(_) => debug!(command = body, "discarding unknown command"),
            }
        }
        Ok(())
    }

    // --- Mode transitions ---

    fn set_mode(&mut self, new_mode: Mode) {
        if new_mode == Mode::Visual && self.mode != Mode::Visual {
            self.visual_anchor = Some((self.cy, self.cx));
        }
        self.mode = new_mode;
        // In NORMAL the cursor rests on a character, never past the end
        if self.mode == Mode::Normal {
            let len = self.buf.line_len(self.cy);
            self.cx = self.cx.min(len.saturating_sub(1));
        }
        self.clamp_cursor();
    }

    fn clamp_cursor(&mut self) {
        let max_y = self.buf.line_count().saturating_sub(1);
        self.cy = self.cy.min(max_y);
        self.cx = self.cx.min(self.buf.line_len(self.cy));
    }

    // --- Motions ---

    fn move_left(&mut self) {
        if let Some((y, x)) = self.buf.step_left(self.cy, self.cx) {
            self.cy = y;
            self.cx = x;
        }
        self.clamp_cursor();
    }

    fn move_right(&mut self) {
        if let Some((y, x)) = self.buf.step_right(self.cy, self.cx) {
            self.cy = y;
            self.cx = x;
        }
        self.clamp_cursor();
    }

    fn move_up(&mut self) {
        if self.cy > 0 {
            self.cy -= 1;
        }
        self.clamp_cursor();
    }

    fn move_down(&mut self) {
        if self.cy + 1 < self.buf.line_count() {
            self.cy += 1;
        }
        self.clamp_cursor();
    }

    fn move_word_forward(&mut self) {
        let (y, x) = self.buf.word_forward(self.cy, self.cx);
        self.cy = y;
        self.cx = x;
        self.clamp_cursor();
    }

    fn move_word_backward(&mut self) {
        let (y, x) = self.buf.word_backward(self.cy, self.cx);
        self.cy = y;
        self.cx = x;
        self.clamp_cursor();
    }

    fn move_to_end_of_word(&mut self) {
        let (y, x) = self.buf.end_of_word(self.cy, self.cx);
        self.cy = y;
        self.cx = x;
        self.clamp_cursor();
    }

    fn search_next(&mut self) {
        if let Some((y, x)) = self.buf.search_forward(self.cy, self.cx, &self.last_search) {
            self.cy = y;
            self.cx = x;
        }
    }

    fn search_prev(&mut self) {
        if let Some((y, x)) = self.buf.search_backward(self.cy, self.cx, &self.last_search) {
            self.cy = y;
            self.cx = x;
        }
    }

    // --- Edits ---

    fn delete_char_under_cursor(&mut self) -> BufferResult<()> {
        if self.cx < self.buf.line_len(self.cy) {
            self.save_history();
            self.buf.delete_char(self.cy, self.cx)?;
            self.clamp_cursor();
        }
        Ok(())
    }

    /// Deletes the half-open range from the cursor to the next word start;
    /// a range spanning lines splices the boundary lines together.
    fn delete_word(&mut self) {
        let (ty, tx) = self.buf.word_forward(self.cy, self.cx);
        let start = self.buf.char_index(self.cy, self.cx);
        let end = self.buf.char_index(ty, tx);
        self.buf.remove_char_range(start, end);
        self.clamp_cursor();
    }

    fn delete_line(&mut self) -> BufferResult<()> {
        self.yank_register = vec![self.buf.line(self.cy)?];
        self.buf.delete_line(self.cy);
        self.clamp_cursor();
        Ok(())
    }

    fn yank(&mut self) {
        let Some(anchor) = self.visual_anchor else {
            self.set_mode(Mode::Normal);
            return;
        };
        let cursor = (self.cy, self.cx);
        let ((sy, sx), (ey, ex)) = if anchor <= cursor {
            (anchor, cursor)
        } else {
            (cursor, anchor)
        };
        let start = self.buf.char_index(sy, sx);
        let end = self.buf.char_index(ey, ex);
        self.yank_register = self
            .buf
            .slice(start, end)
            .split('\n')
            .map(String::from)
            .collect();
        self.set_mode(Mode::Normal);
    }

    fn paste(&mut self) -> BufferResult<()> {
        if self.yank_register.is_empty() {
            return Ok(());
        }
        self.save_history();
        let text = self.yank_register.join("\n");
        self.buf.insert_text(self.cy, self.cx, &text)?;
        self.clamp_cursor();
        Ok(())
    }

    // --- Undo ---

    fn save_history(&mut self) {
        self.history.push_back(self.buf.clone());
        if self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }

    fn undo(&mut self) {
        if let Some(prev) = self.history.pop_back() {
            self.buf = prev;
            self.clamp_cursor();
        }
    }
}
