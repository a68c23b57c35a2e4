use std::io::{self, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::queue;
use crossterm::style::{Color, Print, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::game::Game;
use crate::keymap::Mode;

// Sentinel cache entry that can never match drawn content, forcing a redraw
const DIRTY: &str = "\u{0}";

pub struct Ui {
    pub screen_cols: u16,
    pub screen_rows: u16, // excluding status row
    pub off_x: usize,
    pub off_y: usize,
    prev_lines: Vec<String>,
    prev_status: String,
}

impl Ui {
    pub fn new() -> io::Result<Self> {
        let (cols, rows) = terminal::size()?;
        Ok(Self {
            screen_cols: cols,
            screen_rows: rows.saturating_sub(1),
            off_x: 0,
            off_y: 0,
            prev_lines: vec![String::new(); rows.saturating_sub(1) as usize],
            prev_status: String::new(),
        })
    }

    pub fn resize(&mut self, w: u16, h: u16) {
        self.screen_cols = w;
        self.screen_rows = h.saturating_sub(1);
        self.prev_lines = vec![String::new(); self.screen_rows as usize];
        self.prev_status.clear();
    }

    pub fn clear_cache(&mut self) {
        self.prev_lines.fill(String::new());
        self.prev_status.clear();
    }

    fn truncate_to_width(s: &str, max_w: usize) -> String {
        if max_w == 0 {
            return String::new();
        }
        let mut out = String::new();
        let mut acc = 0usize;
        for g in s.graphemes(true) {
            let w = UnicodeWidthStr::width(g).max(1);
            if acc + w > max_w {
                break;
            }
            out.push_str(g);
            acc += w;
        }
        out
    }

    /// Display column of grapheme column `col` in `line`.
    fn display_col(line: &str, col: usize) -> usize {
        line.graphemes(true)
            .take(col)
            .map(|g| UnicodeWidthStr::width(g).max(1))
            .sum()
    }

    fn scroll(&mut self, game: &Game) {
        if game.cy < self.off_y {
            self.off_y = game.cy;
        }
        if game.cy >= self.off_y + self.screen_rows as usize {
            self.off_y = game.cy + 1 - self.screen_rows as usize;
        }
        let dx = Self::display_col(&game.buf.line_string(game.cy), game.cx);
        if dx < self.off_x {
            self.off_x = dx;
        }
        if dx >= self.off_x + self.screen_cols as usize {
            self.off_x = dx + 1 - self.screen_cols as usize;
        }
    }

    fn draw_rows<W: Write>(&mut self, mut w: W, game: &Game) -> io::Result<()> {
        let selection = game.selection();
        let block_cursor = !game.cursor_visible();
        for row in 0..self.screen_rows as usize {
            let file_row = self.off_y + row;
            if file_row >= game.buf.line_count() {
                if self.prev_lines[row] != "~" {
                    queue!(
                        w,
                        MoveTo(0, row as u16),
                        Clear(ClearType::CurrentLine),
                        Print("~")
                    )?;
                    self.prev_lines[row] = "~".to_string();
                }
                continue;
            }
            let line = game.buf.line_string(file_row);
            // Selection bounds for this row in grapheme columns
            let sel = selection.and_then(|((sy, sx), (ey, ex))| {
                if file_row < sy || file_row > ey {
                    None
                } else if sy == ey {
                    Some((sx, ex))
                } else if file_row == sy {
                    Some((sx, line.graphemes(true).count()))
                } else if file_row == ey {
                    Some((0, ex))
                } else {
                    Some((0, line.graphemes(true).count()))
                }
            });
            let cursor_cell = if block_cursor && file_row == game.cy {
                Some(game.cx)
            } else {
                None
            };
            if sel.is_none() && cursor_cell.is_none() {
                // Fast path: plain text, diffed against the cache
                let mut out = String::new();
                let mut dcol = 0usize;
                let start_col = self.off_x;
                let end_col = start_col + self.screen_cols as usize;
                for g in line.graphemes(true) {
                    let next = dcol + UnicodeWidthStr::width(g).max(1);
                    if next <= start_col {
                        dcol = next;
                        continue;
                    }
                    if dcol >= end_col {
                        break;
                    }
                    out.push_str(g);
                    dcol = next;
                }
                if self.prev_lines[row] != out {
                    queue!(
                        w,
                        MoveTo(0, row as u16),
                        Clear(ClearType::CurrentLine),
                        Print(&out)
                    )?;
                    self.prev_lines[row] = out;
                }
            } else {
                // Decorated row: redraw every frame
                queue!(w, MoveTo(0, row as u16), Clear(ClearType::CurrentLine))?;
                let start_col = self.off_x;
                let end_col = start_col + self.screen_cols as usize;
                let mut dcol = 0usize;
                let mut count = 0usize;
                for (i, g) in line.graphemes(true).enumerate() {
                    count = i + 1;
                    let next = dcol + UnicodeWidthStr::width(g).max(1);
                    if next <= start_col {
                        dcol = next;
                        continue;
                    }
                    if dcol >= end_col {
                        break;
                    }
                    let on_cursor = cursor_cell == Some(i);
                    let in_sel = sel.map_or(false, |(s, e)| i >= s && i < e);
                    if on_cursor {
                        queue!(
                            w,
                            SetBackgroundColor(Color::White),
                            SetForegroundColor(Color::Black)
                        )?;
                    } else if in_sel {
                        queue!(
                            w,
                            SetBackgroundColor(Color::DarkGrey),
                            SetForegroundColor(Color::White)
                        )?;
                    }
                    queue!(w, Print(g))?;
                    if on_cursor || in_sel {
                        queue!(
                            w,
                            SetForegroundColor(Color::Reset),
                            SetBackgroundColor(Color::Reset)
                        )?;
                    }
                    dcol = next;
                }
                // A cursor resting past the last character renders as a
                // reversed cell
                if cursor_cell.is_some_and(|c| c >= count) {
                    queue!(
                        w,
                        SetBackgroundColor(Color::White),
                        Print(" "),
                        SetBackgroundColor(Color::Reset)
                    )?;
                }
                self.prev_lines[row] = DIRTY.to_string();
            }
        }
        Ok(())
    }

    fn draw_status_bar<W: Write>(&mut self, mut w: W, game: &Game) -> io::Result<()> {
        let status_row = self.screen_rows;
        let left_full = match game.mode() {
            Mode::Normal => " -- NORMAL -- ".to_string(),
            Mode::Insert => " -- INSERT -- ".to_string(),
            Mode::Visual => " -- VISUAL -- ".to_string(),
            Mode::Replace => " -- REPLACE -- ".to_string(),
            // The command line is shown verbatim as it is typed
            Mode::Command => format!(" {} ", game.command_text()),
        };
        let (level, total) = game.level_progress();
        let right_full = format!(" Level {}/{} ", level, total);
        let total_w = self.screen_cols as usize;
        let right_w = UnicodeWidthStr::width(right_full.as_str());
        let left = total_w.saturating_sub(right_w);
        let left_str = Self::truncate_to_width(&left_full, left);
        let left_w = UnicodeWidthStr::width(left_str.as_str());
        let pad = left.saturating_sub(left_w);
        let mut content = String::new();
        content.push_str(&left_str);
        if pad > 0 {
            content.push_str(&" ".repeat(pad));
        }
        if right_w <= total_w.saturating_sub(left_w + pad) {
            content.push_str(&right_full);
        }
        if self.prev_status != content {
            queue!(
                w,
                MoveTo(0, status_row),
                Clear(ClearType::CurrentLine),
                SetForegroundColor(Color::Black),
                SetBackgroundColor(Color::White),
                Print(&content),
                SetForegroundColor(Color::Reset),
                SetBackgroundColor(Color::Reset)
            )?;
            self.prev_status = content;
        }
        Ok(())
    }

    pub fn refresh<W: Write>(&mut self, mut w: W, game: &Game) -> io::Result<()> {
        self.scroll(game);
        self.draw_rows(&mut w, game)?;
        self.draw_status_bar(&mut w, game)?;
        if game.cursor_visible() {
            let cur_y = (game.cy - self.off_y) as u16;
            let dx = Self::display_col(&game.buf.line_string(game.cy), game.cx);
            let cur_x = dx.saturating_sub(self.off_x) as u16;
            queue!(w, MoveTo(cur_x, cur_y), Show)?;
        } else {
            queue!(w, Hide)?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn draw_complete_banner<W: Write>(&mut self, mut w: W) -> io::Result<()> {
        let msg = "== GAME COMPLETE ==";
        let row = self.screen_rows / 2;
        let col = (self.screen_cols as usize).saturating_sub(msg.len()) / 2;
        queue!(
            w,
            MoveTo(col as u16, row),
            SetForegroundColor(Color::Green),
            Print(msg),
            SetForegroundColor(Color::Reset)
        )?;
        w.flush()?;
        Ok(())
    }
}
