use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Insert,
    Visual,
    Command,
    Replace,
}

/// Canonical input event delivered by the terminal layer. Enter, Escape and
/// Backspace carry their own variants; everything else arrives as a char.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Esc,
    Backspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    WordForward,
    WordBackward,
    WordEnd,
    Goto, // awaits a second 'g'
    GotoLastLine,
    FindChar,    // awaits the target character
    TillChar,    // awaits the target character
    ReplaceChar, // awaits the replacement character
    EnterReplace,
    Change, // awaits 'w'
    Delete, // awaits 'w' or 'd'
    Paste,
    Undo,
    Yank,
    EnterVisual,
    CommandPrompt,
    SearchPrompt,
    SearchNext,
    SearchPrev,
    EnterInsert,
    DeleteChar,
    Quit,
}

pub fn default_keymap() -> HashMap<char, Action> {
    use Action::*;
    let mut m = HashMap::new();
    m.insert('h', MoveLeft);
    m.insert('j', MoveDown);
    m.insert('k', MoveUp);
    m.insert('l', MoveRight);
    m.insert('w', WordForward);
    m.insert('b', WordBackward);
    m.insert('e', WordEnd);
    m.insert('g', Goto);
    m.insert('G', GotoLastLine);
    m.insert('f', FindChar);
    m.insert('t', TillChar);
    m.insert('r', ReplaceChar);
    m.insert('R', EnterReplace);
    m.insert('c', Change);
    m.insert('d', Delete);
    m.insert('p', Paste);
    m.insert('u', Undo);
    m.insert('y', Yank);
    m.insert('v', EnterVisual);
    m.insert(':', CommandPrompt);
    m.insert('/', SearchPrompt);
    m.insert('n', SearchNext);
    m.insert('N', SearchPrev);
    m.insert('i', EnterInsert);
    m.insert('x', DeleteChar);
    m.insert('q', Quit);
    m
}

fn parse_action(name: &str) -> Option<Action> {
    use Action::*;
    match name.trim() {
        "move_left" | "h" => Some(MoveLeft),
        "move_down" | "j" => Some(MoveDown),
        "move_up" | "k" => Some(MoveUp),
        "move_right" | "l" => Some(MoveRight),
        "word_forward" | "w" => Some(WordForward),
        "word_backward" | "b" => Some(WordBackward),
        "word_end" | "e" => Some(WordEnd),
        "goto" | "g" => Some(Goto),
        "goto_last_line" | "G" => Some(GotoLastLine),
        "find_char" | "f" => Some(FindChar),
        "till_char" | "t" => Some(TillChar),
        "replace_char" | "r" => Some(ReplaceChar),
        "replace" | "R" => Some(EnterReplace),
        "change" | "c" => Some(Change),
        "delete" | "d" => Some(Delete),
        "paste" | "p" => Some(Paste),
        "undo" | "u" => Some(Undo),
        "yank" | "y" => Some(Yank),
        "visual" | "v" => Some(EnterVisual),
        "command" | ":" => Some(CommandPrompt),
        "search" | "/" => Some(SearchPrompt),
        "search_next" | "n" => Some(SearchNext),
        "search_prev" | "N" => Some(SearchPrev),
        "insert" | "i" => Some(EnterInsert),
        "delete_char" | "x" => Some(DeleteChar),
        "quit" | "q" => Some(Quit),
        _ => None,
    }
}

pub struct GameConfig {
    pub keymap: HashMap<char, Action>,
    pub start_level: usize,
}

pub fn load_config(base: HashMap<char, Action>) -> GameConfig {
    // Search order:
    // 1) ./vimnet.conf
    // 2) $XDG_CONFIG_HOME/vimnet/config.conf
    // 3) ~/.config/vimnet/config.conf
    let mut candidates = Vec::new();
    candidates.push(PathBuf::from("vimnet.conf"));
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        let mut p = PathBuf::from(xdg);
        p.push("vimnet");
        p.push("config.conf");
        candidates.push(p);
    } else if let Ok(home) = std::env::var("HOME") {
        let mut p = PathBuf::from(home);
        p.push(".config/vimnet/config.conf");
        candidates.push(p);
    }
    let mut cfg = GameConfig {
        keymap: base,
        start_level: 0,
    };
    for path in candidates {
        if let Ok(content) = fs::read_to_string(&path) {
            parse_config(&content, &mut cfg);
        }
    }
    cfg
}

fn parse_config(content: &str, cfg: &mut GameConfig) {
    let mut section = String::new();
    for line in content.lines() {
        let s = line.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        if s.starts_with('[') && s.ends_with(']') {
            section = s[1..s.len() - 1].to_string();
            continue;
        }
        if let Some(eq) = s.find('=') {
            let (lhs, rhs) = s.split_at(eq);
            let key = lhs.trim().trim_matches('"');
            let val = rhs[1..].trim(); // skip '='
            match section.as_str() {
                "normal" => {
                    let mut chars = key.chars();
                    if let (Some(c), None) = (chars.next(), chars.next()) {
                        if let Some(act) = parse_action(val) {
                            cfg.keymap.insert(c, act);
                        }
                    }
                }
                "general" => {
                    if key.eq_ignore_ascii_case("start_level") {
                        if let Ok(n) = val.trim_matches('"').parse::<usize>() {
                            cfg.start_level = n.saturating_sub(1);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}
