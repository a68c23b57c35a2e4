/// A training stage: the buffer the player starts from and the buffer they
/// must produce. Completion is exact structural equality.
#[derive(Debug, Clone)]
pub struct Level {
    pub initial: Vec<String>,
    pub target: Vec<String>,
}

impl Level {
    fn new(initial: &[&str], target: &[&str]) -> Self {
        Self {
            initial: initial.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// The built-in campaign, in play order.
pub fn levels() -> Vec<Level> {
    vec![
        // Basic movement and deletion
        Level::new(
            &[
                "This is an eror line.",
                "Fix the typo hear.",
                "And another won here.",
            ],
            &[
                "This is an error line.",
                "Fix the typo here.",
                "And another one here.",
            ],
        ),
        // Boss: typos to fix character by character
        Level::new(
            &[
                "This is a ruset gate. It iz full of erors.",
                "Yoou musrt fix dem charracter byy characer.",
                "Manny, manny misstakes in teh syystem.",
                "Cleen it upp, hackerr.",
                "All typoss shuld be corrrrected.",
            ],
            &[
                "This is a rust gate. It is full of errors.",
                "You must fix them character by character.",
                "Many, many mistakes in the system.",
                "Clean it up, hacker.",
                "All typos should be corrected.",
            ],
        ),
        // Word movements
        Level::new(
            &["delete-this-word and this-one-too", "and this-one-also"],
            &["and", "also"],
        ),
        // Visual mode, copy/paste
        Level::new(
            &["line to be copied", "paste here -> "],
            &["line to be copied", "paste here -> line to be copied"],
        ),
        // Search
        Level::new(
            &[
                "find the secret word",
                "the secret word is 'synergy'",
                "jump to synergy and delete it",
            ],
            &[
                "find the secret word",
                "the secret word is ''",
                "jump to synergy and delete it",
            ],
        ),
        // Replace
        Level::new(
            &[
                "Rreplace this line with correct characters",
                "and tis one tooo",
            ],
            &[
                "Replace this line with correct characters",
                "and this one too",
            ],
        ),
    ]
}
