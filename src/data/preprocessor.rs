// ============================================================
// Layer 4 — Sentence Preprocessor
// ============================================================
// Normalises one line of a parallel corpus before it is counted
// into the vocabulary or encoded into ids.
//
// Cleaning steps (applied in order):
//   1. Map Unicode whitespace variants and control characters to a space
//   2. Collapse runs of spaces into one
//   3. Trim both ends
//   4. Optionally lowercase

#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    lowercase: bool,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self { lowercase: true }
    }

    /// Keep the original casing.
    pub fn preserving_case() -> Self {
        Self { lowercase: false }
    }

    /// Clean one sentence. Newlines inside the input are treated as spaces.
    pub fn clean(&self, line: &str) -> String {
        let mut out        = String::with_capacity(line.len());
        let mut last_space = true; // swallows leading whitespace

        for c in line.chars() {
            let c = match c {
                '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_whitespace() || c.is_control() => ' ',
                c => c,
            };
            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else if self.lowercase {
                out.extend(c.to_lowercase());
                last_space = false;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        // At most one trailing space can survive the loop
        if out.ends_with(' ') {
            out.pop();
        }
        out
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
