use std::fmt::Write as _;

use similar::TextDiff;

pub const ORIGINAL_LABEL: &str = "original";
pub const MODIFIED_LABEL: &str = "modified";
pub const CONTEXT_LINES: usize = 3;

const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// One line of a hunk body. The text keeps its line terminator, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLine {
    Context(String),
    Remove(String),
    Add(String),
}

impl HunkLine {
    fn text_mut(&mut self) -> &mut String {
        match self {
            HunkLine::Context(t) | HunkLine::Remove(t) | HunkLine::Add(t) => t,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// 1-based start in the original text (for pure insertions: the line after
    /// which the new lines go).
    pub old_start: usize,
    pub new_start: usize,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    /// Lines the hunk expects to find in the text it is applied to.
    pub fn old_lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|l| match l {
            HunkLine::Context(t) | HunkLine::Remove(t) => Some(t.as_str()),
            HunkLine::Add(_) => None,
        })
    }

    /// Number of lines the hunk covers on the original and modified side.
    pub fn span(&self) -> (usize, usize) {
        self.lines.iter().fold((0, 0), |(old, new), line| match line {
            HunkLine::Context(_) => (old + 1, new + 1),
            HunkLine::Remove(_) => (old + 1, new),
            HunkLine::Add(_) => (old, new + 1),
        })
    }
}

/// A single-file unified diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnifiedPatch {
    /// File name from the `---` header, without its side label.
    pub name: Option<String>,
    pub hunks: Vec<Hunk>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchStats {
    pub hunks: usize,
    pub insertions: usize,
    pub deletions: usize,
}

impl UnifiedPatch {
    pub fn stats(&self) -> PatchStats {
        let mut stats = PatchStats {
            hunks: self.hunks.len(),
            ..PatchStats::default()
        };
        for line in self.hunks.iter().flat_map(|h| &h.lines) {
            match line {
                HunkLine::Add(_) => stats.insertions += 1,
                HunkLine::Remove(_) => stats.deletions += 1,
                HunkLine::Context(_) => {}
            }
        }
        stats
    }
}

/// Render the unified diff turning `original` into `modified`, labelled with `name`.
///
/// Lines end at `\n` only, matching [`parse`] and the applier; a lone `\r`
/// stays part of its line. Identical texts render to the index header alone.
pub fn render(name: &str, original: &str, modified: &str) -> String {
    let old: Vec<&str> = original.split_inclusive('\n').collect();
    let new: Vec<&str> = modified.split_inclusive('\n').collect();
    let diff = TextDiff::configure()
        .newline_terminated(true)
        .diff_slices(&old, &new);

    let old_label = format!("{name}\t{ORIGINAL_LABEL}");
    let new_label = format!("{name}\t{MODIFIED_LABEL}");
    let mut unified = diff.unified_diff();
    unified
        .context_radius(CONTEXT_LINES)
        .header(&old_label, &new_label);

    let mut out = format!("Index: {name}\n{}\n", "=".repeat(67));
    if !ends_with_bare_cr(original) && !ends_with_bare_cr(modified) {
        out.push_str(&unified.to_string());
        return out;
    }

    // similar treats a final bare `\r` as a line end and would run the next
    // diff line into it, so such texts are written change by change.
    for (idx, hunk) in unified.iter_hunks().enumerate() {
        if idx == 0 {
            let _ = writeln!(out, "--- {old_label}\n+++ {new_label}");
        }
        let _ = writeln!(out, "{}", hunk.header());
        for change in hunk.iter_changes() {
            let _ = write!(out, "{}{}", change.tag(), change.value());
            if !change.value().ends_with('\n') {
                let _ = writeln!(out, "\n{NO_NEWLINE_MARKER}");
            }
        }
    }
    out
}

fn ends_with_bare_cr(text: &str) -> bool {
    text.ends_with('\r')
}

struct HunkHeader {
    old_start: usize,
    old_count: usize,
    new_start: usize,
    new_count: usize,
}

/// Parse `@@ -a,b +c,d @@`; a missing count means 1.
fn parse_hunk_header(line: &str) -> Option<HunkHeader> {
    let body = line.strip_prefix("@@")?;
    let body = &body[..body.find("@@")?];
    let mut old = None;
    let mut new = None;
    for token in body.split_whitespace() {
        if let Some(range) = token.strip_prefix('-') {
            old = Some(parse_range(range)?);
        } else if let Some(range) = token.strip_prefix('+') {
            new = Some(parse_range(range)?);
        }
    }
    let (old_start, old_count) = old?;
    let (new_start, new_count) = new?;
    Some(HunkHeader {
        old_start,
        old_count,
        new_start,
        new_count,
    })
}

fn parse_range(range: &str) -> Option<(usize, usize)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

/// First line past a hunk side starting at `start` and covering `len` lines.
/// An empty side's start is the line before the change, not the first line of it.
fn line_after(start: usize, len: usize) -> usize {
    if len == 0 {
        start + 1
    } else {
        start + len
    }
}

/// Lines still expected in the current hunk body; `None` when the header
/// carried no usable counts.
type Remaining = Option<(usize, usize)>;

fn accepts(remaining: Remaining, sign: u8) -> bool {
    match remaining {
        None => true,
        Some((old, new)) => match sign {
            b' ' => old > 0 && new > 0,
            b'-' => old > 0,
            b'+' => new > 0,
            _ => false,
        },
    }
}

/// Parse a unified diff leniently.
///
/// Anything outside a hunk that is not a hunk header (index lines, separators,
/// `---`/`+++` headers, garbage) is skipped. A hunk header with unreadable
/// ranges is kept, placed right after the previous hunk, and its body runs
/// until the first line that is not a body line.
pub fn parse(text: &str) -> UnifiedPatch {
    let mut patch = UnifiedPatch::default();
    let mut current: Option<Hunk> = None;
    let mut remaining: Remaining = None;

    for raw in text.split_inclusive('\n') {
        let line = raw.trim_end_matches(['\r', '\n']);

        if line.starts_with('\\') {
            // Marker refers to the line right before it.
            let last = current
                .as_mut()
                .or(patch.hunks.last_mut())
                .and_then(|h| h.lines.last_mut());
            if let Some(last) = last {
                let text = last.text_mut();
                if text.ends_with('\n') {
                    text.pop();
                }
            }
            continue;
        }

        if let Some(hunk) = current.as_mut() {
            // Blank lines inside a hunk are context lines whose space was stripped.
            let (sign, body) = match raw.as_bytes().first() {
                Some(b'\n') | Some(b'\r') => (b' ', raw),
                Some(&s @ (b' ' | b'-' | b'+')) => (s, &raw[1..]),
                _ => (0, raw),
            };
            let in_body = sign != 0 && accepts(remaining, sign);
            if in_body {
                let body = body.to_string();
                match sign {
                    b' ' => hunk.lines.push(HunkLine::Context(body)),
                    b'-' => hunk.lines.push(HunkLine::Remove(body)),
                    _ => hunk.lines.push(HunkLine::Add(body)),
                }
                if let Some((old, new)) = remaining.as_mut() {
                    if sign != b'+' {
                        *old -= 1;
                    }
                    if sign != b'-' {
                        *new -= 1;
                    }
                }
                continue;
            }
            if let Some(done) = current.take() {
                patch.hunks.push(done);
            }
        }

        if line.starts_with("@@") {
            match parse_hunk_header(line) {
                Some(header) => {
                    remaining = Some((header.old_count, header.new_count));
                    current = Some(Hunk {
                        old_start: header.old_start,
                        new_start: header.new_start,
                        lines: Vec::new(),
                    });
                }
                None => {
                    tracing::warn!(header = line, "unreadable hunk header, placing after previous hunk");
                    let (old_start, new_start) = patch
                        .hunks
                        .last()
                        .map(|h| {
                            let (old_len, new_len) = h.span();
                            (line_after(h.old_start, old_len), line_after(h.new_start, new_len))
                        })
                        .unwrap_or((1, 1));
                    remaining = None;
                    current = Some(Hunk {
                        old_start,
                        new_start,
                        lines: Vec::new(),
                    });
                }
            }
        } else if let Some(header) = line.strip_prefix("--- ") {
            if patch.name.is_none() {
                let name = header.split('\t').next().unwrap_or(header).trim();
                if !name.is_empty() {
                    patch.name = Some(name.to_string());
                }
            }
        }
    }

    if let Some(done) = current.take() {
        patch.hunks.push(done);
    }
    patch
}
