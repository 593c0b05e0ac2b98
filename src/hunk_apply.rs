use crate::patch_format::{HunkLine, UnifiedPatch};

/// A hunk that matched nowhere inside the fuzz window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejected {
    /// 1-based index of the hunk within the patch.
    pub hunk: usize,
    /// Line the hunk was recorded at.
    pub line: usize,
}

fn same_line(a: &str, b: &str) -> bool {
    a.trim_end_matches(['\r', '\n']) == b.trim_end_matches(['\r', '\n'])
}

fn matches_at(image: &[&str], expected: &[&str], pos: usize) -> bool {
    pos + expected.len() <= image.len()
        && image[pos..pos + expected.len()]
            .iter()
            .zip(expected)
            .all(|(a, b)| same_line(a, b))
}

/// Find where `expected` matches in `image`, trying `hint` first and then
/// alternating backward/forward up to `fuzz` lines away. Positions before
/// `floor` belong to earlier hunks and are never considered.
fn find_position(image: &[&str], expected: &[&str], hint: usize, floor: usize, fuzz: usize) -> Option<usize> {
    let candidates = std::iter::once(hint).chain((1..=fuzz).flat_map(|d| {
        let back = hint.checked_sub(d);
        let fwd = hint.checked_add(d);
        back.into_iter().chain(fwd)
    }));
    candidates
        .filter(|&pos| pos >= floor)
        .find(|&pos| matches_at(image, expected, pos))
}

/// Apply `patch` to `base`, letting each hunk drift up to `fuzz` lines from
/// its recorded position (after accounting for the drift of earlier hunks).
///
/// Context lines are taken from `base`, so a drifted line ending is kept as
/// the live text has it.
pub fn apply(base: &str, patch: &UnifiedPatch, fuzz: usize) -> Result<String, Rejected> {
    let image: Vec<&str> = base.split_inclusive('\n').collect();
    let mut out = String::with_capacity(base.len());
    let mut cursor = 0usize;
    let mut drift = 0isize;

    for (idx, hunk) in patch.hunks.iter().enumerate() {
        let expected: Vec<&str> = hunk.old_lines().collect();
        let recorded = if expected.is_empty() {
            hunk.old_start
        } else {
            hunk.old_start.saturating_sub(1)
        };
        let hint = recorded.saturating_add_signed(drift).max(cursor);

        let pos = find_position(&image, &expected, hint, cursor, fuzz).ok_or(Rejected {
            hunk: idx + 1,
            line: hunk.old_start,
        })?;
        drift = pos as isize - recorded as isize;

        for line in &image[cursor..pos] {
            push_line(&mut out, line);
        }
        let mut taken = pos;
        for line in &hunk.lines {
            match line {
                HunkLine::Context(_) => {
                    push_line(&mut out, image[taken]);
                    taken += 1;
                }
                HunkLine::Remove(_) => taken += 1,
                HunkLine::Add(text) => push_line(&mut out, text),
            }
        }
        cursor = taken;
    }

    for line in &image[cursor..] {
        push_line(&mut out, line);
    }
    Ok(out)
}

/// Append `line`, first terminating the previous line if it was left without
/// a newline: a line that is followed by another one is no longer last.
fn push_line(out: &mut String, line: &str) {
    if !out.is_empty() && !out.ends_with('\n') {
        let crlf = line.ends_with("\r\n") && !out.ends_with('\r');
        out.push_str(if crlf { "\r\n" } else { "\n" });
    }
    out.push_str(line);
}
