// model = "claude-opus-4-5"
// created = "2026-02-02"
// modified = "2026-02-03"
// driver = "Isaac Clayton"

//! Line-granular diff producing aligned change blocks.
//!
//! The diff works on line identities, not characters:
//!
//! 1. **Interning**: every distinct line is mapped to a small integer, so
//!    comparing lines is one integer compare.
//! 2. **Myers**: the classic O(ND) greedy search runs over the interned
//!    sequences, after the common prefix and suffix are trimmed away.
//! 3. **Coalescing**: runs of consecutive insertions and deletions are
//!    merged into replacement blocks.
//!
//! The output is a list of `Block { a1, a2, b1, b2 }` meaning "replace
//! lines `a1..a2` of the old text with lines `b1..b2` of the new text".
//! Blocks are ordered by `a1`, never overlap, and never describe an
//! identity replacement.

use std::collections::HashMap;

use crate::lines::split_lines;

/// One aligned change: old lines `a1..a2` become new lines `b1..b2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block {
    /// First changed line of the old text.
    pub a1: usize,
    /// One past the last changed line of the old text.
    pub a2: usize,
    /// First replacement line of the new text.
    pub b1: usize,
    /// One past the last replacement line of the new text.
    pub b2: usize,
}

/// One step of a line-level edit script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Edit {
    Keep,
    Delete,
    Insert,
}

/// Diff two texts at line granularity into ordered change blocks.
/// Applying the blocks to `a` (right-to-left, so indices stay valid)
/// reproduces `b` exactly.
pub fn diff_blocks(a: &str, b: &str) -> Vec<Block> {
    let a_lines = split_lines(a);
    let b_lines = split_lines(b);

    let mut ids: HashMap<&str, u32> = HashMap::new();
    let a_ids = intern(&a_lines, &mut ids);
    let b_ids = intern(&b_lines, &mut ids);

    // Trim the common prefix and suffix so the search only sees the
    // changed core.
    let mut pre = 0;
    while pre < a_ids.len() && pre < b_ids.len() && a_ids[pre] == b_ids[pre] {
        pre += 1;
    }
    let mut post = 0;
    while post < a_ids.len() - pre
        && post < b_ids.len() - pre
        && a_ids[a_ids.len() - 1 - post] == b_ids[b_ids.len() - 1 - post]
    {
        post += 1;
    }

    let edits = myers(
        &a_ids[pre..a_ids.len() - post],
        &b_ids[pre..b_ids.len() - post],
    );

    // Coalesce runs of non-Keep edits into replacement blocks.
    let mut blocks = Vec::new();
    let mut ai = pre;
    let mut bi = pre;
    let mut i = 0;
    while i < edits.len() {
        if edits[i] == Edit::Keep {
            ai += 1;
            bi += 1;
            i += 1;
            continue;
        }
        let a1 = ai;
        let b1 = bi;
        while i < edits.len() && edits[i] != Edit::Keep {
            match edits[i] {
                Edit::Delete => ai += 1,
                Edit::Insert => bi += 1,
                Edit::Keep => unreachable!(),
            }
            i += 1;
        }
        blocks.push(Block { a1, a2: ai, b1, b2: bi });
    }
    return blocks;
}

/// Map each line to a dense integer id, shared across both inputs.
fn intern<'a>(lines: &[&'a str], ids: &mut HashMap<&'a str, u32>) -> Vec<u32> {
    let mut out = Vec::with_capacity(lines.len());
    for &line in lines {
        let next = ids.len() as u32;
        out.push(*ids.entry(line).or_insert(next));
    }
    return out;
}

/// Myers' greedy O(ND) diff over interned ids, recording the frontier of
/// every round so the edit script can be backtracked afterwards. Memory
/// is O(D * (N + M)), which is fine for single-file histories.
// TODO: Switch to the linear-space middle-snake variant if trace memory
// ever shows up in profiles on machine-generated files.
fn myers(a: &[u32], b: &[u32]) -> Vec<Edit> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = n + m;
    if max == 0 {
        return Vec::new();
    }

    let offset = max;
    let width = (2 * max + 1) as usize;
    let mut v = vec![0isize; width];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    'search: for d in 0..=max {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let idx = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                // Step down: extend the path from the diagonal above.
                v[idx + 1]
            } else {
                // Step right: extend the path from the diagonal below.
                v[idx - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    // Backtrack from (n, m) through the recorded frontiers.
    let mut edits = Vec::new();
    let mut x = n;
    let mut y = m;
    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let idx = (k + offset) as usize;
        let prev_k = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
            k + 1
        } else {
            k - 1
        };
        let prev_idx = (prev_k + offset) as usize;
        let prev_x = v[prev_idx];
        let prev_y = prev_x - prev_k;
        while x > prev_x && y > prev_y {
            edits.push(Edit::Keep);
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                edits.push(Edit::Insert);
                y -= 1;
            } else {
                edits.push(Edit::Delete);
                x -= 1;
            }
        }
    }
    edits.reverse();
    return edits;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Apply blocks to `a` and return the rebuilt text.
    fn apply(a: &str, b: &str, blocks: &[Block]) -> String {
        let a_lines = split_lines(a);
        let b_lines = split_lines(b);
        let mut out: Vec<&str> = a_lines.clone();
        for block in blocks.iter().rev() {
            out.splice(block.a1..block.a2, b_lines[block.b1..block.b2].iter().copied());
        }
        return out.concat();
    }

    fn check_round_trip(a: &str, b: &str) {
        let blocks = diff_blocks(a, b);
        assert_eq!(apply(a, b, &blocks), b, "diff of {:?} -> {:?}", a, b);
        // Blocks are ordered, disjoint, and never empty on both sides.
        for pair in blocks.windows(2) {
            assert!(pair[0].a2 <= pair[1].a1);
        }
        for block in &blocks {
            assert!(block.a1 <= block.a2);
            assert!(block.b1 <= block.b2);
            assert!(block.a2 - block.a1 + block.b2 - block.b1 > 0);
        }
    }

    #[test]
    fn identical_texts_have_no_blocks() {
        assert_eq!(diff_blocks("a\nb\n", "a\nb\n"), Vec::new());
        assert_eq!(diff_blocks("", ""), Vec::new());
    }

    #[test]
    fn insert_into_empty() {
        let blocks = diff_blocks("", "a\nb\n");
        assert_eq!(blocks, vec![Block { a1: 0, a2: 0, b1: 0, b2: 2 }]);
    }

    #[test]
    fn delete_to_empty() {
        let blocks = diff_blocks("a\nb\n", "");
        assert_eq!(blocks, vec![Block { a1: 0, a2: 2, b1: 0, b2: 0 }]);
    }

    #[test]
    fn single_line_replacement() {
        let blocks = diff_blocks("a\nb\nc\n", "a\nx\nc\n");
        assert_eq!(blocks, vec![Block { a1: 1, a2: 2, b1: 1, b2: 2 }]);
    }

    #[test]
    fn insertion_in_the_middle() {
        let blocks = diff_blocks("a\nc\n", "a\nb\nc\n");
        assert_eq!(blocks, vec![Block { a1: 1, a2: 1, b1: 1, b2: 2 }]);
    }

    #[test]
    fn deletion_at_the_front() {
        let blocks = diff_blocks("a\nb\nc\n", "b\nc\n");
        assert_eq!(blocks, vec![Block { a1: 0, a2: 1, b1: 0, b2: 0 }]);
    }

    #[test]
    fn disjoint_changes_become_separate_blocks() {
        let blocks = diff_blocks("a\nb\nc\nd\ne\n", "x\nb\nc\nd\ny\n");
        assert_eq!(
            blocks,
            vec![
                Block { a1: 0, a2: 1, b1: 0, b2: 1 },
                Block { a1: 4, a2: 5, b1: 4, b2: 5 },
            ]
        );
    }

    #[test]
    fn trailing_segment_without_newline_is_its_own_line() {
        // "e" and "e\n" are different lines, so finishing a file with a
        // newline shows up as a replacement of the last line.
        let blocks = diff_blocks("a\ne", "a\ne\n");
        assert_eq!(blocks, vec![Block { a1: 1, a2: 2, b1: 1, b2: 2 }]);
    }

    #[test]
    fn round_trips_on_assorted_inputs() {
        let cases = [
            ("", ""),
            ("", "a\n"),
            ("a\n", ""),
            ("a\nb\nc\n", "c\nb\na\n"),
            ("a\nb\nc\nd\n", "a\nd\n"),
            ("x\n", "a\nx\nb\nx\nc\n"),
            ("same\nsame\nsame\n", "same\nsame\n"),
            ("one\ntwo\nthree", "one\n2\nthree"),
            ("\n\n\n", "\n\n"),
            ("alpha\nbeta\n", "beta\nalpha\n"),
        ];
        for (a, b) in cases {
            check_round_trip(a, b);
            check_round_trip(b, a);
        }
    }

    #[test]
    fn repeated_lines_still_round_trip() {
        let a = "a\na\na\na\n";
        let b = "a\nb\na\nb\na\n";
        check_round_trip(a, b);
        check_round_trip(b, a);
    }
}
