// model = "claude-opus-4-5"
// created = "2026-02-02"
// modified = "2026-02-04"
// driver = "Isaac Clayton"

//! The linelog core: interpreter, editor, and cached view.
//!
//! A `LineLog` stores the whole history of a text file as one instruction
//! sequence. The design hinges on three ideas:
//!
//! 1. **Snapshot by interpretation**: executing the program with
//!    `start == end == R` emits exactly the lines of revision R. The two
//!    conditional jumps partition the program so each revision sees its
//!    own path through the same code.
//!
//! 2. **Union by widening**: executing with `start < end` walks every
//!    path any revision in the range could see, so deleted lines surface
//!    in place. A membership set of live program counters tells the
//!    caller which emitted lines belong to the end snapshot.
//!
//! 3. **Edits append**: recording a revision appends one small chunk per
//!    changed region and rewrites a single existing instruction per chunk
//!    to route readers through it. The program grows with the diff, not
//!    with the file.
//!
//! `lines` and `content` are caches derived from the program; they are
//! rebuilt by `check_out` and kept in sync incrementally by the editor.

use std::collections::HashMap;
use std::collections::HashSet;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde_json::Map;
use serde_json::Value;

use crate::diff::Block;
use crate::diff::diff_blocks;
use crate::inst::Inst;
use crate::lines::split_lines;

/// One line of a checked-out view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineInfo {
    /// The line's text, trailing newline included (if it has one).
    pub data: String,
    /// The revision that introduced this line. 0 for the sentinel.
    pub rev: u64,
    /// Address of the instruction that emitted this line.
    pub pc: usize,
    /// True when a range checkout found this line missing from the end
    /// revision's snapshot. Always false for plain checkouts.
    pub deleted: bool,
}

/// The complete edit history of one text file.
pub struct LineLog {
    /// The compiled program. Append-mostly; editing rewrites one
    /// instruction per chunk in place.
    pub(crate) code: Vec<Inst>,
    /// Commit timestamp (milliseconds) per recorded revision.
    pub(crate) ts_map: HashMap<u64, u64>,
    /// Opaque caller-supplied metadata per recorded revision.
    pub(crate) extra_map: HashMap<u64, Map<String, Value>>,
    /// Highest revision ever recorded.
    pub(crate) max_rev: u64,
    /// Revision of the cached snapshot view, or None when the cache
    /// holds a union view (or nothing reusable).
    pub(crate) last_checkout_rev: Option<u64>,
    /// Lines of the current view, one per emitted LINE plus the sentinel.
    pub(crate) lines: Vec<LineInfo>,
    /// Concatenation of the current view's line data.
    pub(crate) content: String,
}

impl LineLog {
    /// Create an empty linelog, checked out at revision 0.
    pub fn new() -> LineLog {
        let mut log = LineLog {
            code: vec![Inst::End],
            ts_map: HashMap::new(),
            extra_map: HashMap::new(),
            max_rev: 0,
            last_checkout_rev: None,
            lines: Vec::new(),
            content: String::new(),
        };
        log.check_out(0, None);
        return log;
    }

    /// The text of the current view. After a range checkout this includes
    /// deleted lines; filter `lines()` on `deleted` to separate them.
    pub fn content(&self) -> &str {
        return &self.content;
    }

    /// The lines of the current view, sentinel last.
    pub fn lines(&self) -> &[LineInfo] {
        return &self.lines;
    }

    /// The highest recorded revision. 0 when nothing has been recorded.
    pub fn max_rev(&self) -> u64 {
        return self.max_rev;
    }

    /// Record `text` as the next revision and return its revision number.
    ///
    /// Recording the current content unchanged returns `max_rev` without
    /// touching anything. A rapid single-line edit on top of the newest
    /// revision rewrites that revision in place instead of creating a new
    /// one, so keystroke-by-keystroke recording does not inflate the
    /// program.
    ///
    /// A `timestamp` of 0 (or None) is replaced with the current wall
    /// clock in milliseconds.
    pub fn record_text(
        &mut self,
        text: &str,
        timestamp: Option<u64>,
        extra: Option<Map<String, Value>>,
    ) -> u64 {
        self.check_out(self.max_rev, None);
        if text == self.content {
            return self.max_rev;
        }

        let ts = match timestamp {
            Some(t) if t != 0 => t,
            _ => now_ms(),
        };
        let blocks = diff_blocks(&self.content, text);
        let b_lines = split_lines(text);

        if let Some(rev) = self.try_trivial_update(&blocks, &b_lines, ts) {
            self.content = text.to_string();
            return rev;
        }

        let rev = self.max_rev + 1;
        self.ts_map.insert(rev, ts);
        if let Some(extra) = extra {
            self.extra_map.insert(rev, extra);
        }
        // Apply blocks bottom-up so addresses captured for earlier blocks
        // stay valid while later ones rewrite the program.
        for block in blocks.iter().rev() {
            self.edit_chunk(block, rev, &b_lines);
        }
        self.max_rev = rev;
        self.last_checkout_rev = Some(rev);
        self.content = text.to_string();
        return rev;
    }

    /// Check out a view of the history.
    ///
    /// With `start` absent the view is the snapshot of `rev` (clamped to
    /// `max_rev`). With `start` present the view is the union across
    /// `start..=rev`: lines deleted somewhere in the range appear in
    /// place, flagged `deleted`.
    pub fn check_out(&mut self, rev: u64, start: Option<u64>) {
        let rev = rev.min(self.max_rev);
        if start.is_none() && Some(rev) == self.last_checkout_rev {
            return;
        }

        let snapshot = self.execute(rev, rev, None);
        let lines = match start {
            None => {
                self.last_checkout_rev = Some(rev);
                snapshot
            }
            Some(start) => {
                // A union view is not a reusable snapshot cache; force the
                // next checkout (and the editor's precondition) to
                // re-execute.
                self.last_checkout_rev = None;
                let present: HashSet<usize> = snapshot.iter().map(|l| l.pc).collect();
                self.execute(start, rev, Some(&present))
            }
        };
        self.content = lines.iter().map(|l| l.data.as_str()).collect();
        self.lines = lines;
    }

    /// Timestamp (ms) of the revision that introduced line `index`, or 0
    /// for the sentinel and out-of-range indices.
    pub fn get_line_timestamp(&self, index: usize) -> u64 {
        if index + 1 >= self.lines.len() {
            return 0;
        }
        return self.ts_map.get(&self.lines[index].rev).copied().unwrap_or(0);
    }

    /// Metadata attached to the revision that introduced line `index`, or
    /// an empty map for the sentinel, out-of-range indices, and revisions
    /// recorded without metadata.
    pub fn get_line_extra(&self, index: usize) -> Map<String, Value> {
        if index + 1 >= self.lines.len() {
            return Map::new();
        }
        return self
            .extra_map
            .get(&self.lines[index].rev)
            .cloned()
            .unwrap_or_default();
    }

    /// Walk the program from pc 0 and collect the emitted lines.
    ///
    /// `(R, R)` yields the snapshot of revision R. `(start, end)` with
    /// `start < end` visits every chunk any revision in the range could
    /// see; `present` then marks which program counters belong to the end
    /// snapshot so emitted lines can be flagged deleted.
    ///
    /// A well-formed program halts within `2 * code.len()` steps; blowing
    /// that budget means the program is corrupt.
    fn execute(
        &self,
        start_rev: u64,
        end_rev: u64,
        present: Option<&HashSet<usize>>,
    ) -> Vec<LineInfo> {
        let budget = 2 * self.code.len();
        let mut steps = 0;
        let mut emitted = Vec::new();
        let mut pc = 0;
        loop {
            steps += 1;
            if steps > budget {
                panic!("linelog program did not halt within {} steps", budget);
            }
            match &self.code[pc] {
                Inst::End => {
                    let deleted = present.map_or(false, |p| !p.contains(&pc));
                    emitted.push(LineInfo { data: String::new(), rev: 0, pc, deleted });
                    break;
                }
                Inst::Line { rev, data } => {
                    let deleted = present.map_or(false, |p| !p.contains(&pc));
                    emitted.push(LineInfo { data: data.clone(), rev: *rev, pc, deleted });
                    pc += 1;
                }
                Inst::J { pc: target } => {
                    pc = *target;
                }
                Inst::Jge { rev, pc: target } => {
                    if start_rev >= *rev {
                        pc = *target;
                    } else {
                        pc += 1;
                    }
                }
                Inst::Jl { rev, pc: target } => {
                    if end_rev < *rev {
                        pc = *target;
                    } else {
                        pc += 1;
                    }
                }
            }
        }
        return emitted;
    }

    /// Rewrite the newest revision in place when the edit is a single-line
    /// change to the single line that revision owns. Returns the reused
    /// revision on success.
    fn try_trivial_update(&mut self, blocks: &[Block], b_lines: &[&str], ts: u64) -> Option<u64> {
        let block = match blocks {
            [block] => block,
            _ => return None,
        };
        if block.a2 - block.a1 != 1 || block.b2 - block.b1 != 1 {
            return None;
        }
        let rev = self.max_rev;
        if self.lines[block.a1].rev != rev {
            return None;
        }
        if self.lines.iter().filter(|l| l.rev == rev).count() != 1 {
            return None;
        }

        let pc = self.lines[block.a1].pc;
        let data = b_lines[block.b1].to_string();
        match &mut self.code[pc] {
            Inst::Line { data: slot, .. } => *slot = data.clone(),
            other => panic!("single-line rewrite expected LINE at pc {}, found {:?}", pc, other),
        }
        self.lines[block.a1].data = data;
        self.ts_map.insert(rev, ts);
        return Some(rev);
    }

    /// Splice one change block into the program.
    ///
    /// The chunk appended at the end of the program reads, for a block
    /// with insertions and deletions:
    ///
    /// ```text
    /// start:  JL rev, skip        ; older revisions skip the new lines
    ///         LINE rev, ...       ; the inserted lines
    /// skip:   JGE rev, a2pc       ; newer revisions skip the old lines
    /// tail:   <displaced inst>    ; the instruction that sat at a1pc
    ///         J a1pc + 1          ; resume the original fall-through
    /// ```
    ///
    /// The instruction at `a1pc` becomes `J start`, routing every reader
    /// of that address through the chunk.
    fn edit_chunk(&mut self, block: &Block, rev: u64, b_lines: &[&str]) {
        let Block { a1, a2, b1, b2 } = *block;
        let line_count = self.lines.len() - 1;
        assert!(
            a1 <= a2 && a2 <= line_count,
            "chunk {}..{} out of bounds for {} lines",
            a1,
            a2,
            line_count,
        );

        let start = self.code.len();
        let a1_pc = self.lines[a1].pc;

        if b1 < b2 {
            self.code.push(Inst::Jl { rev, pc: start + (b2 - b1) + 1 });
            for &data in &b_lines[b1..b2] {
                self.code.push(Inst::Line { rev, data: data.to_string() });
            }
        }
        if a1 < a2 {
            let a2_pc = self.lines[a2 - 1].pc + 1;
            self.code.push(Inst::Jge { rev, pc: a2_pc });
        }

        // The instruction at a1pc moves to the chunk's tail. Line a1's
        // cached address must follow it, or a later edit anchored on that
        // line would splice into the wrong spot. (The splice below drops
        // the entry again when the block deletes line a1.)
        let tail = self.code.len();
        self.lines[a1].pc = tail;
        let displaced = self.code[a1_pc].clone();
        let resumes_fallthrough = !matches!(displaced, Inst::J { .. } | Inst::End);
        self.code.push(displaced);
        if resumes_fallthrough {
            self.code.push(Inst::J { pc: a1_pc + 1 });
        }
        self.code[a1_pc] = Inst::J { pc: start };

        let new_infos: Vec<LineInfo> = b_lines[b1..b2]
            .iter()
            .enumerate()
            .map(|(i, &data)| LineInfo {
                data: data.to_string(),
                rev,
                pc: start + 1 + i,
                deleted: false,
            })
            .collect();
        self.lines.splice(a1..a2, new_infos);
    }
}

impl Default for LineLog {
    fn default() -> Self {
        return Self::new();
    }
}

impl std::fmt::Debug for LineLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(
            f,
            "LineLog {{ max_rev: {}, insts: {}, lines: {} }}",
            self.max_rev,
            self.code.len(),
            self.lines.len(),
        );
    }
}

/// Milliseconds since the unix epoch.
fn now_ms() -> u64 {
    return SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
}
