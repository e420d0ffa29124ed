// model = "claude-opus-4-5"
// created = "2026-02-02"
// modified = "2026-02-04"
// driver = "Isaac Clayton"

//! Linelog - the full history of one text file as a small program.
//!
//! A linelog compiles every revision of a file into a single instruction
//! sequence. Interpreting that sequence under a pair of revision bounds
//! reconstructs any snapshot, annotates every line with the revision that
//! introduced it, or overlays deleted lines from older revisions onto a
//! newer one, all in one linear scan.
//!
//! # Quick Start
//!
//! ```
//! use linelog::log::LineLog;
//!
//! let mut log = LineLog::new();
//!
//! // Record two revisions of the file.
//! log.record_text("hello\nworld\n", Some(1000), None);
//! log.record_text("hello\nthere\nworld\n", Some(2000), None);
//!
//! // The latest revision is checked out.
//! assert_eq!(log.content(), "hello\nthere\nworld\n");
//!
//! // Travel back to revision 1.
//! log.check_out(1, None);
//! assert_eq!(log.content(), "hello\nworld\n");
//! ```

pub mod codec;
pub mod diff;
pub mod inst;
pub mod lines;
pub mod log;
