// model = "claude-opus-4-5"
// created = "2026-02-03"
// modified = "2026-02-04"
// driver = "Isaac Clayton"

//! Portable serialization for linelogs.
//!
//! The on-disk form is a gzip stream over a JSON object:
//!
//! ```text
//! {
//!   "code":     [ { "op": <0..4>, "rev"?, "pc"?, "data"? }, ... ],
//!   "tsMap":    { "<rev>": <ms>, ... },
//!   "extraMap": { "<rev>": { ... }, ... }
//! }
//! ```
//!
//! The integer opcode encoding is fixed so buffers round-trip between
//! implementations: J=0, JGE=1, JL=2, LINE=3, END=4. Importing validates
//! structure up front (opcodes, required fields, jump targets) so a
//! malformed buffer fails as a decode error instead of corrupting the
//! interpreter.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::io::Write;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::inst::Inst;
use crate::log::LineLog;

const OP_J: u8 = 0;
const OP_JGE: u8 = 1;
const OP_JL: u8 = 2;
const OP_LINE: u8 = 3;
const OP_END: u8 = 4;

/// One instruction as it appears on the wire.
#[derive(Serialize, Deserialize)]
struct WireInst {
    op: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rev: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pc: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<String>,
}

/// The decompressed payload. Both maps may be absent in older buffers.
#[derive(Serialize, Deserialize)]
struct WireLog {
    code: Vec<WireInst>,
    #[serde(rename = "tsMap", default)]
    ts_map: HashMap<u64, u64>,
    #[serde(rename = "extraMap", default)]
    extra_map: HashMap<u64, Map<String, Value>>,
}

/// Why an import was rejected.
#[derive(Debug)]
pub enum DecodeError {
    /// The byte stream is not valid gzip.
    Gzip(std::io::Error),
    /// The decompressed payload is not JSON of the expected shape.
    Json(serde_json::Error),
    /// An instruction carried an opcode outside 0..=4.
    UnknownOp(u8),
    /// An instruction was missing a field its opcode requires.
    MissingField { op: u8, field: &'static str },
    /// A jump target pointed outside the program.
    PcOutOfRange { pc: usize, len: usize },
    /// The program had no instructions. Even an empty history holds one
    /// END to emit the sentinel.
    EmptyProgram,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            DecodeError::Gzip(err) => write!(f, "invalid gzip stream: {}", err),
            DecodeError::Json(err) => write!(f, "invalid json payload: {}", err),
            DecodeError::UnknownOp(op) => write!(f, "unknown opcode {}", op),
            DecodeError::MissingField { op, field } => {
                write!(f, "opcode {} is missing field {:?}", op, field)
            }
            DecodeError::PcOutOfRange { pc, len } => {
                write!(f, "jump target {} outside program of {} instructions", pc, len)
            }
            DecodeError::EmptyProgram => write!(f, "program has no instructions"),
        };
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        return match self {
            DecodeError::Gzip(err) => Some(err),
            DecodeError::Json(err) => Some(err),
            _ => None,
        };
    }
}

fn encode_inst(inst: &Inst) -> WireInst {
    return match inst {
        Inst::J { pc } => WireInst { op: OP_J, rev: None, pc: Some(*pc), data: None },
        Inst::Jge { rev, pc } => {
            WireInst { op: OP_JGE, rev: Some(*rev), pc: Some(*pc), data: None }
        }
        Inst::Jl { rev, pc } => {
            WireInst { op: OP_JL, rev: Some(*rev), pc: Some(*pc), data: None }
        }
        Inst::Line { rev, data } => {
            WireInst { op: OP_LINE, rev: Some(*rev), pc: None, data: Some(data.clone()) }
        }
        Inst::End => WireInst { op: OP_END, rev: None, pc: None, data: None },
    };
}

fn require_rev(op: u8, rev: Option<u64>) -> Result<u64, DecodeError> {
    return rev.ok_or(DecodeError::MissingField { op, field: "rev" });
}

fn require_pc(op: u8, pc: Option<usize>, len: usize) -> Result<usize, DecodeError> {
    let pc = pc.ok_or(DecodeError::MissingField { op, field: "pc" })?;
    if pc >= len {
        return Err(DecodeError::PcOutOfRange { pc, len });
    }
    return Ok(pc);
}

fn decode_inst(wire: WireInst, len: usize) -> Result<Inst, DecodeError> {
    let op = wire.op;
    return match op {
        OP_J => Ok(Inst::J { pc: require_pc(op, wire.pc, len)? }),
        OP_JGE => Ok(Inst::Jge {
            rev: require_rev(op, wire.rev)?,
            pc: require_pc(op, wire.pc, len)?,
        }),
        OP_JL => Ok(Inst::Jl {
            rev: require_rev(op, wire.rev)?,
            pc: require_pc(op, wire.pc, len)?,
        }),
        OP_LINE => Ok(Inst::Line {
            rev: require_rev(op, wire.rev)?,
            data: wire.data.ok_or(DecodeError::MissingField { op, field: "data" })?,
        }),
        OP_END => Ok(Inst::End),
        unknown => Err(DecodeError::UnknownOp(unknown)),
    };
}

impl LineLog {
    /// Serialize the history into a self-contained byte buffer.
    pub fn export(&self) -> Vec<u8> {
        let wire = WireLog {
            code: self.code.iter().map(encode_inst).collect(),
            ts_map: self.ts_map.clone(),
            extra_map: self.extra_map.clone(),
        };
        let json = serde_json::to_vec(&wire).expect("wire model always serializes");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json).expect("in-memory gzip writes cannot fail");
        return encoder.finish().expect("in-memory gzip streams always finish");
    }

    /// Replace this linelog's state with a previously exported buffer,
    /// then check out the newest revision.
    ///
    /// The newest revision is recomputed from the program itself: it is
    /// the highest revision any conditional jump tests against.
    pub fn import(&mut self, bytes: &[u8]) -> Result<(), DecodeError> {
        let mut decoder = GzDecoder::new(bytes);
        let mut json = Vec::new();
        decoder.read_to_end(&mut json).map_err(DecodeError::Gzip)?;
        let wire: WireLog = serde_json::from_slice(&json).map_err(DecodeError::Json)?;

        if wire.code.is_empty() {
            return Err(DecodeError::EmptyProgram);
        }
        let len = wire.code.len();
        let mut code = Vec::with_capacity(len);
        for inst in wire.code {
            code.push(decode_inst(inst, len)?);
        }

        let max_rev = code.iter().filter_map(Inst::cond_rev).max().unwrap_or(0);
        self.code = code;
        self.ts_map = wire.ts_map;
        self.extra_map = wire.extra_map;
        self.max_rev = max_rev;
        self.last_checkout_rev = None;
        self.check_out(max_rev, None);
        return Ok(());
    }
}
