//! Structural check of every stream the harness would hand to an oracle.
//!
//! One trial per protocol and corpus case. Each stream is walked opcode by
//! opcode with a small stack machine: opcodes must be legal for the protocol,
//! marks must balance, memo references must point at stored slots, frames
//! must end on an opcode boundary and STOP must leave exactly one value.

use std::collections::{HashMap, HashSet};

use libtest_mimic::{Arguments, Failed, Trial};
use pickle_ref::opcodes::*;
use pickle_ref::{HIGHEST_PROTOCOL, LOWEST_PROTOCOL, Node, NodeId};
use pyrolite_conformance::hexdump::hexdump;
use pyrolite_conformance::{Corpus, TestCase};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    Mark,
    Value,
}

#[derive(Debug, Default)]
struct Stats {
    gets: usize,
    frames: usize,
}

struct Walker<'a> {
    data: &'a [u8],
    pos: usize,
    protocol: u8,
    stack: Vec<Slot>,
    memo: HashSet<u64>,
    frame_end: Option<usize>,
    stats: Stats,
}

impl<'a> Walker<'a> {
    fn new(data: &'a [u8], protocol: u8) -> Self {
        Self {
            data,
            pos: 0,
            protocol,
            stack: Vec::new(),
            memo: HashSet::new(),
            frame_end: None,
            stats: Stats::default(),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], String> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.data.len());
        let Some(end) = end else {
            return Err(format!("truncated: need {n} bytes at {}", self.pos));
        };
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn uint(&mut self, width: usize) -> Result<u64, String> {
        let bytes = self.take(width)?;
        Ok(bytes
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    fn counted(&mut self, width: usize) -> Result<&'a [u8], String> {
        let len = self.uint(width)?;
        let len = usize::try_from(len).map_err(|_| format!("length {len} overflows"))?;
        self.take(len)
    }

    fn line(&mut self) -> Result<&'a [u8], String> {
        let rest = &self.data[self.pos..];
        let Some(nl) = rest.iter().position(|&b| b == b'\n') else {
            return Err(format!("unterminated line at {}", self.pos));
        };
        self.pos += nl + 1;
        Ok(&rest[..nl])
    }

    fn text_line(&mut self) -> Result<&'a str, String> {
        let line = self.line()?;
        std::str::from_utf8(line).map_err(|_| format!("non-ASCII argument before {}", self.pos))
    }

    fn push(&mut self) {
        self.stack.push(Slot::Value);
    }

    fn pop(&mut self, n: usize) -> Result<(), String> {
        for _ in 0..n {
            match self.stack.pop() {
                Some(Slot::Value) => {}
                Some(Slot::Mark) => return Err(format!("popped a mark at {}", self.pos)),
                None => return Err(format!("stack underflow at {}", self.pos)),
            }
        }
        Ok(())
    }

    fn pop_mark(&mut self) -> Result<usize, String> {
        let Some(mark) = self.stack.iter().rposition(|s| *s == Slot::Mark) else {
            return Err(format!("no mark on the stack at {}", self.pos));
        };
        let count = self.stack.len() - mark - 1;
        self.stack.truncate(mark);
        Ok(count)
    }

    fn expect_top(&self) -> Result<(), String> {
        match self.stack.last() {
            Some(Slot::Value) => Ok(()),
            _ => Err(format!("expected a value on top at {}", self.pos)),
        }
    }

    fn store(&mut self, idx: u64) -> Result<(), String> {
        self.expect_top()?;
        self.memo.insert(idx);
        Ok(())
    }

    fn fetch(&mut self, idx: u64) -> Result<(), String> {
        if !self.memo.contains(&idx) {
            return Err(format!("GET of unset memo slot {idx} at {}", self.pos));
        }
        self.stats.gets += 1;
        self.push();
        Ok(())
    }

    fn require(&self, op: u8, since: u8) -> Result<(), String> {
        if self.protocol < since {
            return Err(format!(
                "opcode 0x{op:02x} needs protocol {since}, stream is protocol {}",
                self.protocol
            ));
        }
        Ok(())
    }

    fn walk(mut self) -> Result<Stats, String> {
        if self.protocol >= 2 {
            if self.take(2)? != [PROTO, self.protocol] {
                return Err("missing PROTO header".into());
            }
        } else if self.data.first() == Some(&PROTO) {
            return Err("PROTO header below protocol 2".into());
        }

        loop {
            if let Some(end) = self.frame_end {
                if self.pos == end {
                    self.frame_end = None;
                } else if self.pos > end {
                    return Err(format!("opcode straddles frame end {end}"));
                }
            }

            let op = self.take(1)?[0];
            match op {
                STOP => {
                    if self.stack != [Slot::Value] {
                        return Err(format!("STOP with stack {:?}", self.stack));
                    }
                    if self.pos != self.data.len() {
                        return Err(format!("{} bytes after STOP", self.data.len() - self.pos));
                    }
                    if self.frame_end.is_some_and(|end| end != self.pos) {
                        return Err("frame extends past STOP".into());
                    }
                    return Ok(self.stats);
                }
                MARK => self.stack.push(Slot::Mark),
                POP => self.pop(1)?,
                POP_MARK => {
                    self.require(op, 1)?;
                    self.pop_mark()?;
                }
                NONE => self.push(),
                INT => {
                    let arg = self.text_line()?;
                    if arg != "00" && arg != "01" && arg.parse::<i64>().is_err() {
                        return Err(format!("bad INT argument {arg:?}"));
                    }
                    self.push();
                }
                LONG => {
                    let arg = self.text_line()?;
                    let digits = arg.strip_suffix('L').unwrap_or(arg);
                    let digits = digits.strip_prefix('-').unwrap_or(digits);
                    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(format!("bad LONG argument {arg:?}"));
                    }
                    self.push();
                }
                FLOAT => {
                    let arg = self.text_line()?;
                    if arg.parse::<f64>().is_err() {
                        return Err(format!("bad FLOAT argument {arg:?}"));
                    }
                    self.push();
                }
                UNICODE => {
                    self.line()?;
                    self.push();
                }
                BININT | BININT1 | BININT2 => {
                    self.require(op, 1)?;
                    self.take(match op {
                        BININT => 4,
                        BININT2 => 2,
                        _ => 1,
                    })?;
                    self.push();
                }
                BINFLOAT => {
                    self.require(op, 1)?;
                    self.take(8)?;
                    self.push();
                }
                BINUNICODE => {
                    self.require(op, 1)?;
                    let raw = self.counted(4)?;
                    std::str::from_utf8(raw).map_err(|_| "BINUNICODE is not UTF-8".to_string())?;
                    self.push();
                }
                EMPTY_TUPLE | EMPTY_LIST | EMPTY_DICT => {
                    self.require(op, 1)?;
                    self.push();
                }
                TUPLE | LIST => {
                    self.pop_mark()?;
                    self.push();
                }
                DICT => {
                    if self.pop_mark()? % 2 != 0 {
                        return Err("DICT with an odd item count".into());
                    }
                    self.push();
                }
                APPEND => {
                    self.pop(1)?;
                    self.expect_top()?;
                }
                APPENDS => {
                    self.require(op, 1)?;
                    self.pop_mark()?;
                    self.expect_top()?;
                }
                SETITEM => {
                    self.pop(2)?;
                    self.expect_top()?;
                }
                SETITEMS => {
                    self.require(op, 1)?;
                    if self.pop_mark()? % 2 != 0 {
                        return Err("SETITEMS with an odd item count".into());
                    }
                    self.expect_top()?;
                }
                GLOBAL => {
                    let module = self.text_line()?;
                    let name = self.text_line()?;
                    if module.is_empty() || name.is_empty() {
                        return Err("empty GLOBAL".into());
                    }
                    if self.protocol < 3 && module == "builtins" {
                        return Err("GLOBAL builtins below protocol 3".into());
                    }
                    self.push();
                }
                REDUCE => {
                    self.pop(2)?;
                    self.push();
                }
                PUT | BINPUT | LONG_BINPUT => {
                    if self.protocol >= 4 {
                        return Err("explicit PUT in a protocol 4+ stream".into());
                    }
                    let idx = match op {
                        PUT => self
                            .text_line()?
                            .parse::<u64>()
                            .map_err(|e| format!("bad PUT index: {e}"))?,
                        BINPUT => {
                            self.require(op, 1)?;
                            self.uint(1)?
                        }
                        _ => {
                            self.require(op, 1)?;
                            self.uint(4)?
                        }
                    };
                    self.store(idx)?;
                }
                GET | BINGET | LONG_BINGET => {
                    let idx = match op {
                        GET => self
                            .text_line()?
                            .parse::<u64>()
                            .map_err(|e| format!("bad GET index: {e}"))?,
                        BINGET => {
                            self.require(op, 1)?;
                            self.uint(1)?
                        }
                        _ => {
                            self.require(op, 1)?;
                            self.uint(4)?
                        }
                    };
                    self.fetch(idx)?;
                }
                TUPLE1 | TUPLE2 | TUPLE3 => {
                    self.require(op, 2)?;
                    self.pop(usize::from(op - TUPLE1) + 1)?;
                    self.push();
                }
                NEWTRUE | NEWFALSE => {
                    self.require(op, 2)?;
                    self.push();
                }
                LONG1 | LONG4 => {
                    self.require(op, 2)?;
                    self.counted(if op == LONG1 { 1 } else { 4 })?;
                    self.push();
                }
                SHORT_BINBYTES | BINBYTES => {
                    self.require(op, 3)?;
                    self.counted(if op == SHORT_BINBYTES { 1 } else { 4 })?;
                    self.push();
                }
                SHORT_BINUNICODE | BINUNICODE8 => {
                    self.require(op, 4)?;
                    let raw = self.counted(if op == SHORT_BINUNICODE { 1 } else { 8 })?;
                    std::str::from_utf8(raw).map_err(|_| "unicode is not UTF-8".to_string())?;
                    self.push();
                }
                BINBYTES8 => {
                    self.require(op, 4)?;
                    self.counted(8)?;
                    self.push();
                }
                EMPTY_SET => {
                    self.require(op, 4)?;
                    self.push();
                }
                ADDITEMS => {
                    self.require(op, 4)?;
                    self.pop_mark()?;
                    self.expect_top()?;
                }
                STACK_GLOBAL => {
                    self.require(op, 4)?;
                    self.pop(2)?;
                    self.push();
                }
                MEMOIZE => {
                    self.require(op, 4)?;
                    let idx = self.memo.len() as u64;
                    self.store(idx)?;
                }
                FRAME => {
                    self.require(op, 4)?;
                    if self.frame_end.is_some() {
                        return Err("FRAME inside a frame".into());
                    }
                    let len = self.uint(8)?;
                    let end = usize::try_from(len)
                        .ok()
                        .and_then(|len| self.pos.checked_add(len))
                        .filter(|&end| end <= self.data.len())
                        .ok_or_else(|| format!("FRAME of {len} bytes overruns the stream"))?;
                    self.frame_end = Some(end);
                    self.stats.frames += 1;
                }
                BYTEARRAY8 => {
                    self.require(op, 5)?;
                    self.counted(8)?;
                    self.push();
                }
                PROTO => return Err(format!("PROTO in the body at {}", self.pos - 1)),
                other => return Err(format!("unknown opcode 0x{other:02x} at {}", self.pos - 1)),
            }
        }
    }
}

/// True when some memoizable object is reachable through more than one
/// slot, so the encoder must emit at least one GET.
fn shares_objects(case: &TestCase) -> bool {
    fn memoizable(node: &Node) -> bool {
        match node {
            Node::None | Node::Bool(_) | Node::Int(_) | Node::BigInt(_) | Node::Float(_) => false,
            Node::Tuple(items) => !items.is_empty(),
            _ => true,
        }
    }

    let mut refs: HashMap<NodeId, usize> = HashMap::new();
    let mut pending = vec![case.root];
    refs.insert(case.root, 1);
    let mut visited = HashSet::new();
    while let Some(id) = pending.pop() {
        if !visited.insert(id) {
            continue;
        }
        let children: Vec<NodeId> = match case.graph.get(id) {
            Some(Node::Tuple(items) | Node::List(items) | Node::Set(items)) => items.clone(),
            Some(Node::Dict(entries)) => entries.iter().flat_map(|&(k, v)| [k, v]).collect(),
            _ => Vec::new(),
        };
        for child in children {
            *refs.entry(child).or_default() += 1;
            pending.push(child);
        }
    }
    refs.iter().any(|(&id, &count)| {
        count > 1 && case.graph.get(id).is_some_and(memoizable)
    })
}

fn check_case(case: &TestCase, protocol: u8) -> Result<(), Failed> {
    let stream = pickle_ref::to_vec(&case.graph, case.root, protocol)
        .map_err(|e| format!("encode failed: {e}"))?;
    let fail = |msg: String| -> Failed {
        format!("{msg}\nvalue: {}\n{}", case.describe(), hexdump(&stream)).into()
    };

    let stats = Walker::new(&stream, protocol).walk().map_err(fail)?;

    let header = if protocol >= 2 { 2 } else { 0 };
    let body = stream.len() - header;
    if protocol >= 4 && body >= 4 && stats.frames != 1 {
        return Err(fail(format!("expected one frame, found {}", stats.frames)));
    }
    if (protocol < 4 || body < 4) && stats.frames != 0 {
        return Err(fail(format!("unexpected frame(s): {}", stats.frames)));
    }
    if shares_objects(case) && stats.gets == 0 {
        return Err(fail("shared object was written twice instead of referenced".into()));
    }
    Ok(())
}

fn main() {
    let args = Arguments::from_args();

    let corpus = Corpus::reference().expect("reference corpus builds");
    let mut trials = Vec::new();
    for protocol in LOWEST_PROTOCOL..=HIGHEST_PROTOCOL {
        for group in corpus.groups() {
            for (index, case) in group.cases.iter().enumerate() {
                let name = format!("protocol_{protocol}::{}::{index}", group.label);
                let case = case.clone();
                trials.push(Trial::test(name, move || check_case(&case, protocol)));
            }
        }
    }

    libtest_mimic::run(&args, trials).exit();
}
