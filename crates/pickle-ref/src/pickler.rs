//! The encoder.
//!
//! [`Pickler`] walks a [`Graph`] from a root node and writes the opcode
//! stream CPython's pickler would write for the equivalent Python object.
//! Objects Python would memoize get a memo slot keyed by node identity, so a
//! node met twice is written once and then fetched back with a GET opcode.
//! That is also what stops a self-referential list from recursing forever:
//! the list is memoized before its items are written.
//!
//! Python objects built on the fly while reducing a node (argument tuples,
//! the latin-1 string inside a protocol 0 `bytes`) are fresh objects: they
//! take a memo slot but can never be fetched back.

use std::collections::HashMap;
use std::io::Write;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::long::{self, DecimalInt};
use crate::opcodes::*;
use crate::repr::{float_repr, split_micros};
use crate::value::{Graph, Node, NodeId, TypedArray};
use crate::{HIGHEST_PROTOCOL, PickleError};

/// Frames are committed once they reach this size (protocol 4+).
const FRAME_SIZE_TARGET: usize = 64 * 1024;

/// Frames smaller than this are written without a FRAME header.
const FRAME_SIZE_MIN: usize = 4;

/// Items per APPENDS/SETITEMS/ADDITEMS batch.
const BATCH_SIZE: usize = 1000;

/// Reduce targets that are module-level functions rather than types.
const MODULE_FUNCTIONS: &[(&str, &str)] =
    &[("_codecs", "encode"), ("array", "_array_reconstructor")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum MemoKey {
    Node(NodeId),
    Global(&'static str, &'static str),
    /// Interned strings, equal by content.
    Interned(&'static str),
}

/// A value to write: either a graph node or an object synthesized while
/// reducing one.
#[derive(Debug, Clone)]
enum Item {
    Node(NodeId),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Interned(&'static str),
    Bytes(Vec<u8>),
    Global(&'static str, &'static str),
    List(Vec<Item>),
}

fn nodes(ids: &[NodeId]) -> Vec<Item> {
    ids.iter().copied().map(Item::Node).collect()
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Writes pickle streams for value graphs.
pub struct Pickler<W: Write> {
    out: W,
    protocol: u8,
    /// Pending output; for protocol 4+ this is the current frame.
    buf: Vec<u8>,
    memo: HashMap<MemoKey, u32>,
    memo_len: u32,
}

impl<W: Write> Pickler<W> {
    /// Create a pickler writing `protocol` streams to `out`.
    pub fn new(out: W, protocol: u8) -> Result<Self, PickleError> {
        if protocol > HIGHEST_PROTOCOL {
            return Err(PickleError::UnsupportedProtocol(protocol));
        }
        Ok(Self {
            out,
            protocol,
            buf: Vec::new(),
            memo: HashMap::new(),
            memo_len: 0,
        })
    }

    /// Write one complete stream for the value at `root`, ending with STOP.
    ///
    /// The memo starts empty for every call, since node ids are only
    /// meaningful within one graph.
    pub fn dump(&mut self, graph: &Graph, root: NodeId) -> Result<(), PickleError> {
        tracing::trace!(protocol = self.protocol, nodes = graph.len(), "pickling graph");
        self.memo.clear();
        self.memo_len = 0;
        self.buf.clear();

        if self.protocol >= 2 {
            self.out.write_all(&[PROTO, self.protocol])?;
        }
        self.save(graph, &Item::Node(root))?;
        self.write(&[STOP]);
        self.commit_frame(true)?;
        self.out.flush()?;
        Ok(())
    }

    /// Consume the pickler and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn commit_frame(&mut self, force: bool) -> Result<(), PickleError> {
        if self.buf.is_empty() || (!force && self.buf.len() < FRAME_SIZE_TARGET) {
            return Ok(());
        }
        if self.protocol >= 4 && self.buf.len() >= FRAME_SIZE_MIN {
            self.out.write_all(&[FRAME])?;
            self.out.write_all(&(self.buf.len() as u64).to_le_bytes())?;
        }
        self.out.write_all(&self.buf)?;
        self.buf.clear();
        Ok(())
    }

    fn memoize(&mut self, key: Option<MemoKey>) {
        let idx = self.memo_len;
        self.memo_len += 1;
        if let Some(key) = key {
            self.memo.insert(key, idx);
        }
        if self.protocol >= 4 {
            self.write(&[MEMOIZE]);
        } else if self.protocol >= 1 {
            match u8::try_from(idx) {
                Ok(small) => self.write(&[BINPUT, small]),
                Err(_) => {
                    self.write(&[LONG_BINPUT]);
                    self.write(&idx.to_le_bytes());
                }
            }
        } else {
            self.write(format!("{}{idx}\n", PUT as char).as_bytes());
        }
    }

    fn write_get(&mut self, idx: u32) {
        if self.protocol >= 1 {
            match u8::try_from(idx) {
                Ok(small) => self.write(&[BINGET, small]),
                Err(_) => {
                    self.write(&[LONG_BINGET]);
                    self.write(&idx.to_le_bytes());
                }
            }
        } else {
            self.write(format!("{}{idx}\n", GET as char).as_bytes());
        }
    }

    /// Emit a GET if `key` is already memoized.
    fn try_get(&mut self, key: Option<MemoKey>) -> bool {
        match key.and_then(|k| self.memo.get(&k).copied()) {
            Some(idx) => {
                self.write_get(idx);
                true
            }
            None => false,
        }
    }

    fn save(&mut self, graph: &Graph, item: &Item) -> Result<(), PickleError> {
        self.commit_frame(false)?;
        match item {
            Item::Node(id) => self.save_node(graph, *id),
            Item::Int(v) => {
                self.save_int(*v);
                Ok(())
            }
            Item::UInt(v) => {
                match i64::try_from(*v) {
                    Ok(v) => self.save_int(v),
                    Err(_) => self.save_long(false, &v.to_le_bytes(), &v.to_string()),
                }
                Ok(())
            }
            Item::Float(v) => {
                self.save_float(*v);
                Ok(())
            }
            Item::Str(s) => {
                self.save_str(s);
                self.memoize(None);
                Ok(())
            }
            Item::Interned(s) => {
                let key = Some(MemoKey::Interned(*s));
                if !self.try_get(key) {
                    self.save_str(s);
                    self.memoize(key);
                }
                Ok(())
            }
            Item::Bytes(b) => self.save_bytes(graph, b, None),
            Item::Global(module, name) => self.save_global(graph, *module, *name),
            Item::List(items) => self.save_list(graph, items, None),
        }
    }

    fn save_node(&mut self, graph: &Graph, id: NodeId) -> Result<(), PickleError> {
        let key = Some(MemoKey::Node(id));
        if self.try_get(key) {
            return Ok(());
        }
        let node = graph.get(id).ok_or(PickleError::DanglingNode(id.index()))?;
        match node {
            Node::None => self.write(&[NONE]),
            Node::Bool(b) => self.save_bool(*b),
            Node::Int(v) => self.save_int(*v),
            Node::BigInt(literal) => {
                let parsed = DecimalInt::parse(literal)?;
                match parsed.to_i64() {
                    Some(v) => self.save_int(v),
                    None => {
                        let text = if parsed.negative {
                            format!("-{}", parsed.digits)
                        } else {
                            parsed.digits.clone()
                        };
                        self.save_long(parsed.negative, &parsed.magnitude_le(), &text);
                    }
                }
            }
            Node::Float(v) => self.save_float(*v),
            Node::Str(s) => {
                self.save_str(s);
                self.memoize(key);
            }
            Node::Bytes(b) => self.save_bytes(graph, b, key)?,
            Node::ByteArray(b) => self.save_bytearray(graph, b, key)?,
            Node::Complex { re, im } => self.save_reduce(
                graph,
                ("builtins", "complex"),
                vec![Item::Float(*re), Item::Float(*im)],
                key,
            )?,
            Node::DateTime(dt) => self.save_reduce(
                graph,
                ("datetime", "datetime"),
                vec![Item::Bytes(datetime_state(dt))],
                key,
            )?,
            Node::Date(d) => self.save_reduce(
                graph,
                ("datetime", "date"),
                vec![Item::Bytes(date_state(d))],
                key,
            )?,
            Node::Time(t) => self.save_reduce(
                graph,
                ("datetime", "time"),
                vec![Item::Bytes(time_state(t))],
                key,
            )?,
            Node::TimeDelta(delta) => {
                let micros = delta
                    .num_microseconds()
                    .ok_or(PickleError::TimeDeltaOutOfRange)?;
                let (days, seconds, micros) = split_micros(micros);
                self.save_reduce(
                    graph,
                    ("datetime", "timedelta"),
                    vec![Item::Int(days), Item::Int(seconds), Item::Int(micros)],
                    key,
                )?;
            }
            Node::Decimal(literal) => {
                let text = canonical_decimal(literal)?;
                self.save_reduce(graph, ("decimal", "Decimal"), vec![Item::Str(text)], key)?;
            }
            Node::Array(arr) => self.save_array(graph, arr, key)?,
            Node::Tuple(items) => self.save_tuple(graph, &nodes(items), key)?,
            Node::List(items) => self.save_list(graph, &nodes(items), key)?,
            Node::Set(items) => self.save_set(graph, items, key)?,
            Node::Dict(entries) => self.save_dict(graph, entries, key)?,
        }
        Ok(())
    }

    fn save_bool(&mut self, value: bool) {
        if self.protocol >= 2 {
            self.write(&[if value { NEWTRUE } else { NEWFALSE }]);
        } else {
            self.write(if value { TRUE } else { FALSE });
        }
    }

    fn save_int(&mut self, value: i64) {
        if let Ok(small) = i32::try_from(value) {
            if self.protocol >= 1 {
                if let Ok(byte) = u8::try_from(small) {
                    self.write(&[BININT1, byte]);
                } else if let Ok(short) = u16::try_from(small) {
                    self.write(&[BININT2]);
                    self.write(&short.to_le_bytes());
                } else {
                    self.write(&[BININT]);
                    self.write(&small.to_le_bytes());
                }
            } else {
                self.write(format!("{}{small}\n", INT as char).as_bytes());
            }
            return;
        }
        let encoded = long::encode_i64(value);
        if self.protocol >= 2 {
            self.write_long_bytes(&encoded);
        } else {
            self.write(format!("{}{value}L\n", LONG as char).as_bytes());
        }
    }

    /// Integers outside `i64`: LONG1/LONG4 from protocol 2, text otherwise.
    fn save_long(&mut self, negative: bool, magnitude_le: &[u8], text: &str) {
        if self.protocol >= 2 {
            let encoded = long::encode_signed(negative, magnitude_le);
            self.write_long_bytes(&encoded);
        } else {
            self.write(format!("{}{text}L\n", LONG as char).as_bytes());
        }
    }

    fn write_long_bytes(&mut self, encoded: &[u8]) {
        match u8::try_from(encoded.len()) {
            Ok(n) => self.write(&[LONG1, n]),
            Err(_) => {
                self.write(&[LONG4]);
                self.write(&(encoded.len() as i32).to_le_bytes());
            }
        }
        self.write(encoded);
    }

    fn save_float(&mut self, value: f64) {
        if self.protocol >= 1 {
            self.write(&[BINFLOAT]);
            self.write(&value.to_be_bytes());
        } else {
            self.write(format!("{}{}\n", FLOAT as char, float_repr(value)).as_bytes());
        }
    }

    fn save_str(&mut self, value: &str) {
        if self.protocol == 0 {
            self.write(&[UNICODE]);
            self.write(&raw_unicode_escape(value));
            self.write(b"\n");
            return;
        }
        let encoded = value.as_bytes();
        let n = encoded.len();
        if n <= 0xff && self.protocol >= 4 {
            self.write(&[SHORT_BINUNICODE, n as u8]);
        } else if n > 0xffff_ffff && self.protocol >= 4 {
            self.write(&[BINUNICODE8]);
            self.write(&(n as u64).to_le_bytes());
        } else {
            self.write(&[BINUNICODE]);
            self.write(&(n as u32).to_le_bytes());
        }
        self.write(encoded);
    }

    fn save_bytes(
        &mut self,
        graph: &Graph,
        value: &[u8],
        key: Option<MemoKey>,
    ) -> Result<(), PickleError> {
        if self.protocol < 3 {
            return if value.is_empty() {
                self.save_reduce(graph, ("builtins", "bytes"), Vec::new(), key)
            } else {
                self.save_reduce(
                    graph,
                    ("_codecs", "encode"),
                    vec![Item::Str(latin1(value)), Item::Interned("latin1")],
                    key,
                )
            };
        }
        let n = value.len();
        if n <= 0xff {
            self.write(&[SHORT_BINBYTES, n as u8]);
        } else if n > 0xffff_ffff && self.protocol >= 4 {
            self.write(&[BINBYTES8]);
            self.write(&(n as u64).to_le_bytes());
        } else {
            self.write(&[BINBYTES]);
            self.write(&(n as u32).to_le_bytes());
        }
        self.write(value);
        self.memoize(key);
        Ok(())
    }

    fn save_bytearray(
        &mut self,
        graph: &Graph,
        value: &[u8],
        key: Option<MemoKey>,
    ) -> Result<(), PickleError> {
        if self.protocol >= 5 {
            self.write(&[BYTEARRAY8]);
            self.write(&(value.len() as u64).to_le_bytes());
            self.write(value);
            self.memoize(key);
            return Ok(());
        }
        let args = if value.is_empty() {
            Vec::new()
        } else {
            vec![Item::Bytes(value.to_vec())]
        };
        self.save_reduce(graph, ("builtins", "bytearray"), args, key)
    }

    fn save_array(
        &mut self,
        graph: &Graph,
        arr: &TypedArray,
        key: Option<MemoKey>,
    ) -> Result<(), PickleError> {
        let typecode = arr.typecode().to_string();
        if self.protocol < 3 {
            let items = array_items(arr);
            return self.save_reduce(
                graph,
                ("array", "array"),
                vec![Item::Str(typecode), Item::List(items)],
                key,
            );
        }
        self.save_reduce(
            graph,
            ("array", "_array_reconstructor"),
            vec![
                Item::Global("array", "array"),
                Item::Str(typecode),
                Item::Int(arr.machine_format()),
                Item::Bytes(arr.to_le_bytes()),
            ],
            key,
        )
    }

    fn save_tuple(
        &mut self,
        graph: &Graph,
        items: &[Item],
        key: Option<MemoKey>,
    ) -> Result<(), PickleError> {
        if items.is_empty() {
            if self.protocol >= 1 {
                self.write(&[EMPTY_TUPLE]);
            } else {
                self.write(&[MARK, TUPLE]);
            }
            return Ok(());
        }

        let n = items.len();
        if n <= 3 && self.protocol >= 2 {
            for item in items {
                self.save(graph, item)?;
            }
            // The tuple was reached again through one of its items.
            if let Some(idx) = key.and_then(|k| self.memo.get(&k).copied()) {
                self.write(&vec![POP; n]);
                self.write_get(idx);
                return Ok(());
            }
            self.write(&[[TUPLE1, TUPLE2, TUPLE3][n - 1]]);
            self.memoize(key);
            return Ok(());
        }

        self.write(&[MARK]);
        for item in items {
            self.save(graph, item)?;
        }
        if let Some(idx) = key.and_then(|k| self.memo.get(&k).copied()) {
            if self.protocol >= 1 {
                self.write(&[POP_MARK]);
            } else {
                self.write(&vec![POP; n + 1]);
            }
            self.write_get(idx);
            return Ok(());
        }
        self.write(&[TUPLE]);
        self.memoize(key);
        Ok(())
    }

    fn save_list(
        &mut self,
        graph: &Graph,
        items: &[Item],
        key: Option<MemoKey>,
    ) -> Result<(), PickleError> {
        if self.protocol >= 1 {
            self.write(&[EMPTY_LIST]);
        } else {
            self.write(&[MARK, LIST]);
        }
        self.memoize(key);

        if self.protocol == 0 {
            for item in items {
                self.save(graph, item)?;
                self.write(&[APPEND]);
            }
            return Ok(());
        }
        for batch in items.chunks(BATCH_SIZE) {
            if let [single] = batch {
                self.save(graph, single)?;
                self.write(&[APPEND]);
            } else {
                self.write(&[MARK]);
                for item in batch {
                    self.save(graph, item)?;
                }
                self.write(&[APPENDS]);
            }
        }
        Ok(())
    }

    fn save_dict(
        &mut self,
        graph: &Graph,
        entries: &[(NodeId, NodeId)],
        key: Option<MemoKey>,
    ) -> Result<(), PickleError> {
        if self.protocol >= 1 {
            self.write(&[EMPTY_DICT]);
        } else {
            self.write(&[MARK, DICT]);
        }
        self.memoize(key);

        if self.protocol == 0 {
            for &(k, v) in entries {
                self.save_node(graph, k)?;
                self.save_node(graph, v)?;
                self.write(&[SETITEM]);
            }
            return Ok(());
        }
        for batch in entries.chunks(BATCH_SIZE) {
            if let [(k, v)] = batch {
                self.save_node(graph, *k)?;
                self.save_node(graph, *v)?;
                self.write(&[SETITEM]);
            } else {
                self.write(&[MARK]);
                for &(k, v) in batch {
                    self.save_node(graph, k)?;
                    self.save_node(graph, v)?;
                }
                self.write(&[SETITEMS]);
            }
        }
        Ok(())
    }

    fn save_set(
        &mut self,
        graph: &Graph,
        items: &[NodeId],
        key: Option<MemoKey>,
    ) -> Result<(), PickleError> {
        if self.protocol < 4 {
            return self.save_reduce(
                graph,
                ("builtins", "set"),
                vec![Item::List(nodes(items))],
                key,
            );
        }
        self.write(&[EMPTY_SET]);
        self.memoize(key);
        for batch in items.chunks(BATCH_SIZE) {
            self.write(&[MARK]);
            for &item in batch {
                self.save_node(graph, item)?;
            }
            self.write(&[ADDITEMS]);
        }
        Ok(())
    }

    /// `callable(*args)`: the global, the argument tuple, REDUCE, then a memo
    /// slot for the constructed object.
    fn save_reduce(
        &mut self,
        graph: &Graph,
        (module, name): (&'static str, &'static str),
        args: Vec<Item>,
        key: Option<MemoKey>,
    ) -> Result<(), PickleError> {
        self.save_global(graph, module, name)?;
        self.save_tuple(graph, &args, None)?;
        self.write(&[REDUCE]);
        self.memoize(key);
        Ok(())
    }

    fn save_global(
        &mut self,
        graph: &Graph,
        module: &'static str,
        name: &'static str,
    ) -> Result<(), PickleError> {
        let key = Some(MemoKey::Global(module, name));
        if self.try_get(key) {
            return Ok(());
        }
        if self.protocol >= 4 {
            // A type's `__module__` is interned, a C function's is not. The
            // qualified name is always a fresh string.
            let module_item = if MODULE_FUNCTIONS.contains(&(module, name)) {
                Item::Str(module.to_owned())
            } else {
                Item::Interned(module)
            };
            self.save(graph, &module_item)?;
            self.save(graph, &Item::Str(name.to_owned()))?;
            self.write(&[STACK_GLOBAL]);
        } else {
            let module = if self.protocol < 3 && module == "builtins" {
                "__builtin__"
            } else {
                module
            };
            self.write(&[GLOBAL]);
            self.write(module.as_bytes());
            self.write(b"\n");
            self.write(name.as_bytes());
            self.write(b"\n");
        }
        self.memoize(key);
        Ok(())
    }
}

/// Encode `value` under `protocol` into a fresh buffer.
pub fn to_vec(graph: &Graph, root: NodeId, protocol: u8) -> Result<Vec<u8>, PickleError> {
    let mut pickler = Pickler::new(Vec::new(), protocol)?;
    pickler.dump(graph, root)?;
    Ok(pickler.into_inner())
}

/// Protocol 0 text for a `str`: `raw-unicode-escape` plus the escapes the
/// line-oriented opcode format needs.
fn raw_unicode_escape(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for c in value.chars() {
        let code = c as u32;
        match c {
            '\\' | '\0' | '\n' | '\r' | '\u{1a}' => {
                out.extend_from_slice(format!("\\u{code:04x}").as_bytes());
            }
            _ if code < 0x100 => out.push(code as u8),
            _ if code < 0x10000 => out.extend_from_slice(format!("\\u{code:04x}").as_bytes()),
            _ => out.extend_from_slice(format!("\\U{code:08x}").as_bytes()),
        }
    }
    out
}

fn array_items(arr: &TypedArray) -> Vec<Item> {
    fn ints<T: Copy + Into<i64>>(v: &[T]) -> Vec<Item> {
        v.iter().map(|&x| Item::Int(x.into())).collect()
    }
    match arr {
        TypedArray::Unicode(s) => s.chars().map(|c| Item::Str(c.to_string())).collect(),
        TypedArray::I8(v) => ints(v),
        TypedArray::U8(v) => ints(v),
        TypedArray::I16(v) => ints(v),
        TypedArray::U16(v) => ints(v),
        TypedArray::I32(v) => ints(v),
        TypedArray::U32(v) => ints(v),
        TypedArray::Long(v) | TypedArray::I64(v) => ints(v),
        TypedArray::ULong(v) | TypedArray::U64(v) => v.iter().map(|&x| Item::UInt(x)).collect(),
        TypedArray::F32(v) => v.iter().map(|&x| Item::Float(f64::from(x))).collect(),
        TypedArray::F64(v) => v.iter().map(|&x| Item::Float(x)).collect(),
    }
}

fn micros_bytes(nanos: u32) -> [u8; 3] {
    let us = nanos / 1_000 % 1_000_000;
    [(us >> 16) as u8, (us >> 8) as u8, us as u8]
}

fn date_state(d: &NaiveDate) -> Vec<u8> {
    let year = d.year() as u16;
    vec![(year >> 8) as u8, year as u8, d.month() as u8, d.day() as u8]
}

fn time_state(t: &NaiveTime) -> Vec<u8> {
    let mut state = vec![t.hour() as u8, t.minute() as u8, t.second() as u8];
    state.extend_from_slice(&micros_bytes(t.nanosecond()));
    state
}

fn datetime_state(dt: &NaiveDateTime) -> Vec<u8> {
    let mut state = date_state(&dt.date());
    state.extend(time_state(&dt.time()));
    state
}

/// The text `str(decimal.Decimal(literal))` gives, which is what
/// `Decimal.__reduce__` pickles. Literals `Decimal` would reject are errors.
fn canonical_decimal(literal: &str) -> Result<String, PickleError> {
    let invalid = || PickleError::InvalidDecimal(literal.to_owned());
    let (sign, body) = match literal.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", literal.strip_prefix('+').unwrap_or(literal)),
    };
    match body.to_ascii_lowercase().as_str() {
        "inf" | "infinity" => return Ok(format!("{sign}Infinity")),
        "nan" => return Ok(format!("{sign}NaN")),
        "snan" => return Ok(format!("{sign}sNaN")),
        _ => {}
    }

    let (coefficient, exponent) = match body.split_once(['e', 'E']) {
        Some((c, e)) => (c, Some(e)),
        None => (body, None),
    };
    let (int_part, frac_part) = coefficient.split_once('.').unwrap_or((coefficient, ""));
    let digits_ok = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !digits_ok(int_part) || !digits_ok(frac_part) {
        return Err(invalid());
    }
    let exponent: i64 = match exponent {
        Some(e) => {
            let unsigned = e.strip_prefix(['+', '-']).unwrap_or(e);
            if unsigned.is_empty() || !digits_ok(unsigned) {
                return Err(invalid());
            }
            e.parse().map_err(|_| invalid())?
        }
        None => 0,
    };

    let all = format!("{int_part}{frac_part}");
    let digits = match all.trim_start_matches('0') {
        "" => "0",
        d => d,
    };
    let exponent = exponent - frac_part.len() as i64;
    let adjusted = exponent + digits.len() as i64 - 1;
    let text = if exponent == 0 {
        digits.to_owned()
    } else if exponent < 0 && adjusted >= -6 {
        let point = digits.len() as i64 + exponent;
        if point > 0 {
            let (whole, fraction) = digits.split_at(point as usize);
            format!("{whole}.{fraction}")
        } else {
            format!("0.{}{digits}", "0".repeat(point.unsigned_abs() as usize))
        }
    } else {
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{first}E{adjusted:+}")
        } else {
            format!("{first}.{rest}E{adjusted:+}")
        }
    };
    Ok(format!("{sign}{text}"))
}
