//! Python-style `repr` of graph values.
//!
//! Used for progress lines and for the text form of floats inside protocol 0
//! streams, where the bytes must be exactly what `repr(float)` produces.

use std::collections::HashSet;
use std::fmt::Write;

use chrono::{Datelike, Timelike};

use crate::value::{Graph, Node, NodeId, TypedArray};

/// Format a float the way Python's `repr` does: shortest round-trip digits,
/// fixed notation for exponents in `-4..16`, scientific otherwise.
pub fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_owned();
    }

    let sci = format!("{:e}", value.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    let mut out = String::new();
    if value.is_sign_negative() {
        out.push('-');
    }
    if (-4..16).contains(&exponent) {
        if exponent >= 0 {
            let int_len = exponent as usize + 1;
            if digits.len() <= int_len {
                out.push_str(&digits);
                out.extend(std::iter::repeat_n('0', int_len - digits.len()));
                out.push_str(".0");
            } else {
                out.push_str(&digits[..int_len]);
                out.push('.');
                out.push_str(&digits[int_len..]);
            }
        } else {
            out.push_str("0.");
            out.extend(std::iter::repeat_n('0', (-exponent - 1) as usize));
            out.push_str(&digits);
        }
    } else {
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        let sign = if exponent < 0 { '-' } else { '+' };
        let _ = write!(out, "e{sign}{:02}", exponent.unsigned_abs());
    }
    out
}

/// Quote a string like Python's `repr(str)`.
pub fn str_repr(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f || (0x80..0xa0).contains(&(c as u32)) => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Quote bytes like Python's `repr(bytes)`, without the leading `b`.
fn bytes_body(value: &[u8]) -> String {
    let quote = if value.contains(&b'\'') && !value.contains(&b'"') {
        b'"'
    } else {
        b'\''
    };
    let mut out = String::new();
    out.push(quote as char);
    for &b in value {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b if b == quote => {
                out.push('\\');
                out.push(b as char);
            }
            0x20..=0x7e => out.push(b as char),
            b => {
                let _ = write!(out, "\\x{b:02x}");
            }
        }
    }
    out.push(quote as char);
    out
}

fn complex_part(value: f64) -> String {
    let text = float_repr(value);
    text.strip_suffix(".0").map(str::to_owned).unwrap_or(text)
}

fn join<T>(items: &[T], mut f: impl FnMut(&T) -> String) -> String {
    items.iter().map(&mut f).collect::<Vec<_>>().join(", ")
}

impl Graph {
    /// Python-style `repr` of the value at `root`. Containers already being
    /// printed show up as `[...]`, `{...}` or `(...)`.
    pub fn repr(&self, root: NodeId) -> String {
        let mut active = HashSet::new();
        self.repr_inner(root, &mut active)
    }

    fn repr_inner(&self, id: NodeId, active: &mut HashSet<NodeId>) -> String {
        let Some(node) = self.get(id) else {
            return format!("<dangling #{}>", id.index());
        };
        match node {
            Node::None => "None".to_owned(),
            Node::Bool(true) => "True".to_owned(),
            Node::Bool(false) => "False".to_owned(),
            Node::Int(i) => i.to_string(),
            Node::BigInt(s) => s.clone(),
            Node::Float(f) => float_repr(*f),
            Node::Str(s) => str_repr(s),
            Node::Bytes(b) => format!("b{}", bytes_body(b)),
            Node::ByteArray(b) => format!("bytearray(b{})", bytes_body(b)),
            Node::Complex { re, im } => {
                let sign = if im.is_sign_negative() { "-" } else { "+" };
                if *re == 0.0 && re.is_sign_positive() {
                    format!("{}j", complex_part(*im))
                } else {
                    format!("({}{sign}{}j)", complex_part(*re), complex_part(im.abs()))
                }
            }
            Node::DateTime(dt) => {
                let mut fields = vec![
                    dt.year().to_string(),
                    dt.month().to_string(),
                    dt.day().to_string(),
                    dt.hour().to_string(),
                    dt.minute().to_string(),
                ];
                let micros = dt.nanosecond() / 1_000 % 1_000_000;
                if dt.second() != 0 || micros != 0 {
                    fields.push(dt.second().to_string());
                }
                if micros != 0 {
                    fields.push(micros.to_string());
                }
                format!("datetime.datetime({})", fields.join(", "))
            }
            Node::Date(d) => format!("datetime.date({}, {}, {})", d.year(), d.month(), d.day()),
            Node::Time(t) => {
                let mut fields = vec![t.hour().to_string(), t.minute().to_string()];
                let micros = t.nanosecond() / 1_000 % 1_000_000;
                if t.second() != 0 || micros != 0 {
                    fields.push(t.second().to_string());
                }
                if micros != 0 {
                    fields.push(micros.to_string());
                }
                format!("datetime.time({})", fields.join(", "))
            }
            Node::TimeDelta(delta) => match delta.num_microseconds() {
                Some(total) => {
                    let (days, seconds, micros) = split_micros(total);
                    let mut fields = Vec::new();
                    if days != 0 {
                        fields.push(format!("days={days}"));
                    }
                    if seconds != 0 {
                        fields.push(format!("seconds={seconds}"));
                    }
                    if micros != 0 {
                        fields.push(format!("microseconds={micros}"));
                    }
                    if fields.is_empty() {
                        fields.push("0".to_owned());
                    }
                    format!("datetime.timedelta({})", fields.join(", "))
                }
                None => "datetime.timedelta(<out of range>)".to_owned(),
            },
            Node::Decimal(s) => format!("Decimal({})", str_repr(s)),
            Node::Array(arr) => {
                let code = arr.typecode();
                if arr.is_empty() {
                    return format!("array('{code}')");
                }
                let body = match arr {
                    TypedArray::Unicode(s) => str_repr(s),
                    TypedArray::I8(v) => format!("[{}]", join(v, i8::to_string)),
                    TypedArray::U8(v) => format!("[{}]", join(v, u8::to_string)),
                    TypedArray::I16(v) => format!("[{}]", join(v, i16::to_string)),
                    TypedArray::U16(v) => format!("[{}]", join(v, u16::to_string)),
                    TypedArray::I32(v) => format!("[{}]", join(v, i32::to_string)),
                    TypedArray::U32(v) => format!("[{}]", join(v, u32::to_string)),
                    TypedArray::Long(v) | TypedArray::I64(v) => {
                        format!("[{}]", join(v, i64::to_string))
                    }
                    TypedArray::ULong(v) | TypedArray::U64(v) => {
                        format!("[{}]", join(v, u64::to_string))
                    }
                    TypedArray::F32(v) => {
                        format!("[{}]", join(v, |f| float_repr(f64::from(*f))))
                    }
                    TypedArray::F64(v) => format!("[{}]", join(v, |f| float_repr(*f))),
                };
                format!("array('{code}', {body})")
            }
            Node::Tuple(items) => {
                if !active.insert(id) {
                    return "(...)".to_owned();
                }
                let body = join(items, |&child| self.repr_inner(child, active));
                active.remove(&id);
                if items.len() == 1 {
                    format!("({body},)")
                } else {
                    format!("({body})")
                }
            }
            Node::List(items) => {
                if !active.insert(id) {
                    return "[...]".to_owned();
                }
                let body = join(items, |&child| self.repr_inner(child, active));
                active.remove(&id);
                format!("[{body}]")
            }
            Node::Set(items) => {
                if items.is_empty() {
                    return "set()".to_owned();
                }
                if !active.insert(id) {
                    return "{...}".to_owned();
                }
                let body = join(items, |&child| self.repr_inner(child, active));
                active.remove(&id);
                format!("{{{body}}}")
            }
            Node::Dict(entries) => {
                if !active.insert(id) {
                    return "{...}".to_owned();
                }
                let body = join(entries, |&(k, v)| {
                    format!("{}: {}", self.repr_inner(k, active), self.repr_inner(v, active))
                });
                active.remove(&id);
                format!("{{{body}}}")
            }
        }
    }
}

/// Split a microsecond count into Python's normalized
/// `(days, seconds, microseconds)`, where only `days` may be negative.
pub(crate) fn split_micros(total: i64) -> (i64, i64, i64) {
    const PER_SECOND: i64 = 1_000_000;
    const PER_DAY: i64 = 86_400 * PER_SECOND;
    let days = total.div_euclid(PER_DAY);
    let rest = total.rem_euclid(PER_DAY);
    (days, rest / PER_SECOND, rest % PER_SECOND)
}
