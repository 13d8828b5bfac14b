//! Value graph.
//!
//! Every value lives in a [`Graph`] arena and is addressed by a [`NodeId`].
//! Containers store child ids, never child values, so the same child can be
//! referenced from many slots (aliasing) or from inside itself (cycles).

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

/// Handle to a node inside a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in its graph.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A homogeneous `array.array` payload, one variant per typecode.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedArray {
    /// `u`: wide characters.
    Unicode(String),
    /// `b`
    I8(Vec<i8>),
    /// `B`
    U8(Vec<u8>),
    /// `h`
    I16(Vec<i16>),
    /// `H`
    U16(Vec<u16>),
    /// `i`
    I32(Vec<i32>),
    /// `I`
    U32(Vec<u32>),
    /// `l`: a C `long`, 8 bytes on the reference machine.
    Long(Vec<i64>),
    /// `L`: a C `unsigned long`.
    ULong(Vec<u64>),
    /// `q`
    I64(Vec<i64>),
    /// `Q`
    U64(Vec<u64>),
    /// `f`
    F32(Vec<f32>),
    /// `d`
    F64(Vec<f64>),
}

impl TypedArray {
    /// The single-character typecode Python uses for this array.
    pub fn typecode(&self) -> char {
        match self {
            Self::Unicode(_) => 'u',
            Self::I8(_) => 'b',
            Self::U8(_) => 'B',
            Self::I16(_) => 'h',
            Self::U16(_) => 'H',
            Self::I32(_) => 'i',
            Self::U32(_) => 'I',
            Self::Long(_) => 'l',
            Self::ULong(_) => 'L',
            Self::I64(_) => 'q',
            Self::U64(_) => 'Q',
            Self::F32(_) => 'f',
            Self::F64(_) => 'd',
        }
    }

    /// Machine format code from CPython's `arraymodule.c` for an LP64
    /// little-endian host.
    pub fn machine_format(&self) -> i64 {
        match self {
            Self::U8(_) => 0,
            Self::I8(_) => 1,
            Self::U16(_) => 2,
            Self::I16(_) => 4,
            Self::U32(_) => 6,
            Self::I32(_) => 8,
            Self::ULong(_) | Self::U64(_) => 10,
            Self::Long(_) | Self::I64(_) => 12,
            Self::F32(_) => 14,
            Self::F64(_) => 16,
            Self::Unicode(_) => 20,
        }
    }

    /// Raw item bytes in native (little-endian) order.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        fn collect<T: Copy, const N: usize>(items: &[T], f: fn(T) -> [u8; N]) -> Vec<u8> {
            items.iter().flat_map(|&item| f(item)).collect()
        }
        match self {
            Self::Unicode(s) => s.chars().flat_map(|c| (c as u32).to_le_bytes()).collect(),
            Self::I8(v) => collect(v, i8::to_le_bytes),
            Self::U8(v) => v.clone(),
            Self::I16(v) => collect(v, i16::to_le_bytes),
            Self::U16(v) => collect(v, u16::to_le_bytes),
            Self::I32(v) => collect(v, i32::to_le_bytes),
            Self::U32(v) => collect(v, u32::to_le_bytes),
            Self::Long(v) | Self::I64(v) => collect(v, i64::to_le_bytes),
            Self::ULong(v) | Self::U64(v) => collect(v, u64::to_le_bytes),
            Self::F32(v) => collect(v, f32::to_le_bytes),
            Self::F64(v) => collect(v, f64::to_le_bytes),
        }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        match self {
            Self::Unicode(s) => s.chars().count(),
            Self::I8(v) => v.len(),
            Self::U8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::Long(v) | Self::I64(v) => v.len(),
            Self::ULong(v) | Self::U64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One value in the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    None,
    Bool(bool),
    Int(i64),
    /// Integer outside `i64`, kept as its decimal literal.
    BigInt(String),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    ByteArray(Vec<u8>),
    Complex { re: f64, im: f64 },
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    TimeDelta(TimeDelta),
    /// `decimal.Decimal`, kept as its literal.
    Decimal(String),
    Array(TypedArray),
    Tuple(Vec<NodeId>),
    List(Vec<NodeId>),
    /// Set items in iteration order, duplicates already removed.
    Set(Vec<NodeId>),
    /// Dict entries in insertion order.
    Dict(Vec<(NodeId, NodeId)>),
}

impl Node {
    /// Hash-equality key for set deduplication. Only hashable scalars have
    /// one; everything else compares by identity.
    fn set_key(&self) -> Option<SetKey<'_>> {
        match self {
            Self::None => Some(SetKey::None),
            Self::Bool(b) => Some(SetKey::Int(i64::from(*b))),
            Self::Int(i) => Some(SetKey::Int(*i)),
            Self::BigInt(s) => Some(SetKey::Text(s)),
            Self::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Some(SetKey::Int(*f as i64)),
            Self::Float(f) => Some(SetKey::Float(f.to_bits())),
            Self::Str(s) => Some(SetKey::Text(s)),
            Self::Bytes(b) => Some(SetKey::Bytes(b)),
            _ => None,
        }
    }
}

#[derive(PartialEq)]
enum SetKey<'a> {
    None,
    Int(i64),
    Float(u64),
    Text(&'a str),
    Bytes(&'a [u8]),
}

/// Arena of value nodes.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a node and return its id.
    pub fn add(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Look up a node.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn none(&mut self) -> NodeId {
        self.add(Node::None)
    }

    pub fn bool(&mut self, value: bool) -> NodeId {
        self.add(Node::Bool(value))
    }

    pub fn int(&mut self, value: i64) -> NodeId {
        self.add(Node::Int(value))
    }

    /// Arbitrary-precision integer from a decimal literal such as
    /// `"-123456789012345678901234567890"`. The literal is validated when
    /// the graph is encoded.
    pub fn big_int(&mut self, literal: &str) -> NodeId {
        self.add(Node::BigInt(literal.to_owned()))
    }

    pub fn float(&mut self, value: f64) -> NodeId {
        self.add(Node::Float(value))
    }

    pub fn str(&mut self, value: &str) -> NodeId {
        self.add(Node::Str(value.to_owned()))
    }

    pub fn bytes(&mut self, value: &[u8]) -> NodeId {
        self.add(Node::Bytes(value.to_vec()))
    }

    pub fn bytearray(&mut self, value: &[u8]) -> NodeId {
        self.add(Node::ByteArray(value.to_vec()))
    }

    pub fn complex(&mut self, re: f64, im: f64) -> NodeId {
        self.add(Node::Complex { re, im })
    }

    pub fn datetime(&mut self, value: NaiveDateTime) -> NodeId {
        self.add(Node::DateTime(value))
    }

    pub fn date(&mut self, value: NaiveDate) -> NodeId {
        self.add(Node::Date(value))
    }

    pub fn time(&mut self, value: NaiveTime) -> NodeId {
        self.add(Node::Time(value))
    }

    pub fn timedelta(&mut self, value: TimeDelta) -> NodeId {
        self.add(Node::TimeDelta(value))
    }

    /// `decimal.Decimal` from its literal. The encoder writes the literal in
    /// `str(Decimal)` form, so `.5` goes out as `0.5`; malformed literals fail
    /// at encode time.
    pub fn decimal(&mut self, literal: &str) -> NodeId {
        self.add(Node::Decimal(literal.to_owned()))
    }

    pub fn array(&mut self, value: TypedArray) -> NodeId {
        self.add(Node::Array(value))
    }

    pub fn tuple(&mut self, items: impl IntoIterator<Item = NodeId>) -> NodeId {
        self.add(Node::Tuple(items.into_iter().collect()))
    }

    pub fn list(&mut self, items: impl IntoIterator<Item = NodeId>) -> NodeId {
        self.add(Node::List(items.into_iter().collect()))
    }

    /// Build a set, dropping items equal to an earlier one the way Python's
    /// `set()` would. Unhashable items are kept as-is.
    pub fn set(&mut self, items: impl IntoIterator<Item = NodeId>) -> NodeId {
        let mut kept: Vec<NodeId> = Vec::new();
        for item in items {
            let key = self.get(item).and_then(Node::set_key);
            let duplicate = key.is_some_and(|key| {
                kept.iter()
                    .any(|&k| self.get(k).and_then(Node::set_key).as_ref() == Some(&key))
            });
            if !duplicate {
                kept.push(item);
            }
        }
        self.add(Node::Set(kept))
    }

    /// Build a dict. A repeated key replaces the earlier value but keeps the
    /// earlier position, like a Python dict literal.
    pub fn dict(&mut self, entries: impl IntoIterator<Item = (NodeId, NodeId)>) -> NodeId {
        let mut kept: Vec<(NodeId, NodeId)> = Vec::new();
        for (key, value) in entries {
            let probe = self.get(key).and_then(Node::set_key);
            let existing = kept.iter_mut().find(|(k, _)| {
                *k == key
                    || (probe.is_some() && self.get(*k).and_then(Node::set_key) == probe)
            });
            match existing {
                Some(slot) => slot.1 = value,
                None => kept.push((key, value)),
            }
        }
        self.add(Node::Dict(kept))
    }

    /// Append `item` to the list at `list`. Returns `false` if `list` is not
    /// a list. This is how a list comes to contain itself.
    pub fn push(&mut self, list: NodeId, item: NodeId) -> bool {
        match self.nodes.get_mut(list.0) {
            Some(Node::List(items)) => {
                items.push(item);
                true
            }
            _ => false,
        }
    }

    /// Replace slot `index` of the list at `list`, like `lst[index] = item`.
    pub fn set_item(&mut self, list: NodeId, index: usize, item: NodeId) -> bool {
        match self.nodes.get_mut(list.0) {
            Some(Node::List(items)) if index < items.len() => {
                items[index] = item;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_drops_equal_scalars() {
        let mut g = Graph::new();
        let items: Vec<_> = [1, 2, 3, 2, 3].into_iter().map(|i| g.int(i)).collect();
        let set = g.set(items);
        let Some(Node::Set(kept)) = g.get(set) else {
            panic!("expected a set");
        };
        let values: Vec<_> = kept.iter().map(|&id| g.get(id).cloned()).collect();
        assert_eq!(
            values,
            vec![Some(Node::Int(1)), Some(Node::Int(2)), Some(Node::Int(3))]
        );
    }

    #[test]
    fn dict_repeated_key_keeps_first_position() {
        let mut g = Graph::new();
        let abc = g.str("abc");
        let def = g.str("def");
        let one = g.int(1);
        let two = g.int(2);
        let three = g.int(3);
        let dict = g.dict([(abc, one), (def, two), (abc, three)]);
        assert_eq!(g.get(dict), Some(&Node::Dict(vec![(abc, three), (def, two)])));
    }

    #[test]
    fn list_can_contain_itself() {
        let mut g = Graph::new();
        let a = g.str("a");
        let list = g.list([a, a]);
        assert!(g.set_item(list, 1, list));
        assert_eq!(g.get(list), Some(&Node::List(vec![a, list])));
        assert!(!g.push(a, list));
    }

    #[test]
    fn array_machine_bytes() {
        let arr = TypedArray::I16(vec![1, -999]);
        assert_eq!(arr.typecode(), 'h');
        assert_eq!(arr.machine_format(), 4);
        assert_eq!(arr.to_le_bytes(), vec![1, 0, 0x19, 0xfc]);
        assert_eq!(TypedArray::Unicode("a\u{20ac}".into()).to_le_bytes().len(), 8);
    }
}
