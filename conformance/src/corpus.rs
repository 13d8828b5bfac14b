//! The reference corpus.
//!
//! Each group is keyed by the Java type label the unpickler must report, and
//! each case pairs a value with the exact string Pyrolite's `PrettyPrint`
//! produces for it. Groups and cases are kept in a fixed order so two runs
//! print identical transcripts.

use chrono::{NaiveDate, NaiveDateTime};
use pickle_ref::{Graph, NodeId, TypedArray};

use crate::error::HarnessError;
use crate::testcase::TestCase;

/// All cases expecting one type label.
#[derive(Debug, Clone)]
pub struct CaseGroup {
    pub label: String,
    pub cases: Vec<TestCase>,
}

/// Ordered groups of cases.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    groups: Vec<CaseGroup>,
}

impl Corpus {
    pub fn new(groups: Vec<CaseGroup>) -> Self {
        Self { groups }
    }

    /// The full reference corpus.
    pub fn reference() -> Result<Self, HarnessError> {
        reference_groups().map(Self::new)
    }

    pub fn groups(&self) -> &[CaseGroup] {
        &self.groups
    }

    pub fn group(&self, label: &str) -> Option<&CaseGroup> {
        self.groups.iter().find(|g| g.label == label)
    }

    /// Every case, group by group.
    pub fn cases(&self) -> impl Iterator<Item = &TestCase> {
        self.groups.iter().flat_map(|g| g.cases.iter())
    }

    /// Number of cases across all groups.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.cases.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep only the named groups. An empty filter keeps everything.
    /// Returns the labels that matched nothing.
    pub fn retain_groups(&mut self, labels: &[String]) -> Vec<String> {
        if labels.is_empty() {
            return Vec::new();
        }
        let unknown = labels
            .iter()
            .filter(|l| self.group(l).is_none())
            .cloned()
            .collect();
        self.groups.retain(|g| labels.contains(&g.label));
        unknown
    }
}

struct GroupBuilder {
    label: &'static str,
    cases: Vec<TestCase>,
}

impl GroupBuilder {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            cases: Vec::new(),
        }
    }

    fn case(mut self, expected: &str, build: impl FnOnce(&mut Graph) -> NodeId) -> Self {
        let mut graph = Graph::new();
        let root = build(&mut graph);
        self.cases.push(TestCase {
            graph,
            root,
            expected_label: self.label.to_owned(),
            expected_string: expected.to_owned(),
        });
        self
    }

    fn build(self) -> CaseGroup {
        CaseGroup {
            label: self.label.to_owned(),
            cases: self.cases,
        }
    }
}

fn datetime(
    (y, mo, d): (i32, u32, u32),
    (h, mi, s, us): (u32, u32, u32, u32),
    literal: &'static str,
) -> Result<NaiveDateTime, HarnessError> {
    NaiveDate::from_ymd_opt(y, mo, d)
        .and_then(|date| date.and_hms_micro_opt(h, mi, s, us))
        .ok_or(HarnessError::Corpus(literal))
}

fn ints(g: &mut Graph, values: &[i64]) -> Vec<NodeId> {
    values.iter().map(|&v| g.int(v)).collect()
}

fn reference_groups() -> Result<Vec<CaseGroup>, HarnessError> {
    let moment = datetime((1999, 12, 31), (14, 33, 59, 456_111), "1999-12-31 14:33:59.456111")?;
    let later = datetime((2011, 7, 18), (10, 10, 59, 999_222), "2011-07-18 10:10:59.999222")?;
    let elapsed = later - moment;

    let groups = vec![
        GroupBuilder::new("null object")
            .case("null", |g| g.none())
            .build(),
        GroupBuilder::new("java.lang.Boolean")
            .case("true", |g| g.bool(true))
            .case("false", |g| g.bool(false))
            .build(),
        GroupBuilder::new("String")
            .case("", |g| g.str(""))
            .case("hello", |g| g.str("hello"))
            .case("hello\u{ff}", |g| g.str("hello\u{ff}"))
            .case("hello\u{20ac}", |g| g.str("hello\u{20ac}"))
            .build(),
        GroupBuilder::new("net.razorvine.pickle.objects.ComplexNumber")
            .case("0.0+0.0i", |g| g.complex(0.0, 0.0))
            .case("1.2-3.4i", |g| g.complex(1.2, -3.4))
            .build(),
        GroupBuilder::new("java.util.Calendar")
            .case("31-Dec-1999 14:33:59 millisec=456", |g| g.datetime(moment))
            .case("31-Dec-1999 00:00:00 millisec=0", |g| g.date(moment.date()))
            .build(),
        GroupBuilder::new("net.razorvine.pickle.objects.Time")
            .case(
                "Time: 14 hours, 33 minutes, 59 seconds, 456111 microseconds",
                |g| g.time(moment.time()),
            )
            .build(),
        GroupBuilder::new("net.razorvine.pickle.objects.TimeDelta")
            .case(
                "Timedelta: 4216 days, 70620 seconds, 543111 microseconds (total: 364333020.543111 seconds)",
                |g| g.timedelta(elapsed),
            )
            .build(),
        int_group("java.lang.Integer", &[
            0,
            1,
            127,
            128,
            255,
            256,
            30000,
            -30000,
            60000,
            999_999_999,
            -999_999_999,
            i64::from(i32::MIN),
            i64::from(i32::MAX),
        ]),
        int_group("java.lang.Long", &[
            9_999_999_999,
            -9_999_999_999,
            19_999_999_999,
            -19_999_999_999,
            i64::from(i32::MAX) + 1,
            i64::MAX,
            i64::MIN,
        ]),
        GroupBuilder::new("java.math.BigInteger")
            .case("1111222233334444555566667777888899990000", |g| {
                g.big_int("1111222233334444555566667777888899990000")
            })
            .case("9223372036854775808", |g| g.big_int("9223372036854775808"))
            .build(),
        GroupBuilder::new("java.math.BigDecimal")
            .case("123456789.987654321", |g| g.decimal("123456789.987654321"))
            .build(),
        GroupBuilder::new("java.lang.Double")
            .case("1234.5678", |g| g.float(1234.5678))
            .case("-1.23456E255", |g| g.float(-1.23456e255))
            .build(),
        GroupBuilder::new("array of class java.lang.Object")
            .case("[]", |g| g.tuple([]))
            .case("[1, 2]", |g| {
                let items = ints(g, &[1, 2]);
                g.tuple(items)
            })
            .case("[foo, bar, 99, [1, 2, 3], null]", |g| {
                let foo = g.str("foo");
                let bar = g.str("bar");
                let n = g.int(99);
                let inner = ints(g, &[1, 2, 3]);
                let inner = g.tuple(inner);
                let none = g.none();
                g.tuple([foo, bar, n, inner, none])
            })
            .case("[abc, abc, abc]", |g| {
                let s1 = g.str("abc");
                g.tuple([s1, s1, s1])
            })
            .build(),
        GroupBuilder::new("array of char")
            .case("[a, b, c, \u{20ac}]", |g| {
                g.array(TypedArray::Unicode("abc\u{20ac}".into()))
            })
            .build(),
        GroupBuilder::new("array of byte")
            .case("[1, 2, -128]", |g| g.array(TypedArray::I8(vec![1, 2, -128])))
            .case("[1, 2, 3]", |g| g.bytearray(&[1, 2, 3]))
            .case("[65, 66, 67]", |g| g.bytearray(&[65, 66, 67]))
            .case("[65, 66, 67]", |g| g.bytes(b"ABC"))
            .build(),
        GroupBuilder::new("array of short")
            .case("[1, 2, 255]", |g| g.array(TypedArray::U8(vec![1, 2, 255])))
            .case("[1, 2, -999]", |g| g.array(TypedArray::I16(vec![1, 2, -999])))
            .build(),
        GroupBuilder::new("array of int")
            .case("[1, 2, 65535]", |g| {
                g.array(TypedArray::U16(vec![1, 2, 65535]))
            })
            .case("[1, 2, 3]", |g| g.array(TypedArray::I32(vec![1, 2, 3])))
            .case("[1, 2, -999]", |g| g.array(TypedArray::Long(vec![1, 2, -999])))
            .build(),
        GroupBuilder::new("array of long")
            .case("[1, 2, 999]", |g| g.array(TypedArray::U32(vec![1, 2, 999])))
            .case("[1, 2, 999]", |g| g.array(TypedArray::ULong(vec![1, 2, 999])))
            .build(),
        GroupBuilder::new("array of float")
            .case("[1.0, 2.0, 3.0]", |g| {
                g.array(TypedArray::F32(vec![1.0, 2.0, 3.0]))
            })
            .build(),
        GroupBuilder::new("array of double")
            .case("[1.1, 2.2, 3.3]", |g| {
                g.array(TypedArray::F64(vec![1.1, 2.2, 3.3]))
            })
            .build(),
        GroupBuilder::new("java.util.ArrayList")
            .case("[1, 2, 3]", |g| {
                let items = ints(g, &[1, 2, 3]);
                g.list(items)
            })
            .case("[a, b, c]", |g| {
                let items: Vec<_> = ["a", "b", "c"].into_iter().map(|s| g.str(s)).collect();
                g.list(items)
            })
            .case("[abc, abc, abc]", |g| {
                let s1 = g.str("abc");
                g.list([s1, s1, s1])
            })
            .case("[111, 222, 333, 111, 222, 333]", |g| {
                let [i1, i2, i3] = [111, 222, 333].map(|i| g.int(i));
                g.list([i1, i2, i3, i1, i2, i3])
            })
            .case(
                "[[111, 111], [222, 222], [333, 333], [111, 111], [222, 222], [333, 333]]",
                |g| {
                    let [a1, a2, a3] = shared_pairs(g);
                    g.list([a1, a2, a3, a1, a2, a3])
                },
            )
            .case("[a, b, (this Collection)]", |g| {
                let a = g.str("a");
                let b = g.str("b");
                let ar = g.list([a, b]);
                g.push(ar, ar);
                ar
            })
            .case("[{1=2, 3=4}, {5=6, 7=8}, {9=10, 11=12}]", |g| {
                let dicts: Vec<_> = [(1, 2, 3, 4), (5, 6, 7, 8), (9, 10, 11, 12)]
                    .into_iter()
                    .map(|(k1, v1, k2, v2)| {
                        let [k1, v1, k2, v2] = [k1, v1, k2, v2].map(|i| g.int(i));
                        g.dict([(k1, v1), (k2, v2)])
                    })
                    .collect();
                g.list(dicts)
            })
            .build(),
        GroupBuilder::new("java.util.HashSet")
            .case("[1, 2, 3]", |g| {
                let items = ints(g, &[1, 2, 3, 2, 3]);
                g.set(items)
            })
            .case("[]", |g| g.set([]))
            .build(),
        GroupBuilder::new("java.util.HashMap")
            .case("[a=1, b=2]", |g| {
                let a = g.str("a");
                let one = g.int(1);
                let b = g.str("b");
                let two = g.int(2);
                g.dict([(a, one), (b, two)])
            })
            .case("[]", |g| g.dict([]))
            .case("[abc={}]", |g| {
                let s1 = g.str("abc");
                let inner = g.dict([]);
                g.dict([(s1, inner)])
            })
            .case("[abc={def=[111, 111]}]", |g| {
                let [s1, s2, _] = shared_strs(g);
                let [a1, _, _] = shared_pairs(g);
                let inner = g.dict([(s2, a1)]);
                g.dict([(s1, inner)])
            })
            .case("[abc={def=[111, 111], ghi=[222, 222]}]", |g| {
                let [s1, s2, s3] = shared_strs(g);
                let [a1, a2, _] = shared_pairs(g);
                let inner = g.dict([(s2, a1), (s3, a2)]);
                g.dict([(s1, inner)])
            })
            .case("[abc={def=[111, 111], abc=[111, 111]}]", |g| {
                let [s1, s2, _] = shared_strs(g);
                let [a1, _, _] = shared_pairs(g);
                let inner = g.dict([(s2, a1), (s1, a1)]);
                g.dict([(s1, inner)])
            })
            .build(),
    ];
    Ok(groups)
}

fn int_group(label: &'static str, values: &[i64]) -> CaseGroup {
    values
        .iter()
        .fold(GroupBuilder::new(label), |group, &v| {
            group.case(&v.to_string(), |g| g.int(v))
        })
        .build()
}

/// `s1`, `s2`, `s3`: strings shared between containers.
fn shared_strs(g: &mut Graph) -> [NodeId; 3] {
    ["abc", "def", "ghi"].map(|s| g.str(s))
}

/// `a1`, `a2`, `a3`: two-element lists of one shared int each.
fn shared_pairs(g: &mut Graph) -> [NodeId; 3] {
    [111, 222, 333].map(|i| {
        let n = g.int(i);
        g.list([n, n])
    })
}
