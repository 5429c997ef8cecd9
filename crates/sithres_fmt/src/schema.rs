//! Declarative binary schema decoding.
//!
//! A [`Schema`] describes a byte layout as an ordered run of typed steps:
//! integers of a declared width and endianness, fixed-length strings, byte
//! runs and nested-record arrays whose lengths may be computed from fields
//! decoded earlier in the same record, and cursor skips that never
//! materialize their bytes. [`Schema::decode`] walks the declaration once
//! over a buffer and produces a [`Record`], or fails with the first
//! [`DecodeError`] it hits. Partial records are never returned.

use crate::DecodeError;
use byteorder::{ReadBytesExt, BE, LE};
use std::fmt;
use std::io::Cursor;

/// Byte order of a schema's integer fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// Length of an array, byte run or skip: known up front, or computed from
/// the fields decoded so far. Computed lengths only ever see earlier
/// siblings; forward references cannot be expressed.
pub enum Len {
    Fixed(usize),
    Computed(LenFn),
}

/// Length callback, evaluated against the partially decoded record.
pub type LenFn = Box<dyn Fn(&Record) -> Result<i64, DecodeError> + Send + Sync>;

enum FieldKind {
    /// Unsigned integer of 1, 2 or 4 bytes.
    Uint(u8),
    /// Signed integer of 1, 2 or 4 bytes.
    Int(u8),
    /// Fixed-length string, decoded lossily.
    Str(usize),
    /// Raw byte run.
    Bytes(Len),
    /// Repeated nested records.
    Array(Schema, Len),
    /// Everything left in the buffer, as one byte run.
    Remaining,
}

struct Check {
    expected: String,
    pred: Box<dyn Fn(&Value) -> bool + Send + Sync>,
}

struct FieldSpec {
    name: String,
    kind: FieldKind,
    check: Option<Check>,
}

enum Step {
    Field(FieldSpec),
    Skip(Len),
}

/// A single decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Uint(u64),
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Record(Record),
}

impl Value {
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// Signed view; unsigned values convert when they fit.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Uint(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Uint(v) => write!(f, "{v:#x}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v:?}"),
            Value::Bytes(v) => write!(f, "{} bytes", v.len()),
            Value::List(v) => write!(f, "{} items", v.len()),
            Value::Record(_) => write!(f, "record"),
        }
    }
}

/// Ordered field → value mapping produced by a decode. Field order matches
/// declaration order, and lookups work by name or by position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn at(&self, index: usize) -> Option<&Value> {
        self.fields.get(index).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn push(&mut self, name: String, value: Value) {
        self.fields.push((name, value));
    }

    fn lookup(&self, name: &str) -> Result<&Value, DecodeError> {
        self.get(name)
            .ok_or_else(|| DecodeError::MissingField(name.into()))
    }

    pub fn uint(&self, name: &str) -> Result<u64, DecodeError> {
        self.lookup(name)?.as_uint().ok_or(DecodeError::TypeMismatch {
            field: name.into(),
            expected: "an unsigned integer",
        })
    }

    pub fn int(&self, name: &str) -> Result<i64, DecodeError> {
        self.lookup(name)?.as_int().ok_or(DecodeError::TypeMismatch {
            field: name.into(),
            expected: "an integer",
        })
    }

    pub fn text(&self, name: &str) -> Result<&str, DecodeError> {
        self.lookup(name)?.as_str().ok_or(DecodeError::TypeMismatch {
            field: name.into(),
            expected: "a string",
        })
    }

    pub fn bytes(&self, name: &str) -> Result<&[u8], DecodeError> {
        self.lookup(name)?.as_bytes().ok_or(DecodeError::TypeMismatch {
            field: name.into(),
            expected: "a byte run",
        })
    }

    pub fn list(&self, name: &str) -> Result<&[Value], DecodeError> {
        self.lookup(name)?.as_list().ok_or(DecodeError::TypeMismatch {
            field: name.into(),
            expected: "an array",
        })
    }

    pub fn record(&self, name: &str) -> Result<&Record, DecodeError> {
        self.lookup(name)?.as_record().ok_or(DecodeError::TypeMismatch {
            field: name.into(),
            expected: "a record",
        })
    }
}

/// Declarative description of a binary layout. Built once with the chained
/// methods below, then applied to buffers with [`Schema::decode`]; the
/// schema itself carries no decode state, so one instance can decode any
/// number of buffers.
pub struct Schema {
    endian: Endian,
    steps: Vec<Step>,
}

impl Schema {
    pub fn new(endian: Endian) -> Self {
        Self {
            endian,
            steps: Vec::new(),
        }
    }

    /// Little endian schema, the engine's native byte order.
    pub fn le() -> Self {
        Self::new(Endian::Little)
    }

    pub fn be() -> Self {
        Self::new(Endian::Big)
    }

    fn field(mut self, name: &str, kind: FieldKind) -> Self {
        self.steps.push(Step::Field(FieldSpec {
            name: name.into(),
            kind,
            check: None,
        }));
        self
    }

    pub fn u8(self, name: &str) -> Self {
        self.field(name, FieldKind::Uint(1))
    }

    pub fn u16(self, name: &str) -> Self {
        self.field(name, FieldKind::Uint(2))
    }

    pub fn u32(self, name: &str) -> Self {
        self.field(name, FieldKind::Uint(4))
    }

    pub fn i8(self, name: &str) -> Self {
        self.field(name, FieldKind::Int(1))
    }

    pub fn i16(self, name: &str) -> Self {
        self.field(name, FieldKind::Int(2))
    }

    pub fn i32(self, name: &str) -> Self {
        self.field(name, FieldKind::Int(4))
    }

    /// Fixed-length string field, decoded lossily from the raw bytes.
    pub fn str(self, name: &str, len: usize) -> Self {
        self.field(name, FieldKind::Str(len))
    }

    /// Raw byte run of a fixed length.
    pub fn bytes(self, name: &str, len: usize) -> Self {
        self.field(name, FieldKind::Bytes(Len::Fixed(len)))
    }

    /// Raw byte run whose length is computed from earlier fields.
    pub fn bytes_with<F>(self, name: &str, len: F) -> Self
    where
        F: Fn(&Record) -> Result<i64, DecodeError> + Send + Sync + 'static,
    {
        self.field(name, FieldKind::Bytes(Len::Computed(Box::new(len))))
    }

    /// Array of nested records with a fixed repetition count.
    pub fn array(self, name: &str, item: Schema, count: usize) -> Self {
        self.field(name, FieldKind::Array(item, Len::Fixed(count)))
    }

    /// Array of nested records whose count is computed from earlier fields.
    pub fn array_with<F>(self, name: &str, item: Schema, count: F) -> Self
    where
        F: Fn(&Record) -> Result<i64, DecodeError> + Send + Sync + 'static,
    {
        self.field(name, FieldKind::Array(item, Len::Computed(Box::new(count))))
    }

    /// Everything from the cursor to the end of the buffer, as one byte run.
    /// The run can be handed to another schema's `decode`, which is how
    /// multi-pass formats narrow their buffer stage by stage.
    pub fn remaining(self, name: &str) -> Self {
        self.field(name, FieldKind::Remaining)
    }

    /// Advances the cursor by a fixed byte count without producing output.
    pub fn skip(mut self, len: usize) -> Self {
        self.steps.push(Step::Skip(Len::Fixed(len)));
        self
    }

    /// Advances the cursor by a computed byte count without producing output.
    pub fn skip_with<F>(mut self, len: F) -> Self
    where
        F: Fn(&Record) -> Result<i64, DecodeError> + Send + Sync + 'static,
    {
        self.steps.push(Step::Skip(Len::Computed(Box::new(len))));
        self
    }

    /// Attaches a validation predicate to the most recently declared field.
    /// `expected` is the human-readable value reported on failure. The first
    /// failing check aborts the whole decode.
    ///
    /// ## Panics
    /// Panics if the previous step is not a field declaration.
    pub fn check<F>(mut self, expected: &str, pred: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let field = match self.steps.last_mut() {
            Some(Step::Field(field)) => field,
            _ => panic!("check() must follow a field declaration"),
        };
        field.check = Some(Check {
            expected: expected.into(),
            pred: Box::new(pred),
        });
        self
    }

    /// Requires the last declared integer field to equal `value`.
    pub fn expect_u32(self, value: u32) -> Self {
        self.check(&format!("{value:#x}"), move |v| {
            v.as_uint() == Some(u64::from(value))
        })
    }

    /// Requires the last declared string field to equal `value`.
    pub fn expect_str(self, value: &str) -> Self {
        let expected = value.to_owned();
        self.check(&format!("{value:?}"), move |v| {
            v.as_str() == Some(expected.as_str())
        })
    }

    /// Decodes `buf` against this schema. The entire declaration must
    /// succeed; on failure the error is returned as-is and nothing decoded
    /// so far escapes.
    pub fn decode(&self, buf: &[u8]) -> Result<Record, DecodeError> {
        self.decode_from(&mut Cursor::new(buf))
    }

    fn decode_from(&self, cur: &mut Cursor<&[u8]>) -> Result<Record, DecodeError> {
        let mut record = Record::default();

        for step in &self.steps {
            match step {
                Step::Field(field) => {
                    let value = self.decode_field(field, &record, cur)?;
                    if let Some(check) = &field.check {
                        if !(check.pred)(&value) {
                            return Err(DecodeError::ValidationFailed {
                                field: field.name.clone(),
                                expected: check.expected.clone(),
                                actual: value.to_string(),
                            });
                        }
                    }
                    record.push(field.name.clone(), value);
                }
                Step::Skip(len) => {
                    let count = bounded_len(len, &record, "skip", cur)?;
                    cur.set_position(cur.position() + count as u64);
                }
            }
        }

        Ok(record)
    }

    fn decode_field(
        &self,
        field: &FieldSpec,
        record: &Record,
        cur: &mut Cursor<&[u8]>,
    ) -> Result<Value, DecodeError> {
        let name = field.name.as_str();
        Ok(match &field.kind {
            FieldKind::Uint(width) => Value::Uint(self.read_uint(cur, name, *width)?),
            FieldKind::Int(width) => Value::Int(self.read_int(cur, name, *width)?),
            FieldKind::Str(len) => {
                require(cur, name, *len)?;
                let raw = take(cur, *len);
                Value::Str(String::from_utf8_lossy(&raw).into_owned())
            }
            FieldKind::Bytes(len) => {
                let count = bounded_len(len, record, name, cur)?;
                Value::Bytes(take(cur, count))
            }
            FieldKind::Array(item, count) => {
                let count = match count {
                    Len::Fixed(n) => *n,
                    Len::Computed(_) => resolve_len(count, record, name)?,
                };
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(Value::Record(item.decode_from(cur)?));
                }
                Value::List(items)
            }
            FieldKind::Remaining => {
                let left = remaining(cur);
                Value::Bytes(take(cur, left))
            }
        })
    }

    fn read_uint(
        &self,
        cur: &mut Cursor<&[u8]>,
        name: &str,
        width: u8,
    ) -> Result<u64, DecodeError> {
        let left = remaining(cur);
        let read = match (width, self.endian) {
            (1, _) => cur.read_u8().map(u64::from),
            (2, Endian::Little) => cur.read_u16::<LE>().map(u64::from),
            (2, Endian::Big) => cur.read_u16::<BE>().map(u64::from),
            (4, Endian::Little) => cur.read_u32::<LE>().map(u64::from),
            (4, Endian::Big) => cur.read_u32::<BE>().map(u64::from),
            _ => unreachable!("unsupported integer width"),
        };
        read.map_err(|_| DecodeError::TruncatedInput {
            field: name.into(),
            needed: width as usize,
            remaining: left,
        })
    }

    fn read_int(&self, cur: &mut Cursor<&[u8]>, name: &str, width: u8) -> Result<i64, DecodeError> {
        let left = remaining(cur);
        let read = match (width, self.endian) {
            (1, _) => cur.read_i8().map(i64::from),
            (2, Endian::Little) => cur.read_i16::<LE>().map(i64::from),
            (2, Endian::Big) => cur.read_i16::<BE>().map(i64::from),
            (4, Endian::Little) => cur.read_i32::<LE>().map(i64::from),
            (4, Endian::Big) => cur.read_i32::<BE>().map(i64::from),
            _ => unreachable!("unsupported integer width"),
        };
        read.map_err(|_| DecodeError::TruncatedInput {
            field: name.into(),
            needed: width as usize,
            remaining: left,
        })
    }
}

fn remaining(cur: &Cursor<&[u8]>) -> usize {
    (cur.get_ref().len() as u64).saturating_sub(cur.position()) as usize
}

fn require(cur: &Cursor<&[u8]>, field: &str, needed: usize) -> Result<(), DecodeError> {
    let left = remaining(cur);
    if left < needed {
        return Err(DecodeError::TruncatedInput {
            field: field.into(),
            needed,
            remaining: left,
        });
    }
    Ok(())
}

/// Callers guarantee `n <= remaining`.
fn take(cur: &mut Cursor<&[u8]>, n: usize) -> Vec<u8> {
    let start = cur.position() as usize;
    let out = cur.get_ref()[start..start + n].to_vec();
    cur.set_position((start + n) as u64);
    out
}

fn resolve_len(len: &Len, record: &Record, field: &str) -> Result<usize, DecodeError> {
    let value = match len {
        Len::Fixed(n) => return Ok(*n),
        Len::Computed(f) => f(record)?,
    };
    usize::try_from(value).map_err(|_| DecodeError::InvalidLength {
        field: field.into(),
        length: value,
    })
}

/// Resolves a byte-run/skip length and bounds-checks it against the buffer.
/// Fixed lengths that overrun report `TruncatedInput` (the buffer is too
/// short for the declaration); computed lengths that overrun report
/// `InvalidLength` (the fields they came from are nonsense).
fn bounded_len(
    len: &Len,
    record: &Record,
    field: &str,
    cur: &Cursor<&[u8]>,
) -> Result<usize, DecodeError> {
    match len {
        Len::Fixed(n) => {
            require(cur, field, *n)?;
            Ok(*n)
        }
        Len::Computed(_) => {
            let n = resolve_len(len, record, field)?;
            if n > remaining(cur) {
                return Err(DecodeError::InvalidLength {
                    field: field.into(),
                    length: n as i64,
                });
            }
            Ok(n)
        }
    }
}
