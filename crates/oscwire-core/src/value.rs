//! OSC argument values and their type tags

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::stream::{StreamReader, StreamWriter};
use crate::{Error, Result};

/// Type tag characters (OSC 1.0)
pub mod tag {
    pub const BLOB: u8 = b'b';
    pub const CHAR: u8 = b'c';
    pub const COLOR: u8 = b'r';
    pub const DOUBLE: u8 = b'd';
    pub const FALSE: u8 = b'F';
    pub const FLOAT: u8 = b'f';
    pub const INFINITUM: u8 = b'I';
    pub const INT32: u8 = b'i';
    pub const INT64: u8 = b'h';
    pub const NIL: u8 = b'N';
    pub const STRING: u8 = b's';
    pub const TIME_TAG: u8 = b't';
    pub const TRUE: u8 = b'T';
    /// End of the tag string; never a valid argument
    pub const TERMINATE: u8 = b'\0';
    /// Leading character of every type tag string
    pub const PREFIX: u8 = b',';
}

/// Wire discriminant of an [`OscValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OscTypeTag {
    Blob,
    Char,
    Color,
    Double,
    False,
    Float,
    Infinitum,
    Int32,
    Int64,
    Nil,
    String,
    TimeTag,
    True,
    Terminate,
}

impl OscTypeTag {
    pub fn as_byte(self) -> u8 {
        match self {
            OscTypeTag::Blob => tag::BLOB,
            OscTypeTag::Char => tag::CHAR,
            OscTypeTag::Color => tag::COLOR,
            OscTypeTag::Double => tag::DOUBLE,
            OscTypeTag::False => tag::FALSE,
            OscTypeTag::Float => tag::FLOAT,
            OscTypeTag::Infinitum => tag::INFINITUM,
            OscTypeTag::Int32 => tag::INT32,
            OscTypeTag::Int64 => tag::INT64,
            OscTypeTag::Nil => tag::NIL,
            OscTypeTag::String => tag::STRING,
            OscTypeTag::TimeTag => tag::TIME_TAG,
            OscTypeTag::True => tag::TRUE,
            OscTypeTag::Terminate => tag::TERMINATE,
        }
    }

    pub fn from_byte(b: u8) -> Result<Self> {
        Ok(match b {
            tag::BLOB => OscTypeTag::Blob,
            tag::CHAR => OscTypeTag::Char,
            tag::COLOR => OscTypeTag::Color,
            tag::DOUBLE => OscTypeTag::Double,
            tag::FALSE => OscTypeTag::False,
            tag::FLOAT => OscTypeTag::Float,
            tag::INFINITUM => OscTypeTag::Infinitum,
            tag::INT32 => OscTypeTag::Int32,
            tag::INT64 => OscTypeTag::Int64,
            tag::NIL => OscTypeTag::Nil,
            tag::STRING => OscTypeTag::String,
            tag::TIME_TAG => OscTypeTag::TimeTag,
            tag::TRUE => OscTypeTag::True,
            tag::TERMINATE => OscTypeTag::Terminate,
            other => return Err(Error::UnsupportedTypeTag(other)),
        })
    }

    /// Tags that carry no payload bytes
    pub fn is_payload_less(self) -> bool {
        matches!(
            self,
            OscTypeTag::True
                | OscTypeTag::False
                | OscTypeTag::Nil
                | OscTypeTag::Infinitum
                | OscTypeTag::Terminate
        )
    }
}

impl fmt::Display for OscTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OscTypeTag::Terminate => write!(f, "\\0"),
            other => write!(f, "{}", other.as_byte() as char),
        }
    }
}

/// 32-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// A single OSC argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OscValue {
    Blob(Vec<u8>),
    Bool(bool),
    Char(u8),
    Color(Rgba),
    Double(f64),
    Float(f32),
    Int32(i32),
    Int64(i64),
    String(String),
    TimeTag(u64),
    Nil,
    Infinitum,
    /// End-of-tag-string marker, rejected as an argument
    Terminate,
}

impl OscValue {
    pub fn tag(&self) -> OscTypeTag {
        match self {
            OscValue::Blob(_) => OscTypeTag::Blob,
            OscValue::Bool(true) => OscTypeTag::True,
            OscValue::Bool(false) => OscTypeTag::False,
            OscValue::Char(_) => OscTypeTag::Char,
            OscValue::Color(_) => OscTypeTag::Color,
            OscValue::Double(_) => OscTypeTag::Double,
            OscValue::Float(_) => OscTypeTag::Float,
            OscValue::Int32(_) => OscTypeTag::Int32,
            OscValue::Int64(_) => OscTypeTag::Int64,
            OscValue::String(_) => OscTypeTag::String,
            OscValue::TimeTag(_) => OscTypeTag::TimeTag,
            OscValue::Nil => OscTypeTag::Nil,
            OscValue::Infinitum => OscTypeTag::Infinitum,
            OscValue::Terminate => OscTypeTag::Terminate,
        }
    }

    /// Decode the payload for `tag` from the reader.
    ///
    /// `True`, `False`, `Nil` and `Infinitum` consume nothing.
    pub fn decode(tag: OscTypeTag, reader: &mut StreamReader<'_>) -> Result<Self> {
        Ok(match tag {
            OscTypeTag::Blob => OscValue::Blob(reader.read_blob()?.to_vec()),
            OscTypeTag::Char => OscValue::Char(reader.read_char()?),
            OscTypeTag::Color => OscValue::Color(reader.read_color()?),
            OscTypeTag::Double => OscValue::Double(reader.read_f64()?),
            OscTypeTag::False => OscValue::Bool(false),
            OscTypeTag::Float => OscValue::Float(reader.read_f32()?),
            OscTypeTag::Infinitum => OscValue::Infinitum,
            OscTypeTag::Int32 => OscValue::Int32(reader.read_i32()?),
            OscTypeTag::Int64 => OscValue::Int64(reader.read_i64()?),
            OscTypeTag::Nil => OscValue::Nil,
            OscTypeTag::String => OscValue::String(reader.read_string()?.to_string()),
            OscTypeTag::TimeTag => OscValue::TimeTag(reader.read_time_tag()?),
            OscTypeTag::True => OscValue::Bool(true),
            OscTypeTag::Terminate => {
                return Err(Error::UnsupportedTypeTag(tag::TERMINATE));
            }
        })
    }

    /// Write the payload; tag-only variants write nothing.
    pub fn encode(&self, writer: &mut StreamWriter) -> Result<()> {
        match self {
            OscValue::Blob(b) => writer.write_blob(b)?,
            OscValue::Char(c) => writer.write_char(*c),
            OscValue::Color(c) => writer.write_color(*c),
            OscValue::Double(d) => writer.write_f64(*d),
            OscValue::Float(f) => writer.write_f32(*f),
            OscValue::Int32(i) => writer.write_i32(*i),
            OscValue::Int64(i) => writer.write_i64(*i),
            OscValue::String(s) => writer.write_string(s)?,
            OscValue::TimeTag(t) => writer.write_time_tag(*t),
            OscValue::Terminate => return Err(Error::UnsupportedTypeTag(tag::TERMINATE)),
            OscValue::Bool(_) | OscValue::Nil | OscValue::Infinitum => {}
        }
        Ok(())
    }

    pub fn as_int32(&self) -> Option<i32> {
        match self {
            OscValue::Int32(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_int64(&self) -> Option<i64> {
        match self {
            OscValue::Int64(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            OscValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            OscValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OscValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<u8> {
        match self {
            OscValue::Char(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Rgba> {
        match self {
            OscValue::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OscValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            OscValue::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_time_tag(&self) -> Option<u64> {
        match self {
            OscValue::TimeTag(t) => Some(*t),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, OscValue::Nil)
    }

    pub fn is_infinitum(&self) -> bool {
        matches!(self, OscValue::Infinitum)
    }
}

impl From<i32> for OscValue {
    fn from(v: i32) -> Self {
        OscValue::Int32(v)
    }
}

impl From<i64> for OscValue {
    fn from(v: i64) -> Self {
        OscValue::Int64(v)
    }
}

impl From<f32> for OscValue {
    fn from(v: f32) -> Self {
        OscValue::Float(v)
    }
}

impl From<f64> for OscValue {
    fn from(v: f64) -> Self {
        OscValue::Double(v)
    }
}

impl From<bool> for OscValue {
    fn from(v: bool) -> Self {
        OscValue::Bool(v)
    }
}

impl From<&str> for OscValue {
    fn from(v: &str) -> Self {
        OscValue::String(v.to_string())
    }
}

impl From<String> for OscValue {
    fn from(v: String) -> Self {
        OscValue::String(v)
    }
}

impl From<Vec<u8>> for OscValue {
    fn from(v: Vec<u8>) -> Self {
        OscValue::Blob(v)
    }
}

impl From<Rgba> for OscValue {
    fn from(v: Rgba) -> Self {
        OscValue::Color(v)
    }
}
