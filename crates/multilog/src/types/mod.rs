//! Primitive data types and their fixed binary layout.
//!
//! Every column of a multilog record is encoded with one [`DataType`]. All
//! types except STRING have a fixed global width looked up by [`TypeId`];
//! STRING carries a per-column width.
//!
//! ## Binary Layout
//!
//! ```text
//! Type     Width  Encoding
//! BOOL     1      0x00 = false, anything else = true
//! CHAR     1      i8
//! UCHAR    1      u8
//! SHORT    2      i16, native byte order
//! USHORT   2      u16, native byte order
//! INT      4      i32, native byte order
//! UINT     4      u32, native byte order
//! LONG     8      i64, native byte order
//! ULONG    8      u64, native byte order
//! FLOAT    4      IEEE-754 binary32, native byte order
//! DOUBLE   8      IEEE-754 binary64, native byte order
//! STRING   N      N raw bytes, zero-filled, no length prefix
//! ```
//!
//! STRING values longer than the declared width are rejected; shorter values
//! are zero-padded. Unpacking a STRING returns all N bytes.

mod value;

pub use value::Value;

use crate::error::{ClientError, Result};
use std::fmt;
use std::str::FromStr;

/// Identifier of a primitive type. Discriminants are the wire type ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TypeId {
    /// The none type; has no width and cannot hold values.
    None = 0,
    /// Boolean.
    Bool = 1,
    /// Signed character.
    Char = 2,
    /// Unsigned character.
    UChar = 3,
    /// Signed short.
    Short = 4,
    /// Unsigned short.
    UShort = 5,
    /// Signed integer.
    Int = 6,
    /// Unsigned integer.
    UInt = 7,
    /// Signed long.
    Long = 8,
    /// Unsigned long.
    ULong = 9,
    /// Single precision float.
    Float = 10,
    /// Double precision float.
    Double = 11,
    /// Fixed-width string.
    String = 12,
}

impl TypeId {
    /// Creates a TypeId from its wire value.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Bool),
            2 => Some(Self::Char),
            3 => Some(Self::UChar),
            4 => Some(Self::Short),
            5 => Some(Self::UShort),
            6 => Some(Self::Int),
            7 => Some(Self::UInt),
            8 => Some(Self::Long),
            9 => Some(Self::ULong),
            10 => Some(Self::Float),
            11 => Some(Self::Double),
            12 => Some(Self::String),
            _ => None,
        }
    }

    /// Returns the wire value.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the fixed width in bytes, or `None` for STRING.
    pub fn fixed_width(self) -> Option<u32> {
        match self {
            Self::None => Some(0),
            Self::Bool | Self::Char | Self::UChar => Some(1),
            Self::Short | Self::UShort => Some(2),
            Self::Int | Self::UInt | Self::Float => Some(4),
            Self::Long | Self::ULong | Self::Double => Some(8),
            Self::String => None,
        }
    }

    /// Returns the canonical upper-case type name.
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Bool => "BOOL",
            Self::Char => "CHAR",
            Self::UChar => "UCHAR",
            Self::Short => "SHORT",
            Self::UShort => "USHORT",
            Self::Int => "INT",
            Self::UInt => "UINT",
            Self::Long => "LONG",
            Self::ULong => "ULONG",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::String => "STRING",
        }
    }

    /// Looks up a declarable type by name (case-insensitive). NONE is not declarable.
    fn from_name(name: &str) -> Option<Self> {
        let id = match name.to_ascii_uppercase().as_str() {
            "BOOL" => Self::Bool,
            "CHAR" => Self::Char,
            "UCHAR" => Self::UChar,
            "SHORT" => Self::Short,
            "USHORT" => Self::UShort,
            "INT" => Self::Int,
            "UINT" => Self::UInt,
            "LONG" => Self::Long,
            "ULONG" => Self::ULong,
            "FLOAT" => Self::Float,
            "DOUBLE" => Self::Double,
            "STRING" => Self::String,
            _ => return None,
        };
        Some(id)
    }
}

/// A primitive type together with its byte width.
///
/// Two data types are equal iff both id and width match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
    id: TypeId,
    size: u32,
}

impl DataType {
    /// The none type.
    pub const NONE: Self = Self::fixed(TypeId::None);
    /// Boolean type.
    pub const BOOL: Self = Self::fixed(TypeId::Bool);
    /// Signed character type.
    pub const CHAR: Self = Self::fixed(TypeId::Char);
    /// Unsigned character type.
    pub const UCHAR: Self = Self::fixed(TypeId::UChar);
    /// Signed short type.
    pub const SHORT: Self = Self::fixed(TypeId::Short);
    /// Unsigned short type.
    pub const USHORT: Self = Self::fixed(TypeId::UShort);
    /// Signed integer type.
    pub const INT: Self = Self::fixed(TypeId::Int);
    /// Unsigned integer type.
    pub const UINT: Self = Self::fixed(TypeId::UInt);
    /// Signed long type.
    pub const LONG: Self = Self::fixed(TypeId::Long);
    /// Unsigned long type.
    pub const ULONG: Self = Self::fixed(TypeId::ULong);
    /// Single precision float type.
    pub const FLOAT: Self = Self::fixed(TypeId::Float);
    /// Double precision float type.
    pub const DOUBLE: Self = Self::fixed(TypeId::Double);
    /// Type of the implicit leading timestamp column.
    pub const TIMESTAMP: Self = Self::ULONG;

    const fn fixed(id: TypeId) -> Self {
        let size = match id {
            TypeId::None | TypeId::String => 0,
            TypeId::Bool | TypeId::Char | TypeId::UChar => 1,
            TypeId::Short | TypeId::UShort => 2,
            TypeId::Int | TypeId::UInt | TypeId::Float => 4,
            TypeId::Long | TypeId::ULong | TypeId::Double => 8,
        };
        Self { id, size }
    }

    /// Creates a STRING type of the given width.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidType`] if `size` is zero.
    pub fn string(size: u32) -> Result<Self> {
        if size == 0 {
            return Err(ClientError::InvalidType(
                "STRING width must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            id: TypeId::String,
            size,
        })
    }

    /// Creates a data type from an id and width, as received on the wire.
    ///
    /// Fixed-width types must carry their fixed width.
    pub fn new(id: TypeId, size: u32) -> Result<Self> {
        match id.fixed_width() {
            None => Self::string(size),
            Some(width) if width == size => Ok(Self::fixed(id)),
            Some(width) => Err(ClientError::InvalidType(format!(
                "{} has width {}, got {}",
                id.name(),
                width,
                size
            ))),
        }
    }

    /// Returns the type id.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the width in bytes.
    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Returns the width as carried on the wire.
    pub fn wire_size(&self) -> u32 {
        self.size
    }

    /// Packs a value into a freshly allocated buffer of exactly `size()` bytes.
    pub fn pack(&self, value: &Value) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.size());
        self.pack_into(value, &mut out)?;
        Ok(out)
    }

    /// Appends the encoding of `value` to `out`.
    ///
    /// On error nothing is appended.
    pub fn pack_into(&self, value: &Value, out: &mut Vec<u8>) -> Result<()> {
        match self.id {
            TypeId::None => {
                return Err(ClientError::EncodingError(
                    "cannot pack a value into NONE".to_string(),
                ))
            }
            TypeId::Bool => match value {
                Value::Bool(b) => out.push(u8::from(*b)),
                _ => return Err(self.mismatch(value)),
            },
            TypeId::Char => out.extend_from_slice(&self.integer::<i8>(value)?.to_ne_bytes()),
            TypeId::UChar => out.extend_from_slice(&self.integer::<u8>(value)?.to_ne_bytes()),
            TypeId::Short => out.extend_from_slice(&self.integer::<i16>(value)?.to_ne_bytes()),
            TypeId::UShort => out.extend_from_slice(&self.integer::<u16>(value)?.to_ne_bytes()),
            TypeId::Int => out.extend_from_slice(&self.integer::<i32>(value)?.to_ne_bytes()),
            TypeId::UInt => out.extend_from_slice(&self.integer::<u32>(value)?.to_ne_bytes()),
            TypeId::Long => out.extend_from_slice(&self.integer::<i64>(value)?.to_ne_bytes()),
            TypeId::ULong => out.extend_from_slice(&self.integer::<u64>(value)?.to_ne_bytes()),
            TypeId::Float => out.extend_from_slice(&self.float32(value)?.to_ne_bytes()),
            TypeId::Double => {
                let v = value.as_f64().ok_or_else(|| self.mismatch(value))?;
                out.extend_from_slice(&v.to_ne_bytes());
            }
            TypeId::String => {
                let bytes = value.as_bytes().ok_or_else(|| self.mismatch(value))?;
                if bytes.len() > self.size() {
                    return Err(ClientError::EncodingError(format!(
                        "string of {} bytes exceeds {}",
                        bytes.len(),
                        self
                    )));
                }
                out.extend_from_slice(bytes);
                out.resize(out.len() + self.size() - bytes.len(), 0);
            }
        }
        Ok(())
    }

    /// Decodes a value from a slice of exactly `size()` bytes.
    pub fn unpack(&self, bytes: &[u8]) -> Result<Value> {
        if bytes.len() != self.size() {
            return Err(ClientError::DecodingError(format!(
                "{} expects {} bytes, got {}",
                self,
                self.size(),
                bytes.len()
            )));
        }

        let value = match self.id {
            TypeId::None => {
                return Err(ClientError::DecodingError(
                    "cannot unpack a value of NONE".to_string(),
                ))
            }
            TypeId::Bool => Value::Bool(bytes[0] != 0),
            TypeId::Char => Value::Char(i8::from_ne_bytes(array(bytes)?)),
            TypeId::UChar => Value::UChar(bytes[0]),
            TypeId::Short => Value::Short(i16::from_ne_bytes(array(bytes)?)),
            TypeId::UShort => Value::UShort(u16::from_ne_bytes(array(bytes)?)),
            TypeId::Int => Value::Int(i32::from_ne_bytes(array(bytes)?)),
            TypeId::UInt => Value::UInt(u32::from_ne_bytes(array(bytes)?)),
            TypeId::Long => Value::Long(i64::from_ne_bytes(array(bytes)?)),
            TypeId::ULong => Value::ULong(u64::from_ne_bytes(array(bytes)?)),
            TypeId::Float => Value::Float(f32::from_ne_bytes(array(bytes)?)),
            TypeId::Double => Value::Double(f64::from_ne_bytes(array(bytes)?)),
            TypeId::String => Value::String(bytes.to_vec()),
        };
        Ok(value)
    }

    /// Parses the textual form of a value of this type.
    ///
    /// BOOL accepts `true`, `false`, `1` and `0` in any case. CHAR and UCHAR
    /// take decimal integers like the wider integer types. Floats accept
    /// anything [`f64::from_str`] does, including `inf` and `NaN`. Surrounding
    /// whitespace is ignored except for STRING, which takes the text verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EncodingError`] if the text is malformed, out of
    /// range for the type, or longer than a STRING's width.
    pub fn parse_value(&self, text: &str) -> Result<Value> {
        let trimmed = text.trim();
        let value = match self.id {
            TypeId::None => {
                return Err(ClientError::EncodingError(
                    "cannot parse a value of NONE".to_string(),
                ))
            }
            TypeId::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => {
                    return Err(ClientError::EncodingError(format!(
                        "cannot parse {:?} as {}",
                        text, self
                    )))
                }
            },
            TypeId::Char => Value::Char(self.parse_number(trimmed)?),
            TypeId::UChar => Value::UChar(self.parse_number(trimmed)?),
            TypeId::Short => Value::Short(self.parse_number(trimmed)?),
            TypeId::UShort => Value::UShort(self.parse_number(trimmed)?),
            TypeId::Int => Value::Int(self.parse_number(trimmed)?),
            TypeId::UInt => Value::UInt(self.parse_number(trimmed)?),
            TypeId::Long => Value::Long(self.parse_number(trimmed)?),
            TypeId::ULong => Value::ULong(self.parse_number(trimmed)?),
            TypeId::Float => Value::Float(self.parse_number(trimmed)?),
            TypeId::Double => Value::Double(self.parse_number(trimmed)?),
            TypeId::String => {
                if text.len() > self.size() {
                    return Err(ClientError::EncodingError(format!(
                        "string of {} bytes exceeds {}",
                        text.len(),
                        self
                    )));
                }
                Value::from(text)
            }
        };
        Ok(value)
    }

    /// Decodes `bytes` and renders the value as text.
    ///
    /// STRING values drop their zero padding; invalid UTF-8 is replaced.
    pub fn format_value(&self, bytes: &[u8]) -> Result<String> {
        match self.unpack(bytes)? {
            Value::String(raw) => {
                let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
            }
            value => Ok(value.to_string()),
        }
    }

    fn parse_number<T>(&self, text: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        text.parse::<T>().map_err(|e| {
            ClientError::EncodingError(format!("cannot parse {:?} as {}: {}", text, self, e))
        })
    }

    fn integer<T: TryFrom<i128>>(&self, value: &Value) -> Result<T> {
        let wide = value.as_integer().ok_or_else(|| self.mismatch(value))?;
        T::try_from(wide).map_err(|_| {
            ClientError::EncodingError(format!("value {} out of range for {}", wide, self))
        })
    }

    fn float32(&self, value: &Value) -> Result<f32> {
        if let Value::Float(v) = value {
            return Ok(*v);
        }
        let wide = value.as_f64().ok_or_else(|| self.mismatch(value))?;
        let narrow = wide as f32;
        if wide.is_finite() && narrow.is_infinite() {
            return Err(ClientError::EncodingError(format!(
                "value {} out of range for {}",
                wide, self
            )));
        }
        Ok(narrow)
    }

    fn mismatch(&self, value: &Value) -> ClientError {
        ClientError::EncodingError(format!("cannot pack {} value as {}", value.kind(), self))
    }
}

fn array<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| {
        ClientError::DecodingError(format!("expected {} bytes, got {}", N, bytes.len()))
    })
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            TypeId::String => write!(f, "STRING({})", self.size),
            id => f.write_str(id.name()),
        }
    }
}

impl FromStr for DataType {
    type Err = ClientError;

    /// Parses a type descriptor such as `INT`, `double` or `STRING(16)`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let malformed = || ClientError::InvalidType(format!("Malformed type name {:?}", s));

        let (name, size) = match s.find('(') {
            Some(open) => {
                let digits = s[open + 1..].strip_suffix(')').ok_or_else(malformed)?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(malformed());
                }
                let size: u32 = digits.parse().map_err(|_| malformed())?;
                (&s[..open], Some(size))
            }
            None => (s, None),
        };

        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphabetic() || b == b'_') {
            return Err(malformed());
        }
        let id = TypeId::from_name(name)
            .ok_or_else(|| ClientError::InvalidType(format!("Unknown type name {:?}", s)))?;

        match (id.fixed_width(), size) {
            (None, Some(size)) => Self::string(size),
            (None, None) => Err(ClientError::InvalidType(format!(
                "{:?} requires a width, e.g. STRING(16)",
                s
            ))),
            (Some(_), None) => Ok(Self::fixed(id)),
            (Some(_), Some(size)) => Self::new(id, size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_widths() {
        assert_eq!(DataType::BOOL.size(), 1);
        assert_eq!(DataType::CHAR.size(), 1);
        assert_eq!(DataType::USHORT.size(), 2);
        assert_eq!(DataType::INT.size(), 4);
        assert_eq!(DataType::FLOAT.size(), 4);
        assert_eq!(DataType::ULONG.size(), 8);
        assert_eq!(DataType::DOUBLE.size(), 8);
        assert_eq!(DataType::string(16).unwrap().size(), 16);
    }

    #[test]
    fn test_equality_includes_width() {
        assert_eq!(DataType::string(8).unwrap(), DataType::string(8).unwrap());
        assert_ne!(DataType::string(8).unwrap(), DataType::string(9).unwrap());
        assert_ne!(DataType::LONG, DataType::ULONG);
    }

    #[test]
    fn test_zero_width_string_rejected() {
        assert!(matches!(
            DataType::string(0),
            Err(ClientError::InvalidType(_))
        ));
    }

    #[test]
    fn test_new_validates_fixed_width() {
        assert_eq!(DataType::new(TypeId::Int, 4).unwrap(), DataType::INT);
        assert!(DataType::new(TypeId::Int, 8).is_err());
        assert_eq!(
            DataType::new(TypeId::String, 3).unwrap(),
            DataType::string(3).unwrap()
        );
    }

    #[test]
    fn test_integer_boundaries_roundtrip() {
        let cases = [
            (DataType::CHAR, Value::Char(i8::MIN)),
            (DataType::CHAR, Value::Char(-1)),
            (DataType::UCHAR, Value::UChar(u8::MAX)),
            (DataType::SHORT, Value::Short(i16::MIN)),
            (DataType::USHORT, Value::UShort(u16::MAX)),
            (DataType::INT, Value::Int(-1)),
            (DataType::INT, Value::Int(i32::MAX)),
            (DataType::UINT, Value::UInt(0)),
            (DataType::LONG, Value::Long(i64::MIN)),
            (DataType::ULONG, Value::ULong(u64::MAX)),
        ];
        for (dtype, value) in cases {
            let bytes = dtype.pack(&value).unwrap();
            assert_eq!(bytes.len(), dtype.size());
            assert_eq!(dtype.unpack(&bytes).unwrap(), value);
        }
    }

    #[test]
    fn test_native_byte_order() {
        let bytes = DataType::INT.pack(&Value::Int(0x0102_0304)).unwrap();
        assert_eq!(bytes, 0x0102_0304i32.to_ne_bytes());
    }

    #[test]
    fn test_integer_conversion_range_checked() {
        let bytes = DataType::SHORT.pack(&Value::Long(-300)).unwrap();
        assert_eq!(DataType::SHORT.unpack(&bytes).unwrap(), Value::Short(-300));

        let err = DataType::UCHAR.pack(&Value::Int(256)).unwrap_err();
        assert!(matches!(err, ClientError::EncodingError(_)));
        let err = DataType::ULONG.pack(&Value::Long(-1)).unwrap_err();
        assert!(matches!(err, ClientError::EncodingError(_)));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        assert!(DataType::BOOL.pack(&Value::Int(1)).is_err());
        assert!(DataType::INT.pack(&Value::Double(1.0)).is_err());
        assert!(DataType::INT.pack(&Value::from("1")).is_err());
        assert!(DataType::string(4).unwrap().pack(&Value::Int(1)).is_err());
        assert!(DataType::NONE.pack(&Value::Bool(true)).is_err());
    }

    #[test]
    fn test_float_special_values() {
        for v in [f32::INFINITY, f32::NEG_INFINITY, f32::MIN, -0.0] {
            let bytes = DataType::FLOAT.pack(&Value::Float(v)).unwrap();
            match DataType::FLOAT.unpack(&bytes).unwrap() {
                Value::Float(out) => assert_eq!(out.to_bits(), v.to_bits()),
                other => panic!("unexpected {:?}", other),
            }
        }

        let nan = f64::from_bits(0x7ff8_0000_0000_0001);
        let bytes = DataType::DOUBLE.pack(&Value::Double(nan)).unwrap();
        match DataType::DOUBLE.unpack(&bytes).unwrap() {
            Value::Double(out) => assert_eq!(out.to_bits(), nan.to_bits()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_double_into_float_overflow() {
        assert!(DataType::FLOAT.pack(&Value::Double(1e300)).is_err());
        assert!(DataType::FLOAT.pack(&Value::Double(f64::INFINITY)).is_ok());
        let bytes = DataType::FLOAT.pack(&Value::Double(0.5)).unwrap();
        assert_eq!(DataType::FLOAT.unpack(&bytes).unwrap(), Value::Float(0.5));
    }

    #[test]
    fn test_string_padding_and_overflow() {
        let dtype = DataType::string(8).unwrap();
        let bytes = dtype.pack(&Value::from("abc")).unwrap();
        assert_eq!(bytes, b"abc\0\0\0\0\0");

        let exact = dtype.pack(&Value::from("abcdefgh")).unwrap();
        assert_eq!(dtype.unpack(&exact).unwrap(), Value::from("abcdefgh"));

        let err = dtype.pack(&Value::from("abcdefghi")).unwrap_err();
        assert!(matches!(err, ClientError::EncodingError(_)));
    }

    #[test]
    fn test_pack_into_leaves_buffer_on_error() {
        let mut out = vec![1, 2, 3];
        assert!(DataType::UCHAR.pack_into(&Value::Int(-1), &mut out).is_err());
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn test_unpack_wrong_length() {
        let err = DataType::INT.unpack(&[0, 0, 0]).unwrap_err();
        assert!(matches!(err, ClientError::DecodingError(_)));
        assert!(DataType::string(4).unwrap().unpack(&[0; 5]).is_err());
    }

    #[test]
    fn test_bool_decodes_nonzero_as_true() {
        assert_eq!(DataType::BOOL.unpack(&[0]).unwrap(), Value::Bool(false));
        assert_eq!(DataType::BOOL.unpack(&[7]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_parse_type_names() {
        assert_eq!("BOOL".parse::<DataType>().unwrap(), DataType::BOOL);
        assert_eq!("int".parse::<DataType>().unwrap(), DataType::INT);
        assert_eq!(" Double ".parse::<DataType>().unwrap(), DataType::DOUBLE);
        assert_eq!(
            "STRING(16)".parse::<DataType>().unwrap(),
            DataType::string(16).unwrap()
        );
        assert_eq!("INT(4)".parse::<DataType>().unwrap(), DataType::INT);
    }

    #[test]
    fn test_parse_rejects_bad_descriptors() {
        for s in [
            "", "NONE", "VARCHAR", "STRING", "STRING()", "STRING(0)", "STRING(x)", "STRING(4",
            "INT(8)", "IN T", "(4)", "STRING(-1)",
        ] {
            let err = s.parse::<DataType>().unwrap_err();
            assert!(
                matches!(err, ClientError::InvalidType(_)),
                "{:?} gave {:?}",
                s,
                err
            );
        }
    }

    #[test]
    fn test_parse_value_boundaries() {
        let cases = [
            (DataType::CHAR, "-128", Value::Char(i8::MIN)),
            (DataType::CHAR, "127", Value::Char(i8::MAX)),
            (DataType::UCHAR, "255", Value::UChar(u8::MAX)),
            (DataType::SHORT, "-32768", Value::Short(i16::MIN)),
            (DataType::USHORT, "65535", Value::UShort(u16::MAX)),
            (DataType::INT, " -2147483648 ", Value::Int(i32::MIN)),
            (DataType::UINT, "4294967295", Value::UInt(u32::MAX)),
            (DataType::LONG, "-9223372036854775808", Value::Long(i64::MIN)),
            (DataType::ULONG, "18446744073709551615", Value::ULong(u64::MAX)),
            (DataType::FLOAT, "0.5", Value::Float(0.5)),
            (DataType::FLOAT, "-inf", Value::Float(f32::NEG_INFINITY)),
            (DataType::DOUBLE, "1e300", Value::Double(1e300)),
        ];
        for (dtype, text, expected) in cases {
            assert_eq!(dtype.parse_value(text).unwrap(), expected, "{} {:?}", dtype, text);
        }

        match DataType::DOUBLE.parse_value("NaN").unwrap() {
            Value::Double(v) => assert!(v.is_nan()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_value_rejects_out_of_range() {
        for (dtype, text) in [
            (DataType::CHAR, "128"),
            (DataType::UCHAR, "-1"),
            (DataType::SHORT, "32768"),
            (DataType::USHORT, "65536"),
            (DataType::INT, "2147483648"),
            (DataType::UINT, "-1"),
            (DataType::LONG, "9223372036854775808"),
            (DataType::ULONG, "18446744073709551616"),
        ] {
            let err = dtype.parse_value(text).unwrap_err();
            assert!(matches!(err, ClientError::EncodingError(_)), "{} {:?}", dtype, text);
        }
    }

    #[test]
    fn test_parse_value_rejects_malformed() {
        for (dtype, text) in [
            (DataType::BOOL, "yes"),
            (DataType::BOOL, ""),
            (DataType::CHAR, "a"),
            (DataType::INT, "1.5"),
            (DataType::INT, ""),
            (DataType::LONG, "12abc"),
            (DataType::FLOAT, "one"),
            (DataType::DOUBLE, "1e"),
            (DataType::NONE, "0"),
        ] {
            let err = dtype.parse_value(text).unwrap_err();
            assert!(matches!(err, ClientError::EncodingError(_)), "{} {:?}", dtype, text);
        }
    }

    #[test]
    fn test_parse_bool_forms() {
        for text in ["true", "TRUE", " True ", "1"] {
            assert_eq!(DataType::BOOL.parse_value(text).unwrap(), Value::Bool(true));
        }
        for text in ["false", "False", "0"] {
            assert_eq!(DataType::BOOL.parse_value(text).unwrap(), Value::Bool(false));
        }
    }

    #[test]
    fn test_parse_string_value() {
        let dtype = DataType::string(4).unwrap();
        assert_eq!(dtype.parse_value(" ab ").unwrap(), Value::from(" ab "));
        assert_eq!(dtype.parse_value("").unwrap(), Value::from(""));
        let err = dtype.parse_value("abcde").unwrap_err();
        assert!(matches!(err, ClientError::EncodingError(_)));
    }

    #[test]
    fn test_format_value() {
        let text = |dtype: DataType, value: Value| {
            dtype.format_value(&dtype.pack(&value).unwrap()).unwrap()
        };
        assert_eq!(text(DataType::BOOL, Value::Bool(true)), "true");
        assert_eq!(text(DataType::CHAR, Value::Char(-5)), "-5");
        assert_eq!(text(DataType::ULONG, Value::ULong(u64::MAX)), "18446744073709551615");
        assert_eq!(text(DataType::FLOAT, Value::Float(0.1)), "0.1");
        assert_eq!(text(DataType::DOUBLE, Value::Double(f64::INFINITY)), "inf");

        let string = DataType::string(6).unwrap();
        assert_eq!(text(string, Value::from("ab")), "ab");
        assert_eq!(text(string, Value::from("")), "");
        assert_eq!(string.format_value(b"a\0b\0\0\0").unwrap(), "a\0b");

        assert!(DataType::INT.format_value(&[0, 0]).is_err());
    }

    #[test]
    fn test_formatted_values_parse_back() {
        let cases = [
            (DataType::BOOL, Value::Bool(false)),
            (DataType::UCHAR, Value::UChar(200)),
            (DataType::SHORT, Value::Short(-7)),
            (DataType::LONG, Value::Long(i64::MAX)),
            (DataType::FLOAT, Value::Float(f32::MIN_POSITIVE)),
            (DataType::DOUBLE, Value::Double(-1.0 / 3.0)),
        ];
        for (dtype, value) in cases {
            let text = dtype.format_value(&dtype.pack(&value).unwrap()).unwrap();
            assert_eq!(dtype.parse_value(&text).unwrap(), value, "{}", text);
        }
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        for dtype in [DataType::UCHAR, DataType::ULONG, DataType::string(5).unwrap()] {
            assert_eq!(dtype.to_string().parse::<DataType>().unwrap(), dtype);
        }
    }
}
