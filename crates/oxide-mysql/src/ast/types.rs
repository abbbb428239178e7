//! MySQL data type definitions.

use core::fmt;

use super::display::quote_string;

/// MySQL column data types.
///
/// Optional `u32` payloads carry the display width, length or fractional
/// seconds precision written in parentheses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    // Integer types
    /// TINYINT.
    Tinyint(Option<u32>),
    /// SMALLINT.
    Smallint(Option<u32>),
    /// MEDIUMINT.
    Mediumint(Option<u32>),
    /// INT / INTEGER.
    Int(Option<u32>),
    /// BIGINT.
    Bigint(Option<u32>),

    // Fixed and floating point
    /// DECIMAL / NUMERIC.
    Decimal {
        /// Total number of digits.
        precision: Option<u32>,
        /// Number of digits after decimal point.
        scale: Option<u32>,
    },
    /// FLOAT.
    Float {
        /// Total number of digits.
        precision: Option<u32>,
        /// Number of digits after decimal point.
        scale: Option<u32>,
    },
    /// DOUBLE / REAL.
    Double {
        /// Total number of digits.
        precision: Option<u32>,
        /// Number of digits after decimal point.
        scale: Option<u32>,
    },
    /// BIT.
    Bit(Option<u32>),
    /// BOOL / BOOLEAN (an alias of TINYINT(1)).
    Boolean,

    // String types
    /// CHAR.
    Char(Option<u32>),
    /// VARCHAR.
    Varchar(Option<u32>),
    /// BINARY.
    Binary(Option<u32>),
    /// VARBINARY.
    Varbinary(Option<u32>),
    /// TINYTEXT.
    Tinytext,
    /// TEXT.
    Text(Option<u32>),
    /// MEDIUMTEXT.
    Mediumtext,
    /// LONGTEXT.
    Longtext,
    /// TINYBLOB.
    Tinyblob,
    /// BLOB.
    Blob(Option<u32>),
    /// MEDIUMBLOB.
    Mediumblob,
    /// LONGBLOB.
    Longblob,
    /// ENUM('a', 'b').
    Enum(Vec<String>),
    /// SET('a', 'b').
    Set(Vec<String>),

    // Date/time types
    /// DATE.
    Date,
    /// TIME.
    Time(Option<u32>),
    /// DATETIME.
    Datetime(Option<u32>),
    /// TIMESTAMP.
    Timestamp(Option<u32>),
    /// YEAR.
    Year(Option<u32>),

    /// JSON.
    Json,

    /// Any other type name (spatial types and the like), kept verbatim.
    Custom(String),
}

impl DataType {
    /// Builds a type from its upper-cased name, numeric arguments and
    /// ENUM/SET values. Returns `None` when the arguments do not fit.
    #[must_use]
    pub fn from_parts(name: &str, args: &[u32], values: Vec<String>) -> Option<Self> {
        let first = args.first().copied();
        let second = args.get(1).copied();
        let data_type = match name {
            "TINYINT" => Self::Tinyint(first),
            "SMALLINT" => Self::Smallint(first),
            "MEDIUMINT" => Self::Mediumint(first),
            "INT" | "INTEGER" => Self::Int(first),
            "BIGINT" => Self::Bigint(first),
            "DECIMAL" | "DEC" | "NUMERIC" | "FIXED" => Self::Decimal {
                precision: first,
                scale: second,
            },
            "FLOAT" => Self::Float {
                precision: first,
                scale: second,
            },
            "DOUBLE" | "REAL" => Self::Double {
                precision: first,
                scale: second,
            },
            "BIT" => Self::Bit(first),
            "BOOL" | "BOOLEAN" => Self::Boolean,
            "CHAR" | "CHARACTER" => Self::Char(first),
            "VARCHAR" => Self::Varchar(first),
            "BINARY" => Self::Binary(first),
            "VARBINARY" => Self::Varbinary(first),
            "TINYTEXT" => Self::Tinytext,
            "TEXT" => Self::Text(first),
            "MEDIUMTEXT" => Self::Mediumtext,
            "LONGTEXT" => Self::Longtext,
            "TINYBLOB" => Self::Tinyblob,
            "BLOB" => Self::Blob(first),
            "MEDIUMBLOB" => Self::Mediumblob,
            "LONGBLOB" => Self::Longblob,
            "ENUM" => Self::Enum(values),
            "SET" => Self::Set(values),
            "DATE" => Self::Date,
            "TIME" => Self::Time(first),
            "DATETIME" => Self::Datetime(first),
            "TIMESTAMP" => Self::Timestamp(first),
            "YEAR" => Self::Year(first),
            "JSON" => Self::Json,
            _ if args.is_empty() => Self::Custom(name.to_string()),
            _ => return None,
        };
        Some(data_type)
    }

    /// Returns true for the integer family (including BOOLEAN).
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::Tinyint(_)
                | Self::Smallint(_)
                | Self::Mediumint(_)
                | Self::Int(_)
                | Self::Bigint(_)
                | Self::Boolean
        )
    }

    /// Returns true for BLOB/TEXT types, which cannot carry a literal default.
    #[must_use]
    pub const fn is_lob(&self) -> bool {
        matches!(
            self,
            Self::Tinytext
                | Self::Text(_)
                | Self::Mediumtext
                | Self::Longtext
                | Self::Tinyblob
                | Self::Blob(_)
                | Self::Mediumblob
                | Self::Longblob
                | Self::Json
        )
    }

    /// Returns the SQL representation of the data type.
    #[must_use]
    pub fn to_sql(&self) -> String {
        fn sized(name: &str, len: Option<u32>) -> String {
            match len {
                Some(n) => format!("{name}({n})"),
                None => name.to_string(),
            }
        }
        fn scaled(name: &str, precision: Option<u32>, scale: Option<u32>) -> String {
            match (precision, scale) {
                (Some(p), Some(s)) => format!("{name}({p},{s})"),
                (Some(p), None) => format!("{name}({p})"),
                _ => name.to_string(),
            }
        }
        fn listed(name: &str, values: &[String]) -> String {
            let values: Vec<String> = values.iter().map(|v| quote_string(v)).collect();
            format!("{name}({})", values.join(","))
        }

        match self {
            Self::Tinyint(w) => sized("TINYINT", *w),
            Self::Smallint(w) => sized("SMALLINT", *w),
            Self::Mediumint(w) => sized("MEDIUMINT", *w),
            Self::Int(w) => sized("INT", *w),
            Self::Bigint(w) => sized("BIGINT", *w),
            Self::Decimal { precision, scale } => scaled("DECIMAL", *precision, *scale),
            Self::Float { precision, scale } => scaled("FLOAT", *precision, *scale),
            Self::Double { precision, scale } => scaled("DOUBLE", *precision, *scale),
            Self::Bit(w) => sized("BIT", *w),
            Self::Boolean => String::from("BOOLEAN"),
            Self::Char(len) => sized("CHAR", *len),
            Self::Varchar(len) => sized("VARCHAR", *len),
            Self::Binary(len) => sized("BINARY", *len),
            Self::Varbinary(len) => sized("VARBINARY", *len),
            Self::Tinytext => String::from("TINYTEXT"),
            Self::Text(len) => sized("TEXT", *len),
            Self::Mediumtext => String::from("MEDIUMTEXT"),
            Self::Longtext => String::from("LONGTEXT"),
            Self::Tinyblob => String::from("TINYBLOB"),
            Self::Blob(len) => sized("BLOB", *len),
            Self::Mediumblob => String::from("MEDIUMBLOB"),
            Self::Longblob => String::from("LONGBLOB"),
            Self::Enum(values) => listed("ENUM", values),
            Self::Set(values) => listed("SET", values),
            Self::Date => String::from("DATE"),
            Self::Time(fsp) => sized("TIME", *fsp),
            Self::Datetime(fsp) => sized("DATETIME", *fsp),
            Self::Timestamp(fsp) => sized("TIMESTAMP", *fsp),
            Self::Year(w) => sized("YEAR", *w),
            Self::Json => String::from("JSON"),
            Self::Custom(name) => name.clone(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}
