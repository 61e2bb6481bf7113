//! The fixed vocabulary of scalar type tags a header cell may declare.

use std::fmt::Display;

/// A recognized scalar type tag, in its normalized form.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Int,
    UInt,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    Double,
    Bool,
    Boolean,
    Char,
    AnsiChar,
    TChar,
    String,
    Text,
    Name,
}

impl TypeTag {
    /// Every tag, in declaration order.
    pub const ALL: [TypeTag; 20] = [
        Self::Int,
        Self::UInt,
        Self::Int8,
        Self::UInt8,
        Self::Int16,
        Self::UInt16,
        Self::Int32,
        Self::UInt32,
        Self::Int64,
        Self::UInt64,
        Self::Float,
        Self::Double,
        Self::Bool,
        Self::Boolean,
        Self::Char,
        Self::AnsiChar,
        Self::TChar,
        Self::String,
        Self::Text,
        Self::Name,
    ];

    /// Parses a token case-insensitively. Surrounding whitespace is not trimmed.
    ///
    /// The engine-prefixed `fstring`, `ftext` and `fname` spellings are accepted as
    /// aliases of `string`, `text` and `name`.
    ///
    /// ```
    /// use typed_sheet::TypeTag;
    ///
    /// assert_eq!(TypeTag::parse("Int32"), Some(TypeTag::Int32));
    /// assert_eq!(TypeTag::parse("FString"), Some(TypeTag::String));
    /// assert_eq!(TypeTag::parse("notatype"), None);
    /// ```
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "int" => Some(Self::Int),
            "uint" => Some(Self::UInt),
            "int8" => Some(Self::Int8),
            "uint8" => Some(Self::UInt8),
            "int16" => Some(Self::Int16),
            "uint16" => Some(Self::UInt16),
            "int32" => Some(Self::Int32),
            "uint32" => Some(Self::UInt32),
            "int64" => Some(Self::Int64),
            "uint64" => Some(Self::UInt64),
            "float" => Some(Self::Float),
            "double" => Some(Self::Double),
            "bool" => Some(Self::Bool),
            "boolean" => Some(Self::Boolean),
            "char" => Some(Self::Char),
            "ansichar" => Some(Self::AnsiChar),
            "tchar" => Some(Self::TChar),
            "string" | "fstring" => Some(Self::String),
            "text" | "ftext" => Some(Self::Text),
            "name" | "fname" => Some(Self::Name),
            _ => None,
        }
    }

    /// The canonical lower-case spelling.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::Boolean => "boolean",
            Self::Char => "char",
            Self::AnsiChar => "ansichar",
            Self::TChar => "tchar",
            Self::String => "string",
            Self::Text => "text",
            Self::Name => "name",
        }
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if the token names a type in the vocabulary, ignoring case.
pub fn is_valid_type(token: &str) -> bool {
    TypeTag::parse(token).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_ignores_case() {
        for token in ["int32", "INT32", "Int32", "notatype", "NotAType", "fString", "BOOLEAN", ""] {
            assert_eq!(is_valid_type(token), is_valid_type(&token.to_lowercase()), "{token}");
        }
        assert!(is_valid_type("int32"));
        assert!(!is_valid_type("notatype"));
    }

    #[test]
    fn canonical_spelling_round_trips() {
        for tag in TypeTag::ALL {
            assert_eq!(TypeTag::parse(tag.as_str()), Some(tag));
            assert_eq!(TypeTag::parse(&tag.as_str().to_uppercase()), Some(tag));
        }
    }

    #[test]
    fn rejects_near_misses() {
        for token in ["KEY", "int 32", " int32", "int128", "str", "=", "i32"] {
            assert!(!is_valid_type(token), "{token}");
        }
    }

    #[test]
    fn engine_aliases_normalize() {
        assert_eq!(TypeTag::parse("FText").map(|tag| tag.as_str()), Some("text"));
        assert_eq!(TypeTag::parse("fname").map(|tag| tag.as_str()), Some("name"));
    }
}
