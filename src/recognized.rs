use std::fmt;

/// A discriminant that was either recognized as a known variant `T` or kept as
/// its raw on-disk value.
///
/// Unknown kinds are not load errors: the record is kept, its payload is left
/// uninterpreted, and the raw value stays available for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Recognized<T, Raw> {
    Known(T),
    Unknown(Raw),
}

impl<T: Copy, Raw: Copy> Copy for Recognized<T, Raw> {}

impl<T, Raw> Recognized<T, Raw> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Recognized::Known(t) => Some(t),
            Recognized::Unknown(_) => None,
        }
    }

    pub fn unknown(&self) -> Option<&Raw> {
        match self {
            Recognized::Known(_) => None,
            Recognized::Unknown(raw) => Some(raw),
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Recognized::Known(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Recognized::Unknown(_))
    }

    /// Whether this is the known variant `expected`.
    pub fn is(&self, expected: T) -> bool
    where
        T: PartialEq,
    {
        self.known() == Some(&expected)
    }
}

impl<T: fmt::Debug, Raw: fmt::Display> fmt::Display for Recognized<T, Raw> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recognized::Known(t) => write!(f, "{t:?}"),
            Recognized::Unknown(raw) => write!(f, "unknown({raw})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_raw_value_for_unknown() {
        let known: Recognized<&str, u32> = Recognized::Known("Mesh");
        let unknown: Recognized<&str, u32> = Recognized::Unknown(12);
        assert_eq!(known.to_string(), "\"Mesh\"");
        assert_eq!(unknown.to_string(), "unknown(12)");
        assert!(known.is("Mesh"));
        assert!(!unknown.is("Mesh"));
        assert_eq!(unknown.unknown(), Some(&12));
    }
}
