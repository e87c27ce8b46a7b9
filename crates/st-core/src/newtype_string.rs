//! Macro for defining strongly-typed string identifiers.
//!
//! Graph identifiers (node ids, qualified keys) are plain strings on the wire
//! but must never be mixed up with display names. Each identifier type carries
//! its own validity check, which is enforced on construction and on
//! deserialization.

/// Define a strongly-typed string identifier with a validity predicate.
///
/// Generates:
/// - The struct with `Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize`
/// - Custom `Deserialize` (rejects values failing the predicate)
/// - `try_new()` (returns Option), `as_str()`, `into_inner()`
/// - `Display`, `AsRef<str>`, `Deref<Target=str>`, `Borrow<str>`
/// - `PartialEq<str>`, `PartialEq<&str>`, `PartialEq<String>`
macro_rules! define_identifier {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
        valid = |$arg:ident| $check:expr;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
        #[serde(transparent)]
        $vis struct $Name(String);

        impl<'de> serde::Deserialize<'de> for $Name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $Name::try_new(s)
                    .ok_or_else(|| serde::de::Error::custom(concat!("invalid ", stringify!($Name))))
            }
        }

        impl $Name {
            fn is_valid($arg: &str) -> bool {
                $check
            }

            /// Try to create a new identifier, returning `None` if the value is invalid.
            pub fn try_new(value: impl Into<String>) -> Option<Self> {
                let s = value.into();
                if Self::is_valid(&s) { Some(Self(s)) } else { None }
            }

            /// Return the underlying identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $Name {
            fn as_ref(&self) -> &str { &self.0 }
        }

        impl std::ops::Deref for $Name {
            type Target = str;
            fn deref(&self) -> &str { &self.0 }
        }

        impl std::borrow::Borrow<str> for $Name {
            fn borrow(&self) -> &str { &self.0 }
        }

        impl PartialEq<str> for $Name {
            fn eq(&self, other: &str) -> bool { self.0 == other }
        }

        impl PartialEq<&str> for $Name {
            fn eq(&self, other: &&str) -> bool { self.0 == *other }
        }

        impl PartialEq<String> for $Name {
            fn eq(&self, other: &String) -> bool { self.0 == *other }
        }
    };
}

pub(crate) use define_identifier;
