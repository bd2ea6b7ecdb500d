/// Create a strongly-typed newtype wrapper around an integer.
///
/// The generated type derefs to the inner value, converts to and from it,
/// orders and hashes like it, and serializes transparently. An optional
/// display prefix is prepended when formatting with `{}` (`NodeId(2)` prints
/// as `node_2`); `FromStr` accepts both the prefixed and the bare form.
#[macro_export]
macro_rules! strong_type {
    ($name:ident, $inner:ty) => {
        $crate::strong_type!($name, $inner, "");
    };
    ($name:ident, $inner:ty, $prefix:expr) => {
        #[derive(
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Default,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            /// Prefix used by `Display` and accepted by `FromStr`.
            pub const DISPLAY_PREFIX: &'static str = $prefix;
        }

        impl ::std::ops::Deref for $name {
            type Target = $inner;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}{}", Self::DISPLAY_PREFIX, self.0)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::Status;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let raw = s.trim();
                let raw = raw.strip_prefix(Self::DISPLAY_PREFIX).unwrap_or(raw);
                raw.parse::<$inner>().map(Self).map_err(|_| {
                    $crate::Status::with_message(
                        $crate::StatusCode::INVALID_ARG,
                        format!("invalid {}: {:?}", stringify!($name), s),
                    )
                })
            }
        }

        impl From<$inner> for $name {
            #[inline]
            fn from(val: $inner) -> Self {
                Self(val)
            }
        }

        impl From<$name> for $inner {
            #[inline]
            fn from(val: $name) -> Self {
                val.0
            }
        }
    };
}

/// Create a strongly-typed newtype wrapper around an owned `String`.
///
/// Used for textual identifiers (file ids, chunk ids) so that they cannot be
/// mixed up with one another or with arbitrary strings.
#[macro_export]
macro_rules! string_type {
    ($name:ident) => {
        #[derive(
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Default,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::std::ops::Deref for $name {
            type Target = str;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.0)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(val: String) -> Self {
                Self(val)
            }
        }

        impl From<&str> for $name {
            fn from(val: &str) -> Self {
                Self(val.to_string())
            }
        }

        impl ::std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}
