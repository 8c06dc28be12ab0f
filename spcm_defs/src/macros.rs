//! Declarative builders for the integer catalogs and bit-flag sets of the SPCM DLL.
//!
//! The vendor extends its lists between DLL releases, so neither builder ever rejects a raw
//! value: catalogs fall back to an `Unknown(raw)` member and flag sets keep bits they do not name.

/// Defines a catalog of named vendor constants plus an `Unknown(raw)` member.
///
/// Each entry is `Variant = value => "VENDOR_NAME"`. The generated type provides
/// `from_raw`, `raw`, `name`, `is_known`, the `KNOWN` list, `From` conversions in both
/// directions and a `Display` that prints the vendor name.
macro_rules! spcm_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident: $raw:ty {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $value:literal => $bh:literal,
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )*
            /// A value this catalog does not list (added by a newer DLL, or garbage).
            Unknown($raw),
        }

        impl $name {
            /// Every listed member, in declaration order.
            pub const KNOWN: &'static [$name] = &[$($name::$variant),*];

            pub fn from_raw(raw: $raw) -> Self {
                match raw {
                    $( $value => $name::$variant, )*
                    other => $name::Unknown(other),
                }
            }

            pub fn raw(self) -> $raw {
                match self {
                    $( $name::$variant => $value, )*
                    $name::Unknown(raw) => raw,
                }
            }

            /// Upper-case name as spelled in the vendor header, `"UNKNOWN"` for the fallback.
            pub fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $bh, )*
                    $name::Unknown(_) => "UNKNOWN",
                }
            }

            pub fn is_known(self) -> bool {
                !matches!(self, $name::Unknown(_))
            }
        }

        impl From<$raw> for $name {
            fn from(raw: $raw) -> Self {
                $name::from_raw(raw)
            }
        }

        impl From<$name> for $raw {
            fn from(value: $name) -> $raw {
                value.raw()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                match self {
                    $name::Unknown(raw) => write!(f, "UNKNOWN({})", raw),
                    known => write!(f, "{}", known.name()),
                }
            }
        }
    };
}

/// Defines a bit-flag set over an unsigned raw type.
///
/// Each entry is `const FLAG = value => "VENDOR_MACRO";`. Several entries may share a bit
/// when the vendor assigns it different meanings on different module families; all of
/// them are reported when the bit is set.
macro_rules! spcm_flags {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident: $raw:ty {
            $(
                $(#[$fmeta:meta])*
                const $flag:ident = $value:literal => $bh:literal;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name($raw);

        impl $name {
            $(
                $(#[$fmeta])*
                pub const $flag: $name = $name($value);
            )*

            /// `(name, vendor macro, flag)` for every listed flag, aliases included.
            pub const FLAGS: &'static [(&'static str, &'static str, $name)] = &[
                $( (stringify!($flag), $bh, $name($value)), )*
            ];

            pub const fn empty() -> Self {
                $name(0)
            }

            /// Wraps raw bits as returned by the DLL, keeping bits no flag names.
            pub const fn from_bits_retain(bits: $raw) -> Self {
                $name(bits)
            }

            pub const fn bits(self) -> $raw {
                self.0
            }

            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            /// Names of the listed flags that are set.
            pub fn names(self) -> Vec<&'static str> {
                Self::FLAGS
                    .iter()
                    .filter(|(_, _, flag)| flag.0 != 0 && self.contains(*flag))
                    .map(|(name, _, _)| *name)
                    .collect()
            }

            /// Set bits that no listed flag covers.
            pub fn unknown_bits(self) -> $raw {
                let known = Self::FLAGS.iter().fold(0, |acc, (_, _, flag)| acc | flag.0);
                self.0 & !known
            }

            /// Vendor macro name for a flag name, e.g. `"ARMED"` -> `"SPC_ARMED"`.
            pub fn bh_name(name: &str) -> Option<&'static str> {
                Self::FLAGS
                    .iter()
                    .find(|(flag_name, _, _)| *flag_name == name)
                    .map(|(_, bh, _)| *bh)
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                $name(self.0 | rhs.0)
            }
        }

        impl std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl From<$raw> for $name {
            fn from(bits: $raw) -> Self {
                $name::from_bits_retain(bits)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                let mut parts: Vec<String> = self.names().into_iter().map(String::from).collect();
                let unknown = self.unknown_bits();
                if unknown != 0 {
                    parts.push(format!("{:#x}", unknown));
                }
                if parts.is_empty() {
                    write!(f, "{}(empty)", stringify!($name))
                } else {
                    write!(f, "{}({})", stringify!($name), parts.join(" | "))
                }
            }
        }
    };
}
