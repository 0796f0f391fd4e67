//! DNS CLASSes and record TYPEs.
//!
//! Both are 16 bit IANA registries. The enums here cover the values this
//! crate can parse by mnemonic plus a raw variant for everything else, so
//! no registry value is unrepresentable. The `TYPEnnn` and `CLASSnnn`
//! generic forms of RFC 3597 are accepted and produced for values without
//! a well-known mnemonic.

use core::fmt;

/// Creates a registry type wrapping an integer.
macro_rules! int_enum {
    ( $(#[$attr:meta])* =>
      $ianatype:ident, $prefix:literal;
      $( $(#[$variant_attr:meta])* ( $variant:ident =>
                                        $value:expr, $mnemonic:expr) )* ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug)]
        pub enum $ianatype {
            $( $(#[$variant_attr])* $variant ),*,

            /// A raw value given through its integer.
            Int(u16)
        }

        impl $ianatype {
            /// Returns a value from its raw integer value.
            #[must_use]
            pub const fn from_int(value: u16) -> Self {
                match value {
                    $( $value => $ianatype::$variant ),*,
                    _ => $ianatype::Int(value)
                }
            }

            /// Returns the raw integer value for a value.
            #[must_use]
            pub const fn to_int(self) -> u16 {
                match self {
                    $( $ianatype::$variant => $value ),*,
                    $ianatype::Int(value) => value
                }
            }

            /// Returns a value from a well-defined mnemonic.
            #[must_use]
            pub fn from_mnemonic(m: &[u8]) -> Option<Self> {
                $(
                    if m.eq_ignore_ascii_case($mnemonic) {
                        return Some($ianatype::$variant)
                    }
                )*
                None
            }

            /// Returns the mnemonic for this value if there is one.
            #[must_use]
            pub const fn to_mnemonic(self) -> Option<&'static [u8]> {
                match self {
                    $( $ianatype::$variant => Some($mnemonic) ),*,
                    $ianatype::Int(value) => {
                        match $ianatype::from_int(value) {
                            $ianatype::Int(_) => None,
                            value => value.to_mnemonic()
                        }
                    }
                }
            }

            /// Returns a value from its representation format.
            ///
            /// Accepts the well-defined mnemonics plus the generic
            /// form, the ASCII prefix followed by the decimal value.
            #[must_use]
            pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
                if let Some(value) = Self::from_mnemonic(bytes) {
                    return Some(value)
                }
                if bytes.len() <= $prefix.len() {
                    return None
                }
                let (prefix, digits) = bytes.split_at($prefix.len());
                if !prefix.eq_ignore_ascii_case($prefix) {
                    return None
                }
                let mut value = 0u16;
                for &ch in digits {
                    if !ch.is_ascii_digit() {
                        return None
                    }
                    value = value.checked_mul(10)?
                        .checked_add((ch - b'0') as u16)?;
                }
                Some(Self::from_int(value))
            }
        }

        //--- From

        impl From<u16> for $ianatype {
            fn from(value: u16) -> Self {
                $ianatype::from_int(value)
            }
        }

        impl From<$ianatype> for u16 {
            fn from(value: $ianatype) -> Self {
                value.to_int()
            }
        }

        //--- PartialEq and Eq

        impl PartialEq for $ianatype {
            fn eq(&self, other: &Self) -> bool {
                self.to_int() == other.to_int()
            }
        }

        impl PartialEq<u16> for $ianatype {
            fn eq(&self, other: &u16) -> bool {
                self.to_int() == *other
            }
        }

        impl Eq for $ianatype { }

        //--- Hash

        impl core::hash::Hash for $ianatype {
            fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
                self.to_int().hash(state)
            }
        }

        //--- Display

        impl fmt::Display for $ianatype {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                match self.to_mnemonic() {
                    Some(m) => {
                        for ch in m {
                            write!(f, "{}", *ch as char)?;
                        }
                        Ok(())
                    }
                    None => {
                        write!(
                            f, "{}{}",
                            unsafe {
                                core::str::from_utf8_unchecked($prefix)
                            },
                            self.to_int(),
                        )
                    }
                }
            }
        }
    }
}

int_enum! {
    /// DNS CLASSes.
    ///
    /// The domain name space is partitioned into separate classes for
    /// different network types. In practice only the IN class is really
    /// relevant, but zone files name the others, so they are accepted.
    =>
    Class, b"CLASS";

    /// Internet (IN).
    (In => 1, b"IN")

    /// CSNET (CS).
    ///
    /// Obsolete, but RFC 1035 master files may still carry it.
    (Cs => 2, b"CS")

    /// Chaosnet (CH).
    (Ch => 3, b"CH")

    /// Hesiod (HS).
    (Hs => 4, b"HS")
}

int_enum! {
    /// DNS record TYPEs.
    ///
    /// The variants cover the types this crate has mnemonics for. Every
    /// other type is representable through `Int` and the `TYPEnnn`
    /// generic form.
    =>
    Rtype, b"TYPE";

    /// A host address.
    (A => 1, b"A")

    /// An authoritative name server.
    (Ns => 2, b"NS")

    /// The canonical name for an alias.
    (Cname => 5, b"CNAME")

    /// The start of a zone of authority.
    (Soa => 6, b"SOA")

    /// A domain name pointer.
    (Ptr => 12, b"PTR")

    /// Mail exchange.
    (Mx => 15, b"MX")

    /// Text strings.
    (Txt => 16, b"TXT")

    /// An IPv6 host address.
    (Aaaa => 28, b"AAAA")

    /// Server selection.
    (Srv => 33, b"SRV")

    /// Delegation signer.
    (Ds => 43, b"DS")

    /// A DNSSEC signature.
    (Rrsig => 46, b"RRSIG")

    /// Authenticated denial of existence.
    (Nsec => 47, b"NSEC")

    /// A DNSSEC key.
    (Dnskey => 48, b"DNSKEY")
}

//============ Testing =======================================================
