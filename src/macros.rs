#[macro_export]
macro_rules! tls_enum_u8 {
    ($(#[$attr:meta])* $name:ident => { $( $case:ident ( $val:expr ) ),* , (255) }) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        #[allow(non_camel_case_types)]
        pub enum $name {
            $(
                $case,
            )*
            unknown(u8)
        }

        impl $name {
            pub fn to_u8(&self) -> u8 {
                match self {
                    $(
                        $name::$case => $val,
                    )*
                    $name::unknown(v) => *v
                }
            }

            pub fn from_u8(v: u8) -> Self {
                match v {
                    $(
                        $val => $name::$case,
                    )*
                    _ => $name::unknown(v)
                }
            }

            pub fn parse(input: bytes::Bytes) -> $crate::parsing::ParseResult<Self> {
                let (v, rest) = $crate::parsing::be_u8(input)?;
                Ok((Self::from_u8(v), rest))
            }

            pub fn serialize(&self, out: &mut Vec<u8>) {
                out.push(self.to_u8());
            }
        }
    };
}

#[macro_export]
macro_rules! tls_enum_u16 {
    ($(#[$attr:meta])* $name:ident => { $( $case:ident ( $val:expr ) ),* , (0xFFFF) }) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[allow(non_camel_case_types)]
        pub enum $name {
            $(
                $case,
            )*
            unknown(u16)
        }

        impl $name {
            pub fn to_u16(&self) -> u16 {
                match self {
                    $(
                        $name::$case => $val,
                    )*
                    $name::unknown(v) => *v
                }
            }

            pub fn from_u16(v: u16) -> Self {
                match v {
                    $(
                        $val => $name::$case,
                    )*
                    _ => $name::unknown(v)
                }
            }

            pub fn parse(input: bytes::Bytes) -> $crate::parsing::ParseResult<Self> {
                let (v, rest) = $crate::parsing::be_u16(input)?;
                Ok((Self::from_u16(v), rest))
            }

            pub fn serialize(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_u16().to_be_bytes());
            }
        }
    };
}

#[macro_export]
macro_rules! tls_struct {
    ($name:ident => { $( $typ:ident $field:ident );* ; }) => {
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            $(
                pub $field: $typ,
            )*
        }

        impl $name {
            pub fn parse(input: bytes::Bytes) -> $crate::parsing::ParseResult<Self> {
                let rest = input;
                $(
                    let ($field, rest) = $typ::parse(rest)?;
                )*
                Ok((Self { $( $field, )* }, rest))
            }

            pub fn serialize(&self, out: &mut Vec<u8>) {
                $(
                    self.$field.serialize(out);
                )*
            }
        }
    };
}
