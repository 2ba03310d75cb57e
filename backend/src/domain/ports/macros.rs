//! `define_port_error!`: error enums for adapter failures.
//!
//! Every variant carries named fields and a display template. The macro adds
//! one snake_case constructor per variant taking `impl Into<_>` arguments, and
//! a `kind()` accessor naming the variant for structured logs.

macro_rules! define_port_error {
    (@ctor $variant:ident ($($params:tt)*) ($($inits:tt)*)) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };

    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident { $($field:ident : $ty:ty),* $(,)? } => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant { $($field : $ty),* },
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant () () $($field : $ty,)*);
            )*

            /// Variant name in snake_case.
            pub const fn kind(&self) -> &'static str {
                match self {
                    $(
                        Self::$variant { .. } => ::paste::paste! { stringify!([<$variant:snake>]) },
                    )*
                }
            }
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    define_port_error! {
        pub enum SamplePortError {
            Unreachable { message: String } => "unreachable: {message}",
            RateLimited { retry_after: u32 } => "retry in {retry_after}s",
            BadPayload { message: String, status: u16 } => "bad payload {status}: {message}",
        }
    }

    #[test]
    fn constructors_convert_into_field_types() {
        let err = SamplePortError::unreachable("dns");
        assert_eq!(err.to_string(), "unreachable: dns");

        let err = SamplePortError::rate_limited(30_u32);
        assert_eq!(err.to_string(), "retry in 30s");

        let err = SamplePortError::bad_payload("not json", 502_u16);
        assert_eq!(err.to_string(), "bad payload 502: not json");
    }

    #[test]
    fn kind_names_the_variant() {
        assert_eq!(SamplePortError::unreachable("x").kind(), "unreachable");
        assert_eq!(SamplePortError::rate_limited(1_u32).kind(), "rate_limited");
        assert_eq!(SamplePortError::bad_payload("x", 1_u16).kind(), "bad_payload");
    }
}
