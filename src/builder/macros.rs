//! Macros for ergonomic chart construction.

/// Generate a state id enum and its `State` implementation.
///
/// The enum derives everything the interpreter needs (`Copy`, `Eq`, `Hash`,
/// serde) and names each variant after itself.
///
/// # Example
///
/// ```
/// use chartmind::state_enum;
/// use chartmind::core::State;
///
/// state_enum! {
///     pub enum Player {
///         Root,
///         Stopped,
///         Playing,
///     }
/// }
///
/// assert_eq!(Player::Playing.name(), "Playing");
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $name {
            /// Every variant, in declaration order.
            #[allow(dead_code)]
            pub const ALL: &'static [$name] = &[$(Self::$variant),*];
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }
    };
}
