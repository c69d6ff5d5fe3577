use serde::{Deserialize, Serialize};

/// Declares a surrogate-key newtype.
///
/// Keys are assigned by the store on insert. `new` wraps a key that already
/// came from the store or from a request.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw key value.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw key value.
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id!(
    /// Identifier of a customer record.
    CustomerId
);

entity_id!(
    /// Identifier of a product record.
    ProductId
);

entity_id!(
    /// Identifier of an order header.
    OrderId
);

entity_id!(
    /// Identifier of a persisted line item.
    LineItemId
);
