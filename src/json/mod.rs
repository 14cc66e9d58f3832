//! JSON+ dissection: JSON documents rendered through a [`SchemaDictionary`].
//!
//! [`token`] turns the bytes into a token tree with absolute ranges, and [`walker`] maps
//! that tree onto the dictionary. A node whose path is declared with a compatible type gets
//! the declared rendering; everything else is rendered from its own shape. [`external`]
//! holds the optional helper-program delegation for string fields.
//!
//! [`SchemaDictionary`]: crate::schema::SchemaDictionary

pub mod external;
pub mod token;
pub mod walker;

pub use external::{DelegateError, ExternalParser, ParserOutput, ProcessParser};
pub use token::{tokenize, JsonKind, JsonMember, JsonNode, TokenError};
pub use walker::{JsonPlusDissector, JsonPlusOptions};
