pub mod codec;
pub mod compare;
pub mod error;
pub mod generate;
pub mod kind;
pub mod resolve;
pub mod token;

pub use codec::{decode, encode};
pub use compare::{Insert, UniqueValues, compare, compare_tokens};
pub use error::OffsetError;
pub use generate::{SeededGenerator, ValueGenerator, generate_unique};
pub use kind::OffsetType;
pub use resolve::resolve;
pub use token::OffsetToken;
