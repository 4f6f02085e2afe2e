//! Request handlers.

pub mod health;
pub mod index;
pub mod status;
pub mod stream;

pub use health::*;
pub use index::*;
pub use status::*;
pub use stream::*;
