//! HTTP collaborators: the executor abstraction used by the transport and the
//! response parsing helpers behind it.

mod executor;
mod parser;

pub use executor::*;
pub use parser::*;
