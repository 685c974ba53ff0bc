mod node;
mod rows;
mod status;
mod types;

pub use node::*;
pub use rows::*;
pub use status::*;
pub use types::*;
