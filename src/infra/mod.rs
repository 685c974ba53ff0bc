mod config;
mod demo;
mod feed;
mod logging;
mod observer;

pub use config::*;
pub use demo::*;
pub use feed::*;
pub use logging::*;
pub use observer::*;
