mod config;
mod generator;
mod layout;
mod node;
mod status;
#[cfg(test)]
mod tests;

pub use config::*;
pub use generator::*;
pub use layout::*;
pub use node::*;
pub use status::*;
