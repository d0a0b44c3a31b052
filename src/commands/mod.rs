pub mod common;
pub mod completions;
pub mod divisions;
pub mod formats;
pub mod play;
pub mod title;
pub mod tools;
