mod console;
mod json;

pub use console::generate as generate_console;
pub use json::{JsonReport, generate as generate_json, write as write_json};
