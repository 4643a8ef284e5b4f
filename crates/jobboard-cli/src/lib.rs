// Library half of the `jobboard` binary, split out so commands and rendering
// can be tested without a terminal.

pub mod cli;
pub mod commands;
pub mod render;
