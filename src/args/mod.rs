mod cli;
mod parsers;


pub use cli::{ArbalestArgs, ArcherArgs, Command, TargetArgs};
pub use parsers::{load_payload, parse_interval};
