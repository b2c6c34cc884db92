pub mod apply;
pub mod list;

pub use apply::{ApplyArgs, handle_apply};
pub use list::handle_list;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
