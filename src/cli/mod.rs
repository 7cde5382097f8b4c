pub mod prompt;
pub mod shell;
pub mod table;

pub use shell::{App, Page};
pub use table::render_records;
