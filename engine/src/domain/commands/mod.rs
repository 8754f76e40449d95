pub mod create_process;
pub mod create_tab;

pub use create_process::{CreateProcessCommand, CreateProcessResponse};
pub use create_tab::{TabOptions, TabUpdate};
