pub mod download;
pub mod fs;
pub mod process;
pub mod shell;
