pub mod hub;
pub mod print_file;

pub use hub::Hub;
pub use print_file::{PrintFile, PrintFileMetadata};
