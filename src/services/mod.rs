pub mod blob_storage;
pub mod print_files;
