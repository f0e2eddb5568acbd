pub mod archive;
pub mod container;
pub mod database;
pub mod document_store;
pub mod pipeline;
pub mod process;
pub mod retention;
pub mod scheduler;
pub mod staging;

#[cfg(test)]
pub mod testing;
