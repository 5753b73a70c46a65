pub mod archive;
pub mod manager;
pub mod result_error;
pub mod retention;
pub mod settings;
pub mod template;
pub mod validate;
