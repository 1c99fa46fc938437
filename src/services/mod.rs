pub mod editor;
pub mod prompt;
pub mod resolver;
pub mod session;
pub mod staging;
pub mod storage;
