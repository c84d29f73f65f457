#![forbid(unsafe_code)]

pub mod repository;

pub use repository::{
    AttemptRow, InMemoryRepository, ProgressRepository, QuestionBank, Storage, StorageError,
};
