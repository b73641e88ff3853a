pub mod error;
pub mod permissions;
pub mod service;
pub mod tree;
