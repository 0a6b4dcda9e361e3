pub mod history;
pub mod kv;
