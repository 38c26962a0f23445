//! Event / Session ストアの実装
//!
//! - `inmemory`: 単一プロセス向けのインメモリ実装
//! - 将来的に: 外部 KV ストアなど

pub mod inmemory;

pub use inmemory::InMemoryEventStore;
