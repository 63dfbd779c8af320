use std::sync::{Arc, RwLock};

pub mod heap_file;
pub mod heap_page;

/// A page as handed out by the buffer pool. The same `Arc` is shared by
/// every transaction that currently has the page locked; the inner `RwLock`
/// only guards the in-memory representation, actual isolation comes from the
/// lock manager.
pub type PageRef = Arc<RwLock<heap_page::HeapPage>>;
