pub mod document_store;
pub mod http_client;
pub mod object_store;

pub use document_store::{InMemoryDocumentStore, JsonFileDocumentStore};
pub use http_client::ReqwestHttp;
pub use object_store::{InMemoryObjectStore, LocalObjectStore, SupabaseObjectStore};
