pub mod client;
pub mod transport;

pub use client::ReqwestTransport;
pub use transport::{
    HttpTransport, IndexRequest, IndexResponse, RequestTarget, TransferProgress,
};
