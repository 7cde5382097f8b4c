pub mod gateway;
pub mod protocol;
pub mod transport;

pub use gateway::{ApiGateway, CallOptions};
pub use transport::{ApiRequest, ApiResponse, FilePart, ReqwestTransport, RequestBody, Transport};
