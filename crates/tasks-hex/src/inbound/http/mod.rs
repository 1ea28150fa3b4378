mod extract;
mod handlers;
pub mod request;
pub mod response;
mod server;

pub use extract::JsonBody;
pub use server::{serve_until, HttpServer, HttpServerConfig, SERVE_REPORT_WAIT, SHUTDOWN_GRACE};
