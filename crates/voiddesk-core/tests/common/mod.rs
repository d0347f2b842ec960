pub mod fakes;
pub mod http_server;
