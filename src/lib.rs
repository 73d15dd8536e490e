pub mod dispatch;
pub mod display;
pub mod error;
pub mod interface;
pub mod mode;
pub mod session;
pub mod shutdown;
