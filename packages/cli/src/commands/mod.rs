pub mod init;
pub mod render;
pub mod serve;

pub use init::{init, InitArgs};
pub use render::{render, RenderArgs};
pub use serve::{serve, ServeArgs};
