pub mod buffer;
pub mod compute;
pub mod consts;
pub mod equalize;
pub mod error;
pub mod io;
pub mod pipeline;
