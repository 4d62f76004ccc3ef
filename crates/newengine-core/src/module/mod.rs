pub mod ctx;
pub mod module;

pub use ctx::ModuleCtx;
pub use module::Module;

pub use crate::bus::Bus;
