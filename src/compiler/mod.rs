//! 编译模块：分组装配、路由编译与整体编排
pub mod group;
pub mod route;
pub mod compiler;

pub use self::group::GroupAssembler;
pub use self::route::RouteCompiler;
pub use self::compiler::{CompileRequest, ConfigCompiler};
