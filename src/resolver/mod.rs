//! 页面端标题解析：元素查找轮询、标题应用与标题守护
pub mod guard;
pub mod title;

pub use self::guard::TitleGuard;
pub use self::title::{ResolverState, TitleResolver};
