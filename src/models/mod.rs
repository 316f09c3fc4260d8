mod activity;
mod contact;
mod contact_detail;
mod email;
mod merge;
mod phone;
mod tag;
mod task;
mod version;

pub use activity::*;
pub use contact::*;
pub use contact_detail::*;
pub use email::*;
pub use merge::*;
pub use phone::*;
pub use tag::*;
pub use task::*;
pub use version::*;
