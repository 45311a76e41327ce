//! Data models for OnlyPaws

mod media;
mod notification;
mod post;
mod profile;

pub use media::{ImageKind, ImageSource};
pub use notification::{Notification, NotificationKind};
pub use post::{Post, PostImage};
pub use profile::{ProfileImage, UserSummary};
