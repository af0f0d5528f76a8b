pub mod channel;
pub mod embed;
pub mod message;
pub mod presence;
pub mod user;

pub use channel::Channel;
pub use embed::{Embed, EmbedField};
pub use message::{CreateMessage, Message};
pub use presence::{Activity, Presence};
pub use user::User;
