//! Session commands.

mod login;
mod logout;
mod status;

pub use login::login;
pub use logout::logout;
pub use status::status;
