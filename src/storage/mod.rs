pub mod song;
pub mod watch;
