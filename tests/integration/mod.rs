//! End-to-end behaviour of the music core without Discord

pub mod playback;
pub mod voice;
