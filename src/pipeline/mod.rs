pub mod playback;
pub mod sound_loop;
pub mod tracks;
