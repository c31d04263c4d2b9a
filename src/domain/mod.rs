pub mod narration;
pub mod playback;
