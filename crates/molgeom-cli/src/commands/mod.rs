pub mod cleanup;
pub mod stereo;
