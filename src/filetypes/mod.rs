// all the file types we know how to carve
pub mod corpus;
pub mod jpeg;
pub mod mp3;
pub mod ogg;
pub mod png;
pub mod wav;

pub use jpeg::JpegCarver;
pub use mp3::Mp3Carver;
pub use ogg::OggCarver;
pub use png::PngCarver;
pub use wav::WavCarver;
