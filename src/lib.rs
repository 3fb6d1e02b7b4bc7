//! Streaming file carver.
//!
//! Bytes are fed in arbitrary chunks to a [`Corpus`] of carvers, one per file
//! type. Each carver runs many overlapping recognition attempts at once over a
//! single forward pass and reports the `[start, end)` ranges which look like
//! complete PNG, JPEG, WAV, MP3 or Ogg files.
//!
//! ```
//! use bytecarve::{Carver, Corpus};
//!
//! let mut corpus = Corpus::new();
//! corpus.process_bytes(b"RIFF\x24\x00\x00\x00WAVEfmt ");
//! corpus.finalize();
//!
//! let (carver, det) = corpus.detection(0).unwrap();
//! assert_eq!(carver.ext(), "wav");
//! assert_eq!(det.range(), 0..44);
//! ```
pub mod audit;
pub mod carver;
pub mod carvers;
pub mod export;
pub mod filetypes;
pub mod search;

pub use carver::{Carver, Detection};
pub use filetypes::corpus::{human_size, Corpus};
