//! Speech decoder engines.
//!
//! Each engine opens a [`DecoderSession`](crate::DecoderSession) from a
//! [`DecoderConfig`](crate::DecoderConfig). The session owns the native
//! engine state and frees it on drop.
//!
//! # Available Engines
//!
//! ## Whisper Engine
//!
//! whisper.cpp through `whisper-rs` (cargo feature `whisper`):
//! - **Model Format**: Single GGML format file (`.bin`)
//! - **Frame rate**: 100 frames per second (token timestamps are centiseconds)
//! - **Grammars**: FSG vocabularies are used as a decoding prompt
//! - **Endpointing**: short-term energy, see [`energy::EnergyEndpointer`]
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::path::PathBuf;
//! use subalign_rs::engines::whisper::{WhisperDecoder, WhisperDecoderParams};
//! use subalign_rs::{DecoderConfig, DecoderSession};
//!
//! let config = DecoderConfig {
//!     acoustic_model_path: PathBuf::from("models/ggml-base.en.bin"),
//!     ..DecoderConfig::default()
//! };
//! let mut decoder = WhisperDecoder::configure(&config, WhisperDecoderParams::default())?;
//! let decoded = decoder.decode_samples(&samples)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod energy;
pub mod pieces;
#[cfg(feature = "whisper")]
pub mod whisper;
