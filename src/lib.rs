//! scorebridge: a small web front end for music conversion tools.
//!
//! PDF scores are turned into MusicXML by an optical music recognition
//! program (or a canned file in mock mode), and YouTube audio is turned
//! into MIDI with `yt-dlp` and `basic-pitch`.

pub mod config;
pub mod convert;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
