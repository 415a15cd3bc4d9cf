//! Pipeline stages for extracting text from one uploaded image.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the extraction backend can change without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ decode ──▶ encode ──▶ service ──▶ invoke
//! (upload)  (sniff)    (base64)   (VLM call)  (normalise)
//! ```
//!
//! 1. [`input`]: uploaded items; loading files and directories for the CLI
//! 2. [`decode`]: sniff the format and decode the bytes with `image`
//! 3. [`encode`]: re-encode as PNG and base64-wrap for the request body
//! 4. [`service`]: the [`service::TextExtractor`] seam and its Gemini and
//!    edgequake-llm implementations; the only stage with network I/O
//! 5. [`invoke`]: glue the above together for one image and normalise the
//!    reply into text

pub mod decode;
pub mod encode;
pub mod input;
pub mod invoke;
pub mod service;
