//! Serde-serializable value types for serial port parameters, kept
//! separate from any one transport so they can be shared by config
//! loaded from whatever source an embedder chooses. No file-loading
//! support lives here — that's the embedder's concern, not this
//! library's (see DESIGN.md).

pub mod types;

pub use types::{DataBits, Parity, StopBits};
