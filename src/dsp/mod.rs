//! DSP kernels behind the effect nodes.
//!
//! Everything here works on planar f32 blocks and owns its own state, so
//! the live graph and the offline renderer run the exact same code.

pub mod compressor;
pub mod delay;
pub mod eq;
pub mod filter;
pub mod gain;
pub mod reverb;
