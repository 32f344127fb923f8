//! Fixed-point types and binary parameter blocks for the lifcore neuron processor
//!
//! The host tool-chain describes a neuron population in physical units,
//! turns it into a [`ParamBlock`] with [`ParamBlockBuilder`] and deposits the
//! encoded bytes next to the processor. The processor parses the block once
//! at startup; any structural or semantic defect rejects the whole block.
//!
//! A population that learns additionally gets a [`BcpnnRegion`], built from a
//! [`BcpnnSpec`] and shipped alongside the block in the same fashion.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bcpnn;
pub mod block;
pub mod builder;
pub mod decay;
pub mod error;
pub mod fixed_point;
pub mod ln;

pub use bcpnn::{
    BcpnnMode, BcpnnRegion, BcpnnSpec, BCPNN_MAGIC, BCPNN_MAX_DELAY, BCPNN_MAX_POST_NEURONS,
    BCPNN_MAX_PRE_SOURCES, BCPNN_VERSION, P_LUT_ENTRIES, P_LUT_TIME_SHIFT, Z_LUT_ENTRIES,
};
pub use block::{
    words_for_bits, BlockFlags, NeuronModelId, NeuronTypeParams, ParamBlock, ReceptorParams,
    ReceptorSign, BLOCK_VERSION, MAGIC, MAX_NEURONS_PER_CORE, MAX_RECEPTORS,
};
pub use builder::{LifSpec, ParamBlockBuilder, ReceptorSpec};
pub use decay::{decay_factor, ExpDecayLut};
pub use error::{ConfigError, Result};
pub use fixed_point::{FixedPoint, Q15_16};
pub use ln::{LnLut, LN_2, LN_LUT_INPUT_SHIFT};
