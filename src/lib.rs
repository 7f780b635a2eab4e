//! Airborne meteorological observation collector
//!
//! Correlates two surveillance streams, Mode-S Comm-B frames from a
//! dump1090-style decoder and VDL2/ACARS messages from dumpvdl2, into a
//! single stream of validated temperature and wind observations at altitude.

pub mod assembler;
pub mod config;
pub mod fragment;
pub mod geo;
pub mod ingest;
pub mod liveness;
pub mod modes;
pub mod notify;
pub mod outlier;
pub mod physics;
pub mod position;
pub mod store;
pub mod types;
pub mod vdl2;
