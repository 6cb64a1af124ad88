//! Claim and handover workflow for donated surplus food.
//!
//! A listing moves `Available -> Claimed -> Expired`. Claiming issues a
//! six digit pickup code; verifying that code at handover expires the
//! listing and credits its servings to the impact ledger.

pub mod config;
pub mod error;
pub mod impact;
pub mod lifecycle;
pub mod listing;
pub mod notification;
pub mod otp;
pub mod repository;
pub mod review;
pub mod seed;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;
pub mod witness;
