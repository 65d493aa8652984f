//! Memory Card: e-commerce backend for a video-game storefront.
//!
//! The interesting parts live in [`checkout`] (the atomic cart→order
//! transaction) and [`catalog`]/[`cache`]/[`rawg`] (the cache-aside proxy
//! in front of the rate-limited RAWG game-data API). Everything else is
//! the usual storefront plumbing: users, products, carts, reviews.

pub mod cache;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod metrics;
pub mod rawg;
