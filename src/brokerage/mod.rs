//! Brokerage module - REST client for the brokerage/market-data API

pub mod auth;
pub mod messages;
pub mod rest;

pub use rest::BrokerageRestClient;
