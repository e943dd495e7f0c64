//! `qkart` subcommand implementations.

pub mod account;
pub mod cart;
pub mod products;
