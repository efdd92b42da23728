//! Client operations, split by concern.

mod connection;
mod messaging;
mod tools;
