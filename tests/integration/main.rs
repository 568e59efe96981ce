//! Integration tests against a real local WebSocket server.

mod center_test;
mod helpers;
mod transport_test;
