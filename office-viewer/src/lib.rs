// Typed network event bus
pub mod bus;

// Local view model sync with the server stream
pub mod reconcile;
pub mod view;

// Local simulation and the switch that runs it while offline
pub mod demo;
pub mod fallback;

// Server transports (WebSocket stream and REST)
pub mod api_client;
pub mod network;

// Environment configuration
pub mod config;
