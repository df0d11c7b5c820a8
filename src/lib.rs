// Agent record model and ingestion validation
pub mod agent;

// Agent registry and broadcast loop
pub mod state;

// HTTP and WebSocket APIs
pub mod api;

// Shared bearer token handling
pub mod auth;

// Configuration (TOML + env)
pub mod config;

// Fixed-interval background jobs
pub mod scheduler;

// Mock agent generator (dev mode)
pub mod simulation;

// Viewer sessions and wire protocol
pub mod subscription;
