//! Vishkar: an MCP server that serves SDLC guidance, agent profiles and
//! intent-driven context bundles to AI coding assistants.

pub mod api;
pub mod cache;
pub mod config;
pub mod mcp;
pub mod models;
pub mod services;
pub mod storage;
pub mod tools;
