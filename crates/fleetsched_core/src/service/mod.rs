//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate authorization, the scheduling engine and repository calls
//!   into use-case level APIs.
//! - Keep outer layers decoupled from storage details.

pub mod assignment_service;
