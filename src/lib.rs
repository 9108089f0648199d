//! Build-and-release orchestration for Django services on a managed platform.
//!
//! `deploybot` replaces the shell build script a platform runs before
//! starting a web service. It installs Python dependencies into a virtual
//! environment, collects static assets, proves the database is reachable,
//! and applies schema migrations, in that order, stopping at the first step
//! whose failure would leave the release broken.
//!
//! Every failure is classified so the operator gets one actionable hint:
//! an unreachable database points at TLS and the URI shape, a rejected login
//! points at the credentials.
//!
//! # Modules
//!
//! - [`api`]: Command functions behind the CLI (`build`, `check`, `services`)
//! - [`config`]: Configuration system with layered precedence (CLI > env > file > defaults)
//! - [`error`]: Semantic error types and the failure taxonomy
//! - [`logging`]: `tracing` subscriber setup
//! - [`manifest`]: Requirements file and service definition parsing
//! - [`pipeline`]: Steps, run state and the orchestrator
//! - [`probe`]: Database connection URI parsing and connectivity probing
//! - [`process`]: External command execution

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod pipeline;
pub mod probe;
pub mod process;
