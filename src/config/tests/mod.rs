//! Unit tests for deploybot configuration types.
//!
//! This module contains tests organised into:
//! - [`cli_tests`] - Subcommand selection
//! - [`helpers`] - Shared fixtures and helper functions
//! - [`types_tests`] - Defaults and serialisation
//! - [`validation`] - Storage validation and post-merge normalisation
//! - [`layer_precedence_tests`] - `MergeComposer` layer precedence tests

mod helpers;
