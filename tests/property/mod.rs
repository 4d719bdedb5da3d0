// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Consistency, coalescing and freeze properties of derived values.

mod consistency;
