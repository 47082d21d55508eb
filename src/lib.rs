// ABOUTME: Library module for inline-dumper
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod checksum;
pub mod config;
pub mod dump;
pub mod error;
pub mod interactive;
pub mod mysql;
pub mod runner;
pub mod table_list;
pub mod target;
pub mod utils;
