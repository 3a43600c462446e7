//! Core library for the guestbook.
//!
//! Contains the entry model and its validation rules, the shared-secret
//! access gate, the entry repository, the JSON wire types, and the headless
//! client controller with its view rendering. This crate depends on
//! `guestbook-storage` for the document store trait and knows nothing about
//! HTTP or a specific database.

pub mod api;
pub mod controller;
pub mod entry;
pub mod error;
pub mod gate;
pub mod repository;
pub mod view;
