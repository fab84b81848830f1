//! Motionhouse - backend for a motion graphics and VFX studio site
//!
//! Serves the public site content (articles, settings), captures leads from
//! the contact form and newsletter, and exposes the production pricing
//! calculator. Staff manage everything through the `/api/admin` routes.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
