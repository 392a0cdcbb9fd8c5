//! EMT Palma bus client: stop arrivals, line browsing and route maps.
pub mod emt_api;
pub mod emt_config;
pub mod emt_controllers;
pub mod emt_credential;
pub mod emt_format;
pub mod emt_gui;
pub mod emt_map;
pub mod emt_models;
pub mod emt_views;
