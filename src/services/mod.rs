pub mod delivery_service;
pub mod webhook_service;
