pub mod delivery_event;
pub mod webhook_subscription;
