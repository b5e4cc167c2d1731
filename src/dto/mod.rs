pub mod proxy_dto;
pub mod webhook_dto;
