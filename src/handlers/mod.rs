pub mod auth_handlers;
pub mod password_reset_handlers;
pub mod registration_handlers;
pub mod subscriber_handlers;
