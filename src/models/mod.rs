pub mod acknowledgment;
pub mod channel;
pub mod health;
pub mod message;
pub mod response;
pub mod status;
pub mod validation;
pub mod whatsapp;
