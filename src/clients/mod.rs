pub mod email;
pub mod queue;
pub mod rbmq;
pub mod sender;
pub mod sms;
pub mod whatsapp;
