//! Domain logic

pub mod mail;
