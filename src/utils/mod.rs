// src/utils/mod.rs

pub mod cookie;
pub mod form;
pub mod hash;
pub mod html;
pub mod jwt;
