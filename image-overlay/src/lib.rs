#![allow(missing_docs)]

pub mod overlay;
