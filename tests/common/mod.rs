#![allow(dead_code, unused_imports)]

pub use ccnet_test_utils::*;
