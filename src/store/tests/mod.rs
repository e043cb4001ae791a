// src/store/tests/mod.rs
