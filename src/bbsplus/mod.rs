pub mod ciphersuites;
pub mod commitment;
pub mod generators;
pub mod keys;
pub mod proof;
pub mod signature;
