pub mod account;
pub mod ctf;
pub mod labs;
pub mod stats;
