pub mod config;
pub mod console;
pub mod input;
pub mod run;
pub mod simulate;
pub mod status;
