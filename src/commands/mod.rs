pub mod capture;
pub mod catalog;
pub mod config;
pub mod gate;
pub mod init;
pub mod pipeline;
pub mod profile;
pub mod records;

pub use capture::*;
pub use catalog::*;
pub use config::*;
pub use gate::*;
pub use init::*;
pub use pipeline::*;
pub use profile::*;
pub use records::*;
