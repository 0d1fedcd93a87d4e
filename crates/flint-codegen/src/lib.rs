mod frame;
pub mod generator;

pub use generator::Generator;
